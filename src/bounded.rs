//! Timeout racing for network-bound stages.
//!
//! Every network stage (redirect lookup, record fetch, listing fetch, job
//! submission) is raced against its own timer. The result is a three-way
//! outcome so callers can tell "too slow" apart from "failed".

use std::future::Future;
use std::time::Duration;

/// Result of racing a fallible stage against a timer.
#[derive(Debug)]
pub enum StageOutcome<T, E> {
    /// The stage finished in time and succeeded.
    Completed(T),
    /// The stage finished in time and failed.
    Failed(E),
    /// The timer fired first; the stage was dropped.
    TimedOut(Duration),
}

/// Runs `stage` for at most `limit`.
pub async fn race<F, T, E>(limit: Duration, stage: F) -> StageOutcome<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, stage).await {
        Ok(Ok(value)) => StageOutcome::Completed(value),
        Ok(Err(error)) => StageOutcome::Failed(error),
        Err(_) => StageOutcome::TimedOut(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_race_completed() {
        let outcome = race(Duration::from_millis(100), async { Ok::<_, String>(7) }).await;
        assert!(matches!(outcome, StageOutcome::Completed(7)));
    }

    #[tokio::test]
    async fn test_race_failed() {
        let outcome = race(Duration::from_millis(100), async {
            Err::<u8, _>("refused".to_string())
        })
        .await;
        assert!(matches!(outcome, StageOutcome::Failed(ref e) if e == "refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_times_out_even_if_stage_would_succeed() {
        let outcome = race(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(1)
        })
        .await;
        assert!(matches!(outcome, StageOutcome::TimedOut(d) if d == Duration::from_millis(50)));
    }
}
