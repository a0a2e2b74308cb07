//! Canonical description of the files in a resolved dataset.
//!
//! Providers return heterogeneous file listings; [`normalize`] turns them into
//! a [`StorageContent`] whose element order matches the provider's listing.

use serde::Serialize;
use url::Url;

/// One file as reported by a provider, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileEntry {
    /// File name (provider key).
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Provider checksum, usually `algorithm:hex`.
    pub checksum: Option<String>,
    /// Where the file can be downloaded from.
    pub download_url: Url,
}

/// A provider's file listing in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFileListing {
    /// Listed files.
    pub entries: Vec<RawFileEntry>,
}

/// One file in a resolved dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageElement {
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Checksum, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Download URL.
    pub source_url: Url,
}

impl From<RawFileEntry> for StorageElement {
    fn from(entry: RawFileEntry) -> Self {
        Self {
            name: entry.name,
            size_bytes: entry.size,
            checksum: entry.checksum.filter(|c| !c.trim().is_empty()),
            source_url: entry.download_url,
        }
    }
}

/// Ordered collection of storage elements.
///
/// `count` always equals the number of elements; it is recomputed on every
/// mutation and cannot be set independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageContent {
    elements: Vec<StorageElement>,
    count: usize,
}

impl StorageContent {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    /// Appends an element.
    pub fn push(&mut self, element: StorageElement) {
        self.elements.push(element);
        self.count = self.elements.len();
    }

    /// Elements in source order.
    #[must_use]
    pub fn elements(&self) -> &[StorageElement] {
        &self.elements
    }

    /// Number of elements.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total size of all elements in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.elements.iter().map(|e| e.size_bytes).sum()
    }
}

impl Extend<StorageElement> for StorageContent {
    fn extend<T: IntoIterator<Item = StorageElement>>(&mut self, iter: T) {
        self.elements.extend(iter);
        self.count = self.elements.len();
    }
}

impl FromIterator<StorageElement> for StorageContent {
    fn from_iter<T: IntoIterator<Item = StorageElement>>(iter: T) -> Self {
        let mut content = Self::new();
        content.extend(iter);
        content
    }
}

impl<'a> IntoIterator for &'a StorageContent {
    type Item = &'a StorageElement;
    type IntoIter = std::slice::Iter<'a, StorageElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Converts a provider listing into canonical storage content.
///
/// One element per entry, source order preserved, missing checksums tolerated.
#[must_use]
pub fn normalize(listing: RawFileListing) -> StorageContent {
    let mut content = StorageContent::with_capacity(listing.entries.len());
    content.extend(listing.entries.into_iter().map(StorageElement::from));
    content
}
