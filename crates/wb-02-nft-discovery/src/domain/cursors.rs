//! Continuation cursors keyed by the operation that returned them.

use std::collections::BTreeMap;

use super::entities::FetchOrigin;

/// Pagination cursors grouped by [`FetchOrigin`].
#[derive(Debug, Clone, Default)]
pub struct CursorBook {
    by_origin: BTreeMap<FetchOrigin, Vec<String>>,
}

impl CursorBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `cursors` to the list kept for `origin`.
    pub fn record(&mut self, origin: FetchOrigin, cursors: impl IntoIterator<Item = String>) {
        let mut cursors = cursors.into_iter().peekable();
        if cursors.peek().is_none() {
            return;
        }
        self.by_origin.entry(origin).or_default().extend(cursors);
    }

    pub fn cursors_for(&self, origin: &FetchOrigin) -> &[String] {
        self.by_origin
            .get(origin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Remove and return the cursors kept for `origin`.
    pub fn take(&mut self, origin: &FetchOrigin) -> Vec<String> {
        self.by_origin.remove(origin).unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<FetchOrigin, Vec<String>> {
        self.by_origin.clone()
    }

    pub fn len(&self) -> usize {
        self.by_origin.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }
}
