use serde::Serialize;
use structwire_primitives::PrimitiveValue;

/// An owned, read-only copy of a protocol's leaf values.
///
/// Handlers that need message data after their callback returns should
/// keep a snapshot rather than the live protocol, which the next message
/// of the same type overwrites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub id: u64,
    /// Latest capture timestamp among the leaves, `0` if never decoded.
    pub timestamp_ns: u64,
    pub values: Vec<SnapshotEntry>,
}

/// One leaf value and its flattened path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub path: String,
    pub value: PrimitiveValue,
}

impl Snapshot {
    pub fn get(&self, path: &str) -> Option<PrimitiveValue> {
        self.values
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.value)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|entry| entry.path.as_str())
    }
}
