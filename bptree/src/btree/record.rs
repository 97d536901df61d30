//! Stored records.

/// Identifier assigned to every inserted record.
///
/// Identifiers start at 1 and are never reused within a tree.
pub type RecordId = u64;

/// A stored value paired with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<V> {
    pub record_id: RecordId,
    pub value: V,
}

impl<V> Record<V> {
    #[must_use]
    pub const fn new(record_id: RecordId, value: V) -> Self {
        Self { record_id, value }
    }
}
