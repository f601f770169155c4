//! Predicate port applied to every successfully fetched record.

use crate::domain::Record;

/// Decides whether a fetched record is kept.
///
/// The fetch loop evaluates every registered filter for every record, even
/// after one has already rejected it.
pub trait RecordFilter: Send + Sync {
    /// Return `true` to keep `record`.
    fn accepts(&self, record: &Record) -> bool;
}

impl<F> RecordFilter for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn accepts(&self, record: &Record) -> bool {
        self(record)
    }
}
