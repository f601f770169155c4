//! Aggregating sink that counts accepted records per field value.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::domain::Record;
use crate::domain::filters::lookup;
use crate::domain::ports::{RecordSink, RecordSinkError};

/// Shared read access to the counts of a [`FieldTallySink`].
#[derive(Debug, Clone, Default)]
pub struct TallyHandle(Arc<Mutex<BTreeMap<String, u64>>>);

impl TallyHandle {
    /// Copy of the current counts, ordered by value.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn bump(&self, key: String) {
        let mut counts = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = counts.entry(key).or_insert(0);
        *slot = slot.saturating_add(1);
    }
}

/// Counts records by the value found at a dotted field path.
///
/// Records without the field are ignored.
///
/// # Examples
/// ```
/// use harvester::domain::FieldTallySink;
/// use harvester::domain::ports::RecordSink;
/// use serde_json::json;
///
/// let (mut sink, handle) = FieldTallySink::new("queueType");
/// let record = json!({"queueType": "RANKED_SOLO_5x5"});
/// sink.accept(record.as_object().expect("object")).expect("tally");
/// assert_eq!(handle.snapshot().get("RANKED_SOLO_5x5"), Some(&1));
/// ```
#[derive(Debug)]
pub struct FieldTallySink {
    path: Vec<String>,
    counts: TallyHandle,
}

impl FieldTallySink {
    /// Build a sink plus the handle used to read its counts.
    pub fn new(path: &str) -> (Self, TallyHandle) {
        let counts = TallyHandle::default();
        let sink = Self {
            path: path.split('.').map(str::to_owned).collect(),
            counts: counts.clone(),
        };
        (sink, counts)
    }
}

impl RecordSink for FieldTallySink {
    fn accept(&mut self, record: &Record) -> Result<(), RecordSinkError> {
        let key = match lookup(record, &self.path) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        self.counts.bump(key);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecordSinkError> {
        Ok(())
    }
}
