//! A single record read from the stream log.

use std::collections::BTreeMap;

/// One entry of the append-only stream log.
///
/// The `id` is assigned by the log on append (`<millis>-<seq>` for Redis
/// streams) and is unique within the stream. Entries are immutable once
/// read and are removed from the log by the poll cycle that claims them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log-assigned identifier.
    pub id: String,
    /// Field name to value mapping carried by the entry.
    pub fields: BTreeMap<String, String>,
}

impl LogEntry {
    /// Build an entry from an ID and field pairs.
    pub fn new<I, K, V>(id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
