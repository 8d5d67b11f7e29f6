// Reply parsing
//
// Turns a reply batch into attribute records: one record per `!re` row,
// holding that row's `=key=value` words with the sigil stripped.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

use crate::sentence::{ReplyBatch, ReplyKind};

/// Key/value view of one `!re` data row, in the order the router sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeRecord {
    fields: IndexMap<String, String>,
}

impl AttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. A repeated key keeps its first position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Missing fields read as the empty string.
    pub fn get_or_default(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Numeric field; missing or unparsable values read as zero.
    pub fn get_u64(&self, key: &str) -> u64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    /// Router booleans are spelled `true` / `false` (older firmware: `yes` / `no`).
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true" | "yes"))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Field lookup; absence is a normal outcome.
pub fn extract_field<'a>(record: &'a AttributeRecord, key: &str) -> Option<&'a str> {
    record.get(key)
}

/// Parse every `!re` row of a batch.
pub fn parse(batch: &ReplyBatch) -> Vec<AttributeRecord> {
    parse_words(
        batch
            .sentences()
            .iter()
            .flat_map(|s| s.words().iter().map(String::as_str)),
    )
}

/// Parse a flat word stream.
///
/// A `!re` opens a record and any reply marker closes the open one. Words
/// outside a record and words with no `key=value` shape are skipped.
pub fn parse_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Vec<AttributeRecord> {
    let mut records = Vec::new();
    let mut current: Option<AttributeRecord> = None;

    for word in words {
        if let Some(kind) = ReplyKind::from_word(word) {
            records.extend(current.take());
            if kind == ReplyKind::Re {
                current = Some(AttributeRecord::new());
            }
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };
        let Some(body) = word.strip_prefix('=').or_else(|| word.strip_prefix('?')) else {
            trace!(word, "skipping word without attribute sigil");
            continue;
        };
        match body.split_once('=') {
            Some((key, value)) if !key.is_empty() => record.insert(key, value),
            _ => trace!(word, "skipping malformed attribute word"),
        }
    }

    // A row cut short by a partial batch is still handed back.
    records.extend(current);
    records
}
