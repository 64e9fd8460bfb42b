use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Index;
use std::slice;

use crate::canon::key_digest;

/// One row of a view response: `(id, key, value)` plus the full document
/// when `include_docs` was requested.
///
/// A row synthesized for a missing key has `id = None` and `value = Null`,
/// with `key` set to the requested key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

impl ViewRow {
    /// Placeholder row for a requested key the server returned no match for.
    pub fn missing(key: Value) -> Self {
        Self {
            id: None,
            key,
            value: Value::Null,
            doc: None,
        }
    }
}

/// Decoded body of a view or all-docs response, before reconciliation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewResponse {
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub rows: Option<Vec<ViewRow>>,
}

/// Rebuild a complete, ordered row sequence from a sparse server response.
///
/// The server only returns rows for keys that matched; it makes no promise
/// about their order relative to the request. This restores both guarantees:
/// the output has exactly one row per requested key, in request order, with
/// unmatched keys becoming [`ViewRow::missing`] placeholders.
///
/// Rows are matched by a digest of their key's canonical JSON form (see
/// [`crate::canon`]), so structurally equal composite keys match regardless
/// of how either side was constructed. When the response carries several
/// rows for the same key, the first one wins. Duplicate requested keys each
/// resolve independently against the same lookup.
///
/// Total by construction: an unmatched key is a missing row, not an error.
/// `rows = None` and an empty key list are both no-ops.
pub fn reconcile_missing_keys(
    requested_keys: &[Value],
    rows: Option<Vec<ViewRow>>,
) -> Option<Vec<ViewRow>> {
    let rows = rows?;
    if requested_keys.is_empty() {
        return Some(rows);
    }

    let mut by_digest: HashMap<String, ViewRow> = HashMap::with_capacity(rows.len());
    for row in rows {
        by_digest.entry(key_digest(&row.key)).or_insert(row);
    }

    let reconciled: Vec<ViewRow> = requested_keys
        .iter()
        .map(|key| match by_digest.get(&key_digest(key)) {
            Some(row) => row.clone(),
            None => ViewRow::missing(key.clone()),
        })
        .collect();

    tracing::debug!(
        requested = requested_keys.len(),
        matched = by_digest.len(),
        "reconciled view rows"
    );
    Some(reconciled)
}

/// Read-only, ordered collection of view rows, as returned to the caller.
///
/// `total_rows` and `offset` are reported exactly as the server sent them;
/// in particular `total_rows` counts the whole index, not this page, and is
/// not recomputed after reconciliation. Immutable once built, so sharing
/// across threads is safe.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    rows: Vec<ViewRow>,
    total_rows: Option<u64>,
    offset: Option<u64>,
}

impl QueryResult {
    pub fn new(rows: Vec<ViewRow>, total_rows: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            rows,
            total_rows,
            offset,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ViewRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, ViewRow> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ViewRow> {
        self.rows
    }

    /// Total number of rows in the underlying index, when reported.
    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    /// Offset of the first row within the index, when reported.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

impl From<ViewResponse> for QueryResult {
    fn from(response: ViewResponse) -> Self {
        Self::new(
            response.rows.unwrap_or_default(),
            response.total_rows,
            response.offset,
        )
    }
}

impl Index<usize> for QueryResult {
    type Output = ViewRow;

    fn index(&self, index: usize) -> &ViewRow {
        &self.rows[index]
    }
}

impl IntoIterator for QueryResult {
    type Item = ViewRow;
    type IntoIter = std::vec::IntoIter<ViewRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a ViewRow;
    type IntoIter = slice::Iter<'a, ViewRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
