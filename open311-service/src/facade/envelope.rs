//! Result envelope
//!
//! Serializes as `{ "<plural key>": [...], "pages": n, "count": n }`, e.g.
//!
//! ```json
//! { "priorities": [{ "_id": "...", "name": "High" }], "pages": 1, "count": 1 }
//! ```

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::store::Document;

/// Records plus pagination metadata under the resource's plural key
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEnvelope {
    key: String,
    records: Vec<Document>,
    pages: u64,
    count: u64,
}

impl ResultEnvelope {
    /// Wrap records under `key`
    pub fn new(key: impl Into<String>, records: Vec<Document>, pages: u64, count: u64) -> Self {
        Self {
            key: key.into(),
            records,
            pages,
            count,
        }
    }

    /// The plural key the records are published under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The records, in result order
    pub fn records(&self) -> &[Document] {
        &self.records
    }

    /// The `pages` value
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// The `count` value
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Take the records out of the envelope
    pub fn into_records(self) -> Vec<Document> {
        self.records
    }
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(&self.key, &self.records)?;
        map.serialize_entry("pages", &self.pages)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}

impl IntoResponse for ResultEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
