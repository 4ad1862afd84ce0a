use std::collections::BTreeMap;
use std::fmt;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

const AUTO_ID_LEN: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "timestampValue")]
    Timestamp(String),
}

/// Fields of a document about to be created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, Value>,
    server_timestamps: Vec<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_double(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.fields.insert(name.into(), Value::Double(value));
        self
    }

    /// Marks `name` to be filled with the commit time by the server.
    pub fn set_server_timestamp(&mut self, name: impl Into<String>) -> &mut Self {
        self.server_timestamps.push(name.into());
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn server_timestamps(&self) -> &[String] {
        &self.server_timestamps
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionPath {
    segments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            segments: vec![collection_id.into()],
        }
    }

    pub fn doc(&self, document_id: impl Into<String>) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(document_id.into());
        DocumentPath { segments }
    }

    /// Path of a new document with a random id.
    pub fn new_doc(&self) -> DocumentPath {
        self.doc(auto_id())
    }
}

impl DocumentPath {
    pub fn collection(&self, collection_id: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(collection_id.into());
        CollectionPath { segments }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn auto_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}
