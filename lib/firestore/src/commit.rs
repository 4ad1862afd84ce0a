use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Document, DocumentPath, Error, Value};

const REQUEST_TIME: &str = "REQUEST_TIME";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitRequest<'a> {
    writes: Vec<Write<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Write<'a> {
    update: Update<'a>,
    current_document: Precondition,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    update_transforms: Vec<FieldTransform<'a>>,
}

#[derive(Debug, Serialize)]
struct Update<'a> {
    name: String,
    fields: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform<'a> {
    field_path: &'a str,
    set_to_server_value: &'static str,
}

impl<'a> CommitRequest<'a> {
    /// Single write that creates `name` and fails if it already exists.
    pub(crate) fn create(name: String, document: &'a Document) -> Self {
        let update_transforms = document
            .server_timestamps()
            .iter()
            .map(|field_path| FieldTransform {
                field_path,
                set_to_server_value: REQUEST_TIME,
            })
            .collect();

        Self {
            writes: vec![Write {
                update: Update {
                    name,
                    fields: document.fields(),
                },
                current_document: Precondition { exists: false },
                update_transforms,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResponse>,
    commit_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResponse {
    update_time: Option<String>,
    #[serde(default)]
    transform_results: Vec<Value>,
}

/// Outcome of a successful document creation.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteResult {
    pub document: DocumentPath,
    /// Value the server stored for the first server timestamp field, or the
    /// commit time when the document had none.
    pub server_time: DateTime<Utc>,
}

impl CommitResponse {
    pub(crate) fn into_write_result(self, document: DocumentPath) -> Result<WriteResult, Error> {
        let write = self
            .write_results
            .into_iter()
            .next()
            .ok_or(Error::MissingWriteResult)?;

        let timestamp = write
            .transform_results
            .into_iter()
            .find_map(|value| match value {
                Value::Timestamp(timestamp) => Some(timestamp),
                Value::Double(_) => None,
            })
            .or(write.update_time)
            .unwrap_or(self.commit_time);

        let server_time = DateTime::parse_from_rfc3339(&timestamp)?.with_timezone(&Utc);

        Ok(WriteResult {
            document,
            server_time,
        })
    }
}
