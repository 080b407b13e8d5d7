//! Response bodies of the Paperless statistics and tasks endpoints.
//!
//! Every field defaults when absent, and `null` decodes as the default too, so a
//! partial response still produces a value instead of a decode error.

use serde::{Deserialize, Deserializer};

/// Body of `GET /api/statistics/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub documents_total: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub documents_inbox: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub inbox_tag: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub character_count: u64,
    #[serde(
        rename = "document_file_type_counts",
        deserialize_with = "null_as_default"
    )]
    pub file_type_counts: Vec<MimeTypeCount>,
}

/// Number of documents with a given MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MimeTypeCount {
    #[serde(deserialize_with = "null_as_default")]
    pub mime_type: String,
    #[serde(rename = "mime_type_count", deserialize_with = "null_as_default")]
    pub count: u64,
}

/// One entry of `GET /api/tasks/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteTask {
    #[serde(deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub task_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub task_file_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date_created: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date_done: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    /// Celery state, e.g. `SUCCESS`, `FAILURE`, `PENDING`.
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(deserialize_with = "null_as_default")]
    pub acknowledged: bool,
    /// Document id as reported by the API; older releases send it as a string,
    /// newer ones as a number.
    #[serde(deserialize_with = "string_or_number")]
    pub related_document: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        None => String::new(),
    })
}
