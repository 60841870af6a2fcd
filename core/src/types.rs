//! Domain DTOs for the todo API.
//!
//! # Design
//! Field names are camelCase on the wire and optional fields are omitted
//! rather than serialized as `null`. Timestamps use ISO-8601 UTC with
//! millisecond precision (`2026-01-02T03:04:05.678Z`) regardless of the
//! precision of the clock that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single todo item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Outcome of the last mirror write. Absent when no mirror is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_in_blob: Option<bool>,
}

impl Todo {
    /// The JSON document written to blob storage. Mirror bookkeeping
    /// (`storedInBlob`) is not part of the persisted form.
    pub fn to_blob_json(&self) -> Result<String, serde_json::Error> {
        let persisted = Todo {
            stored_in_blob: None,
            ..self.clone()
        };
        serde_json::to_string(&persisted)
    }
}

/// Request payload for creating a todo. `title` is optional here so that a
/// missing title reaches the store and fails validation instead of failing
/// deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTodo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request payload for updating an existing todo. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Response body of `GET /todos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoList {
    pub count: usize,
    pub items: Vec<Todo>,
}

/// Response body of `DELETE /todos/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTodo {
    pub message: String,
    pub todo: Todo,
}

/// Error body shared by every failing route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// Millisecond-precision RFC 3339 timestamps.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&super::format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
