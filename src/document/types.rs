//! The persisted document record.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::Key;
use crate::error::{Error, Result};

/// Name of the payload field carrying the document body.
pub const DATA_FIELD: &str = "data";

/// A stored document: an id, an opaque JSON body, and write metadata.
///
/// Serializes to the on-disk and wire representation:
///
/// ```json
/// {
///   "id": "0b8e4f9c-6a53-4c1e-9d2f-1f0e3c8a7b21",
///   "data": {"x": 1},
///   "created_at": "2024-05-01T12:00:00.123456Z",
///   "created_by": "node-a",
///   "updated_at": "2024-05-01T12:05:00.000001Z",
///   "updated_by": "node-b"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Key,
    pub data: Value,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Document {
    pub(crate) fn new(id: Key, data: Value, writer_id: &str) -> Self {
        Self {
            id,
            data,
            created_at: now(),
            created_by: writer_id.to_string(),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Replace the body wholesale and stamp the update metadata.
    pub(crate) fn replace_data(&mut self, data: Value, writer_id: &str) {
        self.data = data;
        self.updated_at = Some(now());
        self.updated_by = Some(writer_id.to_string());
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::internal(format!("failed to serialize document {}: {}", self.id, e)))
    }

    /// Parse a persisted record, checking it belongs to `key`.
    pub(crate) fn from_bytes(key: &Key, bytes: &[u8]) -> Result<Self> {
        let document: Self = serde_json::from_slice(bytes).map_err(|e| Error::malformed(key, e))?;
        if document.id != *key {
            return Err(Error::malformed(
                key,
                format!("record carries id '{}'", document.id),
            ));
        }
        Ok(document)
    }
}

/// Extract the `data` field from a request payload.
pub(crate) fn take_data(payload: Value) -> Result<Value> {
    match payload {
        Value::Object(mut fields) => fields.remove(DATA_FIELD).ok_or_else(|| {
            Error::invalid_input(format!("request body must contain \"{}\" field", DATA_FIELD))
        }),
        _ => Err(Error::invalid_input("request body must be a JSON object")),
    }
}

/// Current time at the precision records are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// RFC 3339 timestamps in UTC. Naive ISO-8601 values without an offset are
/// read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
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
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp '{}'", raw))
                }),
                None => Ok(None),
            }
        }
    }
}
