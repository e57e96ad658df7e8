//! Conversion of host records into typed module entities.
//!
//! Mapping never fails. Each field is read by its fixed name through a serde
//! intermediate struct whose fields all deserialize leniently:
//!
//! * required text (`Name`, versions) defaults to `""`;
//! * optional text defaults to `None`, and blank text counts as unset;
//! * timestamps accept RFC 3339, offset-less ISO date-times (read as local
//!   time), `/Date(ms)/` and epoch milliseconds; anything else is `None`;
//! * serialized `System.Version` objects become `Major.Minor[.Build[.Revision]]`,
//!   other objects and arrays become compact JSON.

use crate::host::StructuredRecord;
use crate::model::{InstalledModule, PendingUpdate};
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub trait FromRecord: Sized {
    fn from_record(record: &StructuredRecord) -> Self;
}

/// Maps every record, one entity per record.
pub fn map_records<T: FromRecord>(records: &[StructuredRecord]) -> Vec<T> {
    records.iter().map(T::from_record).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PendingUpdateFields {
    #[serde(rename = "Name", deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(rename = "CurrentVersion", deserialize_with = "lenient_text")]
    current_version: Option<String>,
    #[serde(rename = "NewVersion", deserialize_with = "lenient_text")]
    new_version: Option<String>,
    #[serde(rename = "PublishedDate", deserialize_with = "lenient_timestamp")]
    published_date: Option<Timestamp>,
    #[serde(rename = "ReleaseNotes", deserialize_with = "lenient_text")]
    release_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstalledModuleFields {
    #[serde(rename = "Name", deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(rename = "Version", deserialize_with = "lenient_text")]
    version: Option<String>,
    #[serde(rename = "Author", deserialize_with = "lenient_text")]
    author: Option<String>,
    #[serde(rename = "InstalledDate", deserialize_with = "lenient_timestamp")]
    installed_date: Option<Timestamp>,
    #[serde(rename = "Location", deserialize_with = "lenient_text")]
    location: Option<String>,
    #[serde(rename = "ProjectUri", deserialize_with = "lenient_text")]
    project_uri: Option<String>,
}

impl FromRecord for PendingUpdate {
    fn from_record(record: &StructuredRecord) -> Self {
        let fields: PendingUpdateFields = parse_fields(record);
        PendingUpdate {
            name: fields.name.unwrap_or_default(),
            current_version: fields.current_version.unwrap_or_default(),
            new_version: fields.new_version.unwrap_or_default(),
            published_date: fields.published_date,
            release_notes: non_blank(fields.release_notes),
        }
    }
}

impl FromRecord for InstalledModule {
    fn from_record(record: &StructuredRecord) -> Self {
        let fields: InstalledModuleFields = parse_fields(record);
        InstalledModule {
            name: fields.name.unwrap_or_default(),
            version: fields.version.unwrap_or_default(),
            author: non_blank(fields.author),
            installed_date: fields.installed_date,
            location: non_blank(fields.location).map(PathBuf::from),
            project_uri: non_blank(fields.project_uri),
        }
    }
}

fn parse_fields<T: for<'de> Deserialize<'de> + Default>(record: &StructuredRecord) -> T {
    // Every field deserializer accepts any JSON value, so this only falls
    // back to the default if serde_json itself misbehaves.
    serde_json::from_value(Value::Object(record.fields().clone())).unwrap_or_default()
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_timestamp(&value))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => {
            if let Some(inner) = map.get("value") {
                return value_text(inner);
            }
            version_text(map).or_else(|| Some(value.to_string()))
        }
        Value::Array(_) => Some(value.to_string()),
    }
}

fn version_text(map: &Map<String, Value>) -> Option<String> {
    let major = map.get("Major")?.as_i64()?;
    let minor = map.get("Minor")?.as_i64()?;
    let mut parts = vec![major, minor];
    for key in ["Build", "Revision"] {
        match map.get(key).and_then(Value::as_i64) {
            Some(part) if part >= 0 => parts.push(part),
            _ => break,
        }
    }
    let parts: Vec<String> = parts.iter().map(i64::to_string).collect();
    Some(parts.join("."))
}

fn value_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => number
            .as_i64()
            .and_then(|ms| Timestamp::from_millisecond(ms).ok()),
        Value::Object(map) => map.get("value").and_then(value_timestamp),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(ms) = parse_ms_date(text) {
        return Timestamp::from_millisecond(ms).ok();
    }
    if let Ok(timestamp) = text.parse::<Timestamp>() {
        return Some(timestamp);
    }
    let civil: DateTime = text.parse().ok()?;
    civil
        .to_zoned(TimeZone::system())
        .ok()
        .map(|zoned| zoned.timestamp())
}

/// Parses `/Date(1709287200000)/`, ignoring any trailing `+hhmm` offset.
fn parse_ms_date(text: &str) -> Option<i64> {
    let inner = text.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let end = inner
        .char_indices()
        .skip(1)
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(inner.len());
    inner[..end].parse().ok()
}
