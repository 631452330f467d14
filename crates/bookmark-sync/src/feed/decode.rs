//! Decoding of realtime change payloads.
//!
//! Payloads use the row-change envelope
//! `{"eventType": "INSERT" | "UPDATE" | "DELETE", "new": {..}, "old": {..}}`.
//! Inserts and updates read the row from `new`; deletes only need `old.id`.

use serde_json::Value;

use crate::{error::FeedDecodeError, types::BookmarkRecord};

use super::event::FeedEvent;

const EVENT_TYPE_FIELD: &str = "eventType";

/// Decode one feed payload into a typed event.
pub fn decode_change(payload: &Value) -> Result<FeedEvent, FeedDecodeError> {
    let envelope = payload
        .as_object()
        .ok_or_else(|| FeedDecodeError::Malformed("expected a JSON object".to_string()))?;

    let event_type = envelope
        .get(EVENT_TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            FeedDecodeError::Malformed(format!("missing string field \"{EVENT_TYPE_FIELD}\""))
        })?;

    match event_type.to_ascii_uppercase().as_str() {
        "INSERT" => {
            let row = row_field(envelope.get("new"), event_type, "new")?;
            Ok(FeedEvent::Created(decode_record(row)?))
        }
        "UPDATE" => {
            let row = row_field(envelope.get("new"), event_type, "new")?;
            Ok(FeedEvent::Updated(decode_record(row)?))
        }
        "DELETE" => {
            let row = row_field(envelope.get("old"), event_type, "old")?;
            let id = row
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    FeedDecodeError::InvalidRecord("deleted row carries no id".to_string())
                })?;
            Ok(FeedEvent::Deleted(id.to_string()))
        }
        _ => Err(FeedDecodeError::UnknownEventType(event_type.to_string())),
    }
}

/// Decode and validate a single bookmark row.
///
/// Beyond the shape check, `id`, `ownerId`, `title` and `url` must be
/// non-blank.
pub fn decode_record(row: &Value) -> Result<BookmarkRecord, FeedDecodeError> {
    let record: BookmarkRecord = serde_json::from_value(row.clone())
        .map_err(|e| FeedDecodeError::InvalidRecord(e.to_string()))?;

    let blank = [
        ("id", &record.id),
        ("ownerId", &record.owner_id),
        ("title", &record.title),
        ("url", &record.url),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    if let Some((field, _)) = blank {
        return Err(FeedDecodeError::InvalidRecord(format!(
            "field \"{field}\" must not be empty"
        )));
    }
    Ok(record)
}

/// An absent, `null`, or empty-object row counts as missing.
fn row_field<'a>(
    value: Option<&'a Value>,
    event_type: &str,
    field: &str,
) -> Result<&'a Value, FeedDecodeError> {
    match value {
        Some(row @ Value::Object(map)) if !map.is_empty() => Ok(row),
        Some(Value::Object(_)) | Some(Value::Null) | None => Err(FeedDecodeError::MissingPayload {
            event_type: event_type.to_string(),
            field: field.to_string(),
        }),
        Some(other) => Err(FeedDecodeError::Malformed(format!(
            "\"{field}\" must be an object, got {other}"
        ))),
    }
}
