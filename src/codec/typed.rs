use serde_json::{Map, Value};

use super::Encoding;
use super::values::{read_question, write_question};
use crate::error::TaskError;
use crate::segment::{Segment, SegmentKind};

/// Tags accepted on input only. Older documents write line-entry questions as
/// `input`.
const LEGACY_TAGS: &[(&str, SegmentKind)] = &[("input", SegmentKind::Line)];

fn tag(segment: &Segment) -> &'static str {
    match segment {
        Segment::Text { body } => body.kind.as_str(),
        Segment::Line { .. } => "line",
        Segment::Check { .. } => "check",
        Segment::Radio { .. } => "radio",
        Segment::Multi { .. } => "multi",
    }
}

pub(super) fn encode(segment: &Segment) -> Value {
    let mut object = Map::new();
    object.insert("type".to_string(), Value::from(tag(segment)));
    match segment {
        Segment::Text { body } => {
            object.insert("content".to_string(), Value::from(body.content.as_str()));
            if body.comment {
                object.insert("comment".to_string(), Value::Bool(true));
            }
        }
        question => write_question(question, &mut object),
    }
    Value::Object(object)
}

/// `{"check": {...}}` and friends: a single key holding an object.
fn looks_keyed(object: &Map<String, Value>) -> bool {
    object.len() == 1 && object.values().all(Value::is_object)
}

pub(super) fn decode(
    object: &Map<String, Value>,
    notes: &mut Vec<TaskError>,
) -> Result<Segment, TaskError> {
    let Some(tag) = object.get("type") else {
        if looks_keyed(object) {
            return Err(TaskError::WrongEncoding {
                expected: Encoding::Typed,
            });
        }
        return Err(TaskError::MissingKind);
    };
    let name = tag.as_str().ok_or(TaskError::MissingKind)?;
    let kind = Encoding::Typed
        .kind_for_name(name)
        .or_else(|| {
            LEGACY_TAGS
                .iter()
                .find(|(legacy, _)| *legacy == name)
                .map(|(_, kind)| *kind)
        })
        .ok_or_else(|| TaskError::UnknownKind(name.to_string()))?;
    Ok(read_question(kind, object, notes))
}
