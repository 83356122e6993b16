use serde_json::{Map, Value};

use super::Encoding;
use super::values::{read_question, write_question};
use crate::error::TaskError;
use crate::segment::{Entry, Segment, SegmentKind};

fn key(segment: &Segment) -> &'static str {
    match segment {
        Segment::Text { body } if body.comment => "comment",
        Segment::Text { .. } => "text",
        Segment::Line { .. } => "input",
        Segment::Check { .. } => "check",
        Segment::Radio { .. } => "radio",
        Segment::Multi { .. } => "multi",
    }
}

pub(super) fn encode(segment: &Segment) -> Value {
    let mut fields = Map::new();
    match segment {
        Segment::Text { body } => {
            fields.insert("content".to_string(), Value::from(body.content.as_str()));
            fields.insert("type".to_string(), Value::from(body.kind.as_str()));
        }
        question => write_question(question, &mut fields),
    }
    let mut object = Map::new();
    object.insert(key(segment).to_string(), Value::Object(fields));
    Value::Object(object)
}

pub(super) fn decode(
    object: &Map<String, Value>,
    notes: &mut Vec<TaskError>,
) -> Result<Segment, TaskError> {
    let mut keys = object.iter();
    let (Some((name, inner)), None) = (keys.next(), keys.next()) else {
        if object.is_empty() {
            return Err(TaskError::MissingKind);
        }
        return Err(TaskError::WrongEncoding {
            expected: Encoding::Keyed,
        });
    };
    if name == "type" {
        return Err(TaskError::WrongEncoding {
            expected: Encoding::Keyed,
        });
    }
    let kind = Encoding::Keyed
        .kind_for_name(name)
        .ok_or_else(|| TaskError::UnknownKind(name.clone()))?;

    match inner {
        Value::Object(fields) => Ok(read_question(kind, fields, notes)),
        Value::String(text) if matches!(kind, SegmentKind::Text | SegmentKind::Comment) => {
            Ok(Segment::Text {
                body: Entry::new(text.clone()).with_comment(kind == SegmentKind::Comment),
            })
        }
        _ => Ok(read_question(kind, &Map::new(), notes)),
    }
}
