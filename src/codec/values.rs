use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::error::TaskError;
use crate::segment::{
    ContentKind, Entry, MULTI_OPTIONS, RADIO_OPTIONS, Segment, SegmentKind,
};

pub(super) fn string_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

pub(super) fn bool_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text == "true",
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// Reads an entry from either a bare string or `{"content", "type", "comment"}`.
pub(super) fn entry_from(value: Option<&Value>) -> Entry {
    match value {
        Some(Value::Object(object)) => Entry {
            content: string_value(object.get("content")),
            kind: ContentKind::from_marker(&string_value(object.get("type"))),
            comment: bool_value(object.get("comment")),
        },
        Some(Value::String(text)) => Entry::new(text.clone()),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => Entry::new(other.to_string()),
        _ => Entry::default(),
    }
}

pub(super) fn entry_value(entry: &Entry) -> Value {
    let mut value = json!({
        "content": entry.content,
        "type": entry.kind.as_str(),
    });
    if entry.comment {
        if let Some(object) = value.as_object_mut() {
            object.insert("comment".to_string(), Value::Bool(true));
        }
    }
    value
}

/// A missing list becomes a single empty entry, the same thing a new view
/// starts with. An explicitly empty list stays empty.
fn entries_from(value: Option<&Value>) -> Vec<Entry> {
    match value {
        Some(Value::Array(items)) => items.iter().map(|item| entry_from(Some(item))).collect(),
        None | Some(Value::Null) => vec![Entry::default()],
        single => vec![entry_from(single)],
    }
}

fn solutions_from(value: Option<&Value>) -> Vec<Entry> {
    match value {
        Some(Value::Array(items)) if !items.is_empty() => {
            items.iter().map(|item| entry_from(Some(item))).collect()
        }
        Some(Value::Array(_)) | None | Some(Value::Null) => vec![Entry::default()],
        single => vec![entry_from(single)],
    }
}

fn solutions_value(solutions: &[Entry]) -> Value {
    match solutions {
        [] => entry_value(&Entry::default()),
        [single] => entry_value(single),
        many => Value::Array(many.iter().map(entry_value).collect()),
    }
}

fn options_from<const N: usize>(
    value: Option<&Value>,
    kind: &'static str,
    notes: &mut Vec<TaskError>,
) -> [String; N] {
    let Some(Value::Array(items)) = value else {
        return std::array::from_fn(|_| String::new());
    };
    if items.len() != N {
        notes.push(TaskError::OptionCount {
            kind,
            expected: N,
            found: items.len(),
        });
    }
    std::array::from_fn(|idx| match items.get(idx) {
        Some(Value::Object(object)) => string_value(object.get("content")),
        item => string_value(item),
    })
}

fn radio_selection(value: Option<&Value>, len: usize, notes: &mut Vec<TaskError>) -> usize {
    let Some(index) = value.and_then(Value::as_u64) else {
        return 0;
    };
    match usize::try_from(index) {
        Ok(idx) if idx < len => idx,
        _ => {
            notes.push(TaskError::IndexOutOfRange { index, len });
            0
        }
    }
}

fn multi_selection(
    value: Option<&Value>,
    len: usize,
    notes: &mut Vec<TaskError>,
) -> BTreeSet<usize> {
    let items = match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(single @ Value::Number(_)) => std::slice::from_ref(single),
        _ => return BTreeSet::new(),
    };
    let mut selected = BTreeSet::new();
    for index in items.iter().filter_map(Value::as_u64) {
        match usize::try_from(index) {
            Ok(idx) if idx < len => {
                selected.insert(idx);
            }
            _ => notes.push(TaskError::IndexOutOfRange { index, len }),
        }
    }
    selected
}

/// Reads the fields of a segment out of `object`; the field layout is shared
/// by both encodings, only the placement of the type tag differs.
pub(super) fn read_question(
    kind: SegmentKind,
    object: &Map<String, Value>,
    notes: &mut Vec<TaskError>,
) -> Segment {
    match kind {
        SegmentKind::Line => Segment::Line {
            content: entries_from(object.get("content")),
            answer: entry_from(object.get("answer")),
            solution: solutions_from(object.get("solution")),
        },
        SegmentKind::Check => Segment::Check {
            content: entries_from(object.get("content")),
            solution: bool_value(object.get("solution")),
        },
        SegmentKind::Radio => Segment::Radio {
            options: options_from::<RADIO_OPTIONS>(object.get("options"), "radio", notes),
            selected: radio_selection(object.get("solution"), RADIO_OPTIONS, notes),
        },
        SegmentKind::Multi => Segment::Multi {
            options: options_from::<MULTI_OPTIONS>(object.get("options"), "multi", notes),
            selected: multi_selection(object.get("solution"), MULTI_OPTIONS, notes),
        },
        SegmentKind::Text | SegmentKind::Source | SegmentKind::Comment => Segment::Text {
            body: Entry {
                content: string_value(object.get("content")),
                kind: ContentKind::from_marker(&string_value(object.get("type"))),
                comment: kind == SegmentKind::Comment || bool_value(object.get("comment")),
            },
        },
    }
}

/// Writes the fields of a question segment after whatever `object` holds.
/// Text segments are encoding specific and write nothing here.
pub(super) fn write_question(segment: &Segment, object: &mut Map<String, Value>) {
    match segment {
        Segment::Text { .. } => {}
        Segment::Line {
            content,
            answer,
            solution,
        } => {
            object.insert(
                "content".to_string(),
                Value::Array(content.iter().map(entry_value).collect()),
            );
            object.insert("answer".to_string(), entry_value(answer));
            object.insert("solution".to_string(), solutions_value(solution));
        }
        Segment::Check { content, solution } => {
            object.insert(
                "content".to_string(),
                Value::Array(content.iter().map(entry_value).collect()),
            );
            object.insert("solution".to_string(), Value::Bool(*solution));
        }
        Segment::Radio { options, selected } => {
            object.insert("options".to_string(), json!(options));
            object.insert("solution".to_string(), json!(selected));
        }
        Segment::Multi { options, selected } => {
            object.insert("options".to_string(), json!(options));
            object.insert(
                "solution".to_string(),
                Value::Array(selected.iter().map(|idx| json!(idx)).collect()),
            );
        }
    }
}
