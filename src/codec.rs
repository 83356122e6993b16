//! JSON encodings of a task document.
//!
//! A document is always `{"segments": [...]}`. Each segment is written either
//! with an inline type tag (`{"type": "check", ...}`, the [`Encoding::Typed`]
//! form) or as a single-key object (`{"check": {...}}`, the
//! [`Encoding::Keyed`] form). One deployment uses one encoding; decoding
//! rejects segments written in the other shape.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Diagnostic, TaskError};
use crate::segment::{Segment, SegmentKind, Task};

mod keyed;
mod typed;
mod values;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `{"type": "<kind>", ...fields}`
    #[default]
    Typed,
    /// `{"<kind>": {...fields}}`
    Keyed,
}

const TYPED_VOCABULARY: &[(&str, SegmentKind)] = &[
    ("text", SegmentKind::Text),
    ("source", SegmentKind::Source),
    ("line", SegmentKind::Line),
    ("check", SegmentKind::Check),
    ("radio", SegmentKind::Radio),
    ("multi", SegmentKind::Multi),
];

const KEYED_VOCABULARY: &[(&str, SegmentKind)] = &[
    ("text", SegmentKind::Text),
    ("comment", SegmentKind::Comment),
    ("input", SegmentKind::Line),
    ("check", SegmentKind::Check),
    ("radio", SegmentKind::Radio),
    ("multi", SegmentKind::Multi),
];

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Typed => "typed",
            Encoding::Keyed => "keyed",
        }
    }

    /// Type names understood by this encoding, in menu order.
    pub fn vocabulary(self) -> &'static [(&'static str, SegmentKind)] {
        match self {
            Encoding::Typed => TYPED_VOCABULARY,
            Encoding::Keyed => KEYED_VOCABULARY,
        }
    }

    pub fn kind_for_name(self, name: &str) -> Option<SegmentKind> {
        self.vocabulary()
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name_of(self, kind: SegmentKind) -> Option<&'static str> {
        self.vocabulary()
            .iter()
            .find(|(_, candidate)| *candidate == kind)
            .map(|(name, _)| *name)
    }

    /// Kinds a user can add, in menu order. The typed encoding stores comments
    /// as flagged text blocks, so they are offered without a tag of their own.
    pub fn insertable(self) -> Vec<SegmentKind> {
        let mut kinds: Vec<SegmentKind> =
            self.vocabulary().iter().map(|(_, kind)| *kind).collect();
        if !kinds.contains(&SegmentKind::Comment) {
            let at = kinds
                .iter()
                .position(|kind| *kind == SegmentKind::Source)
                .map_or(kinds.len(), |idx| idx + 1);
            kinds.insert(at, SegmentKind::Comment);
        }
        kinds
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of decoding a document: every segment that could be read, plus the
/// problems found along the way.
#[derive(Debug, Default)]
pub struct Decoded {
    pub task: Task,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn encode_segment(encoding: Encoding, segment: &Segment) -> Value {
    match encoding {
        Encoding::Typed => typed::encode(segment),
        Encoding::Keyed => keyed::encode(segment),
    }
}

pub fn encode_task(encoding: Encoding, task: &Task) -> Value {
    let segments = task
        .iter()
        .map(|segment| encode_segment(encoding, segment))
        .collect();
    let mut document = Map::new();
    document.insert("segments".to_string(), Value::Array(segments));
    Value::Object(document)
}

/// Pretty-printed document with four-space indentation.
pub fn to_json_string(encoding: Encoding, task: &Task) -> String {
    let value = encode_task(encoding, task);
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// Decodes one segment. Values that had to be clamped are reported through
/// `notes`; the segment is still returned.
pub fn decode_segment(
    encoding: Encoding,
    value: &Value,
    notes: &mut Vec<TaskError>,
) -> Result<Segment, TaskError> {
    let object = value.as_object().ok_or(TaskError::NotAnObject)?;
    match encoding {
        Encoding::Typed => typed::decode(object, notes),
        Encoding::Keyed => keyed::decode(object, notes),
    }
}

pub fn decode_value(encoding: Encoding, document: &Value) -> Result<Decoded, TaskError> {
    let entries = document
        .get("segments")
        .and_then(Value::as_array)
        .ok_or(TaskError::MissingSegments)?;

    let mut decoded = Decoded::default();
    for (index, entry) in entries.iter().enumerate() {
        let mut notes = Vec::new();
        match decode_segment(encoding, entry, &mut notes) {
            Ok(segment) => decoded.task.segments.push(segment),
            Err(problem) => {
                warn!(index, %problem, "skipping segment");
                decoded.diagnostics.push(Diagnostic::segment(index, problem));
            }
        }
        for note in notes {
            warn!(index, problem = %note, "adjusted segment while decoding");
            decoded.diagnostics.push(Diagnostic::segment(index, note));
        }
    }
    debug!(
        %encoding,
        segments = decoded.task.len(),
        diagnostics = decoded.diagnostics.len(),
        "decoded task document"
    );
    Ok(decoded)
}

pub fn decode_task(encoding: Encoding, input: &str) -> Result<Decoded, TaskError> {
    let document: Value = serde_json::from_str(input)?;
    decode_value(encoding, &document)
}

/// Re-encodes a document from one encoding into the other.
pub fn convert(
    input: &str,
    from: Encoding,
    to: Encoding,
) -> Result<(String, Vec<Diagnostic>), TaskError> {
    let decoded = decode_task(from, input)?;
    Ok((to_json_string(to, &decoded.task), decoded.diagnostics))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod codec_tests;
