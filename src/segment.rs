use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

mod fields;

pub use fields::FieldRef;

/// Number of labels every radio segment carries.
pub const RADIO_OPTIONS: usize = 4;
/// Number of labels every multi-select segment carries.
pub const MULTI_OPTIONS: usize = 4;

/// Marks whether a string is prose or source code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Source,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Source => "source",
        }
    }

    /// Anything other than `source` is treated as plain text.
    pub fn from_marker(marker: &str) -> Self {
        if marker == "source" {
            ContentKind::Source
        } else {
            ContentKind::Text
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ContentKind::Text => ContentKind::Source,
            ContentKind::Source => ContentKind::Text,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single editable string together with its content kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub content: String,
    pub kind: ContentKind,
    pub comment: bool,
}

impl Entry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: ContentKind::Text,
            comment: false,
        }
    }

    pub fn source(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: ContentKind::Source,
            comment: false,
        }
    }

    pub fn with_comment(mut self, comment: bool) -> Self {
        self.comment = comment;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of display lines; an empty string still occupies one.
    pub fn line_count(&self) -> usize {
        line_count(&self.content)
    }
}

pub fn line_count(text: &str) -> usize {
    text.split('\n').count().max(1)
}

/// The insertable segment types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Source,
    Comment,
    Line,
    Check,
    Radio,
    Multi,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 7] = [
        SegmentKind::Text,
        SegmentKind::Source,
        SegmentKind::Comment,
        SegmentKind::Line,
        SegmentKind::Check,
        SegmentKind::Radio,
        SegmentKind::Multi,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SegmentKind::Text => "Text",
            SegmentKind::Source => "Source",
            SegmentKind::Comment => "Comment",
            SegmentKind::Line => "Line Entry",
            SegmentKind::Check => "Check",
            SegmentKind::Radio => "Radio",
            SegmentKind::Multi => "Multiple Choice",
        }
    }

    /// A freshly inserted, unfilled segment of this kind.
    pub fn empty_segment(self) -> Segment {
        match self {
            SegmentKind::Text => Segment::Text { body: Entry::default() },
            SegmentKind::Source => Segment::Text {
                body: Entry::source(""),
            },
            SegmentKind::Comment => Segment::Text {
                body: Entry::default().with_comment(true),
            },
            SegmentKind::Line => Segment::Line {
                content: vec![Entry::default()],
                answer: Entry::default(),
                solution: vec![Entry::default()],
            },
            SegmentKind::Check => Segment::Check {
                content: vec![Entry::default()],
                solution: false,
            },
            SegmentKind::Radio => Segment::Radio {
                options: Default::default(),
                selected: 0,
            },
            SegmentKind::Multi => Segment::Multi {
                options: Default::default(),
                selected: BTreeSet::new(),
            },
        }
    }

    /// Whether `segment` can pre-fill a view of this kind. The three text
    /// flavours share one variant and accept each other's data.
    pub fn accepts(self, segment: &Segment) -> bool {
        matches!(
            (self, segment),
            (
                SegmentKind::Text | SegmentKind::Source | SegmentKind::Comment,
                Segment::Text { .. }
            ) | (SegmentKind::Line, Segment::Line { .. })
                | (SegmentKind::Check, Segment::Check { .. })
                | (SegmentKind::Radio, Segment::Radio { .. })
                | (SegmentKind::Multi, Segment::Multi { .. })
        )
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// A text or source block; `comment` on the body marks editorial notes.
    Text { body: Entry },
    /// Labelled line entries, a pre-filled answer and the accepted solutions.
    Line {
        content: Vec<Entry>,
        answer: Entry,
        solution: Vec<Entry>,
    },
    Check { content: Vec<Entry>, solution: bool },
    Radio {
        options: [String; RADIO_OPTIONS],
        selected: usize,
    },
    Multi {
        options: [String; MULTI_OPTIONS],
        selected: BTreeSet<usize>,
    },
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text {
            body: Entry::new(content),
        }
    }

    pub fn source(content: impl Into<String>) -> Self {
        Segment::Text {
            body: Entry::source(content),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Segment::Text {
            body: Entry::new(content).with_comment(true),
        }
    }

    pub fn check<I, S>(entries: I, solution: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Segment::Check {
            content: entries.into_iter().map(Entry::new).collect(),
            solution,
        }
    }

    pub fn line<I, S>(entries: I, answer: Entry, solution: Entry) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Segment::Line {
            content: entries.into_iter().map(Entry::new).collect(),
            answer,
            solution: vec![solution],
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text { body } if body.comment => SegmentKind::Comment,
            Segment::Text { body } => match body.kind {
                ContentKind::Text => SegmentKind::Text,
                ContentKind::Source => SegmentKind::Source,
            },
            Segment::Line { .. } => SegmentKind::Line,
            Segment::Check { .. } => SegmentKind::Check,
            Segment::Radio { .. } => SegmentKind::Radio,
            Segment::Multi { .. } => SegmentKind::Multi,
        }
    }

    /// Line questions always keep at least one accepted solution.
    pub fn normalized(mut self) -> Self {
        if let Segment::Line { solution, .. } = &mut self
            && solution.is_empty()
        {
            solution.push(Entry::default());
        }
        self
    }

    pub fn is_question(&self) -> bool {
        !matches!(self, Segment::Text { .. })
    }
}

/// An ordered list of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Task {
    pub segments: Vec<Segment>,
}

impl Task {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod segment_tests;
