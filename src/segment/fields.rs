use std::fmt;

use super::{ContentKind, Entry, Segment};

/// Addresses one editable field inside a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Body,
    Entry(usize),
    Answer,
    Solution(usize),
    Option(usize),
    /// The boolean solution of a check segment.
    Flag,
}

impl FieldRef {
    pub fn label(&self) -> String {
        match self {
            FieldRef::Body => "Text".to_string(),
            FieldRef::Entry(idx) => format!("Entry {}", idx + 1),
            FieldRef::Answer => "Answer".to_string(),
            FieldRef::Solution(idx) => format!("Solution {}", idx + 1),
            FieldRef::Option(idx) => format!("Option {}", idx + 1),
            FieldRef::Flag => "Correct".to_string(),
        }
    }

    /// Multi-line fields accept newlines and are sized by their line count.
    pub fn is_multiline(&self) -> bool {
        matches!(self, FieldRef::Body | FieldRef::Answer | FieldRef::Solution(_))
    }

    pub fn holds_text(&self) -> bool {
        !matches!(self, FieldRef::Flag)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Segment {
    /// Fields in display order.
    pub fn fields(&self) -> Vec<FieldRef> {
        match self {
            Segment::Text { .. } => vec![FieldRef::Body],
            Segment::Line {
                content, solution, ..
            } => {
                let mut fields: Vec<FieldRef> = (0..content.len()).map(FieldRef::Entry).collect();
                fields.push(FieldRef::Answer);
                fields.extend((0..solution.len()).map(FieldRef::Solution));
                fields
            }
            Segment::Check { content, .. } => {
                let mut fields: Vec<FieldRef> = (0..content.len()).map(FieldRef::Entry).collect();
                fields.push(FieldRef::Flag);
                fields
            }
            Segment::Radio { options, .. } => (0..options.len()).map(FieldRef::Option).collect(),
            Segment::Multi { options, .. } => (0..options.len()).map(FieldRef::Option).collect(),
        }
    }

    pub fn has_field(&self, field: FieldRef) -> bool {
        self.fields().contains(&field)
    }

    pub fn entry(&self, field: FieldRef) -> Option<&Entry> {
        match (self, field) {
            (Segment::Text { body }, FieldRef::Body) => Some(body),
            (Segment::Line { content, .. }, FieldRef::Entry(idx))
            | (Segment::Check { content, .. }, FieldRef::Entry(idx)) => content.get(idx),
            (Segment::Line { answer, .. }, FieldRef::Answer) => Some(answer),
            (Segment::Line { solution, .. }, FieldRef::Solution(idx)) => solution.get(idx),
            _ => None,
        }
    }

    fn entry_mut(&mut self, field: FieldRef) -> Option<&mut Entry> {
        match (self, field) {
            (Segment::Text { body }, FieldRef::Body) => Some(body),
            (Segment::Line { content, .. }, FieldRef::Entry(idx))
            | (Segment::Check { content, .. }, FieldRef::Entry(idx)) => content.get_mut(idx),
            (Segment::Line { answer, .. }, FieldRef::Answer) => Some(answer),
            (Segment::Line { solution, .. }, FieldRef::Solution(idx)) => solution.get_mut(idx),
            _ => None,
        }
    }

    pub fn field_text(&self, field: FieldRef) -> Option<&str> {
        match (self, field) {
            (Segment::Radio { options, .. }, FieldRef::Option(idx)) => {
                options.get(idx).map(String::as_str)
            }
            (Segment::Multi { options, .. }, FieldRef::Option(idx)) => {
                options.get(idx).map(String::as_str)
            }
            _ => self.entry(field).map(|entry| entry.content.as_str()),
        }
    }

    pub fn field_kind(&self, field: FieldRef) -> Option<ContentKind> {
        self.entry(field).map(|entry| entry.kind)
    }

    /// Returns whether the stored value changed.
    pub fn set_field_text(&mut self, field: FieldRef, value: &str) -> bool {
        let slot = match (&mut *self, field) {
            (Segment::Radio { options, .. }, FieldRef::Option(idx)) => options.get_mut(idx),
            (Segment::Multi { options, .. }, FieldRef::Option(idx)) => options.get_mut(idx),
            (segment, field) => segment.entry_mut(field).map(|entry| &mut entry.content),
        };
        let Some(slot) = slot else {
            return false;
        };
        if slot == value {
            return false;
        }
        *slot = value.to_string();
        true
    }

    pub fn toggle_field_kind(&mut self, field: FieldRef) -> bool {
        let Some(entry) = self.entry_mut(field) else {
            return false;
        };
        entry.kind = entry.kind.toggled();
        true
    }

    /// Whether `field` is currently marked as (part of) the solution.
    pub fn is_marked(&self, field: FieldRef) -> bool {
        match (self, field) {
            (Segment::Check { solution, .. }, FieldRef::Flag) => *solution,
            (Segment::Radio { selected, .. }, FieldRef::Option(idx)) => *selected == idx,
            (Segment::Multi { selected, .. }, FieldRef::Option(idx)) => selected.contains(&idx),
            _ => false,
        }
    }

    /// Flips the solution mark of `field`. Selecting the already selected
    /// radio option changes nothing.
    pub fn toggle_mark(&mut self, field: FieldRef) -> bool {
        match (self, field) {
            (Segment::Check { solution, .. }, FieldRef::Flag) => {
                *solution = !*solution;
                true
            }
            (Segment::Radio { options, selected }, FieldRef::Option(idx)) => {
                if idx >= options.len() || *selected == idx {
                    return false;
                }
                *selected = idx;
                true
            }
            (Segment::Multi { options, selected }, FieldRef::Option(idx)) => {
                if idx >= options.len() {
                    return false;
                }
                if !selected.remove(&idx) {
                    selected.insert(idx);
                }
                true
            }
            _ => false,
        }
    }

    /// Appends an empty entry to a line or check segment.
    pub fn add_entry(&mut self) -> Option<FieldRef> {
        match self {
            Segment::Line { content, .. } | Segment::Check { content, .. } => {
                content.push(Entry::default());
                Some(FieldRef::Entry(content.len() - 1))
            }
            _ => None,
        }
    }

    /// Drops the last entry; the final one is never removed.
    pub fn remove_entry(&mut self) -> bool {
        match self {
            Segment::Line { content, .. } | Segment::Check { content, .. } if content.len() > 1 => {
                content.pop();
                true
            }
            _ => false,
        }
    }

    pub fn add_solution(&mut self) -> Option<FieldRef> {
        match self {
            Segment::Line { solution, .. } => {
                solution.push(Entry::default());
                Some(FieldRef::Solution(solution.len() - 1))
            }
            _ => None,
        }
    }

    pub fn remove_solution(&mut self, idx: usize) -> bool {
        match self {
            Segment::Line { solution, .. } if solution.len() > 1 && idx < solution.len() => {
                solution.remove(idx);
                true
            }
            _ => false,
        }
    }
}
