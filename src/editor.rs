use std::{collections::HashSet, fmt};

use tracing::{debug, warn};

use crate::codec::{self, Encoding};
use crate::error::{Diagnostic, TaskError};
use crate::segment::{FieldRef, Segment, SegmentKind, Task};

/// Name of the form field the serialized task is submitted under.
pub const DEFAULT_FIELD_NAME: &str = "body_xml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u64);

impl SegmentId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment{}", self.0)
    }
}

/// Hands out view ids for one editor. Ids are never reused, so a removed
/// view's id stays dead.
#[derive(Debug, Default)]
struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    fn next_id(&mut self) -> SegmentId {
        let id = SegmentId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentView {
    pub id: SegmentId,
    pub segment: Segment,
}

/// The single output the editor writes: the serialized task as submitted with
/// the enclosing form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputField {
    name: String,
    value: String,
}

impl OutputField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
    }
}

impl Default for OutputField {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_NAME)
    }
}

/// What happened while restoring a stored document.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub inserted: Vec<SegmentId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Owns the ordered list of segment views and keeps the output field in sync
/// with it. Every mutation re-serializes the whole list.
#[derive(Debug)]
pub struct SegmentEditor {
    encoding: Encoding,
    views: Vec<SegmentView>,
    ids: IdGenerator,
    output: OutputField,
}

impl SegmentEditor {
    pub fn new(encoding: Encoding) -> Self {
        Self::with_output(encoding, OutputField::default())
    }

    pub fn with_output(encoding: Encoding, output: OutputField) -> Self {
        let mut editor = Self {
            encoding,
            views: Vec::new(),
            ids: IdGenerator::default(),
            output,
        };
        editor.serialize();
        editor
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn views(&self) -> &[SegmentView] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn output(&self) -> &OutputField {
        &self.output
    }

    pub fn view(&self, id: SegmentId) -> Option<&SegmentView> {
        self.views.iter().find(|view| view.id == id)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.view(id).map(|view| &view.segment)
    }

    pub fn position(&self, id: SegmentId) -> Option<usize> {
        self.views.iter().position(|view| view.id == id)
    }

    pub fn is_active(&self, id: SegmentId) -> bool {
        self.position(id).is_some()
    }

    /// Appends a view of `kind`, pre-filled from `initial` when it matches.
    pub fn insert_segment(
        &mut self,
        kind: SegmentKind,
        initial: Option<Segment>,
    ) -> SegmentId {
        let segment = match initial {
            Some(segment) if kind.accepts(&segment) => segment,
            Some(segment) => {
                let problem = TaskError::KindMismatch {
                    expected: kind.label(),
                    found: segment.kind().label(),
                };
                warn!(%problem, "ignoring initial data");
                kind.empty_segment()
            }
            None => kind.empty_segment(),
        };
        let id = self.attach(segment);
        debug!(%id, %kind, "inserted segment");
        self.serialize();
        id
    }

    /// Resolves `name` through the active vocabulary and inserts it.
    pub fn insert_named(&mut self, name: &str, initial: Option<Segment>) -> Option<SegmentId> {
        let Some(kind) = self.encoding.kind_for_name(name) else {
            let problem = TaskError::UnknownKind(name.to_string());
            warn!(%problem, "nothing inserted");
            return None;
        };
        Some(self.insert_segment(kind, initial))
    }

    fn attach(&mut self, segment: Segment) -> SegmentId {
        let id = self.ids.next_id();
        self.views.push(SegmentView {
            id,
            segment: segment.normalized(),
        });
        id
    }

    /// Detaches the view. Removal is terminal; unknown ids are ignored.
    pub fn remove_segment(&mut self, id: SegmentId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.views.remove(idx);
        debug!(%id, "removed segment");
        self.serialize();
        true
    }

    /// Applies the order produced by a drag-and-drop. `new_order` must list
    /// every active id exactly once; anything else leaves the order untouched.
    pub fn reorder(&mut self, new_order: &[SegmentId]) -> bool {
        let distinct: HashSet<&SegmentId> = new_order.iter().collect();
        let is_permutation = new_order.len() == self.views.len()
            && distinct.len() == new_order.len()
            && new_order.iter().all(|id| self.is_active(*id));
        if !is_permutation {
            warn!(
                expected = self.views.len(),
                found = new_order.len(),
                "reorder is not a permutation of the active segments"
            );
            return false;
        }
        self.views
            .sort_by_key(|view| new_order.iter().position(|id| *id == view.id));
        debug!(segments = self.views.len(), "reordered segments");
        self.serialize();
        true
    }

    /// Moves the view to position `to` (clamped to the end of the list).
    pub fn move_segment(&mut self, id: SegmentId, to: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = to.min(self.views.len() - 1);
        if from == to {
            return false;
        }
        let view = self.views.remove(from);
        self.views.insert(to, view);
        self.serialize();
        true
    }

    pub fn move_up(&mut self, id: SegmentId) -> bool {
        match self.position(id) {
            Some(idx) if idx > 0 => self.move_segment(id, idx - 1),
            _ => false,
        }
    }

    pub fn move_down(&mut self, id: SegmentId) -> bool {
        match self.position(id) {
            Some(idx) => self.move_segment(id, idx + 1),
            None => false,
        }
    }

    /// Runs `edit` against one view and re-serializes when it reports a change.
    fn edit<F>(&mut self, id: SegmentId, edit: F) -> bool
    where
        F: FnOnce(&mut Segment) -> bool,
    {
        let Some(view) = self.views.iter_mut().find(|view| view.id == id) else {
            return false;
        };
        if !edit(&mut view.segment) {
            return false;
        }
        self.serialize();
        true
    }

    pub fn set_field(&mut self, id: SegmentId, field: FieldRef, value: &str) -> bool {
        self.edit(id, |segment| segment.set_field_text(field, value))
    }

    pub fn toggle_field_kind(&mut self, id: SegmentId, field: FieldRef) -> bool {
        self.edit(id, |segment| segment.toggle_field_kind(field))
    }

    pub fn toggle_mark(&mut self, id: SegmentId, field: FieldRef) -> bool {
        self.edit(id, |segment| segment.toggle_mark(field))
    }

    pub fn set_check_solution(&mut self, id: SegmentId, value: bool) -> bool {
        self.edit(id, |segment| match segment {
            Segment::Check { solution, .. } if *solution != value => {
                *solution = value;
                true
            }
            _ => false,
        })
    }

    pub fn select_radio(&mut self, id: SegmentId, index: usize) -> bool {
        self.edit(id, |segment| {
            matches!(segment, Segment::Radio { .. }) && segment.toggle_mark(FieldRef::Option(index))
        })
    }

    pub fn toggle_multi(&mut self, id: SegmentId, index: usize) -> bool {
        self.edit(id, |segment| {
            matches!(segment, Segment::Multi { .. }) && segment.toggle_mark(FieldRef::Option(index))
        })
    }

    pub fn add_entry(&mut self, id: SegmentId) -> Option<FieldRef> {
        let mut added = None;
        self.edit(id, |segment| {
            added = segment.add_entry();
            added.is_some()
        });
        added
    }

    pub fn remove_entry(&mut self, id: SegmentId) -> bool {
        self.edit(id, Segment::remove_entry)
    }

    pub fn add_solution(&mut self, id: SegmentId) -> Option<FieldRef> {
        let mut added = None;
        self.edit(id, |segment| {
            added = segment.add_solution();
            added.is_some()
        });
        added
    }

    pub fn remove_solution(&mut self, id: SegmentId, index: usize) -> bool {
        self.edit(id, |segment| segment.remove_solution(index))
    }

    /// Current state as a task document. Pure and total.
    pub fn export_value(&self) -> Task {
        Task::new().with_segments(self.views.iter().map(|view| view.segment.clone()).collect())
    }

    /// Encodes the current list and writes it into the output field.
    pub fn serialize(&mut self) -> &str {
        let value = codec::to_json_string(self.encoding, &self.export_value());
        self.output.set_value(value);
        self.output.value()
    }

    /// Rebuilds views from a stored document, appending them in document
    /// order. Input that cannot be read at all leaves the task empty.
    pub fn restore(&mut self, json: &str) -> RestoreReport {
        let mut report = RestoreReport::default();
        if json.trim().is_empty() {
            self.serialize();
            return report;
        }
        let decoded = match codec::decode_task(self.encoding, json) {
            Ok(decoded) => decoded,
            Err(problem) => {
                warn!(%problem, "stored task is unreadable, starting empty");
                report.diagnostics.push(Diagnostic::document(problem));
                self.serialize();
                return report;
            }
        };
        for segment in decoded.task.segments {
            let id = self.attach(segment);
            report.inserted.push(id);
        }
        debug!(count = report.inserted.len(), "restored segments");
        report.diagnostics = decoded.diagnostics;
        self.serialize();
        report
    }

    /// Fields of the view in display order; empty for unknown ids.
    pub fn fields(&self, id: SegmentId) -> Vec<FieldRef> {
        self.segment(id).map(Segment::fields).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
