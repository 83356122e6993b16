use std::ops::Deref;

use tracing::debug;

use crate::editor::{SegmentEditor, SegmentId};
use crate::render::{CursorVisualPosition, Focus, RenderResult, render_segments};
use crate::segment::{FieldRef, SegmentKind};
use crate::theme::Theme;

/// EditorDisplay wraps a SegmentEditor and tracks which field receives input.
/// All keyboard edits go through the focused field only.
#[derive(Debug)]
pub struct EditorDisplay {
    editor: SegmentEditor,
    focus: Option<Focus>,
    last_cursor_visual: Option<CursorVisualPosition>,
    last_total_lines: usize,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

impl EditorDisplay {
    pub fn new(editor: SegmentEditor) -> Self {
        let mut display = Self {
            editor,
            focus: None,
            last_cursor_visual: None,
            last_total_lines: 0,
        };
        display.repair_focus();
        display
    }

    pub fn editor(&self) -> &SegmentEditor {
        &self.editor
    }

    pub fn focus(&self) -> Option<Focus> {
        self.focus
    }

    pub fn last_cursor_visual(&self) -> Option<CursorVisualPosition> {
        self.last_cursor_visual
    }

    pub fn last_total_lines(&self) -> usize {
        self.last_total_lines
    }

    /// Render the task at the given width and remember where the cursor went
    pub fn render(&mut self, width: usize, theme: &Theme) -> RenderResult {
        let render = render_segments(&self.editor, self.focus.as_ref(), width, theme);
        self.last_cursor_visual = render.cursor;
        self.last_total_lines = render.total_lines;
        render
    }

    fn focused_text(&self) -> Option<&str> {
        let focus = self.focus?;
        self.editor.segment(focus.segment)?.field_text(focus.field)
    }

    fn field_order(&self) -> Vec<(SegmentId, FieldRef)> {
        self.editor
            .views()
            .iter()
            .flat_map(|view| view.segment.fields().into_iter().map(move |field| (view.id, field)))
            .collect()
    }

    /// Keeps the focus on an existing field after structural edits.
    fn repair_focus(&mut self) {
        let target = self.focus.and_then(|focus| {
            let segment = self.editor.segment(focus.segment)?;
            if segment.has_field(focus.field) {
                Some((focus.segment, focus.field, focus.offset))
            } else {
                segment.fields().first().map(|field| (focus.segment, *field, 0))
            }
        });
        let target = target.or_else(|| {
            self.field_order()
                .first()
                .map(|(segment, field)| (*segment, *field, 0))
        });
        self.focus = target.map(|(segment, field, offset)| {
            let len = self
                .editor
                .segment(segment)
                .and_then(|segment| segment.field_text(field))
                .map(char_len)
                .unwrap_or(0);
            Focus {
                segment,
                field,
                offset: offset.min(len),
            }
        });
    }

    fn set_focus(&mut self, segment: SegmentId, field: FieldRef, offset: usize) {
        self.focus = Some(Focus {
            segment,
            field,
            offset,
        });
        self.repair_focus();
    }

    pub fn focus_segment(&mut self, id: SegmentId) -> bool {
        let Some(field) = self.editor.fields(id).first().copied() else {
            return false;
        };
        self.set_focus(id, field, 0);
        true
    }

    /// Moves to the previous (`delta < 0`) or next field across segments.
    pub fn move_field(&mut self, delta: isize) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let order = self.field_order();
        let Some(current) = order
            .iter()
            .position(|(segment, field)| *segment == focus.segment && *field == focus.field)
        else {
            return false;
        };
        let target = current
            .saturating_add_signed(delta)
            .min(order.len().saturating_sub(1));
        if target == current {
            return false;
        }
        let (segment, field) = order[target];
        self.set_focus(segment, field, focus.offset);
        true
    }

    fn move_offset(&mut self, offset: usize) -> bool {
        let Some(focus) = self.focus.as_mut() else {
            return false;
        };
        if focus.offset == offset {
            return false;
        }
        focus.offset = offset;
        true
    }

    pub fn move_left(&mut self) -> bool {
        match self.focus {
            Some(focus) if focus.offset > 0 => self.move_offset(focus.offset - 1),
            _ => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        let (Some(focus), Some(text)) = (self.focus, self.focused_text()) else {
            return false;
        };
        if focus.offset >= char_len(text) {
            return false;
        }
        self.move_offset(focus.offset + 1)
    }

    /// Start of the current line inside a multi-line field.
    pub fn move_home(&mut self) -> bool {
        let (Some(focus), Some(text)) = (self.focus, self.focused_text()) else {
            return false;
        };
        let start = text
            .chars()
            .take(focus.offset)
            .collect::<Vec<_>>()
            .iter()
            .rposition(|ch| *ch == '\n')
            .map(|idx| idx + 1)
            .unwrap_or(0);
        self.move_offset(start)
    }

    pub fn move_end(&mut self) -> bool {
        let (Some(focus), Some(text)) = (self.focus, self.focused_text()) else {
            return false;
        };
        let end = text
            .chars()
            .skip(focus.offset)
            .position(|ch| ch == '\n')
            .map(|idx| focus.offset + idx)
            .unwrap_or_else(|| char_len(text));
        self.move_offset(end)
    }

    fn replace_focused_text<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut String, usize) -> Option<usize>,
    {
        let Some(focus) = self.focus else {
            return false;
        };
        if !focus.field.holds_text() {
            return false;
        }
        let Some(mut text) = self.focused_text().map(str::to_string) else {
            return false;
        };
        let Some(offset) = edit(&mut text, focus.offset) else {
            return false;
        };
        if !self.editor.set_field(focus.segment, focus.field, &text) {
            return false;
        }
        self.move_offset(offset);
        true
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' && !self.focus.is_some_and(|focus| focus.field.is_multiline()) {
            return false;
        }
        self.replace_focused_text(|text, offset| {
            text.insert(byte_index(text, offset), ch);
            Some(offset + 1)
        })
    }

    pub fn insert_newline(&mut self) -> bool {
        self.insert_char('\n')
    }

    pub fn backspace(&mut self) -> bool {
        self.replace_focused_text(|text, offset| {
            if offset == 0 {
                return None;
            }
            text.remove(byte_index(text, offset - 1));
            Some(offset - 1)
        })
    }

    pub fn delete_forward(&mut self) -> bool {
        self.replace_focused_text(|text, offset| {
            if offset >= char_len(text) {
                return None;
            }
            text.remove(byte_index(text, offset));
            Some(offset)
        })
    }

    /// Marks or unmarks the focused option or check flag as the solution.
    pub fn toggle_mark(&mut self) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        self.editor.toggle_mark(focus.segment, focus.field)
    }

    pub fn toggle_kind(&mut self) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        self.editor.toggle_field_kind(focus.segment, focus.field)
    }

    pub fn insert_segment(&mut self, kind: SegmentKind) -> SegmentId {
        let id = self.editor.insert_segment(kind, None);
        self.focus_segment(id);
        id
    }

    pub fn insert_named(&mut self, name: &str) -> Option<SegmentId> {
        let id = self.editor.insert_named(name, None)?;
        self.focus_segment(id);
        Some(id)
    }

    /// Deletes the focused segment and focuses its neighbour.
    pub fn delete_focused_segment(&mut self) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let Some(position) = self.editor.position(focus.segment) else {
            return false;
        };
        if !self.editor.remove_segment(focus.segment) {
            return false;
        }
        self.focus = None;
        let neighbour = self
            .editor
            .views()
            .get(position.min(self.editor.len().saturating_sub(1)))
            .map(|view| view.id);
        if let Some(id) = neighbour {
            self.focus_segment(id);
        }
        debug!(removed = %focus.segment, "deleted focused segment");
        true
    }

    pub fn move_focused_up(&mut self) -> bool {
        self.focus
            .is_some_and(|focus| self.editor.move_up(focus.segment))
    }

    pub fn move_focused_down(&mut self) -> bool {
        self.focus
            .is_some_and(|focus| self.editor.move_down(focus.segment))
    }

    pub fn add_entry(&mut self) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let Some(field) = self.editor.add_entry(focus.segment) else {
            return false;
        };
        self.set_focus(focus.segment, field, 0);
        true
    }

    pub fn remove_entry(&mut self) -> bool {
        let removed = self
            .focus
            .is_some_and(|focus| self.editor.remove_entry(focus.segment));
        if removed {
            self.repair_focus();
        }
        removed
    }

    pub fn add_solution(&mut self) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let Some(field) = self.editor.add_solution(focus.segment) else {
            return false;
        };
        self.set_focus(focus.segment, field, 0);
        true
    }

    /// Removes the focused solution of a line segment.
    pub fn remove_focused_solution(&mut self) -> bool {
        let Some(Focus {
            segment,
            field: FieldRef::Solution(idx),
            ..
        }) = self.focus
        else {
            return false;
        };
        if !self.editor.remove_solution(segment, idx) {
            return false;
        }
        let next = FieldRef::Solution(idx.saturating_sub(1));
        self.set_focus(segment, next, 0);
        true
    }

    /// Short description of the focus for the status bar, e.g. `2/3 Check › Entry 1`.
    pub fn focus_label(&self) -> String {
        let Some(focus) = self.focus else {
            return "-".to_string();
        };
        let position = self.editor.position(focus.segment).map_or(0, |idx| idx + 1);
        let kind = self
            .editor
            .segment(focus.segment)
            .map(|segment| segment.kind().label())
            .unwrap_or_default();
        format!(
            "{}/{} {} › {}",
            position,
            self.editor.len(),
            kind,
            focus.field
        )
    }
}

impl Deref for EditorDisplay {
    type Target = SegmentEditor;

    fn deref(&self) -> &Self::Target {
        &self.editor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoding;
    use crate::segment::{Entry, Segment};

    fn display_with(segments: Vec<Segment>) -> EditorDisplay {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        for segment in segments {
            editor.insert_segment(segment.kind(), Some(segment));
        }
        EditorDisplay::new(editor)
    }

    fn focused_text(display: &EditorDisplay) -> String {
        display.focused_text().unwrap_or_default().to_string()
    }

    #[test]
    fn focus_starts_on_the_first_field() {
        let display = display_with(vec![Segment::text("a"), Segment::text("b")]);
        let focus = display.focus().unwrap();
        assert_eq!(focus.segment, display.views()[0].id);
        assert_eq!(focus.field, FieldRef::Body);
        assert_eq!(focus.offset, 0);
        assert!(EditorDisplay::new(SegmentEditor::new(Encoding::Typed)).focus().is_none());
    }

    #[test]
    fn typing_edits_the_focused_field_and_output() {
        let mut display = display_with(vec![Segment::text("")]);
        for ch in "héllo".chars() {
            assert!(display.insert_char(ch));
        }
        assert!(display.move_left());
        assert!(display.backspace());
        assert_eq!(focused_text(&display), "hélo");
        assert!(display.delete_forward());
        assert!(!display.delete_forward());
        assert_eq!(focused_text(&display), "hél");
        assert!(display.output().value().contains("\"hél\""));
    }

    #[test]
    fn newlines_only_go_into_multiline_fields() {
        let mut display = display_with(vec![Segment::check(["2+2"], false)]);
        assert!(!display.insert_newline());
        let mut display = display_with(vec![Segment::text("ab")]);
        display.move_end();
        assert!(display.insert_newline());
        assert!(display.insert_char('c'));
        assert_eq!(focused_text(&display), "ab\nc");
        assert!(display.move_home());
        assert_eq!(display.focus().unwrap().offset, 3);
        assert!(display.move_left());
        assert!(display.move_home());
        assert_eq!(display.focus().unwrap().offset, 0);
    }

    #[test]
    fn field_navigation_crosses_segments() {
        let mut display = display_with(vec![
            Segment::text("first"),
            Segment::check(["2+2"], false),
        ]);
        assert!(!display.move_field(-1));
        assert!(display.move_field(1));
        assert_eq!(display.focus().unwrap().field, FieldRef::Entry(0));
        assert!(display.move_field(1));
        assert_eq!(display.focus().unwrap().field, FieldRef::Flag);
        assert!(!display.move_field(1));

        assert!(display.toggle_mark());
        assert!(display.output().value().contains("\"solution\": true"));
        assert!(!display.insert_char('x'));
    }

    #[test]
    fn deleting_refocuses_a_neighbour() {
        let mut display = display_with(vec![Segment::text("a"), Segment::text("b")]);
        let second = display.views()[1].id;
        display.focus_segment(second);
        assert!(display.delete_focused_segment());
        assert_eq!(display.focus().unwrap().segment, display.views()[0].id);
        assert!(display.delete_focused_segment());
        assert!(display.focus().is_none());
        assert!(!display.delete_focused_segment());
    }

    #[test]
    fn structural_edits_keep_focus_valid() {
        let mut display = display_with(vec![Segment::line(["x ="], Entry::default(), Entry::new("3"))]);
        assert!(display.add_entry());
        assert_eq!(display.focus().unwrap().field, FieldRef::Entry(1));
        assert!(display.remove_entry());
        assert_eq!(display.focus().unwrap().field, FieldRef::Entry(0));

        display.move_field(2);
        assert!(display.add_solution());
        assert_eq!(display.focus().unwrap().field, FieldRef::Solution(1));
        assert!(display.remove_focused_solution());
        assert_eq!(display.focus().unwrap().field, FieldRef::Solution(0));
        assert!(!display.remove_focused_solution());
    }

    #[test]
    fn inserted_segments_take_the_focus() {
        let mut display = display_with(vec![Segment::text("a")]);
        let id = display.insert_segment(SegmentKind::Radio);
        assert_eq!(display.focus().unwrap().segment, id);
        assert_eq!(display.focus_label(), "2/2 Radio › Option 1");
        assert!(display.insert_named("video").is_none());
        assert!(display.move_focused_up());
        assert!(!display.move_focused_up());
        assert_eq!(display.views()[0].id, id);
    }
}
