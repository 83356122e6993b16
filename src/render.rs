use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::editor::{SegmentEditor, SegmentId, SegmentView};
use crate::segment::{ContentKind, FieldRef, Segment, line_count};
use crate::theme::Theme;

/// Width reserved for field labels in front of the `│` gutter.
const LABEL_WIDTH: usize = 10;
/// Body fields of text segments never shrink below this many rows.
const WIDE_FIELD_ROWS: usize = 5;
const TAB_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

/// The field that receives keyboard input, with a char offset into its text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Focus {
    pub segment: SegmentId,
    pub field: FieldRef,
    pub offset: usize,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// First rendered line of every segment, in list order.
    pub segment_starts: Vec<(SegmentId, usize)>,
}

/// Rows a text field occupies: its line count, at least one, and at least
/// [`WIDE_FIELD_ROWS`] for the body of a text segment.
pub fn field_rows(field: FieldRef, text: &str) -> usize {
    let lines = line_count(text).max(1);
    if field == FieldRef::Body {
        lines.max(WIDE_FIELD_ROWS)
    } else {
        lines
    }
}

pub fn render_segments(
    editor: &SegmentEditor,
    focus: Option<&Focus>,
    width: usize,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), theme);
    if editor.is_empty() {
        renderer.push_styled_line(
            "No segments yet. Press Ctrl-Space to add one.",
            theme.placeholder_style(),
        );
    }
    for (position, view) in editor.views().iter().enumerate() {
        if position > 0 {
            renderer.push_blank_line();
        }
        let focus = focus.filter(|focus| focus.segment == view.id);
        renderer.render_view(position, view, focus);
    }
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    theme: &'a Theme,
    cursor: Option<CursorVisualPosition>,
    lines: Vec<Line<'static>>,
    segment_starts: Vec<(SegmentId, usize)>,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            theme,
            cursor: None,
            lines: Vec::new(),
            segment_starts: Vec::new(),
        }
    }

    fn render_view(&mut self, position: usize, view: &SegmentView, focus: Option<&Focus>) {
        self.segment_starts.push((view.id, self.lines.len()));
        self.render_header(position, &view.segment, focus.is_some());
        for field in view.segment.fields() {
            let cursor = focus
                .filter(|focus| focus.field == field)
                .map(|focus| focus.offset);
            self.render_field(&view.segment, field, cursor);
        }
    }

    fn render_header(&mut self, position: usize, segment: &Segment, focused: bool) {
        let title = format!(" {}. {} ", position + 1, segment.kind().label());
        let fill = self.wrap_width.saturating_sub(visible_width(&title) + 2);
        let style = if focused {
            self.theme.segment_header_focused_style()
        } else {
            self.theme.segment_header_style()
        };
        self.lines.push(Line::from(vec![
            Span::styled("──".to_string(), style),
            Span::styled(title, style),
            Span::styled("─".repeat(fill), style),
        ]));
    }

    fn field_prefixes(&self, field: FieldRef, focused: bool) -> (Vec<LineSegment>, Vec<LineSegment>) {
        let label_style = if focused {
            self.theme.field_label_focused_style()
        } else {
            self.theme.field_label_style()
        };
        let gutter = LineSegment {
            text: " │ ".to_string(),
            style: self.theme.gutter_style(),
        };
        let first = vec![
            LineSegment {
                text: format!("{:>width$}", field.label(), width = LABEL_WIDTH),
                style: label_style,
            },
            gutter.clone(),
        ];
        let continuation = vec![
            LineSegment {
                text: " ".repeat(LABEL_WIDTH),
                style: Style::default(),
            },
            gutter,
        ];
        (first, continuation)
    }

    fn render_field(&mut self, segment: &Segment, field: FieldRef, cursor: Option<usize>) {
        let (mut first, continuation) = self.field_prefixes(field, cursor.is_some());

        if field == FieldRef::Flag {
            let mark = if segment.is_marked(field) { "[x]" } else { "[ ]" };
            let label_width: usize = first.iter().map(|part| visible_width(&part.text)).sum();
            first.push(LineSegment {
                text: format!("{mark} correct answer"),
                style: self.theme.mark_style(),
            });
            if cursor.is_some() {
                self.cursor = Some(CursorVisualPosition {
                    line: self.lines.len(),
                    column: (label_width + 1) as u16,
                });
            }
            self.consume_lines(vec![LineOutput {
                spans: first,
                cursor: None,
            }]);
            return;
        }

        let mut continuation_prefix = continuation;
        if let FieldRef::Option(_) = field {
            let mark = match segment {
                Segment::Radio { .. } if segment.is_marked(field) => "(•) ",
                Segment::Radio { .. } => "( ) ",
                _ if segment.is_marked(field) => "[x] ",
                _ => "[ ] ",
            };
            first.push(LineSegment {
                text: mark.to_string(),
                style: self.theme.mark_style(),
            });
            continuation_prefix.push(LineSegment {
                text: " ".repeat(visible_width(mark)),
                style: Style::default(),
            });
        }

        let text = segment.field_text(field).unwrap_or_default();
        let style = match segment.entry(field) {
            Some(entry) if entry.comment => self.theme.comment_style(),
            Some(entry) if entry.kind == ContentKind::Source => self.theme.source_style(),
            _ => Style::default(),
        };

        let mut fragments = Vec::new();
        tokenize_text(text, style, cursor, &mut fragments);
        let mut lines = wrap_fragments(&fragments, &first, &continuation_prefix, self.wrap_width);

        if field.is_multiline() {
            let rows = field_rows(field, text);
            while lines.len() < rows {
                lines.push(LineOutput {
                    spans: continuation_prefix.clone(),
                    cursor: None,
                });
            }
        }
        self.consume_lines(lines);
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
    }

    fn push_styled_line(&mut self, content: &str, style: Style) {
        self.lines
            .push(Line::from(vec![Span::styled(content.to_string(), style)]));
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            if let Some(column) = output.cursor {
                self.cursor = Some(CursorVisualPosition {
                    line: self.lines.len(),
                    column,
                });
            }
            self.lines.push(Line::from(spans));
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
            segment_starts: self.segment_starts,
        }
    }
}

#[derive(Clone, Debug)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone, Debug)]
struct LineOutput {
    spans: Vec<LineSegment>,
    cursor: Option<u16>,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    /// Column of the cursor inside this fragment.
    cursor: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

fn empty_fragment(style: Style, cursor: Option<usize>) -> Fragment {
    Fragment {
        text: String::new(),
        style,
        kind: FragmentKind::Word,
        width: 0,
        cursor,
    }
}

/// Splits `text` into words, whitespace runs and line breaks. `cursor` is a
/// char offset into `text`.
fn tokenize_text(text: &str, style: Style, cursor: Option<usize>, fragments: &mut Vec<FragmentItem>) {
    let mut builder: Option<TokenBuilder> = None;
    let mut cursor_pending = false;

    for (idx, ch) in text.chars().enumerate() {
        if cursor == Some(idx) {
            cursor_pending = true;
        }
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            if let Some(mut token) = builder.take() {
                token.take_cursor(&mut cursor_pending);
                fragments.push(FragmentItem::Token(token.finish()));
            } else if cursor_pending {
                cursor_pending = false;
                fragments.push(FragmentItem::Token(empty_fragment(style, Some(0))));
            }
            fragments.push(FragmentItem::LineBreak);
            continue;
        }

        let (actual, repeat) = if ch == '\t' { (' ', TAB_WIDTH) } else { (ch, 1) };
        let is_whitespace = actual.is_whitespace();
        for _ in 0..repeat {
            match builder.as_mut() {
                Some(current) if current.kind_matches(is_whitespace) => {
                    current.take_cursor(&mut cursor_pending);
                    current.push_char(actual);
                }
                _ => {
                    if let Some(existing) = builder.take() {
                        fragments.push(FragmentItem::Token(existing.finish()));
                    }
                    let mut next = TokenBuilder::new(style, is_whitespace);
                    next.take_cursor(&mut cursor_pending);
                    next.push_char(actual);
                    builder = Some(next);
                }
            }
        }
    }

    if cursor.is_some_and(|offset| offset >= text.chars().count()) {
        cursor_pending = true;
    }
    if let Some(mut token) = builder {
        token.take_cursor(&mut cursor_pending);
        fragments.push(FragmentItem::Token(token.finish()));
    } else if cursor_pending {
        fragments.push(FragmentItem::Token(empty_fragment(style, Some(0))));
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    cursor: Option<usize>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            cursor: None,
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn take_cursor(&mut self, pending: &mut bool) {
        if *pending {
            self.cursor = Some(self.width);
            *pending = false;
        }
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            cursor: self.cursor,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &[LineSegment],
    continuation_prefix: &[LineSegment],
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix);
            }
            FragmentItem::Token(token) if token.kind == FragmentKind::Whitespace => {
                pending_whitespace.push(token.clone());
            }
            FragmentItem::Token(token) => {
                let whitespace_width: usize =
                    pending_whitespace.iter().map(|item| item.width).sum();
                if builder.width > builder.prefix_width
                    && builder.width + whitespace_width + token.width > width
                {
                    builder.consume_pending(&mut pending_whitespace);
                    outputs.push(builder.build_line());
                    builder = LineBuilder::new(continuation_prefix);
                }
                builder.consume_pending(&mut pending_whitespace);
                builder.append(token.clone());
            }
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    cursor: Option<u16>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &[LineSegment]) -> Self {
        let prefix_width = prefix.iter().map(|part| visible_width(&part.text)).sum();
        Self {
            segments: prefix.to_vec(),
            cursor: None,
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append(fragment);
        }
    }

    fn append(&mut self, fragment: Fragment) {
        if let Some(offset) = fragment.cursor {
            self.cursor = Some((self.width + offset) as u16);
        }
        if !fragment.text.is_empty() {
            self.width += fragment.width;
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
        }
    }

    fn build_line(self) -> LineOutput {
        LineOutput {
            spans: self.segments,
            cursor: self.cursor,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoding;
    use crate::segment::SegmentKind;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn prefix_width() -> usize {
        LABEL_WIDTH + visible_width(" │ ")
    }

    #[test]
    fn empty_editor_shows_a_hint() {
        let editor = SegmentEditor::new(Encoding::Typed);
        let render = render_segments(&editor, None, 60, &Theme::default());
        assert_eq!(render.total_lines, 1);
        assert!(line_text(&render.lines[0]).contains("Ctrl-Space"));
        assert!(render.cursor.is_none());
    }

    #[test]
    fn text_bodies_use_five_rows() {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        editor.insert_segment(SegmentKind::Text, Some(Segment::text("Hello")));
        let render = render_segments(&editor, None, 60, &Theme::default());
        // header + five body rows
        assert_eq!(render.total_lines, 6);
        assert!(line_text(&render.lines[0]).contains("1. Text"));
        assert!(line_text(&render.lines[1]).ends_with("Hello"));
    }

    #[test]
    fn field_rows_follow_line_count() {
        assert_eq!(field_rows(FieldRef::Answer, ""), 1);
        assert_eq!(field_rows(FieldRef::Answer, "a\nb\nc"), 3);
        assert_eq!(field_rows(FieldRef::Body, "a\nb"), 5);
        assert_eq!(field_rows(FieldRef::Body, "1\n2\n3\n4\n5\n6"), 6);
    }

    #[test]
    fn cursor_lands_on_the_focused_offset() {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        editor.insert_segment(SegmentKind::Text, Some(Segment::text("intro")));
        let id = editor.insert_segment(
            SegmentKind::Line,
            Some(Segment::line(["ab\ncd"], Default::default(), Default::default())),
        );
        let focus = Focus {
            segment: id,
            field: FieldRef::Entry(0),
            offset: 4,
        };
        let render = render_segments(&editor, Some(&focus), 60, &Theme::default());
        let start = render.segment_starts[1].1;
        // blank separator line + header, then "ab", then "cd"
        assert_eq!(start, 7);
        assert_eq!(
            render.cursor,
            Some(CursorVisualPosition {
                line: start + 2,
                column: (prefix_width() + 1) as u16,
            })
        );
    }

    #[test]
    fn cursor_at_end_of_empty_field() {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        let id = editor.insert_segment(SegmentKind::Line, None);
        let focus = Focus {
            segment: id,
            field: FieldRef::Answer,
            offset: 0,
        };
        let render = render_segments(&editor, Some(&focus), 60, &Theme::default());
        assert_eq!(
            render.cursor,
            Some(CursorVisualPosition {
                line: 2,
                column: prefix_width() as u16,
            })
        );
    }

    #[test]
    fn options_show_their_marks() {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        let radio = editor.insert_segment(SegmentKind::Radio, None);
        editor.select_radio(radio, 1);
        let render = render_segments(&editor, None, 60, &Theme::default());
        let rendered: Vec<String> = render.lines.iter().map(line_text).collect();
        assert!(rendered[1].contains("( ) "));
        assert!(rendered[2].contains("(•) "));

        let mut editor = SegmentEditor::new(Encoding::Typed);
        let check = editor.insert_segment(SegmentKind::Check, None);
        editor.set_check_solution(check, true);
        let render = render_segments(&editor, None, 60, &Theme::default());
        assert!(line_text(&render.lines[2]).contains("[x] correct answer"));
    }

    #[test]
    fn long_text_wraps_under_the_gutter() {
        let mut editor = SegmentEditor::new(Encoding::Typed);
        let id = editor.insert_segment(SegmentKind::Check, None);
        editor.set_field(id, FieldRef::Entry(0), "alpha beta gamma delta");
        let render = render_segments(&editor, None, prefix_width() + 11, &Theme::default());
        let rendered: Vec<String> = render.lines.iter().map(line_text).collect();
        assert!(rendered[1].trim_end().ends_with("alpha beta"));
        assert!(rendered[2].trim_start().starts_with("│ gamma"));
    }
}
