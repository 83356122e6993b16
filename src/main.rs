use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use codequiz_builder::codec::{self, Encoding};
use codequiz_builder::config::{Cli, Command};
use codequiz_builder::editor_display::EditorDisplay;
use codequiz_builder::grading;
use codequiz_builder::preview::{PreviewOptions, render_preview};
use codequiz_builder::render::RenderResult;
use codequiz_builder::segment::{FieldRef, Segment, SegmentKind};
use codequiz_builder::task_file::{self, SaveOutcome, TaskFile};
use codequiz_builder::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.resolved_command() else {
        Cli::command().print_help().context("failed to print help")?;
        return Ok(());
    };

    match command {
        Command::Edit { file, field } => {
            init_logging(Some(&cli.log_path()))?;
            run_editor(file, &field, cli.encoding)
        }
        Command::Convert {
            file,
            to,
            output,
            write,
        } => {
            init_logging(None)?;
            let output = if write {
                Some(task_file::converted_path(&file, to))
            } else {
                output
            };
            run_convert(&file, cli.encoding, to, output.as_deref())
        }
        Command::Preview {
            file,
            format,
            solutions,
        } => {
            init_logging(None)?;
            let input = task_file::read_document(&file)?;
            let decoded = codec::decode_task(cli.encoding, &input)
                .with_context(|| format!("failed to read {}", file.display()))?;
            for diagnostic in &decoded.diagnostics {
                warn!(%diagnostic, "skipped part of the task");
            }
            let options = PreviewOptions {
                show_solutions: solutions,
            };
            let rendered = render_preview(&decoded.task, format, options)?;
            io::stdout()
                .write_all(rendered.as_bytes())
                .context("failed to write preview")?;
            Ok(())
        }
        Command::Grade { file, submissions } => {
            init_logging(None)?;
            let input = task_file::read_document(&file)?;
            let decoded = codec::decode_task(cli.encoding, &input)
                .with_context(|| format!("failed to read {}", file.display()))?;
            for diagnostic in &decoded.diagnostics {
                warn!(%diagnostic, "skipped part of the task");
            }
            let answers = task_file::read_document(&submissions)?;
            let answers = grading::parse_submissions(&answers)
                .with_context(|| format!("failed to read {}", submissions.display()))?;
            let verdicts = grading::grade_task(&decoded.task, &answers);
            io::stdout()
                .write_all(grading::format_report(&verdicts).as_bytes())
                .context("failed to write report")?;
            Ok(())
        }
    }
}

/// The interactive editor owns the terminal, so it logs to a file. The
/// one-shot commands log to stderr.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let default_level = if log_file.is_some() { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
    Ok(())
}

fn run_convert(file: &Path, from: Encoding, to: Encoding, output: Option<&Path>) -> Result<()> {
    let input = task_file::read_document(file)?;
    let (converted, diagnostics) = codec::convert(&input, from, to)
        .with_context(|| format!("failed to convert {}", file.display()))?;
    for diagnostic in &diagnostics {
        warn!(%diagnostic, "dropped while converting");
    }
    match output {
        Some(path) => {
            fs::write(path, &converted)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(from = %from, to = %to, path = %path.display(), "converted task");
        }
        None => {
            let mut stdout = io::stdout();
            stdout
                .write_all(converted.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("failed to write converted task")?;
        }
    }
    Ok(())
}

fn run_editor(path: PathBuf, field: &str, encoding: Encoding) -> Result<()> {
    let loaded = task_file::load(&path, encoding, field)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut app = App::new(
        EditorDisplay::new(loaded.editor),
        loaded.file,
        Some(loaded.status),
    );

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt);
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.has_status_message();
            app.on_tick();
            last_tick = Instant::now();
            if had_message_before && !app.has_status_message() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum MenuAction {
    Insert(SegmentKind),
    DeleteSegment,
    MoveUp,
    MoveDown,
    ToggleKind,
    ToggleMark,
    AddEntry,
    RemoveEntry,
    AddSolution,
    RemoveSolution,
}

#[derive(Clone, Copy)]
struct MenuShortcut {
    key: char,
    requires_shift: bool,
}

impl MenuShortcut {
    const fn new(key: char) -> Self {
        Self {
            key,
            requires_shift: false,
        }
    }

    const fn with_shift(key: char) -> Self {
        Self {
            key,
            requires_shift: true,
        }
    }

    fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char(ch) if ch == self.key => {
                if self.requires_shift {
                    modifiers == KeyModifiers::SHIFT
                } else {
                    modifiers.is_empty()
                }
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy)]
struct MenuItem {
    label: &'static str,
    action: Option<MenuAction>,
    shortcut: MenuShortcut,
}

impl MenuItem {
    fn new(label: &'static str, action: MenuAction, shortcut: MenuShortcut, enabled: bool) -> Self {
        Self {
            label,
            action: enabled.then_some(action),
            shortcut,
        }
    }

    fn is_enabled(&self) -> bool {
        self.action.is_some()
    }
}

enum MenuEntry {
    Section(&'static str),
    Separator,
    Item(MenuItem),
}

struct ContextMenuState {
    entries: Vec<MenuEntry>,
    selected_index: usize,
}

impl ContextMenuState {
    fn new(entries: Vec<MenuEntry>) -> Self {
        let selected_index = entries
            .iter()
            .position(|entry| matches!(entry, MenuEntry::Item(item) if item.is_enabled()))
            .unwrap_or(0);
        Self {
            entries,
            selected_index,
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.entries.is_empty() {
            return;
        }

        let len = self.entries.len() as i32;
        let mut idx = self.selected_index as i32;

        for _ in 0..len {
            idx = (idx + delta).rem_euclid(len);
            if matches!(self.entries[idx as usize], MenuEntry::Item(_)) {
                self.selected_index = idx as usize;
                break;
            }
        }
    }

    fn current_action(&self) -> Option<MenuAction> {
        match self.entries.get(self.selected_index) {
            Some(MenuEntry::Item(item)) => item.action,
            _ => None,
        }
    }

    fn shortcut_action(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> (bool, Option<MenuAction>) {
        for (idx, entry) in self.entries.iter().enumerate() {
            if let MenuEntry::Item(item) = entry
                && item.shortcut.matches(code, modifiers)
            {
                self.selected_index = idx;
                return (true, item.action);
            }
        }
        (false, None)
    }
}

const INSERT_SHORTCUTS: [char; 7] = ['1', '2', '3', '4', '5', '6', '7'];

/// What the focused segment and field allow, used to enable menu items.
#[derive(Default)]
struct FocusState {
    has_segment: bool,
    can_move_up: bool,
    can_move_down: bool,
    has_kind: bool,
    has_mark: bool,
    has_entries: bool,
    can_remove_entry: bool,
    has_solutions: bool,
    can_remove_solution: bool,
}

fn build_context_menu_entries(encoding: Encoding, state: &FocusState) -> Vec<MenuEntry> {
    let mut entries = vec![MenuEntry::Section("Add segment")];
    for (kind, key) in encoding.insertable().into_iter().zip(INSERT_SHORTCUTS) {
        entries.push(MenuEntry::Item(MenuItem::new(
            kind.label(),
            MenuAction::Insert(kind),
            MenuShortcut::new(key),
            true,
        )));
    }

    entries.extend([
        MenuEntry::Separator,
        MenuEntry::Section("Segment"),
        MenuEntry::Item(MenuItem::new(
            "Delete",
            MenuAction::DeleteSegment,
            MenuShortcut::new('d'),
            state.has_segment,
        )),
        MenuEntry::Item(MenuItem::new(
            "Move up",
            MenuAction::MoveUp,
            MenuShortcut::new('k'),
            state.can_move_up,
        )),
        MenuEntry::Item(MenuItem::new(
            "Move down",
            MenuAction::MoveDown,
            MenuShortcut::new('j'),
            state.can_move_down,
        )),
        MenuEntry::Separator,
        MenuEntry::Section("Field"),
        MenuEntry::Item(MenuItem::new(
            "Toggle text/source",
            MenuAction::ToggleKind,
            MenuShortcut::new('t'),
            state.has_kind,
        )),
        MenuEntry::Item(MenuItem::new(
            "Toggle solution",
            MenuAction::ToggleMark,
            MenuShortcut::new('x'),
            state.has_mark,
        )),
        MenuEntry::Item(MenuItem::new(
            "Add entry",
            MenuAction::AddEntry,
            MenuShortcut::new('e'),
            state.has_entries,
        )),
        MenuEntry::Item(MenuItem::new(
            "Remove last entry",
            MenuAction::RemoveEntry,
            MenuShortcut::with_shift('E'),
            state.can_remove_entry,
        )),
        MenuEntry::Item(MenuItem::new(
            "Add solution",
            MenuAction::AddSolution,
            MenuShortcut::new('s'),
            state.has_solutions,
        )),
        MenuEntry::Item(MenuItem::new(
            "Remove solution",
            MenuAction::RemoveSolution,
            MenuShortcut::with_shift('S'),
            state.can_remove_solution,
        )),
    ]);
    entries
}

fn is_context_menu_shortcut(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Esc => modifiers.is_empty(),
        KeyCode::Char(' ') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

struct App {
    display: EditorDisplay,
    theme: Theme,
    task_file: TaskFile,
    scroll_top: usize,
    should_quit: bool,
    dirty: bool,
    cursor_following: bool,
    status_message: Option<(String, Instant)>,
    context_menu: Option<ContextMenuState>,
    last_viewport_height: usize,
    last_total_lines: usize,
}

impl App {
    fn new(display: EditorDisplay, task_file: TaskFile, initial_status: Option<String>) -> Self {
        Self {
            display,
            theme: Theme::default(),
            task_file,
            scroll_top: 0,
            should_quit: false,
            dirty: false,
            cursor_following: true,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            context_menu: None,
            last_viewport_height: 0,
            last_total_lines: 0,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let editor_area = vertical[0];
        let status_area = vertical[1];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];

        let render = self
            .display
            .render(text_area.width.max(1) as usize, &self.theme);
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);
        self.last_viewport_height = viewport_height;
        self.last_total_lines = render.total_lines;

        let paragraph = Paragraph::new(Text::from(render.lines))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        self.draw_scrollbar(frame, scrollbar_area);

        if self.context_menu.is_none()
            && let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width.saturating_sub(1));
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        if self.context_menu.is_some() {
            self.render_context_menu(frame, area);
        }
    }

    fn draw_scrollbar(&self, frame: &mut Frame, area: Rect) {
        if area.height == 0 || self.last_total_lines <= self.last_viewport_height {
            return;
        }

        let viewport = self.last_viewport_height;
        let knob_size = ((viewport * viewport) / self.last_total_lines).clamp(1, viewport);
        let max_scroll = self.last_total_lines.saturating_sub(viewport);
        let knob_travel = viewport.saturating_sub(knob_size);
        let knob_start = if max_scroll == 0 || knob_travel == 0 {
            0
        } else {
            (self.scroll_top * knob_travel) / max_scroll
        };

        for row in knob_start..(knob_start + knob_size).min(area.height as usize) {
            let span = Span::styled(" ", self.theme.scrollbar_knob_style());
            frame.render_widget(
                Paragraph::new(Line::from(span)),
                Rect::new(area.x, area.y + row as u16, 1, 1),
            );
        }
    }

    fn render_context_menu(&self, frame: &mut Frame, area: Rect) {
        let Some(menu) = &self.context_menu else {
            return;
        };

        if area.width < 3 || area.height < 3 {
            return;
        }

        let mut max_label_width = 0usize;
        let mut max_section_width = 0usize;
        for entry in &menu.entries {
            match entry {
                MenuEntry::Item(item) => {
                    max_label_width = max_label_width.max(item.label.chars().count());
                }
                MenuEntry::Section(title) => {
                    max_section_width = max_section_width.max(title.chars().count());
                }
                MenuEntry::Separator => {}
            }
        }

        // label, two spaces, one shortcut character
        let content_width = (max_label_width + 3).max(max_section_width) as u16;
        let min_width = 10.min(area.width);
        let width = (content_width + 4).min(area.width).max(min_width);
        let height = (menu.entries.len() as u16 + 2).min(area.height).max(3);

        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup_area);

        let separator_width = popup_area.width.saturating_sub(4).max(4) as usize;
        let popup_style = self.theme.menu_style();

        let items: Vec<ListItem> = menu
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Section(title) => ListItem::new(Line::from(Span::styled(
                    *title,
                    popup_style.add_modifier(Modifier::BOLD),
                ))),
                MenuEntry::Separator => ListItem::new(Line::from(Span::styled(
                    "─".repeat(separator_width),
                    self.theme.menu_border_style(),
                ))),
                MenuEntry::Item(item) => {
                    let content = format!(
                        "{label:<label_width$}  {shortcut}",
                        label = item.label,
                        label_width = max_label_width,
                        shortcut = item.shortcut.key,
                    );
                    let style = if item.is_enabled() {
                        popup_style
                    } else {
                        self.theme.menu_disabled_style()
                    };
                    ListItem::new(Line::from(Span::styled(content, style)))
                }
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(menu.selected_index));

        let list = List::new(items)
            .highlight_style(self.theme.menu_selected_style())
            .style(popup_style)
            .block(
                Block::default()
                    .title("Segments")
                    .borders(Borders::ALL)
                    .style(popup_style)
                    .border_style(self.theme.menu_border_style()),
            );

        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn focus_state(&self) -> FocusState {
        let Some(focus) = self.display.focus() else {
            return FocusState::default();
        };
        let Some(segment) = self.display.segment(focus.segment) else {
            return FocusState::default();
        };
        let position = self.display.position(focus.segment).unwrap_or(0);
        let (entries, solutions) = match segment {
            Segment::Line {
                content, solution, ..
            } => (Some(content.len()), Some(solution.len())),
            Segment::Check { content, .. } => (Some(content.len()), None),
            _ => (None, None),
        };
        FocusState {
            has_segment: true,
            can_move_up: position > 0,
            can_move_down: position + 1 < self.display.len(),
            has_kind: segment.field_kind(focus.field).is_some(),
            has_mark: matches!(focus.field, FieldRef::Flag | FieldRef::Option(_)),
            has_entries: entries.is_some(),
            can_remove_entry: entries.is_some_and(|len| len > 1),
            has_solutions: solutions.is_some(),
            can_remove_solution: matches!(focus.field, FieldRef::Solution(_))
                && solutions.is_some_and(|len| len > 1),
        }
    }

    fn open_context_menu(&mut self) {
        let entries = build_context_menu_entries(self.display.encoding(), &self.focus_state());
        self.context_menu = Some(ContextMenuState::new(entries));
    }

    fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    fn handle_context_menu_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let Some(menu) = self.context_menu.as_mut() else {
            return false;
        };

        match code {
            KeyCode::Esc => self.close_context_menu(),
            KeyCode::Char(' ') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.close_context_menu()
            }
            KeyCode::Up => menu.move_selection(-1),
            KeyCode::Down => menu.move_selection(1),
            KeyCode::Enter => {
                if let Some(action) = menu.current_action() {
                    self.execute_menu_action(action);
                    self.close_context_menu();
                }
            }
            KeyCode::Char(_) => {
                let (handled, action) = menu.shortcut_action(code, modifiers);
                if let Some(action) = action {
                    self.execute_menu_action(action);
                    self.close_context_menu();
                }
                return handled;
            }
            _ => return false,
        }
        true
    }

    fn execute_menu_action(&mut self, action: MenuAction) {
        let changed = match action {
            MenuAction::Insert(kind) => {
                self.display.insert_segment(kind);
                self.set_status(format!("Added {} segment", kind.label()));
                true
            }
            MenuAction::DeleteSegment => self.display.delete_focused_segment(),
            MenuAction::MoveUp => self.display.move_focused_up(),
            MenuAction::MoveDown => self.display.move_focused_down(),
            MenuAction::ToggleKind => self.display.toggle_kind(),
            MenuAction::ToggleMark => self.display.toggle_mark(),
            MenuAction::AddEntry => self.display.add_entry(),
            MenuAction::RemoveEntry => self.display.remove_entry(),
            MenuAction::AddSolution => self.display.add_solution(),
            MenuAction::RemoveSolution => self.display.remove_focused_solution(),
        };
        if changed {
            self.mark_dirty();
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let position = self.display.focus_label();
        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{} ", position)),
                Span::raw(message.clone()),
            ]);
        }

        let filename = self.task_file.path().display().to_string();
        let marker = if self.dirty { "*" } else { "" };

        // Least important first
        let all_shortcuts = ["^T:Source", "^D:Delete", "^Space:Menu", "^S:Save", "^Q:Quit"];

        let mut spans = vec![
            Span::raw(position),
            Span::raw(" "),
            Span::styled(format!("{}{}", filename, marker), self.theme.filename_style()),
            Span::raw(format!(
                ", {} segments, {}",
                self.display.len(),
                self.display.encoding()
            )),
        ];

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let min_padding = 1;
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;

        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
        if self.cursor_following
            && let Some(cursor) = render.cursor
        {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
    }

    fn scroll_top_for_cursor(
        &self,
        cursor_line: usize,
        viewport: usize,
        max_scroll: usize,
    ) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }
        scroll.min(max_scroll)
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.cursor_following = false;
        let max_scroll = self
            .last_total_lines
            .saturating_sub(self.last_viewport_height.max(1));
        self.scroll_top = self.scroll_top.saturating_add_signed(delta).min(max_scroll);
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::ScrollDown => self.scroll_by_lines(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::Down(_) => self.close_context_menu(),
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code, modifiers),
            Event::Mouse(mouse_event) => self.handle_mouse_event(mouse_event),
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.handle_context_menu_key(code, modifiers) || self.context_menu.is_some() {
            return;
        }

        if is_context_menu_shortcut(code, modifiers) {
            self.open_context_menu();
            return;
        }

        self.cursor_following = true;
        let focused_field = self.display.focus().map(|focus| focus.field);
        let edited = match (code, modifiers) {
            (KeyCode::Char('q') | KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                false
            }
            (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.save();
                false
            }
            (KeyCode::Char('d'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.display.delete_focused_segment()
            }
            (KeyCode::Char('t'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.display.toggle_kind()
            }
            (KeyCode::Char('x'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.display.toggle_mark()
            }
            (KeyCode::Char(' '), m) if focused_field == Some(FieldRef::Flag) && m.is_empty() => {
                self.display.toggle_mark()
            }
            (KeyCode::Up, m) if m.contains(KeyModifiers::ALT) => self.display.move_focused_up(),
            (KeyCode::Down, m) if m.contains(KeyModifiers::ALT) => {
                self.display.move_focused_down()
            }
            (KeyCode::Up, _) | (KeyCode::BackTab, _) => {
                self.display.move_field(-1);
                false
            }
            (KeyCode::Down, _) | (KeyCode::Tab, _) => {
                self.display.move_field(1);
                false
            }
            (KeyCode::Left, _) => {
                self.display.move_left();
                false
            }
            (KeyCode::Right, _) => {
                self.display.move_right();
                false
            }
            (KeyCode::Home, _) => {
                self.display.move_home();
                false
            }
            (KeyCode::End, _) => {
                self.display.move_end();
                false
            }
            (KeyCode::PageUp, _) => {
                self.scroll_by_lines(-(self.last_viewport_height.max(1) as isize));
                false
            }
            (KeyCode::PageDown, _) => {
                self.scroll_by_lines(self.last_viewport_height.max(1) as isize);
                false
            }
            (KeyCode::Enter, _) if focused_field.is_some_and(|field| field.is_multiline()) => {
                self.display.insert_newline()
            }
            (KeyCode::Enter, _) => {
                self.display.move_field(1);
                false
            }
            (KeyCode::Backspace, _) => self.display.backspace(),
            (KeyCode::Delete, _) => self.display.delete_forward(),
            (KeyCode::Char(ch), m)
                if !m.contains(KeyModifiers::CONTROL) && !m.contains(KeyModifiers::ALT) =>
            {
                self.display.insert_char(ch)
            }
            _ => false,
        };
        if edited {
            self.mark_dirty();
        }
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn save(&mut self) {
        match self.task_file.save(self.display.output(), self.dirty) {
            Ok(SaveOutcome::Saved) => {
                self.dirty = false;
                self.set_status("Saved");
            }
            Ok(SaveOutcome::KeptOriginal(backup)) => {
                self.dirty = false;
                self.set_status(format!("Saved, original kept as {}", backup.display()));
            }
            Ok(SaveOutcome::Unchanged) => {
                self.set_status("Not saved: the file did not load cleanly and nothing was edited");
            }
            Err(err) => {
                error!(error = %err, "save failed");
                self.set_status(format!("Save failed: {err}"));
            }
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
