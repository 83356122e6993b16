use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the builder
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the task file name in the status bar
    pub filename_color: Color,

    /// Color of the rule above each segment
    pub segment_header_fg: Color,

    /// Color of the rule above the segment holding the cursor
    pub segment_header_focused_fg: Color,

    /// Color for field labels
    pub field_label_fg: Color,

    /// Color for the label of the field holding the cursor
    pub field_label_focused_fg: Color,

    /// Color of the gutter between labels and field text
    pub gutter_fg: Color,

    /// Color for entries marked as source code
    pub source_fg: Color,

    /// Color for comment segments
    pub comment_fg: Color,

    /// Color for solution marks (`[x]`, `(•)`)
    pub mark_fg: Color,

    /// Color for the hint shown by an empty task
    pub placeholder_fg: Color,

    /// Foreground color for the scrollbar knob
    pub scrollbar_knob_fg: Color,

    /// Foreground color for menu items
    pub menu_fg: Color,

    /// Background color for menu
    pub menu_bg: Color,

    /// Foreground color for disabled menu items
    pub menu_disabled_fg: Color,

    /// Foreground color for selected menu entry
    pub menu_selected_fg: Color,

    /// Background color for selected menu entry
    pub menu_selected_bg: Color,

    /// Color of the menu border and separators
    pub menu_border_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            segment_header_fg: Color::DarkGray,
            segment_header_focused_fg: Color::LightBlue,
            field_label_fg: Color::Gray,
            field_label_focused_fg: Color::White,
            gutter_fg: Color::DarkGray,
            source_fg: Color::LightGreen,
            comment_fg: Color::Yellow,
            mark_fg: Color::LightCyan,
            placeholder_fg: Color::DarkGray,
            scrollbar_knob_fg: Color::Reset,
            menu_fg: Color::White,
            menu_bg: Color::Black,
            menu_disabled_fg: Color::DarkGray,
            menu_selected_fg: Color::Black,
            menu_selected_bg: Color::White,
            menu_border_fg: Color::Gray,
        }
    }
}

impl Theme {
    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the filename in the status bar
    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn segment_header_style(&self) -> Style {
        Style::default().fg(self.segment_header_fg)
    }

    pub fn segment_header_focused_style(&self) -> Style {
        Style::default()
            .fg(self.segment_header_focused_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn field_label_style(&self) -> Style {
        Style::default().fg(self.field_label_fg)
    }

    pub fn field_label_focused_style(&self) -> Style {
        Style::default()
            .fg(self.field_label_focused_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn gutter_style(&self) -> Style {
        Style::default().fg(self.gutter_fg)
    }

    /// Get the style for source entries
    pub fn source_style(&self) -> Style {
        Style::default().fg(self.source_fg)
    }

    /// Get the style for comment segments
    pub fn comment_style(&self) -> Style {
        Style::default()
            .fg(self.comment_fg)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn mark_style(&self) -> Style {
        Style::default().fg(self.mark_fg)
    }

    pub fn placeholder_style(&self) -> Style {
        Style::default()
            .fg(self.placeholder_fg)
            .add_modifier(Modifier::ITALIC)
    }

    /// Get the style for the scrollbar knob
    pub fn scrollbar_knob_style(&self) -> Style {
        Style::default()
            .fg(self.scrollbar_knob_fg)
            .add_modifier(Modifier::REVERSED)
    }

    /// Get the style for the menu/popup
    pub fn menu_style(&self) -> Style {
        Style::default().fg(self.menu_fg).bg(self.menu_bg)
    }

    /// Get the style for a disabled menu item
    pub fn menu_disabled_style(&self) -> Style {
        Style::default().fg(self.menu_disabled_fg)
    }

    /// Get the style for a selected menu entry
    pub fn menu_selected_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_fg)
            .bg(self.menu_selected_bg)
    }

    pub fn menu_border_style(&self) -> Style {
        Style::default().fg(self.menu_border_fg)
    }
}
