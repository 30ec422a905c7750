use std::str::FromStr;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::config::Config;
use crate::host::{EditorHost, MessageLevel, RangeStyle};
use crate::matcher::Mark;

const HORIZONTAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

fn color(name: &str, fallback: Color) -> Color {
    Color::from_str(name).unwrap_or(fallback)
}

/// Ghost text takes the color carried by its decoration
fn hint_style(name: &str) -> Style {
    Style::default()
        .fg(color(name, Color::DarkGray))
        .add_modifier(Modifier::DIM)
}

struct Palette {
    plain: Style,
    correct: Style,
    error: Style,
}

impl Palette {
    fn from_config(cfg: &Config) -> Self {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        Self {
            plain: Style::default(),
            correct: bold_style.fg(color(&cfg.correct_color, Color::Green)),
            error: bold_style.fg(color(&cfg.error_color, Color::Red)),
        }
    }
}

/// Per-character mark of the typed text, errors taking precedence
fn marks(app: &App, len: usize) -> Vec<Option<Mark>> {
    let host = app.host();
    let mut marks = vec![None; len];
    for (mark, style) in [(Mark::Correct, RangeStyle::Correct), (Mark::Error, RangeStyle::Error)] {
        for d in host.decorations(style) {
            let end = d.range.end.min(len);
            for slot in marks.iter_mut().take(end).skip(d.range.start) {
                *slot = Some(mark);
            }
        }
    }
    marks
}

/// One styled character of the editor view, ghost text included
fn cells(app: &App, palette: &Palette) -> Vec<(char, Style)> {
    let host = app.host();
    let text: Vec<char> = host.text().chars().collect();
    let marks = marks(app, text.len());
    let hint = host
        .decorations(RangeStyle::OverlayHint)
        .first()
        .and_then(|d| d.hint.as_ref().map(|h| (d.range.start, h)));
    let cursor = host.cursor();
    let show_whitespace = app.config().show_whitespace;

    let mut out = Vec::with_capacity(text.len() + hint.map_or(0, |(_, h)| h.text.len()));
    let mut cursor_drawn = false;

    for idx in 0..=text.len() {
        if let Some((anchor, ghost)) = hint {
            if anchor == idx {
                let ghost_style = hint_style(&ghost.color);
                for (n, c) in ghost.text.chars().enumerate() {
                    let mut style = ghost_style;
                    if n == 0 && cursor == anchor {
                        style = style.add_modifier(Modifier::UNDERLINED);
                        cursor_drawn = true;
                    }
                    out.push((displayable(c), style));
                }
            }
        }

        let Some(&c) = text.get(idx) else {
            break;
        };
        let is_error = marks[idx] == Some(Mark::Error);
        let mut style = match marks[idx] {
            Some(Mark::Error) => palette.error,
            Some(Mark::Correct) => palette.correct,
            None => palette.plain,
        };
        if idx == cursor && !cursor_drawn {
            style = style.add_modifier(Modifier::REVERSED);
            cursor_drawn = true;
        }
        let shown = match c {
            ' ' if show_whitespace && is_error => '·',
            '\n' if show_whitespace && is_error => {
                out.push(('↵', style));
                '\n'
            }
            other => displayable(other),
        };
        out.push((shown, style));
    }

    if !cursor_drawn {
        out.push((' ', palette.plain.add_modifier(Modifier::REVERSED)));
    }
    out
}

fn displayable(c: char) -> char {
    match c {
        '\t' => ' ',
        other => other,
    }
}

/// Group cells into lines of same-style spans
fn lines(cells: &[(char, Style)]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];

    for (style, chunk) in &cells.iter().chunk_by(|(_, s)| *s) {
        let mut text = String::new();
        for (c, _) in chunk {
            if *c == '\n' {
                if let Some(line) = lines.last_mut() {
                    line.push_span(Span::styled(std::mem::take(&mut text), style));
                }
                lines.push(Line::default());
            } else {
                text.push(*c);
            }
        }
        if let Some(line) = lines.last_mut() {
            line.push_span(Span::styled(text, style));
        }
    }
    lines
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = Palette::from_config(self.config());
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1), // mode
                Constraint::Min(1),    // buffer
                Constraint::Length(1), // last message
                Constraint::Length(1), // key help
            ])
            .split(area);

        let mode = if self.is_practicing() {
            Span::styled("PRACTICE", bold_style.fg(Color::Yellow))
        } else {
            Span::styled("EDIT", bold_style.fg(Color::Cyan))
        };
        Paragraph::new(Line::from(vec![Span::styled("shadowtype ", bold_style), mode]))
            .render(chunks[0], buf);

        Paragraph::new(lines(&cells(self, &palette)))
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        if let Some((level, text)) = self.host().last_message() {
            let style = match level {
                MessageLevel::Info => dim_style,
                MessageLevel::Warning => Style::default().fg(Color::Yellow),
                MessageLevel::Error => bold_style.fg(Color::Red),
            };
            let max = chunks[2].width as usize;
            let shown = if text.width() > max {
                text.chars().take(max.saturating_sub(1)).chain(['…']).collect()
            } else {
                text.clone()
            };
            Paragraph::new(Span::styled(shown, style)).render(chunks[2], buf);
        }

        let help = if self.is_practicing() {
            "(esc) stop practice / (ctrl-c) quit"
        } else {
            "(ctrl-s) start practice / (ctrl-c) quit"
        };
        Paragraph::new(Span::styled(help, Style::default().add_modifier(Modifier::ITALIC)))
            .render(chunks[3], buf);
    }
}
