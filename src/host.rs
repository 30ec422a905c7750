//! The editor surface the practice controller drives.
//!
//! A host owns the documents, the cursor and the decorations. The controller
//! only ever reaches it through [`EditorHost`]; [`MemoryHost`] is a complete
//! in-memory implementation used by the terminal front-end and by tests.

use std::collections::{HashMap, VecDeque};

use crate::error::HostError;
use crate::matcher::CharRange;

/// Visual treatment for a set of decorations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RangeStyle {
    Correct,
    Error,
    OverlayHint,
}

/// Inline ghost text rendered after the end of a decoration's range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub range: CharRange,
    pub hint: Option<Hint>,
}

impl Decoration {
    pub fn plain(range: CharRange) -> Self {
        Self { range, hint: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Notifications a host delivers to subscribed listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    BufferChanged,
    ActiveSurfaceChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Identifies one editable buffer for as long as the host keeps it open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(usize);

pub trait EditorHost {
    /// The surface user keystrokes currently go to
    fn active_surface(&self) -> Option<SurfaceId>;

    /// Full text of `surface`, or None once it has been closed
    fn buffer_text(&self, surface: SurfaceId) -> Option<String>;

    fn active_buffer_text(&self) -> Option<String> {
        self.active_surface().and_then(|s| self.buffer_text(s))
    }

    /// Replace the characters in `range` of `surface` with `text`
    fn replace_range(
        &mut self,
        surface: SurfaceId,
        range: CharRange,
        text: &str,
    ) -> Result<(), HostError>;

    /// Cursor position in the active surface
    fn cursor(&self) -> usize;

    fn set_cursor(&mut self, pos: usize);

    /// Start delivering events of `kind` through [`EditorHost::poll_event`]
    fn subscribe(&mut self, kind: HostEvent) -> ListenerId;

    fn unsubscribe(&mut self, id: ListenerId);

    /// Next queued notification for an active subscription
    fn poll_event(&mut self) -> Option<HostEvent>;

    /// Replace every decoration of `style` with `decorations`
    fn render(&mut self, style: RangeStyle, decorations: &[Decoration]);

    fn show_message(&mut self, text: &str, level: MessageLevel);
}

/// In-memory editor surface. Closed buffers keep their slot so ids stay stable.
#[derive(Debug, Default)]
pub struct MemoryHost {
    buffers: Vec<Option<Vec<char>>>,
    active: Option<usize>,
    cursor: usize,
    listeners: HashMap<ListenerId, HostEvent>,
    next_listener: u64,
    events: VecDeque<HostEvent>,
    decorations: HashMap<RangeStyle, Vec<Decoration>>,
    messages: Vec<(MessageLevel, String)>,
    read_only: bool,
    edits_before_failure: Option<usize>,
}

impl MemoryHost {
    pub fn new(text: &str) -> Self {
        Self {
            buffers: vec![Some(text.chars().collect())],
            active: Some(0),
            ..Self::default()
        }
    }

    /// A host with no editable buffer open
    pub fn without_surface() -> Self {
        Self::default()
    }

    /// Text of the active buffer, empty if none is open
    pub fn text(&self) -> String {
        self.active_buffer_text().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.active_buffer().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn decorations(&self, style: RangeStyle) -> &[Decoration] {
        self.decorations
            .get(&style)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn messages(&self) -> &[(MessageLevel, String)] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&(MessageLevel, String)> {
        self.messages.last()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Let `n` more edits through, then reject every edit after that
    pub fn fail_edits_after(&mut self, n: usize) {
        self.edits_before_failure = Some(n);
    }

    /// Open a new buffer and make it active, as if the user opened another file
    pub fn open_surface(&mut self, text: &str) -> SurfaceId {
        self.buffers.push(Some(text.chars().collect()));
        let id = self.buffers.len() - 1;
        self.focus(Some(id));
        SurfaceId(id)
    }

    pub fn activate(&mut self, surface: SurfaceId) {
        if matches!(self.buffers.get(surface.0), Some(Some(_))) {
            self.focus(Some(surface.0));
        }
    }

    pub fn close_surface(&mut self, surface: SurfaceId) {
        if let Some(slot) = self.buffers.get_mut(surface.0) {
            *slot = None;
        }
        if self.active == Some(surface.0) {
            self.focus(None);
        }
    }

    // User edits at the cursor of the active buffer. These are the keystrokes
    // a practice session observes.

    pub fn type_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.type_text(c.encode_utf8(&mut tmp));
    }

    pub fn type_text(&mut self, text: &str) {
        let Some(active) = self.active else { return };
        let pos = self.cursor;
        if self.apply_edit(active, CharRange::new(pos, pos), text).is_ok() {
            self.cursor = pos + text.chars().count();
        }
    }

    pub fn backspace(&mut self) {
        let Some(active) = self.active else { return };
        if self.cursor > 0 {
            let pos = self.cursor;
            let _ = self.apply_edit(active, CharRange::new(pos - 1, pos), "");
        }
    }

    pub fn delete_forward(&mut self) {
        let Some(active) = self.active else { return };
        if self.cursor < self.len() {
            let pos = self.cursor;
            let _ = self.apply_edit(active, CharRange::new(pos, pos + 1), "");
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn active_buffer(&self) -> Option<&Vec<char>> {
        self.active
            .and_then(|i| self.buffers.get(i))
            .and_then(Option::as_ref)
    }

    fn focus(&mut self, active: Option<usize>) {
        self.active = active;
        self.cursor = 0;
        self.notify(HostEvent::ActiveSurfaceChanged);
    }

    fn notify(&mut self, event: HostEvent) {
        if self.listeners.values().any(|k| *k == event) {
            self.events.push_back(event);
        }
    }

    fn apply_edit(&mut self, surface: usize, range: CharRange, text: &str) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::ReadOnly);
        }
        if let Some(n) = self.edits_before_failure {
            if n == 0 {
                return Err(HostError::Rejected("injected failure".to_string()));
            }
            self.edits_before_failure = Some(n - 1);
        }

        let buffer = self
            .buffers
            .get_mut(surface)
            .and_then(Option::as_mut)
            .ok_or(HostError::NoActiveBuffer)?;
        if range.end > buffer.len() {
            return Err(HostError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: buffer.len(),
            });
        }

        let inserted = text.chars().count();
        buffer.splice(range.start..range.end, text.chars());

        if self.active == Some(surface) {
            self.cursor = if self.cursor >= range.end {
                self.cursor - range.len() + inserted
            } else if self.cursor > range.start {
                range.start + inserted
            } else {
                self.cursor
            };
        }

        self.notify(HostEvent::BufferChanged);
        Ok(())
    }
}

impl EditorHost for MemoryHost {
    fn active_surface(&self) -> Option<SurfaceId> {
        self.active_buffer().and(self.active).map(SurfaceId)
    }

    fn buffer_text(&self, surface: SurfaceId) -> Option<String> {
        self.buffers
            .get(surface.0)
            .and_then(Option::as_ref)
            .map(|b| b.iter().collect())
    }

    fn replace_range(
        &mut self,
        surface: SurfaceId,
        range: CharRange,
        text: &str,
    ) -> Result<(), HostError> {
        self.apply_edit(surface.0, range, text)
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.len());
    }

    fn subscribe(&mut self, kind: HostEvent) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, kind);
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        if let Some(kind) = self.listeners.remove(&id) {
            if !self.listeners.values().any(|k| *k == kind) {
                self.events.retain(|e| *e != kind);
            }
        }
    }

    fn poll_event(&mut self) -> Option<HostEvent> {
        self.events.pop_front()
    }

    fn render(&mut self, style: RangeStyle, decorations: &[Decoration]) {
        self.decorations.insert(style, decorations.to_vec());
    }

    fn show_message(&mut self, text: &str, level: MessageLevel) {
        self.messages.push((level, text.to_string()));
    }
}
