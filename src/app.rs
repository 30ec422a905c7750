use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::config::Config;
use crate::host::MemoryHost;
use crate::runtime::TermEvent;
use crate::session::{PracticeController, StopReason};

/// Terminal front-end state: one in-memory buffer with a practice controller on top
pub struct App {
    pub controller: PracticeController<MemoryHost>,
    pub should_quit: bool,
}

impl App {
    pub fn new(text: &str, config: Config) -> Self {
        Self {
            controller: PracticeController::new(MemoryHost::new(text), config),
            should_quit: false,
        }
    }

    pub fn host(&self) -> &MemoryHost {
        self.controller.host()
    }

    pub fn config(&self) -> &Config {
        self.controller.config()
    }

    pub fn is_practicing(&self) -> bool {
        self.controller.is_active()
    }

    pub fn handle_event(&mut self, event: TermEvent) {
        match event {
            TermEvent::Key(key) => self.on_key(key),
            TermEvent::Paste(text) => self.controller.host_mut().type_text(&text),
            TermEvent::Resize | TermEvent::Tick => {}
        }
        self.controller.pump();
    }

    /// Let `elapsed` of wall-clock time pass for the debounce timer
    pub fn advance(&mut self, elapsed: Duration) {
        self.controller.advance(elapsed);
    }

    pub fn next_due_in(&self) -> Option<Duration> {
        self.controller.next_due_in()
    }

    pub fn quit(&mut self) {
        if let Err(e) = self.controller.stop(StopReason::Deactivated) {
            tracing::error!(error = %e, "could not restore buffer on exit");
        }
        self.should_quit = true;
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return self.quit(),
            KeyCode::Char('s') if ctrl => return self.controller.start_practice(),
            KeyCode::Esc => return self.controller.stop_practice(),
            KeyCode::Char(_) if ctrl => {
                debug!(?key, "unbound control key");
                return;
            }
            _ => {}
        }

        let host = self.controller.host_mut();
        match key.code {
            KeyCode::Char(c) => host.type_char(c),
            KeyCode::Enter => host.type_char('\n'),
            KeyCode::Tab => host.type_char('\t'),
            KeyCode::Backspace => host.backspace(),
            KeyCode::Delete => host.delete_forward(),
            KeyCode::Left => host.move_left(),
            KeyCode::Right => host.move_right(),
            KeyCode::Home => host.move_home(),
            KeyCode::End => host.move_end(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EditorHost, RangeStyle};

    fn key(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> TermEvent {
        TermEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn editing_keys_change_the_buffer() {
        let mut app = App::new("", Config::default());
        app.handle_event(key(KeyCode::Char('a')));
        app.handle_event(key(KeyCode::Enter));
        app.handle_event(key(KeyCode::Char('b')));
        app.handle_event(key(KeyCode::Left));
        app.handle_event(key(KeyCode::Backspace));

        assert_eq!(app.host().text(), "ab");
        assert_eq!(app.host().cursor(), 1);
    }

    #[test]
    fn ctrl_s_starts_and_esc_stops() {
        let mut app = App::new("abc", Config::default());
        app.handle_event(ctrl('s'));
        assert!(app.is_practicing());
        assert_eq!(app.host().text(), "");

        app.handle_event(key(KeyCode::Char('a')));
        app.advance(Duration::from_millis(10));
        assert_eq!(app.host().decorations(RangeStyle::Correct).len(), 1);

        app.handle_event(key(KeyCode::Esc));
        assert!(!app.is_practicing());
        assert_eq!(app.host().text(), "abc");
    }

    #[test]
    fn paste_counts_as_one_change() {
        let mut app = App::new("hello world", Config::default());
        app.handle_event(ctrl('s'));
        app.handle_event(TermEvent::Paste("hello world".into()));
        app.advance(Duration::from_millis(10));

        assert!(!app.is_practicing());
        assert_eq!(app.host().text(), "hello world");
    }

    #[test]
    fn quitting_mid_session_restores_silently() {
        let mut app = App::new("abc", Config::default());
        app.handle_event(ctrl('s'));
        app.handle_event(key(KeyCode::Char('x')));
        let messages = app.host().messages().len();

        app.handle_event(ctrl('c'));

        assert!(app.should_quit);
        assert_eq!(app.host().text(), "abc");
        assert_eq!(app.host().messages().len(), messages);
    }
}
