//! Practice session lifecycle: snapshot the buffer, let the user retype it
//! over ghost text, and put the original back when the session ends.

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{EditStep, HostError, PracticeError, Result};
use crate::host::{
    Decoration, EditorHost, Hint, HostEvent, ListenerId, MessageLevel, RangeStyle, SurfaceId,
};
use crate::matcher::{compute_partition, CharRange, Partition};
use crate::scheduler::{CancelToken, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum StopReason {
    /// The user ran the stop command
    UserRequested,
    /// Focus moved to another buffer
    EditorChanged,
    /// The host is shutting down
    Deactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Session {
    handle: SessionHandle,
    surface: SurfaceId,
    target: String,
    /// Set while the controller clears the buffer itself; change events are ignored
    setting_up: bool,
    listeners: Vec<ListenerId>,
    pending: Option<CancelToken>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Active(Session),
}

pub struct PracticeController<H: EditorHost> {
    host: H,
    config: Config,
    timers: TimerQueue,
    phase: Phase,
    next_session: u64,
    last_partition: Option<Partition>,
}

impl<H: EditorHost> PracticeController<H> {
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            timers: TimerQueue::new(),
            phase: Phase::Idle,
            next_session: 0,
            last_partition: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    pub fn session(&self) -> Option<SessionHandle> {
        match &self.phase {
            Phase::Active(s) => Some(s.handle),
            Phase::Idle => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(s) => Some(s.target.as_str()),
            Phase::Idle => None,
        }
    }

    /// Result of the most recent recompute in the running session
    pub fn last_partition(&self) -> Option<&Partition> {
        self.last_partition.as_ref()
    }

    /// True while a debounced recompute is waiting to run
    pub fn has_pending_refresh(&self) -> bool {
        matches!(&self.phase, Phase::Active(s) if s.pending.is_some())
    }

    /// Time until the debounce timer fires, if one is armed
    pub fn next_due_in(&self) -> Option<std::time::Duration> {
        self.timers.next_due_in()
    }

    /// StartPractice command. Failures become host messages.
    pub fn start_practice(&mut self) {
        match self.start() {
            Ok(_) if self.is_active() => self.host.show_message(
                "Typing practice started. Retype the text over the hint.",
                MessageLevel::Info,
            ),
            Ok(handle) => debug!(session = handle.id(), "practice ended during setup"),
            Err(e) => self.report(&e),
        }
    }

    /// StopPractice command. Failures become host messages.
    pub fn stop_practice(&mut self) {
        if !self.is_active() {
            self.host
                .show_message("No typing practice is running.", MessageLevel::Info);
            return;
        }
        self.stop_and_report(StopReason::UserRequested);
    }

    /// Snapshot the active buffer as the target and clear it for typing
    pub fn start(&mut self) -> Result<SessionHandle> {
        if self.is_active() {
            return Err(PracticeError::AlreadyActive);
        }
        let surface = self
            .host
            .active_surface()
            .ok_or(PracticeError::NoActiveSurface)?;
        let target = self
            .host
            .buffer_text(surface)
            .ok_or(PracticeError::NoActiveSurface)?;
        if target.trim().is_empty() {
            return Err(PracticeError::EmptyTarget);
        }

        let handle = SessionHandle(self.next_session);
        self.next_session += 1;
        let target_len = target.chars().count();
        let listeners = vec![
            self.host.subscribe(HostEvent::BufferChanged),
            self.host.subscribe(HostEvent::ActiveSurfaceChanged),
        ];
        self.phase = Phase::Active(Session {
            handle,
            surface,
            target,
            setting_up: true,
            listeners,
            pending: None,
        });
        info!(session = handle.id(), chars = target_len, "practice session starting");

        if let Err(source) = self
            .host
            .replace_range(surface, CharRange::new(0, target_len), "")
        {
            error!(session = handle.id(), error = %source, "could not clear buffer");
            if let Phase::Active(session) = std::mem::replace(&mut self.phase, Phase::Idle) {
                self.release(&session);
            }
            return Err(PracticeError::BufferMutation {
                step: EditStep::Clear,
                source,
            });
        }
        self.host.set_cursor(0);
        self.finish_setup();

        self.refresh();
        Ok(handle)
    }

    /// End the running session and put the original text back
    pub fn stop(&mut self, reason: StopReason) -> Result<()> {
        if !self.is_active() {
            debug!(%reason, "stop requested while idle");
            return Ok(());
        }
        info!(%reason, "practice session stopping");
        self.end_session()?;
        if reason != StopReason::Deactivated {
            self.host
                .show_message("Typing practice stopped.", MessageLevel::Info);
        }
        Ok(())
    }

    /// Drain host notifications and react to each of them
    pub fn pump(&mut self) {
        while let Some(event) = self.host.poll_event() {
            self.dispatch(event);
        }
    }

    /// Advance the debounce clock, running the recompute if it came due
    pub fn advance(&mut self, elapsed: std::time::Duration) {
        for token in self.timers.advance(elapsed) {
            self.on_timer(token);
        }
    }

    pub fn on_buffer_changed(&mut self) {
        let Phase::Active(session) = &mut self.phase else {
            return;
        };
        if session.setting_up {
            debug!("ignoring change made while preparing the buffer");
            return;
        }
        if session.target.is_empty() {
            return;
        }
        if let Some(previous) = session.pending.take() {
            self.timers.cancel(previous);
        }
        session.pending = Some(self.timers.schedule_after(self.config.debounce()));
    }

    pub fn on_active_surface_changed(&mut self) {
        if self.is_active() {
            self.stop_and_report(StopReason::EditorChanged);
        }
    }

    /// A timer fired. Tokens from cancelled or finished sessions are ignored.
    pub fn on_timer(&mut self, token: CancelToken) {
        match &mut self.phase {
            Phase::Active(session) if session.pending == Some(token) => session.pending = None,
            _ => {
                debug!(?token, "stale timer");
                return;
            }
        }
        self.refresh();
    }

    fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::BufferChanged => self.on_buffer_changed(),
            HostEvent::ActiveSurfaceChanged => self.on_active_surface_changed(),
        }
    }

    /// Swallow the change notifications caused by our own clear, then leave setup
    fn finish_setup(&mut self) {
        let mut deferred = Vec::new();
        while let Some(event) = self.host.poll_event() {
            match event {
                HostEvent::BufferChanged => self.on_buffer_changed(),
                other => deferred.push(other),
            }
        }
        if let Phase::Active(session) = &mut self.phase {
            session.setting_up = false;
        }
        for event in deferred {
            self.dispatch(event);
        }
    }

    fn refresh(&mut self) {
        let Phase::Active(session) = &self.phase else {
            return;
        };
        if session.setting_up || session.target.is_empty() {
            return;
        }
        if self.host.active_surface() != Some(session.surface) {
            debug!("practice buffer is not focused, skipping refresh");
            return;
        }
        let Some(typed) = self.host.buffer_text(session.surface) else {
            return;
        };

        let partition = compute_partition(&session.target, &typed);
        debug!(
            match_index = partition.match_index,
            correct = partition.correct_count(),
            errors = partition.error_count(),
            typed = partition.typed_len,
            "partition updated"
        );

        if self.host.cursor() != partition.match_index {
            self.host.set_cursor(partition.match_index);
        }
        self.render(&partition);

        let complete = partition.is_complete();
        self.last_partition = Some(partition);
        if complete {
            self.complete();
        }
    }

    fn render(&mut self, partition: &Partition) {
        let correct: Vec<Decoration> = partition
            .correct
            .iter()
            .copied()
            .map(Decoration::plain)
            .collect();
        let errors: Vec<Decoration> = partition
            .errors
            .iter()
            .copied()
            .map(Decoration::plain)
            .collect();
        let hint: Vec<Decoration> = partition
            .overlay
            .iter()
            .map(|o| Decoration {
                range: CharRange::new(o.anchor, o.anchor),
                hint: Some(Hint {
                    text: o.text.clone(),
                    color: self.config.hint_color.clone(),
                }),
            })
            .collect();

        self.host.render(RangeStyle::Correct, &correct);
        self.host.render(RangeStyle::Error, &errors);
        self.host.render(RangeStyle::OverlayHint, &hint);
    }

    fn clear_decorations(&mut self) {
        for style in [RangeStyle::Correct, RangeStyle::Error, RangeStyle::OverlayHint] {
            self.host.render(style, &[]);
        }
    }

    fn complete(&mut self) {
        info!("practice session complete");
        match self.end_session() {
            Ok(()) => self.host.show_message(
                "Practice complete! Every character matches.",
                MessageLevel::Info,
            ),
            Err(e) => self.report(&e),
        }
    }

    /// Go idle and restore the target text. Safe to call only while active.
    fn end_session(&mut self) -> Result<()> {
        let Phase::Active(session) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Ok(());
        };
        self.release(&session);
        self.clear_decorations();
        self.last_partition = None;

        if session.target.is_empty() {
            return Ok(());
        }
        self.restore(session.surface, &session.target)
    }

    fn release(&mut self, session: &Session) {
        if let Some(token) = session.pending {
            self.timers.cancel(token);
        }
        for id in &session.listeners {
            self.host.unsubscribe(*id);
        }
    }

    /// Clear the buffer, then insert the original. The insert never runs if the clear failed.
    fn restore(&mut self, surface: SurfaceId, target: &str) -> Result<()> {
        let restore_failed = |step, source| PracticeError::RestoreFailed { step, source };

        let len = self
            .host
            .buffer_text(surface)
            .map(|t| t.chars().count())
            .ok_or_else(|| restore_failed(EditStep::Clear, HostError::NoActiveBuffer))?;
        self.host
            .replace_range(surface, CharRange::new(0, len), "")
            .map_err(|e| restore_failed(EditStep::Clear, e))?;
        self.host
            .replace_range(surface, CharRange::new(0, 0), target)
            .map_err(|e| restore_failed(EditStep::Insert, e))?;
        Ok(())
    }

    fn stop_and_report(&mut self, reason: StopReason) {
        if let Err(e) = self.stop(reason) {
            self.report(&e);
        }
    }

    fn report(&mut self, err: &PracticeError) {
        let level = match err {
            PracticeError::EmptyTarget
            | PracticeError::NoActiveSurface
            | PracticeError::AlreadyActive => {
                warn!(error = %err, "practice not started");
                MessageLevel::Warning
            }
            PracticeError::BufferMutation { .. } => {
                error!(error = %err, "practice aborted");
                MessageLevel::Error
            }
            PracticeError::RestoreFailed { .. } => {
                error!(error = %err, "original text may be lost");
                MessageLevel::Error
            }
        };
        let text = match err {
            PracticeError::RestoreFailed { .. } => {
                format!("{err}. The original text could not be put back.")
            }
            _ => err.to_string(),
        };
        self.host.show_message(&text, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use assert_matches::assert_matches;
    use std::time::Duration;

    const DEBOUNCE: Duration = Duration::from_millis(10);

    fn controller(text: &str) -> PracticeController<MemoryHost> {
        PracticeController::new(MemoryHost::new(text), Config::default())
    }

    /// Deliver pending host events and let the debounce window elapse
    fn settle(c: &mut PracticeController<MemoryHost>) {
        c.pump();
        c.advance(DEBOUNCE);
    }

    fn hint_text(c: &PracticeController<MemoryHost>) -> Option<String> {
        c.host()
            .decorations(RangeStyle::OverlayHint)
            .first()
            .and_then(|d| d.hint.as_ref())
            .map(|h| h.text.clone())
    }

    #[test]
    fn start_clears_buffer_and_shows_full_hint() {
        let mut c = controller("fn main() {}");
        let handle = c.start().unwrap();

        assert!(c.is_active());
        assert_eq!(c.session(), Some(handle));
        assert_eq!(c.target(), Some("fn main() {}"));
        assert_eq!(c.host().text(), "");
        assert_eq!(c.host().cursor(), 0);
        assert_eq!(hint_text(&c).as_deref(), Some("fn main() {}"));
        assert_eq!(c.host().listener_count(), 2);
        // the clear's own change event was swallowed during setup
        assert!(!c.has_pending_refresh());
    }

    #[test]
    fn whitespace_only_buffer_is_rejected() {
        let mut c = controller("  \n\t ");
        assert_matches!(c.start(), Err(PracticeError::EmptyTarget));
        assert!(!c.is_active());
        assert_eq!(c.host().text(), "  \n\t ");
        assert_eq!(c.host().listener_count(), 0);
    }

    #[test]
    fn no_surface_is_rejected() {
        let mut c = PracticeController::new(MemoryHost::without_surface(), Config::default());
        assert_matches!(c.start(), Err(PracticeError::NoActiveSurface));

        c.start_practice();
        assert_matches!(c.host().last_message(), Some((MessageLevel::Warning, _)));
    }

    #[test]
    fn second_start_is_rejected() {
        let mut c = controller("abc");
        c.start().unwrap();
        assert_matches!(c.start(), Err(PracticeError::AlreadyActive));
        assert_eq!(c.target(), Some("abc"));
    }

    #[test]
    fn typing_updates_ranges_after_debounce() {
        let mut c = controller("abc");
        c.start().unwrap();

        c.host_mut().type_text("ax");
        c.pump();
        assert!(c.has_pending_refresh());
        assert_eq!(c.last_partition().unwrap().typed_len, 0);

        c.advance(DEBOUNCE);
        let p = c.last_partition().unwrap();
        assert_eq!(p.match_index, 1);
        assert_eq!(p.errors, vec![CharRange::new(1, 2)]);
        assert_eq!(
            c.host().decorations(RangeStyle::Correct),
            &[Decoration::plain(CharRange::new(0, 1))]
        );
        assert_eq!(
            c.host().decorations(RangeStyle::Error),
            &[Decoration::plain(CharRange::new(1, 2))]
        );
        assert_eq!(hint_text(&c).as_deref(), Some("bc"));
    }

    #[test]
    fn cursor_snaps_back_to_first_mismatch() {
        let mut c = controller("hello");
        c.start().unwrap();

        c.host_mut().type_text("hexlo");
        assert_eq!(c.host().cursor(), 5);
        settle(&mut c);

        assert_eq!(c.host().cursor(), 2);
        assert_eq!(c.last_partition().unwrap().match_index(), 2);
    }

    #[test]
    fn burst_of_changes_recomputes_once_with_latest_text() {
        let mut c = controller("abcdef");
        c.start().unwrap();

        for ch in "abcd".chars() {
            c.host_mut().type_char(ch);
            c.pump();
            c.advance(Duration::from_millis(3));
        }
        c.advance(Duration::from_millis(6));
        // 9ms after the last keystroke: still inside the window
        assert_eq!(c.last_partition().unwrap().typed_len, 0);
        assert!(c.host().decorations(RangeStyle::Correct).is_empty());

        c.advance(Duration::from_millis(1));
        assert_eq!(c.last_partition().unwrap().typed_len, 4);
        assert!(!c.has_pending_refresh());
        assert_eq!(hint_text(&c).as_deref(), Some("ef"));
    }

    #[test]
    fn completion_restores_and_goes_idle() {
        let mut c = controller("hi there");
        c.start().unwrap();

        c.host_mut().type_text("hi there");
        settle(&mut c);

        assert!(!c.is_active());
        assert_eq!(c.host().text(), "hi there");
        assert_eq!(c.host().listener_count(), 0);
        assert!(c.host().decorations(RangeStyle::Correct).is_empty());
        assert!(c.host().decorations(RangeStyle::OverlayHint).is_empty());
        let (level, text) = c.host().last_message().unwrap();
        assert_eq!(*level, MessageLevel::Info);
        assert!(text.starts_with("Practice complete"));
        assert!(!c
            .host()
            .messages()
            .iter()
            .any(|(_, m)| m.contains("stopped")));
    }

    #[test]
    fn overflow_does_not_complete() {
        let mut c = controller("abc");
        c.start().unwrap();

        c.host_mut().type_text("abcd");
        settle(&mut c);

        assert!(c.is_active());
        let p = c.last_partition().unwrap();
        assert_eq!(p.errors, vec![CharRange::new(3, 4)]);
        assert!(c.host().decorations(RangeStyle::OverlayHint).is_empty());
    }

    #[test]
    fn stop_restores_original_text() {
        let mut c = controller("let x = 1;");
        c.start().unwrap();
        c.host_mut().type_text("let y");
        settle(&mut c);

        c.stop_practice();

        assert!(!c.is_active());
        assert_eq!(c.host().text(), "let x = 1;");
        assert_eq!(c.host().listener_count(), 0);
        assert!(c.host().decorations(RangeStyle::Error).is_empty());
        assert_eq!(
            c.host().last_message(),
            Some(&(MessageLevel::Info, "Typing practice stopped.".to_string()))
        );
    }

    #[test]
    fn deactivation_is_silent() {
        let mut c = controller("abc");
        c.start_practice();
        let before = c.host().messages().len();

        c.stop(StopReason::Deactivated).unwrap();

        assert_eq!(c.host().messages().len(), before);
        assert_eq!(c.host().text(), "abc");
    }

    #[test]
    fn stop_mid_debounce_cancels_the_timer() {
        let mut c = controller("abc");
        c.start().unwrap();
        c.host_mut().type_text("a");
        c.pump();
        assert!(c.has_pending_refresh());

        c.stop(StopReason::UserRequested).unwrap();
        assert_eq!(c.next_due_in(), None);

        c.advance(DEBOUNCE * 5);
        assert_eq!(c.host().text(), "abc");
        assert!(c.host().decorations(RangeStyle::Correct).is_empty());
    }

    #[test]
    fn callbacks_while_idle_are_noops() {
        let mut c = controller("abc");
        c.on_buffer_changed();
        c.on_active_surface_changed();
        c.advance(DEBOUNCE);
        assert!(c.stop(StopReason::UserRequested).is_ok());

        assert_eq!(c.host().text(), "abc");
        assert!(c.host().messages().is_empty());
    }

    #[test]
    fn restarted_session_does_not_inherit_pending_refresh() {
        let mut c = controller("abc");
        c.start().unwrap();
        c.host_mut().type_text("ab");
        c.pump();
        c.stop(StopReason::UserRequested).unwrap();

        c.start().unwrap();
        assert!(!c.has_pending_refresh());
        c.advance(DEBOUNCE);
        assert_eq!(c.last_partition().unwrap().typed_len, 0);
        assert_eq!(c.host().text(), "");
    }

    #[test]
    fn switching_editor_stops_and_restores_the_practiced_buffer() {
        let mut c = controller("original");
        let practiced = c.host().active_surface().unwrap();
        c.start().unwrap();
        c.host_mut().type_text("orig");
        c.pump();

        c.host_mut().open_surface("unrelated");
        settle(&mut c);

        assert!(!c.is_active());
        assert_eq!(c.host().text(), "unrelated");
        assert_eq!(
            c.host().buffer_text(practiced).as_deref(),
            Some("original")
        );
        assert_eq!(
            c.host().last_message().map(|(_, m)| m.as_str()),
            Some("Typing practice stopped.")
        );
    }

    #[test]
    fn failed_clear_at_start_returns_to_idle() {
        let mut c = controller("abc");
        c.host_mut().set_read_only(true);

        assert_matches!(
            c.start(),
            Err(PracticeError::BufferMutation {
                step: EditStep::Clear,
                source: HostError::ReadOnly
            })
        );
        assert!(!c.is_active());
        assert_eq!(c.host().listener_count(), 0);
        assert_eq!(c.host().text(), "abc");
    }

    #[test]
    fn failed_insert_on_restore_is_reported_distinctly() {
        let mut c = controller("abc");
        c.start().unwrap();
        // the restore's clear goes through, its insert does not
        c.host_mut().fail_edits_after(1);

        assert_matches!(
            c.stop(StopReason::UserRequested),
            Err(PracticeError::RestoreFailed {
                step: EditStep::Insert,
                ..
            })
        );
        assert!(!c.is_active());
    }

    #[test]
    fn failed_clear_on_restore_skips_the_insert() {
        let mut c = controller("abc");
        c.start().unwrap();
        c.host_mut().type_text("zz");
        c.host_mut().fail_edits_after(0);

        c.stop_practice();

        assert!(!c.is_active());
        assert_eq!(c.host().text(), "zz");
        let (level, text) = c.host().last_message().unwrap();
        assert_eq!(*level, MessageLevel::Error);
        assert!(text.contains("clear failed"));
        assert!(text.contains("could not be put back"));
    }

    #[test]
    fn hint_uses_configured_color() {
        let cfg = Config {
            hint_color: "#777777".into(),
            ..Config::default()
        };
        let mut c = PracticeController::new(MemoryHost::new("abc"), cfg);
        c.start().unwrap();

        let hint = c.host().decorations(RangeStyle::OverlayHint)[0]
            .hint
            .clone()
            .unwrap();
        assert_eq!(hint.color, "#777777");
    }

    #[test]
    fn sessions_get_fresh_handles() {
        let mut c = controller("abc");
        let first = c.start().unwrap();
        c.stop(StopReason::UserRequested).unwrap();
        let second = c.start().unwrap();
        assert_ne!(first, second);
    }
}
