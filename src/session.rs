//! The typing-session engine.
//!
//! A [`Session`] owns the target text, the typed log, the phase and the sample
//! timer. Key events and timer ticks are fed in one at a time by the host; the
//! engine never blocks and never fails on input.

use crossterm::event::KeyEvent;
use tracing::{debug, info, warn};

use crate::keystroke::{self, KeyAction};
use crate::metrics::{self, ROLLING_WINDOW_MS};
use crate::result::{FinalMetrics, ResultPayload};
use crate::snippet::TargetText;
use crate::store::ResultSink;
use crate::timer::{Scheduler, TimerHandle, TimerId, SAMPLE_PERIOD};
use crate::typed_log::{TypedEntry, TypedLog};

/// Consecutive trailing errors after which typed input is refused.
pub const ERROR_CAP: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub display_name: String,
    pub user_id: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            display_name: "anonymous".to_string(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub started_at_ms: Option<u64>,
    pub remaining_secs: u32,
    pub blocked: bool,
    pub wpm_samples: Vec<u32>,
}

impl SessionState {
    fn new(duration_secs: u32) -> Self {
        Self {
            phase: Phase::Idle,
            started_at_ms: None,
            remaining_secs: duration_secs,
            blocked: false,
            wpm_samples: Vec::new(),
        }
    }
}

/// Numbers shown while typing; replaced by the final numbers at finalize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Readout {
    wpm: u32,
    raw_wpm: u32,
    accuracy: u32,
    errors: u32,
}

impl Default for Readout {
    fn default() -> Self {
        Self {
            wpm: 0,
            raw_wpm: 0,
            accuracy: 100,
            errors: 0,
        }
    }
}

/// Read-only projection of the session for a presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveMetrics {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub errors: u32,
    pub remaining_secs: u32,
    pub blocked: bool,
    pub caps_lock_on: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing changed.
    Ignored,
    /// Printable input refused until the error run is corrected.
    Blocked,
    /// Printable input refused because every target slot is used.
    Full,
    Typed,
    Deleted,
    Restarted,
    /// The host should load a new target text.
    SkipRequested,
    /// The last target slot was filled and the session finalized.
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick from a timer this session no longer owns, or outside `Active`.
    Stale,
    Sampled,
    TimedOut,
}

pub struct Session {
    config: SessionConfig,
    target: TargetText,
    log: TypedLog,
    state: SessionState,
    readout: Readout,
    caps_lock_on: bool,
    timer: Option<TimerHandle>,
    next_timer_id: TimerId,
    scheduler: Box<dyn Scheduler>,
    sink: Box<dyn ResultSink>,
    result: Option<ResultPayload>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        target: TargetText,
        scheduler: Box<dyn Scheduler>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        let state = SessionState::new(config.duration_secs);
        Self {
            config,
            target,
            log: TypedLog::new(),
            state,
            readout: Readout::default(),
            caps_lock_on: false,
            timer: None,
            next_timer_id: 1,
            scheduler,
            sink,
            result: None,
        }
    }

    /// Replaces the target text and returns to `Idle`.
    pub fn load(&mut self, target: TargetText) {
        debug!(snippet = target.id(), "loading target text");
        self.target = target;
        self.reset();
    }

    /// Returns to `Idle` with the same target text.
    pub fn restart(&mut self) {
        debug!(snippet = self.target.id(), "restarting session");
        self.reset();
    }

    fn reset(&mut self) {
        self.cancel_timer();
        self.log.clear();
        self.state = SessionState::new(self.config.duration_secs);
        self.readout = Readout::default();
        self.result = None;
    }

    /// Applies one key event that arrived at `now_ms`.
    pub fn handle_key(&mut self, key: KeyEvent, now_ms: u64) -> KeyOutcome {
        self.caps_lock_on = keystroke::caps_lock_on(&key);

        let action = keystroke::classify(&key);
        if action == KeyAction::Skip {
            return KeyOutcome::SkipRequested;
        }
        if self.state.phase == Phase::Result {
            return KeyOutcome::Ignored;
        }

        match action {
            KeyAction::Skip => KeyOutcome::SkipRequested,
            KeyAction::Restart => {
                self.restart();
                KeyOutcome::Restarted
            }
            KeyAction::DeleteWord => {
                if self.state.phase == Phase::Idle {
                    return KeyOutcome::Ignored;
                }
                self.log.delete_word();
                self.state.blocked = false;
                self.refresh_readout(now_ms);
                KeyOutcome::Deleted
            }
            KeyAction::Backspace => {
                if self.state.phase == Phase::Idle {
                    return KeyOutcome::Ignored;
                }
                self.log.pop();
                self.update_blocked();
                self.refresh_readout(now_ms);
                KeyOutcome::Deleted
            }
            KeyAction::Ignore => KeyOutcome::Ignored,
            KeyAction::Type(c) => self.type_char(c, now_ms),
        }
    }

    fn type_char(&mut self, c: char, now_ms: u64) -> KeyOutcome {
        if self.state.blocked {
            return KeyOutcome::Blocked;
        }
        let Some(expected) = self.target.char_at(self.log.len()) else {
            return KeyOutcome::Full;
        };

        if self.state.phase == Phase::Idle {
            self.start(now_ms);
        }

        self.log.push(TypedEntry::new(c, expected, now_ms));
        self.update_blocked();
        self.refresh_readout(now_ms);

        if self.log.len() == self.target.len() {
            self.finalize(now_ms);
            return KeyOutcome::Completed;
        }
        KeyOutcome::Typed
    }

    fn start(&mut self, now_ms: u64) {
        let id = self.next_timer_id;
        self.next_timer_id += 1;

        self.state.phase = Phase::Active;
        self.state.started_at_ms = Some(now_ms);
        self.timer = Some(self.scheduler.start(id, SAMPLE_PERIOD));
        debug!(timer = id, snippet = self.target.id(), "session started");
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(timer = timer.id(), "cancelling sample timer");
            timer.cancel();
        }
    }

    fn update_blocked(&mut self) {
        self.state.blocked = self.log.trailing_incorrect() >= ERROR_CAP;
    }

    fn refresh_readout(&mut self, now_ms: u64) {
        let Some(started) = self.state.started_at_ms else {
            return;
        };
        let correct = self.log.correct_count();
        let total = self.log.len();

        self.readout = Readout {
            wpm: metrics::rolling_speed(self.log.entries(), ROLLING_WINDOW_MS),
            raw_wpm: metrics::speed(total, now_ms.saturating_sub(started)),
            accuracy: metrics::accuracy(correct, total),
            errors: self.log.incorrect_count() as u32,
        };
    }

    /// Advances the countdown for the timer identified by `timer`.
    pub fn on_tick(&mut self, timer: TimerId, now_ms: u64) -> TickOutcome {
        let owned = self.timer.as_ref().map(TimerHandle::id) == Some(timer);
        if !owned || self.state.phase != Phase::Active {
            debug!(timer, "dropping stale tick");
            return TickOutcome::Stale;
        }

        let sample = metrics::rolling_speed(self.log.entries(), ROLLING_WINDOW_MS);
        self.state.wpm_samples.push(sample);
        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);

        if self.state.remaining_secs == 0 {
            self.finalize(now_ms);
            return TickOutcome::TimedOut;
        }
        TickOutcome::Sampled
    }

    fn finalize(&mut self, now_ms: u64) {
        if self.state.phase == Phase::Result {
            return;
        }
        let Some(started) = self.state.started_at_ms else {
            debug!("finalize requested before the session started");
            return;
        };

        self.cancel_timer();
        let elapsed_ms = now_ms.saturating_sub(started);
        let metrics = FinalMetrics::compute(&self.log, &self.state.wpm_samples, elapsed_ms);

        self.readout = Readout {
            wpm: metrics.wpm,
            raw_wpm: metrics.raw_wpm,
            accuracy: metrics.accuracy,
            errors: metrics.errors,
        };
        self.state.phase = Phase::Result;

        let payload = ResultPayload {
            language: self.target.language(),
            duration_secs: self.config.duration_secs,
            wpm: metrics.wpm,
            raw_wpm: metrics.raw_wpm,
            accuracy: metrics.accuracy,
            errors: metrics.errors,
            consistency: metrics.consistency,
            snippet_id: self.target.id().to_string(),
            elapsed_ms,
            user_id: self.config.user_id.clone(),
            display_name: self.config.display_name.clone(),
        };
        info!(
            snippet = %payload.snippet_id,
            wpm = payload.wpm,
            raw_wpm = payload.raw_wpm,
            accuracy = payload.accuracy,
            errors = payload.errors,
            consistency = payload.consistency,
            elapsed_ms,
            "session finished"
        );

        if let Err(err) = self.sink.submit(&payload) {
            warn!(error = %err, "session result not saved");
        }
        self.result = Some(payload);
    }

    pub fn snapshot(&self) -> LiveMetrics {
        LiveMetrics {
            wpm: self.readout.wpm,
            raw_wpm: self.readout.raw_wpm,
            accuracy: self.readout.accuracy,
            errors: self.readout.errors,
            remaining_secs: self.state.remaining_secs,
            blocked: self.state.blocked,
            caps_lock_on: self.caps_lock_on,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn target(&self) -> &TargetText {
        &self.target
    }

    pub fn log(&self) -> &TypedLog {
        &self.log
    }

    pub fn is_blocked(&self) -> bool {
        self.state.blocked
    }

    /// Id of the running sample timer, if any.
    pub fn active_timer(&self) -> Option<TimerId> {
        self.timer.as_ref().map(TimerHandle::id)
    }

    /// The payload produced at finalize, until the next reset.
    pub fn result(&self) -> Option<&ResultPayload> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet::Language;
    use crate::store::ChannelSink;
    use crate::timer::ManualScheduler;
    use assert_matches::assert_matches;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::mpsc::{self, Receiver};

    fn session(text: &str, duration_secs: u32) -> (Session, ManualScheduler, Receiver<ResultPayload>) {
        let scheduler = ManualScheduler::new();
        let (tx, rx) = mpsc::channel();
        let config = SessionConfig {
            duration_secs,
            ..SessionConfig::default()
        };
        let session = Session::new(
            config,
            TargetText::new("test-1", Language::Javascript, text),
            Box::new(scheduler.clone()),
            Box::new(ChannelSink::new(tx)),
        );
        (session, scheduler, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(session: &mut Session, text: &str, start_ms: u64, step_ms: u64) -> KeyOutcome {
        let mut outcome = KeyOutcome::Ignored;
        for (i, c) in text.chars().enumerate() {
            let code = if c == '\n' { KeyCode::Enter } else { KeyCode::Char(c) };
            outcome = session.handle_key(key(code), start_ms + i as u64 * step_ms);
        }
        outcome
    }

    #[test]
    fn test_new_session_is_idle() {
        let (session, scheduler, _rx) = session("hello", 30);

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.log().is_empty());
        assert_eq!(session.state().started_at_ms, None);
        assert_eq!(session.active_timer(), None);
        assert!(scheduler.started().is_empty());

        let live = session.snapshot();
        assert_eq!(live.wpm, 0);
        assert_eq!(live.accuracy, 100);
        assert_eq!(live.remaining_secs, 30);
        assert!(!live.blocked);
    }

    #[test]
    fn test_first_keystroke_starts_session() {
        let (mut session, scheduler, _rx) = session("hello", 30);

        assert_eq!(session.handle_key(key(KeyCode::Char('h')), 500), KeyOutcome::Typed);

        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.state().started_at_ms, Some(500));
        assert_eq!(scheduler.started(), vec![1]);
        assert_eq!(session.active_timer(), Some(1));
        assert!(session.log().entries()[0].is_correct());
    }

    #[test]
    fn test_incorrect_keystroke_consumes_slot() {
        let (mut session, _scheduler, _rx) = session("abc", 60);

        type_str(&mut session, "ax", 0, 100);
        assert_eq!(session.log().len(), 2);
        assert!(!session.log().entries()[1].is_correct());

        // the next keystroke is compared with 'c', not 'b'
        session.handle_key(key(KeyCode::Char('b')), 300);
        assert!(!session.log().entries()[2].is_correct());
    }

    #[test]
    fn test_enter_types_newline() {
        let (mut session, _scheduler, _rx) = session("a\nb", 60);
        type_str(&mut session, "a\n", 0, 100);
        assert!(session.log().entries()[1].is_correct());
        assert_eq!(session.log().entries()[1].character, '\n');
    }

    #[test]
    fn test_backspace_and_delete_word_ignored_while_idle() {
        let (mut session, _scheduler, _rx) = session("abc", 60);
        assert_eq!(session.handle_key(key(KeyCode::Backspace), 0), KeyOutcome::Ignored);
        assert_eq!(
            session.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::CONTROL), 0),
            KeyOutcome::Ignored
        );
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_backspace_removes_last_entry() {
        let (mut session, _scheduler, _rx) = session("abcdef", 60);
        type_str(&mut session, "abx", 0, 100);

        assert_eq!(session.handle_key(key(KeyCode::Backspace), 400), KeyOutcome::Deleted);
        assert_eq!(session.log().len(), 2);
        assert_eq!(session.snapshot().errors, 0);
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn test_backspace_on_empty_active_log() {
        let (mut session, _scheduler, _rx) = session("abc", 60);
        type_str(&mut session, "a", 0, 100);
        session.handle_key(key(KeyCode::Backspace), 100);
        assert_eq!(session.handle_key(key(KeyCode::Backspace), 200), KeyOutcome::Deleted);
        assert!(session.log().is_empty());
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn test_delete_word() {
        let (mut session, _scheduler, _rx) = session("let value = 1;", 60);
        type_str(&mut session, "let valxe", 0, 100);

        let outcome = session.handle_key(
            KeyEvent::new(KeyCode::Backspace, KeyModifiers::CONTROL),
            1_000,
        );
        assert_eq!(outcome, KeyOutcome::Deleted);
        let kept: String = session.log().entries().iter().map(|e| e.character).collect();
        assert_eq!(kept, "let ");
    }

    #[test]
    fn test_error_cap_blocks_on_eighth_error() {
        let (mut session, _scheduler, _rx) = session("abcdefghijklmnop", 60);

        for i in 0..7 {
            session.handle_key(key(KeyCode::Char('z')), i * 100);
            assert!(!session.is_blocked(), "blocked too early at {i}");
        }
        session.handle_key(key(KeyCode::Char('z')), 800);
        assert!(session.is_blocked());
        assert!(session.snapshot().blocked);

        assert_eq!(session.handle_key(key(KeyCode::Char('i')), 900), KeyOutcome::Blocked);
        assert_eq!(session.log().len(), 8);

        session.handle_key(key(KeyCode::Backspace), 1_000);
        assert!(!session.is_blocked());
        assert_eq!(session.log().trailing_incorrect(), 7);
        assert_eq!(session.handle_key(key(KeyCode::Char('h')), 1_100), KeyOutcome::Typed);
    }

    #[test]
    fn test_delete_word_always_unblocks() {
        let (mut session, _scheduler, _rx) = session("abcdefghijklmnop", 60);
        type_str(&mut session, "zzzzzzzzz", 0, 10);
        assert!(session.is_blocked());
        // the blocked keystroke never made it into the log
        assert_eq!(session.log().len(), 8);

        session.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL), 500);
        assert!(!session.is_blocked());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_control_chords_and_navigation_ignored() {
        let (mut session, _scheduler, _rx) = session("abc", 60);
        type_str(&mut session, "a", 0, 100);

        for event in [
            KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL),
            KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT),
            key(KeyCode::Left),
            key(KeyCode::F(1)),
            key(KeyCode::Home),
        ] {
            assert_eq!(session.handle_key(event, 200), KeyOutcome::Ignored);
        }
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_completion_finalizes_once() {
        let (mut session, scheduler, rx) = session("hi", 60);

        assert_eq!(type_str(&mut session, "hi", 0, 6_000), KeyOutcome::Completed);

        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(session.active_timer(), None);
        assert!(scheduler.is_cancelled(1));

        let payload = rx.try_recv().unwrap();
        assert_eq!(payload.snippet_id, "test-1");
        assert_eq!(payload.wpm, 4);
        assert_eq!(payload.accuracy, 100);
        assert_eq!(payload.elapsed_ms, 6_000);
        assert!(rx.try_recv().is_err());
        assert_eq!(session.result(), Some(&payload));
    }

    #[test]
    fn test_tick_queued_before_completion_is_stale() {
        let (mut session, _scheduler, rx) = session("ab", 30);

        session.handle_key(key(KeyCode::Char('a')), 0);
        let timer = session.active_timer().unwrap();
        assert_eq!(session.handle_key(key(KeyCode::Char('b')), 1_000), KeyOutcome::Completed);

        assert_eq!(session.on_tick(timer, 1_000), TickOutcome::Stale);
        assert_eq!(session.snapshot().remaining_secs, 30);
        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_result_phase_ignores_everything_but_skip() {
        let (mut session, _scheduler, rx) = session("a", 60);
        type_str(&mut session, "a", 0, 100);
        assert_eq!(session.phase(), Phase::Result);

        assert_eq!(session.handle_key(key(KeyCode::Char('a')), 200), KeyOutcome::Ignored);
        assert_eq!(session.handle_key(key(KeyCode::Backspace), 200), KeyOutcome::Ignored);
        assert_eq!(session.handle_key(key(KeyCode::Esc), 200), KeyOutcome::Ignored);
        assert_eq!(session.handle_key(key(KeyCode::Tab), 200), KeyOutcome::SkipRequested);
        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_typing_past_end_is_rejected() {
        let (mut session, _scheduler, _rx) = session("", 60);
        assert_eq!(session.handle_key(key(KeyCode::Char('a')), 0), KeyOutcome::Full);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_restart_resets_and_cancels_timer() {
        let (mut session, scheduler, _rx) = session("hello", 30);
        type_str(&mut session, "hex", 0, 100);
        session.on_tick(1, 1_000);

        assert_eq!(session.handle_key(key(KeyCode::Esc), 1_200), KeyOutcome::Restarted);

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.log().is_empty());
        assert!(session.state().wpm_samples.is_empty());
        assert_eq!(session.state().started_at_ms, None);
        assert_eq!(session.snapshot().remaining_secs, 30);
        assert_eq!(session.snapshot().errors, 0);
        assert!(scheduler.is_cancelled(1));
        assert_eq!(scheduler.live(), 0);
        assert_eq!(session.target().id(), "test-1");
    }

    #[test]
    fn test_load_replaces_target() {
        let (mut session, scheduler, _rx) = session("hello", 30);
        type_str(&mut session, "he", 0, 100);

        session.load(TargetText::new("other", Language::Java, "xyz"));

        assert_eq!(session.target().id(), "other");
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.log().is_empty());
        assert_eq!(scheduler.live(), 0);
    }

    #[test]
    fn test_skip_does_not_touch_state() {
        let (mut session, _scheduler, _rx) = session("hello", 30);
        type_str(&mut session, "he", 0, 100);
        assert_eq!(session.handle_key(key(KeyCode::Tab), 300), KeyOutcome::SkipRequested);
        assert_eq!(session.log().len(), 2);
    }

    #[test]
    fn test_tick_samples_and_counts_down() {
        let (mut session, _scheduler, _rx) = session("hello world", 3);
        type_str(&mut session, "hello", 0, 200);

        assert_eq!(session.on_tick(1, 1_000), TickOutcome::Sampled);
        assert_eq!(session.state().wpm_samples.len(), 1);
        assert_eq!(session.snapshot().remaining_secs, 2);
    }

    #[test]
    fn test_timeout_finalizes_with_partial_log() {
        let (mut session, _scheduler, rx) = session("hello world", 2);
        type_str(&mut session, "hellx", 0, 200);

        assert_eq!(session.on_tick(1, 1_000), TickOutcome::Sampled);
        assert_eq!(session.on_tick(1, 2_000), TickOutcome::TimedOut);

        assert_eq!(session.phase(), Phase::Result);
        let payload = rx.try_recv().unwrap();
        assert_eq!(payload.accuracy, 80);
        assert_eq!(payload.errors, 1);
        assert_eq!(payload.elapsed_ms, 2_000);
        assert_eq!(payload.duration_secs, 2);

        assert_eq!(session.handle_key(key(KeyCode::Char('o')), 2_100), KeyOutcome::Ignored);
        assert_eq!(session.log().len(), 5);
        assert_eq!(session.on_tick(1, 3_000), TickOutcome::Stale);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ticks_before_start_are_stale() {
        let (mut session, _scheduler, _rx) = session("hello", 1);
        assert_eq!(session.on_tick(1, 1_000), TickOutcome::Stale);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.snapshot().remaining_secs, 1);
    }

    #[test]
    fn test_stale_timer_cannot_touch_new_session() {
        let (mut session, scheduler, _rx) = session("hello", 30);
        type_str(&mut session, "he", 0, 100);
        session.restart();
        type_str(&mut session, "h", 5_000, 100);

        assert_eq!(scheduler.started(), vec![1, 2]);
        assert_eq!(session.on_tick(1, 6_000), TickOutcome::Stale);
        assert!(session.state().wpm_samples.is_empty());
        assert_eq!(session.on_tick(2, 6_000), TickOutcome::Sampled);
        assert_eq!(session.state().wpm_samples.len(), 1);
    }

    #[test]
    fn test_dropping_session_cancels_timer() {
        let (mut session, scheduler, _rx) = session("hello", 30);
        type_str(&mut session, "h", 0, 100);
        assert_eq!(scheduler.live(), 1);
        drop(session);
        assert_eq!(scheduler.live(), 0);
    }

    #[test]
    fn test_live_readout_after_keystrokes() {
        let (mut session, _scheduler, _rx) = session("hello world", 60);
        type_str(&mut session, "helxo", 0, 250);

        let live = session.snapshot();
        assert_eq!(live.accuracy, 80);
        assert_eq!(live.errors, 1);
        // 5 attempts over 1s of typing
        assert_eq!(live.raw_wpm, 60);
        // 4 correct over the 1s the log covers
        assert_eq!(live.wpm, 48);
    }

    #[test]
    fn test_caps_lock_tracked_from_events() {
        use crossterm::event::{KeyEventKind, KeyEventState};

        let (mut session, _scheduler, _rx) = session("Hello", 60);
        let caps = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('H'),
            KeyModifiers::NONE,
            KeyEventKind::Press,
            KeyEventState::CAPS_LOCK,
        );
        session.handle_key(caps, 0);
        assert!(session.snapshot().caps_lock_on);

        session.handle_key(key(KeyCode::Char('e')), 100);
        assert!(!session.snapshot().caps_lock_on);
    }

    #[test]
    fn test_failing_sink_keeps_result() {
        struct Broken;
        impl ResultSink for Broken {
            fn submit(&mut self, _payload: &ResultPayload) -> crate::error::Result<()> {
                Err(crate::error::Error::SinkClosed)
            }
        }

        let mut session = Session::new(
            SessionConfig::default(),
            TargetText::new("t", Language::Python, "ok"),
            Box::new(ManualScheduler::new()),
            Box::new(Broken),
        );
        type_str(&mut session, "ok", 0, 100);

        assert_eq!(session.phase(), Phase::Result);
        assert_matches!(session.result(), Some(payload) if payload.accuracy == 100);
        assert_eq!(session.handle_key(key(KeyCode::Char('o')), 500), KeyOutcome::Ignored);
    }
}
