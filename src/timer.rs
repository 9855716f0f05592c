//! The per-second sample timer.
//!
//! A session owns at most one [`TimerHandle`]. Dropping or cancelling the handle
//! stops the underlying schedule, and every tick carries the [`TimerId`] it was
//! started with so a tick from a replaced timer can be recognised and dropped.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::runtime::SessionEvent;

/// Period between consistency samples and countdown steps.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

pub type TimerId = u64;

/// Shared flag observed by whatever is producing ticks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Exclusive owner of a running timer. Cancels on drop.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    token: CancelToken,
}

impl TimerHandle {
    pub fn new(id: TimerId) -> Self {
        Self {
            id,
            token: CancelToken::default(),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Starts recurring ticks for a session.
pub trait Scheduler {
    fn start(&mut self, id: TimerId, period: Duration) -> TimerHandle;
}

/// Production scheduler: one sleeping thread per timer, pushing
/// [`SessionEvent::Tick`] into the host's event channel.
#[derive(Clone, Debug)]
pub struct ThreadScheduler {
    tx: Sender<SessionEvent>,
}

impl ThreadScheduler {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl Scheduler for ThreadScheduler {
    fn start(&mut self, id: TimerId, period: Duration) -> TimerHandle {
        let handle = TimerHandle::new(id);
        let token = handle.token();
        let tx = self.tx.clone();

        thread::spawn(move || loop {
            thread::sleep(period);
            if token.is_cancelled() || tx.send(SessionEvent::Tick(id)).is_err() {
                break;
            }
        });

        handle
    }
}

/// Scheduler that never fires on its own; tests deliver ticks by hand and
/// inspect which timers were started and cancelled.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    started: Rc<RefCell<Vec<(TimerId, CancelToken)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every timer started so far, oldest first.
    pub fn started(&self) -> Vec<TimerId> {
        self.started.borrow().iter().map(|(id, _)| *id).collect()
    }

    pub fn is_cancelled(&self, id: TimerId) -> bool {
        self.started
            .borrow()
            .iter()
            .find(|(started, _)| *started == id)
            .map_or(false, |(_, token)| token.is_cancelled())
    }

    /// Number of timers that are still running.
    pub fn live(&self) -> usize {
        self.started
            .borrow()
            .iter()
            .filter(|(_, token)| !token.is_cancelled())
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, id: TimerId, _period: Duration) -> TimerHandle {
        let handle = TimerHandle::new(id);
        self.started.borrow_mut().push((id, handle.token()));
        handle
    }
}
