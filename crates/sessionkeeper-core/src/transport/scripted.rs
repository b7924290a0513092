//! In-memory transport with scripted behaviour, for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sessionkeeper_types::TransportError;
use tokio::sync::broadcast;

use super::{Transport, TransportEvent, EVENT_CHANNEL_CAPACITY};

/// What `initialize` does on the next call.
#[derive(Debug, Clone)]
pub enum InitBehavior {
    /// Open a session, become ready and emit `Ready`
    BecomeReady,
    /// Open a session that stays unauthenticated
    StayPending,
    /// Wait, then behave like `BecomeReady`
    SlowReady(Duration),
    /// Return the error
    Fail(TransportError),
    /// Never complete
    Hang,
}

pub struct ScriptedTransport {
    events: broadcast::Sender<TransportEvent>,
    ready: AtomicBool,
    session: AtomicBool,
    init_calls: AtomicU32,
    destroy_calls: AtomicU32,
    fail_destroy: AtomicBool,
    behavior: Mutex<InitBehavior>,
    pid: Mutex<Option<u32>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new(InitBehavior::BecomeReady)
    }
}

impl ScriptedTransport {
    pub fn new(behavior: InitBehavior) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            ready: AtomicBool::new(false),
            session: AtomicBool::new(false),
            init_calls: AtomicU32::new(0),
            destroy_calls: AtomicU32::new(0),
            fail_destroy: AtomicBool::new(false),
            behavior: Mutex::new(behavior),
            pid: Mutex::new(None),
        }
    }

    /// Transport that already holds a ready session.
    pub fn ready() -> Self {
        let transport = Self::default();
        transport.set_ready(true);
        transport
    }

    pub fn set_behavior(&self, behavior: InitBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
        if ready {
            self.session.store(true, Ordering::SeqCst);
        }
    }

    pub fn set_session(&self, open: bool) {
        self.session.store(open, Ordering::SeqCst);
        if !open {
            self.ready.store(false, Ordering::SeqCst);
        }
    }

    pub fn set_pid(&self, pid: Option<u32>) {
        *self.pid.lock() = pid;
    }

    pub fn fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> u32 {
        self.destroy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<(), TransportError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();
        match behavior {
            InitBehavior::BecomeReady => {
                self.set_ready(true);
                self.emit(TransportEvent::Ready);
                Ok(())
            },
            InitBehavior::SlowReady(delay) => {
                tokio::time::sleep(delay).await;
                self.set_ready(true);
                self.emit(TransportEvent::Ready);
                Ok(())
            },
            InitBehavior::StayPending => {
                self.session.store(true, Ordering::SeqCst);
                Ok(())
            },
            InitBehavior::Fail(err) => Err(err),
            InitBehavior::Hang => std::future::pending().await,
        }
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.set_session(false);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(TransportError::transient("Protocol error: Target closed"));
        }
        Ok(())
    }

    fn browser_pid(&self) -> Option<u32> {
        *self.pid.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}
