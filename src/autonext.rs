use crate::error::Result;
use log::{debug, warn};
use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Reaction to an advance event
pub trait AdvanceListener: Send + Sync {
    fn on_advance(&self, handle: &AutonextHandle) -> Result<()>;
}

struct Inner {
    armed: AtomicBool,
    disarms: AtomicUsize,
    delivered: AtomicUsize,
    delivery: Mutex<()>,
    listener: Arc<dyn AdvanceListener>,
}

#[derive(Clone)]
pub struct AutonextHandle {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for AutonextHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AutonextHandle")
            .field("armed", &self.is_armed())
            .field("disarms", &self.disarm_count())
            .field("delivered", &self.delivered())
            .finish()
    }
}

impl AutonextHandle {
    /// A new, armed handle
    pub fn new(listener: Arc<dyn AdvanceListener>) -> Self {
        AutonextHandle {
            inner: Arc::new(Inner {
                armed: AtomicBool::new(true),
                disarms: AtomicUsize::new(0),
                delivered: AtomicUsize::new(0),
                delivery: Mutex::new(()),
                listener,
            }),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    /// Deliver one event to the listener. Returns `false`, without calling
    /// it, once the handle is disarmed.
    pub fn fire(&self) -> Result<bool> {
        let _delivery = self.inner.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_armed() {
            debug!("autonext event after disarm ignored");
            return Ok(false);
        }
        self.inner.delivered.fetch_add(1, Ordering::SeqCst);
        self.inner.listener.on_advance(self)?;
        Ok(true)
    }

    /// Stop delivering events. Returns whether this call did the disarming;
    /// only those calls are counted.
    pub fn disarm(&self) -> bool {
        let was_armed = self.inner.armed.swap(false, Ordering::SeqCst);
        if was_armed {
            self.inner.disarms.fetch_add(1, Ordering::SeqCst);
        }
        was_armed
    }

    /// Wait for an in-flight delivery to finish. Must not be called from the
    /// listener.
    pub fn quiesce(&self) {
        drop(self.inner.delivery.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn disarm_count(&self) -> usize {
        self.inner.disarms.load(Ordering::SeqCst)
    }

    /// Events handed to the listener so far
    pub fn delivered(&self) -> usize {
        self.inner.delivered.load(Ordering::SeqCst)
    }

    /// Fire every `interval` from a background thread until disarmed or the
    /// listener fails
    pub fn spawn_ticker(&self, interval: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        thread::spawn(move || {
            while handle.is_armed() {
                thread::sleep(interval);
                match handle.fire() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        warn!("autonext listener failed: {}", e);
                        break;
                    }
                }
            }
        })
    }
}
