//! Recording sink with scriptable failures

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SinkError;
use crate::frame::{PackedFrame, PixelFormat};
use crate::sink::FrameSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Negotiate(PixelFormat, u32, u32),
    Activate,
    Push(Vec<u8>),
    EndOfStream,
    Deactivate,
    /// Recorded by fakes elsewhere that share the same log
    External(String),
}

pub type EventLog = Arc<Mutex<Vec<SinkEvent>>>;

#[derive(Default)]
pub struct RecordingSink {
    log: EventLog,
    failing_activations: AtomicUsize,
    failing_negotiations: AtomicUsize,
    reject_pushes: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Fail the next `count` activations
    pub fn fail_activations(&self, count: usize) {
        self.failing_activations.store(count, Ordering::SeqCst);
    }

    pub fn fail_negotiations(&self, count: usize) {
        self.failing_negotiations.store(count, Ordering::SeqCst);
    }

    pub fn reject_pushes(&self, reject: bool) {
        self.reject_pushes.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }

    pub fn pushed(&self) -> Vec<Vec<u8>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Push(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SinkEvent) {
        self.log.lock().unwrap().push(event);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl FrameSink for RecordingSink {
    fn negotiate(&self, format: PixelFormat, width: u32, height: u32) -> Result<(), SinkError> {
        self.record(SinkEvent::Negotiate(format, width, height));
        if Self::take_failure(&self.failing_negotiations) {
            return Err(SinkError::Negotiation("scripted failure".into()));
        }
        Ok(())
    }

    fn activate(&self) -> Result<(), SinkError> {
        self.record(SinkEvent::Activate);
        if Self::take_failure(&self.failing_activations) {
            return Err(SinkError::Activation("scripted failure".into()));
        }
        Ok(())
    }

    fn push(&self, frame: PackedFrame) -> Result<(), SinkError> {
        if self.reject_pushes.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("flushing".into()));
        }
        self.record(SinkEvent::Push(frame.as_slice().to_vec()));
        Ok(())
    }

    fn end_of_stream(&self) -> Result<(), SinkError> {
        self.record(SinkEvent::EndOfStream);
        Ok(())
    }

    fn deactivate(&self) -> Result<(), SinkError> {
        self.record(SinkEvent::Deactivate);
        Ok(())
    }
}
