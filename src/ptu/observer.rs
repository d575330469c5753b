// Diagnostics hooks
//
// Observers see every frame the driver writes or accepts, and every run of
// bytes it throws away while resynchronising. They run inline on the
// driver's thread, so they should return quickly.

use std::sync::{Arc, Mutex};

/// Callbacks for raw traffic on a driver connection
pub trait FrameObserver: Send {
    /// A marshalled frame was written to the transport
    fn on_frame_sent(&self, frame: &[u8]) {
        let _ = frame;
    }

    /// A complete, checksum-valid frame was taken from the receive buffer
    fn on_frame_received(&self, frame: &[u8]) {
        let _ = frame;
    }

    /// Bytes that could not start a frame and were dropped
    fn on_bytes_discarded(&self, bytes: &[u8]) {
        let _ = bytes;
    }
}

/// Direction of a recorded traffic event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traffic {
    Sent,
    Received,
    Discarded,
}

/// Observer that keeps a copy of all traffic, useful for post-mortems and tests
#[derive(Debug, Clone, Default)]
pub struct TrafficRecorder {
    events: Arc<Mutex<Vec<(Traffic, Vec<u8>)>>>,
}

impl TrafficRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<(Traffic, Vec<u8>)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, kind: Traffic, bytes: &[u8]) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push((kind, bytes.to_vec()));
    }
}

impl FrameObserver for TrafficRecorder {
    fn on_frame_sent(&self, frame: &[u8]) {
        self.push(Traffic::Sent, frame);
    }

    fn on_frame_received(&self, frame: &[u8]) {
        self.push(Traffic::Received, frame);
    }

    fn on_bytes_discarded(&self, bytes: &[u8]) {
        self.push(Traffic::Discarded, bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_shares_events_between_clones() {
        let recorder = TrafficRecorder::new();
        let observer: Box<dyn FrameObserver> = Box::new(recorder.clone());
        observer.on_frame_sent(b"<a>");
        observer.on_bytes_discarded(&[0x00]);
        assert_eq!(
            recorder.events(),
            vec![
                (Traffic::Sent, b"<a>".to_vec()),
                (Traffic::Discarded, vec![0x00]),
            ]
        );
    }
}
