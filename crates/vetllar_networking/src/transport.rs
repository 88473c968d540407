//! # Transport Layer
//!
//! In-process loopback datagram transport.
//!
//! Each endpoint owns a bounded outgoing queue. A full queue drops the
//! datagram, like a saturated socket buffer would, and counts it as a send
//! error. Statistics live behind a lock so a monitoring thread can read them
//! while the owner keeps sending.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Datagrams sent.
    pub packets_sent: u64,
    /// Datagrams received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Datagrams dropped on send.
    pub send_errors: u64,
}

/// One end of a loopback link.
pub struct LoopbackEndpoint {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    stats: Arc<Mutex<TransportStats>>,
    closed: bool,
}

/// Creates two connected endpoints, each able to queue `capacity` datagrams.
#[must_use]
pub fn loopback_pair(capacity: usize) -> (LoopbackEndpoint, LoopbackEndpoint) {
    let (a_tx, b_rx) = bounded(capacity);
    let (b_tx, a_rx) = bounded(capacity);
    (
        LoopbackEndpoint::new(a_tx, a_rx),
        LoopbackEndpoint::new(b_tx, b_rx),
    )
}

impl LoopbackEndpoint {
    fn new(outgoing: Sender<Vec<u8>>, incoming: Receiver<Vec<u8>>) -> Self {
        Self {
            outgoing,
            incoming,
            stats: Arc::new(Mutex::new(TransportStats::default())),
            closed: false,
        }
    }

    /// Sends one datagram. Returns false if it was dropped.
    pub fn send(&self, data: &[u8]) -> bool {
        match self.outgoing.try_send(data.to_vec()) {
            Ok(()) => {
                let mut stats = self.stats.lock();
                stats.packets_sent += 1;
                stats.bytes_sent += data.len() as u64;
                true
            }
            Err(TrySendError::Full(_)) => {
                self.stats.lock().send_errors += 1;
                tracing::warn!(len = data.len(), "loopback queue full, datagram dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.lock().send_errors += 1;
                false
            }
        }
    }

    /// Receives one datagram if any is queued.
    pub fn recv(&mut self) -> Option<Vec<u8>> {
        match self.incoming.try_recv() {
            Ok(data) => {
                let mut stats = self.stats.lock();
                stats.packets_received += 1;
                stats.bytes_received += data.len() as u64;
                Some(data)
            }
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    /// True once the remote end has been dropped and everything it sent
    /// has been received.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Snapshot of the statistics.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        *self.stats.lock()
    }

    /// Shared handle to the live statistics.
    #[must_use]
    pub fn stats_handle(&self) -> Arc<Mutex<TransportStats>> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagrams_cross_in_order() {
        let (a, mut b) = loopback_pair(8);
        assert!(a.send(&[1, 2, 3]));
        assert!(a.send(&[4]));

        assert_eq!(b.recv(), Some(vec![1, 2, 3]));
        assert_eq!(b.recv(), Some(vec![4]));
        assert_eq!(b.recv(), None);

        assert_eq!(a.stats().packets_sent, 2);
        assert_eq!(a.stats().bytes_sent, 4);
        assert_eq!(b.stats().packets_received, 2);
    }

    #[test]
    fn test_full_queue_drops() {
        let (a, _b) = loopback_pair(1);
        assert!(a.send(&[1]));
        assert!(!a.send(&[2]));
        assert_eq!(a.stats().send_errors, 1);
    }

    #[test]
    fn test_dropped_peer_closes_after_drain() {
        let (a, mut b) = loopback_pair(4);
        assert!(a.send(&[9]));
        drop(a);

        assert_eq!(b.recv(), Some(vec![9]));
        assert!(!b.is_closed());
        assert_eq!(b.recv(), None);
        assert!(b.is_closed());
        assert!(!b.send(&[1]));
    }

    #[test]
    fn test_stats_handle_is_live() {
        let (a, _b) = loopback_pair(4);
        let handle = a.stats_handle();
        a.send(&[0; 10]);
        assert_eq!(handle.lock().bytes_sent, 10);
    }
}
