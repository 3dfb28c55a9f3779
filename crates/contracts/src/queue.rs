//! Per-sensor reading queue
//!
//! Unbounded FIFO with exactly one producer (the sampling worker) and one
//! consumer (the feed controller). Neither half is `Clone`.

use async_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::Reading;

/// Create a connected queue pair
pub fn reading_queue() -> (ReadingSender, ReadingReceiver) {
    let (tx, rx) = unbounded();
    (ReadingSender { tx }, ReadingReceiver { rx })
}

/// Producing half, handed to a sensor on `start`
#[derive(Debug)]
pub struct ReadingSender {
    tx: Sender<Reading>,
}

impl ReadingSender {
    /// Append a reading
    ///
    /// Returns `false` when the consumer has gone away.
    pub fn push(&self, reading: Reading) -> bool {
        self.tx.try_send(reading).is_ok()
    }

    /// Whether the consuming half has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half, kept by the feed controller
#[derive(Debug)]
pub struct ReadingReceiver {
    rx: Receiver<Reading>,
}

impl ReadingReceiver {
    /// Take the next reading if one is available, never waiting
    pub fn try_pop(&self) -> Option<Reading> {
        match self.rx.try_recv() {
            Ok(reading) => Some(reading),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Drain everything currently queued, in FIFO order
    pub fn drain(&self) -> impl Iterator<Item = Reading> + '_ {
        std::iter::from_fn(move || self.try_pop())
    }

    /// Number of readings waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no readings are waiting
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = reading_queue();
        let now = Utc::now();
        for i in 0..3 {
            assert!(tx.push(Reading::new(now, i as f64)));
        }

        let values: Vec<f64> = rx.drain().map(|r| r.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (tx, rx) = reading_queue();
        drop(rx);
        assert!(tx.is_closed());
        assert!(!tx.push(Reading::new(Utc::now(), 1.0)));
    }

    #[test]
    fn test_drain_empty_does_not_block() {
        let (_tx, rx) = reading_queue();
        assert_eq!(rx.drain().count(), 0);
    }
}
