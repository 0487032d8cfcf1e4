//! Many-producer / single-consumer event channel.

use std::sync::mpsc;
use std::time::Duration;

use super::ProgressEvent;

/// Creates a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer side. Cheap to clone; one clone per chunk/stream task.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    /// Sends an event. A vanished consumer is not an error for the producer:
    /// transfers keep going and the result is reported through the exit status.
    pub fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("progress consumer gone; event dropped");
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(ProgressEvent::status(message));
    }
}

/// Consumer side, owned by exactly one monitor.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ProgressEvent, mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Drains whatever is queued without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        self.rx.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_producer_order_is_preserved() {
        let (tx, rx) = progress_channel();
        let tx2 = tx.clone();
        let a = std::thread::spawn(move || {
            for i in 0..50 {
                tx.status(format!("a{i}"));
            }
        });
        let b = std::thread::spawn(move || {
            for i in 0..50 {
                tx2.status(format!("b{i}"));
            }
        });
        a.join().unwrap();
        b.join().unwrap();

        let mut next_a = 0;
        let mut next_b = 0;
        for ev in rx.try_iter() {
            let ProgressEvent::Status { message } = ev else { panic!("unexpected event") };
            if let Some(n) = message.strip_prefix('a') {
                assert_eq!(n.parse::<i32>().unwrap(), next_a);
                next_a += 1;
            } else if let Some(n) = message.strip_prefix('b') {
                assert_eq!(n.parse::<i32>().unwrap(), next_b);
                next_b += 1;
            }
        }
        assert_eq!((next_a, next_b), (50, 50));
    }

    #[test]
    fn recv_timeout_reports_disconnect() {
        let (tx, rx) = progress_channel();
        drop(tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }
}
