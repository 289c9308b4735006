use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use libris_core::{MessageId, OutboundMessage};
use tokio::sync::Notify;
use tracing::debug;

/// Unbounded FIFO of outbound messages.
///
/// Any number of producers may push; the single [`MailWorker`](crate::MailWorker)
/// pops. Enqueue never blocks and never fails. There is no persistence:
/// whatever is still queued when the process exits is gone.
#[derive(Default)]
pub struct MailQueue {
    items: Mutex<VecDeque<OutboundMessage>>,
    notify: Notify,
}

impl MailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a message; returns the queue length after the push.
    pub fn enqueue(&self, message: OutboundMessage) -> usize {
        let len = {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            items.push_back(message);
            items.len()
        };
        self.notify.notify_one();
        debug!(queued = len, "email queued");
        len
    }

    /// Convenience for producers that only have the three fields.
    pub fn enqueue_email(
        &self,
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> MessageId {
        let message = OutboundMessage::new(to, subject, html_body);
        let id = message.id.clone();
        self.enqueue(message);
        id
    }

    pub fn try_dequeue(&self) -> Option<OutboundMessage> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Pop the oldest message, waiting up to `wait` for one to arrive.
    pub async fn dequeue_timeout(&self, wait: Duration) -> Option<OutboundMessage> {
        if let Some(message) = self.try_dequeue() {
            return Some(message);
        }
        // A push between the check above and the wait below leaves a stored
        // permit in `notify`, so the wait returns at once.
        match tokio::time::timeout(wait, self.notify.notified()).await {
            Ok(()) => self.try_dequeue(),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn enqueue_without_consumer_accumulates() {
        let queue = MailQueue::new();
        for i in 0..25 {
            assert_eq!(
                queue.enqueue(OutboundMessage::new(format!("s{i}@aoa.school"), "s", "b")),
                i + 1
            );
        }
        assert_eq!(queue.len(), 25);
    }

    #[test]
    fn dequeues_in_fifo_order() {
        let queue = MailQueue::new();
        let first = queue.enqueue_email("a@aoa.school", "first", "b");
        let second = queue.enqueue_email("b@aoa.school", "second", "b");

        assert_eq!(queue.try_dequeue().unwrap().id, first);
        assert_eq!(queue.try_dequeue().unwrap().id, second);
        assert!(queue.try_dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_times_out_when_empty() {
        let queue = MailQueue::new();
        let start = std::time::Instant::now();
        assert!(queue.dequeue_timeout(Duration::from_millis(50)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn dequeue_wakes_on_push() {
        let queue = Arc::new(MailQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue_timeout(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue_email("a@aoa.school", "wake", "b");

        let message = consumer.await.unwrap().expect("message delivered");
        assert_eq!(message.subject, "wake");
    }
}
