//! Bridges the controller's synchronous `respond` to listener tasks
//! awaiting their response.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use resgw_core::{CorrelationId, PublicResponder};

/// Slot table pairing each public request with its eventual response.
///
/// `respond` may run before the listener task starts waiting (the form
/// and rejection paths answer from inside request registration), so early
/// responses are parked until collected.
#[derive(Debug, Default)]
pub struct ResponseMailbox {
    slots: Mutex<HashMap<CorrelationId, Slot>>,
}

#[derive(Debug)]
enum Slot {
    Waiting(oneshot::Sender<String>),
    Parked(String),
}

impl ResponseMailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the response for `correlation_id`. Returns `None` only if the
    /// waiting slot was dropped without an answer.
    pub async fn wait(&self, correlation_id: CorrelationId) -> Option<String> {
        let receiver = {
            let mut slots = self.slots.lock();
            match slots.remove(&correlation_id) {
                Some(Slot::Parked(response)) => return Some(response),
                Some(Slot::Waiting(_)) | None => {
                    let (sender, receiver) = oneshot::channel();
                    slots.insert(correlation_id, Slot::Waiting(sender));
                    receiver
                }
            }
        };
        receiver.await.ok()
    }
}

impl PublicResponder for ResponseMailbox {
    fn respond(&self, correlation_id: CorrelationId, response: String) {
        let mut slots = self.slots.lock();
        match slots.remove(&correlation_id) {
            Some(Slot::Waiting(sender)) => {
                // waiter may have given up; nothing left to deliver to then
                let _ = sender.send(response);
            }
            Some(Slot::Parked(previous)) => {
                warn!(correlation_id, "duplicate response discarded");
                slots.insert(correlation_id, Slot::Parked(previous));
            }
            None => {
                slots.insert(correlation_id, Slot::Parked(response));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn response_delivered_to_waiter() {
        let mailbox = Arc::new(ResponseMailbox::new());
        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move { mailbox.wait(42).await })
        };
        tokio::task::yield_now().await;
        mailbox.respond(42, "hello".to_string());
        assert_eq!(waiter.await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn early_response_is_parked() {
        let mailbox = ResponseMailbox::new();
        mailbox.respond(7, "early".to_string());
        assert_eq!(mailbox.wait(7).await, Some("early".to_string()));
    }

    #[tokio::test]
    async fn first_response_wins() {
        let mailbox = ResponseMailbox::new();
        mailbox.respond(7, "first".to_string());
        mailbox.respond(7, "second".to_string());
        assert_eq!(mailbox.wait(7).await, Some("first".to_string()));
    }
}
