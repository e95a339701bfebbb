//! Single-slot hand-off for the most recent human message.

use std::sync::Mutex;

/// Last-writer-wins mailbox. The ingress task posts, the scheduler takes,
/// and a message is consumed at most once. Only the newest pending message
/// matters; older ones are overwritten, never queued.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<String>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is pending.
    pub fn post(&self, text: String) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(text);
    }

    /// Take the pending message, leaving the slot empty.
    pub fn take(&self) -> Option<String> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_exactly_once() {
        let mailbox = Mailbox::new();
        mailbox.post("hello".to_string());
        assert_eq!(mailbox.take().as_deref(), Some("hello"));
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn newest_post_wins() {
        let mailbox = Mailbox::new();
        mailbox.post("first".to_string());
        mailbox.post("second".to_string());
        assert_eq!(mailbox.take().as_deref(), Some("second"));
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn empty_mailbox_yields_none() {
        assert!(Mailbox::new().take().is_none());
    }
}
