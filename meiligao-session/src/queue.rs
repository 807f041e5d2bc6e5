//! Pending-command bookkeeping for one session

use std::collections::VecDeque;

use tokio::sync::oneshot;

use meiligao_codec::Message;
use meiligao_core::{MeiligaoError, MeiligaoResult};

/// One queued command with its correlation data.
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub message: Message,
    /// Command code the device's answer will carry.
    pub expected_response: u16,
    pub complete: oneshot::Sender<MeiligaoResult<Message>>,
}

/// Ordered pending commands plus the single in-flight slot.
///
/// The head entry becomes in-flight only through [`CommandQueue::promote`],
/// so a response can never match a command that has not been sent yet.
#[derive(Debug, Default)]
pub(crate) struct CommandQueue {
    entries: VecDeque<QueueEntry>,
    in_flight: bool,
}

impl CommandQueue {
    pub fn new() -> Self {
        CommandQueue {
            entries: VecDeque::new(),
            in_flight: false,
        }
    }

    /// Appends a command behind everything already waiting.
    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Marks the head entry in-flight and hands it out for dispatch.
    ///
    /// Returns `None` while a command is already awaiting its response or
    /// nothing is queued.
    pub fn promote(&mut self) -> Option<&QueueEntry> {
        if self.in_flight {
            return None;
        }
        let entry = self.entries.front()?;
        self.in_flight = true;
        Some(entry)
    }

    /// Response code the in-flight command waits for, without promoting
    /// anything.
    pub fn expected(&self) -> Option<u16> {
        if !self.in_flight {
            return None;
        }
        self.entries.front().map(|entry| entry.expected_response)
    }

    /// Completes the in-flight command with its response.
    pub fn resolve(&mut self, response: Message) -> bool {
        if !self.in_flight {
            return false;
        }
        let Some(entry) = self.entries.pop_front() else {
            return false;
        };
        self.in_flight = false;
        let _ = entry.complete.send(Ok(response));
        true
    }

    /// Queued commands, the in-flight one included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Fails every queued command, in-flight included.
    pub fn fail_all(&mut self, error: impl Fn() -> MeiligaoError) {
        self.in_flight = false;
        for entry in self.entries.drain(..) {
            let _ = entry.complete.send(Err(error()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meiligao_core::{Command, resolve_response};

    fn entry(command: Command) -> (QueueEntry, oneshot::Receiver<MeiligaoResult<Message>>) {
        let (tx, rx) = oneshot::channel();
        let message = Message::request(command);
        (
            QueueEntry {
                expected_response: resolve_response(message.command),
                message,
                complete: tx,
            },
            rx,
        )
    }

    #[test]
    fn test_promote_holds_the_head_until_resolved() {
        let mut queue = CommandQueue::new();
        let (a, mut a_rx) = entry(Command::RequestReport);
        let (b, _b_rx) = entry(Command::ClearMileage);
        queue.push(a);
        queue.push(b);

        let head = queue.promote().unwrap();
        assert_eq!(head.message.command, Command::RequestReport.code());
        assert!(queue.promote().is_none());
        assert_eq!(queue.expected(), Some(Command::Report.code()));
        assert_eq!(queue.len(), 2);

        let response = Message::request(Command::Report);
        assert!(queue.resolve(response.clone()));
        assert_eq!(a_rx.try_recv().unwrap().unwrap(), response);

        assert_eq!(queue.expected(), None);
        let next = queue.promote().unwrap();
        assert_eq!(next.message.command, Command::ClearMileage.code());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_expected_does_not_promote() {
        let mut queue = CommandQueue::new();
        let (a, _a_rx) = entry(Command::GetSnImei);
        queue.push(a);

        assert_eq!(queue.expected(), None);
        assert!(!queue.resolve(Message::request(Command::GetSnImei)));
        assert!(queue.promote().is_some());
        assert_eq!(queue.expected(), Some(Command::GetSnImei.code()));
    }

    #[test]
    fn test_fail_all_completes_every_entry() {
        let mut queue = CommandQueue::new();
        let (a, mut a_rx) = entry(Command::RebootGps);
        let (b, mut b_rx) = entry(Command::ClearMileage);
        queue.push(a);
        queue.push(b);
        queue.promote();

        queue.fail_all(|| MeiligaoError::ConnectionClosed);
        assert_eq!(queue.len(), 0);
        assert!(matches!(
            a_rx.try_recv().unwrap(),
            Err(MeiligaoError::ConnectionClosed)
        ));
        assert!(matches!(
            b_rx.try_recv().unwrap(),
            Err(MeiligaoError::ConnectionClosed)
        ));
    }
}
