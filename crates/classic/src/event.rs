//! Status-indicator events
//!
//! Coarse state signals for whatever renders feedback next to the reader
//! (an LED, a console line). The core emits discrete events; rendering is
//! someone else's job.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::sector::Sector;

/// Coarse scanner state for visual feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Idle, waiting for a card
    Waiting,
    /// Card accepted, sector walk running
    Scanning,
    /// Sector opened and read
    SectorSuccess(Sector),
    /// Sector refused every candidate
    SectorDenied(Sector),
    /// Reader chip failed at startup
    HardwareFault,
}

/// Trait for handling status events
pub trait StatusEventHandler {
    /// Handle a status event
    fn handle_event(&mut self, event: StatusEvent);
}

// Implement the handler for closures
impl<F> StatusEventHandler for F
where
    F: FnMut(StatusEvent),
{
    fn handle_event(&mut self, event: StatusEvent) {
        self(event)
    }
}

/// Sender for status events
pub type StatusEventSender = Sender<StatusEvent>;
/// Receiver for status events
pub type StatusEventReceiver = Receiver<StatusEvent>;

/// Create an unbounded channel for status events
pub fn status_channel() -> (StatusEventSender, StatusEventReceiver) {
    unbounded()
}

/// Handler that forwards every event into a channel
pub fn channel_handler(sender: StatusEventSender) -> impl StatusEventHandler {
    move |event| {
        let _ = sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_handlers() {
        let mut seen = Vec::new();
        {
            let mut handler = |event: StatusEvent| seen.push(event);
            handler.handle_event(StatusEvent::Waiting);
            handler.handle_event(StatusEvent::Scanning);
        }
        assert_eq!(seen, vec![StatusEvent::Waiting, StatusEvent::Scanning]);
    }

    #[test]
    fn channel_handler_forwards() {
        let (sender, receiver) = status_channel();
        let mut handler = channel_handler(sender);
        handler.handle_event(StatusEvent::SectorDenied(Sector::new(7)));
        assert_eq!(
            receiver.try_recv().unwrap(),
            StatusEvent::SectorDenied(Sector::new(7))
        );
    }
}
