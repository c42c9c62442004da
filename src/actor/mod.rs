//! Message plumbing between the overlays and the rest of the window manager.
//!
//! Every message carries the span that was current when it was sent, so work
//! done on the receiving side is attributed to the code that asked for it.

pub mod overlay_manager;

use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::Span;

#[derive(Debug)]
pub struct Sender<Event>(UnboundedSender<(Span, Event)>);

pub type Receiver<Event> = UnboundedReceiver<(Span, Event)>;

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Event> Sender<Event> {
    /// Sends `event`, dropping it if the receiver has gone away.
    pub fn send(&self, event: Event) { _ = self.try_send(event); }

    pub fn try_send(&self, event: Event) -> Result<(), SendError<(Span, Event)>> {
        self.0.send((Span::current(), event))
    }
}

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), rx)
}
