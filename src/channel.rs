use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::warn;

use crate::message::Message;

/// Ordered hand-off from the worker thread to the invoking thread.
///
/// Pushes never block. [`drain`](Self::drain) blocks while the channel is empty
/// and open, and ends once the channel has been closed and emptied.
pub struct OutputChannel {
    sender: Mutex<Option<Sender<Message>>>,
    receiver: Receiver<Message>,
}

impl OutputChannel {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    pub fn push(&self, message: Message) {
        match self.sender.lock().as_ref() {
            // The receiver lives as long as `self`, so sending cannot fail.
            Some(sender) => {
                let _ = sender.send(message);
            }
            None => {
                debug_assert!(false, "message pushed after the output channel was closed");
                warn!("dropping message pushed after close: {:?}", message);
            }
        }
    }

    /// Marks the channel complete. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn drain(&self) -> impl Iterator<Item = Message> + '_ {
        self.receiver.iter()
    }
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}
