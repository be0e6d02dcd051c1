//! Transport abstraction carrying stroke events between participants.
//!
//! Implementations establish their connection in an inherent
//! `connect(endpoint)` constructor. Inbound frames are queued by the
//! transport and handed to the registered handler only from [`SyncChannel::poll`],
//! so the owner of the stroke buffer stays its only writer.

use crate::error::ChannelError;
use crate::protocol::WireMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closed => "closed",
        }
    }
}

pub type ReceiveHandler = Box<dyn FnMut(WireMessage)>;

pub trait SyncChannel {
    fn state(&self) -> ChannelState;

    /// Queues a message for transmission without waiting for delivery.
    fn send(&self, message: &WireMessage) -> Result<(), ChannelError>;

    /// Replaces the inbound handler. Messages are delivered once each, in
    /// the order the transport received them.
    fn on_receive(&mut self, handler: ReceiveHandler);

    /// Dispatches queued inbound messages to the handler, returning how many
    /// were delivered. Messages stay queued while no handler is registered.
    fn poll(&mut self) -> usize;

    fn close(&mut self);

    fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }
}
