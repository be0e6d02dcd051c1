//! In-process channel pair for tests and local demos.
//!
//! Frames cross the pipe as encoded JSON text, so both ends exercise the
//! same wire format as a real socket.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::channel::{ChannelState, ReceiveHandler, SyncChannel};
use crate::error::ChannelError;
use crate::protocol::{self, WireMessage};

#[derive(Default)]
struct Pipe {
    to_left: VecDeque<String>,
    to_right: VecDeque<String>,
    closed: bool,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

pub struct MemoryChannel {
    pipe: Rc<RefCell<Pipe>>,
    side: Side,
    handler: Option<ReceiveHandler>,
}

impl MemoryChannel {
    /// Two connected ends; whatever one sends, the other receives.
    pub fn pair() -> (Self, Self) {
        let pipe = Rc::new(RefCell::new(Pipe::default()));
        (
            Self {
                pipe: pipe.clone(),
                side: Side::Left,
                handler: None,
            },
            Self {
                pipe,
                side: Side::Right,
                handler: None,
            },
        )
    }

    /// Pushes a raw text frame towards the peer, bypassing encoding.
    pub fn send_raw(&self, text: &str) -> Result<(), ChannelError> {
        let mut pipe = self.pipe.borrow_mut();
        if pipe.closed {
            return Err(ChannelError::Closed(ChannelState::Closed));
        }
        match self.side {
            Side::Left => pipe.to_right.push_back(text.to_string()),
            Side::Right => pipe.to_left.push_back(text.to_string()),
        }
        Ok(())
    }

    /// Frames waiting to be polled on this end.
    pub fn pending(&self) -> usize {
        let pipe = self.pipe.borrow();
        match self.side {
            Side::Left => pipe.to_left.len(),
            Side::Right => pipe.to_right.len(),
        }
    }

    fn next_inbound(&self) -> Option<String> {
        let mut pipe = self.pipe.borrow_mut();
        match self.side {
            Side::Left => pipe.to_left.pop_front(),
            Side::Right => pipe.to_right.pop_front(),
        }
    }
}

impl SyncChannel for MemoryChannel {
    fn state(&self) -> ChannelState {
        if self.pipe.borrow().closed {
            ChannelState::Closed
        } else {
            ChannelState::Open
        }
    }

    fn send(&self, message: &WireMessage) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed(self.state()));
        }
        let text = protocol::encode(message)?;
        self.send_raw(&text)
    }

    fn on_receive(&mut self, handler: ReceiveHandler) {
        self.handler = Some(handler);
    }

    fn poll(&mut self) -> usize {
        if self.handler.is_none() {
            return 0;
        }
        let mut delivered = 0;
        while let Some(text) = self.next_inbound() {
            match protocol::decode(&text) {
                Ok(message) => {
                    if let Some(handler) = self.handler.as_mut() {
                        handler(message);
                        delivered += 1;
                    }
                }
                Err(error) => log::warn!("dropping malformed frame: {error}"),
            }
        }
        delivered
    }

    fn close(&mut self) {
        let mut pipe = self.pipe.borrow_mut();
        pipe.closed = true;
        pipe.to_left.clear();
        pipe.to_right.clear();
    }
}
