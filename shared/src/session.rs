//! Single-writer driver tying a [`StrokeBuffer`] to a [`SyncChannel`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::buffer::{Snapshot, StrokeBuffer};
use crate::channel::{ChannelState, SyncChannel};
use crate::error::{BufferError, ChannelError};
use crate::protocol::WireMessage;
use crate::reducer::{self, Event, LocalEvent, Reduction};

/// Result of a local event that the buffer accepted.
#[derive(Debug)]
pub struct Dispatch {
    pub reduction: Reduction,
    /// Set when the outbound message could not be handed to the transport.
    /// The stroke stays in the local buffer either way.
    pub transport: Option<ChannelError>,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub local: Vec<Result<Dispatch, BufferError>>,
    pub remote_changed: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.remote_changed > 0
            || self
                .local
                .iter()
                .any(|result| matches!(result, Ok(dispatch) if dispatch.reduction.changed))
    }
}

pub struct Session<C: SyncChannel> {
    buffer: StrokeBuffer,
    channel: C,
    inbox: Rc<RefCell<VecDeque<WireMessage>>>,
}

impl<C: SyncChannel> Session<C> {
    pub fn new(mut channel: C) -> Self {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = inbox.clone();
        channel.on_receive(Box::new(move |message| sink.borrow_mut().push_back(message)));
        Self {
            buffer: StrokeBuffer::new(),
            channel,
            inbox,
        }
    }

    pub fn buffer(&self) -> &StrokeBuffer {
        &self.buffer
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.buffer.snapshot()
    }

    pub fn handle_local(&mut self, event: LocalEvent) -> Result<Dispatch, BufferError> {
        let reduction = reducer::apply(&mut self.buffer, Event::Local(event))?;
        let transport = match &reduction.outbound {
            Some(message) => match self.channel.send(message) {
                Ok(()) => None,
                Err(error) => {
                    log::warn!("could not broadcast {}: {error}", message.kind());
                    Some(error)
                }
            },
            None => None,
        };
        Ok(Dispatch {
            reduction,
            transport,
        })
    }

    /// Applies every inbound message queued by the transport, in arrival
    /// order. Returns how many of them changed the buffer.
    pub fn pump(&mut self) -> usize {
        self.channel.poll();
        let mut changed = 0;
        loop {
            let Some(message) = self.inbox.borrow_mut().pop_front() else {
                break;
            };
            match reducer::apply(&mut self.buffer, Event::Remote(message)) {
                Ok(reduction) if reduction.changed => changed += 1,
                Ok(_) => {}
                Err(error) => log::warn!("remote event rejected: {error}"),
            }
        }
        changed
    }

    /// Processes one tick: all local events first, then pending remote ones.
    pub fn tick<I>(&mut self, locals: I) -> TickReport
    where
        I: IntoIterator<Item = LocalEvent>,
    {
        let local = locals
            .into_iter()
            .map(|event| self.handle_local(event))
            .collect();
        TickReport {
            local,
            remote_changed: self.pump(),
        }
    }

    /// Releases the transport. Local strokes stay readable.
    pub fn close(&mut self) {
        self.channel.close();
        self.inbox.borrow_mut().clear();
    }
}
