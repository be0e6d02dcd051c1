//! Stateless transition function from input and network events to buffer
//! mutations.

use crate::buffer::StrokeBuffer;
use crate::error::BufferError;
use crate::protocol::WireMessage;
use crate::{Point, StrokeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// Pointer phases from the local input source.
#[derive(Clone, Debug, PartialEq)]
pub enum LocalEvent {
    Begin {
        author: String,
        point: Point,
        color: String,
        width: f64,
    },
    Move {
        id: StrokeId,
        point: Point,
    },
    End {
        id: StrokeId,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Local(LocalEvent),
    Remote(WireMessage),
}

impl Event {
    pub fn origin(&self) -> Origin {
        match self {
            Event::Local(_) => Origin::Local,
            Event::Remote(_) => Origin::Remote,
        }
    }
}

impl From<LocalEvent> for Event {
    fn from(event: LocalEvent) -> Self {
        Event::Local(event)
    }
}

impl From<WireMessage> for Event {
    fn from(message: WireMessage) -> Self {
        Event::Remote(message)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reduction {
    /// Whether the buffer was mutated and needs a redraw.
    pub changed: bool,
    /// Id assigned by a local `Begin`.
    pub began: Option<StrokeId>,
    /// Message the caller must broadcast.
    pub outbound: Option<WireMessage>,
}

impl Reduction {
    fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }
}

/// Applies one event to the buffer.
///
/// Local contract violations are returned as errors. Remote input never
/// fails: duplicates, undrawable strokes, `live_update` and unknown message
/// types all reduce to an unchanged result.
pub fn apply(buffer: &mut StrokeBuffer, event: Event) -> Result<Reduction, BufferError> {
    match event {
        Event::Local(LocalEvent::Begin {
            author,
            point,
            color,
            width,
        }) => {
            let id = buffer.begin_stroke(&author, point, &color, width)?;
            Ok(Reduction {
                changed: true,
                began: Some(id),
                outbound: None,
            })
        }
        Event::Local(LocalEvent::Move { id, point }) => {
            buffer.append_point(&id, point)?;
            Ok(Reduction::changed())
        }
        Event::Local(LocalEvent::End { id }) => {
            let stroke = buffer.close_stroke(&id)?;
            Ok(Reduction {
                changed: true,
                began: None,
                outbound: Some(WireMessage::EndStroke(stroke)),
            })
        }
        Event::Remote(message) => Ok(apply_remote(buffer, message)),
    }
}

fn apply_remote(buffer: &mut StrokeBuffer, message: WireMessage) -> Reduction {
    let kind = message.kind();
    let Some(stroke) = message.into_stroke() else {
        log::debug!("ignoring {kind} message");
        return Reduction::default();
    };
    let id = stroke.id.clone();
    match buffer.apply_remote(stroke) {
        Ok(true) => Reduction::changed(),
        Ok(false) => {
            log::debug!("duplicate {kind} for stroke {id}");
            Reduction::default()
        }
        Err(error) => {
            log::warn!("ignoring remote {kind}: {error}");
            Reduction::default()
        }
    }
}
