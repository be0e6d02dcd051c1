use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod buffer;
pub mod channel;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod reducer;
pub mod sanitize;
pub mod session;

pub use buffer::{Snapshot, StrokeBuffer};
pub use channel::{ChannelState, ReceiveHandler, SyncChannel};
pub use error::{BufferError, ChannelError, ProtocolError};
pub use memory::MemoryChannel;
pub use protocol::WireMessage;
pub use reducer::{Event, LocalEvent, Origin, Reduction};
pub use session::{Dispatch, Session, TickReport};

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 5.0;
pub const USER_AUTHOR: &str = "user";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    /// Fresh random id, assigned by the authoring client.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrokeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StrokeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeState {
    Open,
    #[default]
    Closed,
}

/// One continuous gesture from pointer-down to pointer-up.
///
/// The wire form flattens `points` into `[x, y, x, y, ...]`. Strokes decoded
/// from the wire are always `Closed`; the state itself is never transmitted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stroke {
    pub id: StrokeId,
    #[serde(with = "protocol::flat_points")]
    pub points: Vec<Point>,
    pub color: String,
    #[serde(rename = "strokeWidth")]
    pub stroke_width: f64,
    #[serde(alias = "agent")]
    pub author: String,
    #[serde(skip)]
    pub state: StrokeState,
}

impl Stroke {
    pub fn is_open(&self) -> bool {
        self.state == StrokeState::Open
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }
}
