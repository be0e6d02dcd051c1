//! Turns pointer phases into local stroke events.

use didboard_shared::{
    BufferError, Dispatch, LocalEvent, Point, Session, StrokeId, SyncChannel,
};

use crate::config::ClientConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

pub enum DrawMode {
    Idle,
    Drawing { id: StrokeId },
}

/// The local user's pen: presentation attributes plus the stroke it is
/// currently drawing.
pub struct Pen {
    pub author: String,
    pub color: String,
    pub width: f64,
    mode: DrawMode,
}

impl Pen {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            author: config.author.clone(),
            color: config.color.clone(),
            width: config.stroke_width,
            mode: DrawMode::Idle,
        }
    }

    pub fn drawing(&self) -> Option<&StrokeId> {
        match &self.mode {
            DrawMode::Drawing { id } => Some(id),
            DrawMode::Idle => None,
        }
    }

    /// Feeds one pointer sample into the session.
    ///
    /// Moves and releases outside a stroke are ignored. A press while a
    /// stroke is still open (a release the browser never delivered)
    /// finishes that stroke before starting the next one.
    pub fn pointer<C: SyncChannel>(
        &mut self,
        session: &mut Session<C>,
        phase: PointerPhase,
        point: Point,
    ) -> Result<Option<Dispatch>, BufferError> {
        match phase {
            PointerPhase::Down => {
                if self.drawing().is_some() {
                    self.release(session)?;
                }
                let dispatch = session.handle_local(LocalEvent::Begin {
                    author: self.author.clone(),
                    point,
                    color: self.color.clone(),
                    width: self.width,
                })?;
                if let Some(id) = dispatch.reduction.began.clone() {
                    self.mode = DrawMode::Drawing { id };
                }
                Ok(Some(dispatch))
            }
            PointerPhase::Move => {
                let Some(id) = self.drawing().cloned() else {
                    return Ok(None);
                };
                session
                    .handle_local(LocalEvent::Move { id, point })
                    .map(Some)
            }
            PointerPhase::Up | PointerPhase::Cancel => self.release(session),
        }
    }

    /// Closes the stroke in progress, if any. Used for releases that carry
    /// no usable position.
    pub fn release<C: SyncChannel>(
        &mut self,
        session: &mut Session<C>,
    ) -> Result<Option<Dispatch>, BufferError> {
        let DrawMode::Drawing { id } = std::mem::replace(&mut self.mode, DrawMode::Idle) else {
            return Ok(None);
        };
        session.handle_local(LocalEvent::End { id }).map(Some)
    }
}
