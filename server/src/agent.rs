//! Automated participant that answers each finished user stroke.

use std::time::Duration;

use didboard_shared::{Point, Stroke, StrokeId, StrokeState, WireMessage};
use tracing::info;

use crate::logic::{broadcast_all, encode, record};
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub name: String,
    pub color: String,
    pub stroke_width: f64,
    pub delay: Duration,
    pub offset: Point,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "jarvis".to_string(),
            color: "#0000FF".to_string(),
            stroke_width: 5.0,
            delay: Duration::from_secs(2),
            offset: Point::new(50.0, 50.0),
        }
    }
}

impl AgentConfig {
    /// A short line from the end of `stroke`, shifted by the configured offset.
    pub fn respond(&self, stroke: &Stroke) -> Option<Stroke> {
        let last = stroke.last_point()?;
        Some(Stroke {
            id: StrokeId::generate(),
            points: vec![last, last.offset(self.offset.x, self.offset.y)],
            color: self.color.clone(),
            stroke_width: self.stroke_width,
            author: self.name.clone(),
            state: StrokeState::Closed,
        })
    }
}

/// Waits out the thinking delay, then records the reply and sends it to
/// every peer, the author of `stroke` included.
pub fn spawn_response(state: AppState, stroke: Stroke) {
    let Some(config) = state.agent.clone() else {
        return;
    };
    tokio::spawn(async move {
        info!("{} is answering stroke {}", config.name, stroke.id);
        tokio::time::sleep(config.delay).await;
        let Some(reply) = config.respond(&stroke) else {
            return;
        };
        let mut board = state.board.write().await;
        if board.peers.is_empty() {
            return;
        }
        let stored = record(&mut board, reply);
        if let Some(text) = stored.and_then(|reply| encode(&WireMessage::NewStroke(reply))) {
            broadcast_all(&mut board, &text);
        }
    });
}
