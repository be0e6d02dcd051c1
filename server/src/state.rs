use std::collections::HashMap;
use std::sync::Arc;

use didboard_shared::StrokeBuffer;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::agent::AgentConfig;

/// Strokes kept for replay to late joiners.
pub const MAX_STROKES: usize = 2000;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<RwLock<Board>>,
    pub agent: Option<Arc<AgentConfig>>,
}

impl AppState {
    pub fn new(agent: Option<AgentConfig>) -> Self {
        Self {
            board: Arc::new(RwLock::new(Board::default())),
            agent: agent.map(Arc::new),
        }
    }
}

/// The single drawing session shared by every connected peer.
#[derive(Default)]
pub struct Board {
    pub history: StrokeBuffer,
    pub peers: HashMap<Uuid, mpsc::UnboundedSender<String>>,
}
