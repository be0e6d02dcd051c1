use didboard_shared::protocol::{self, WireMessage};
use didboard_shared::{Stroke, USER_AUTHOR};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::{Board, MAX_STROKES};

/// What the relay does with one inbound frame.
#[derive(Debug, Default, PartialEq)]
pub struct Routed {
    /// Frame to send to every other peer.
    pub forward: Option<String>,
    /// Finished user stroke the agent should answer.
    pub agent_trigger: Option<Stroke>,
}

pub fn route_frame(board: &mut Board, sender: Uuid, text: &str) -> Routed {
    let message = match protocol::decode(text) {
        Ok(message) => message,
        Err(error) => {
            warn!("dropping frame from {sender}: {error}");
            return Routed::default();
        }
    };

    match message {
        WireMessage::NewStroke(stroke) => match record(board, stroke) {
            Some(stored) => Routed {
                forward: encode(&WireMessage::NewStroke(stored)),
                agent_trigger: None,
            },
            None => Routed::default(),
        },
        WireMessage::EndStroke(stroke) => match record(board, stroke) {
            Some(stored) => {
                let agent_trigger = (stored.author == USER_AUTHOR).then(|| stored.clone());
                Routed {
                    forward: encode(&WireMessage::EndStroke(stored)),
                    agent_trigger,
                }
            }
            None => Routed::default(),
        },
        // Not interpreted by the relay; peers decide what to do with them.
        WireMessage::LiveUpdate { .. } | WireMessage::Unknown => Routed {
            forward: Some(text.to_string()),
            agent_trigger: None,
        },
    }
}

/// Adds a stroke to the history; `None` for duplicates and undrawable strokes.
pub fn record(board: &mut Board, stroke: Stroke) -> Option<Stroke> {
    let id = stroke.id.clone();
    match board.history.apply_remote(stroke) {
        Ok(true) => {
            let evicted = board.history.evict_oldest(MAX_STROKES);
            if evicted > 0 {
                debug!("evicted {evicted} strokes from history");
            }
            board.history.closed_strokes().last().cloned()
        }
        Ok(false) => {
            debug!("duplicate stroke {id}");
            None
        }
        Err(error) => {
            warn!("rejected stroke: {error}");
            None
        }
    }
}

/// History as `end_stroke` frames, oldest first.
pub fn replay_frames(board: &Board) -> Vec<String> {
    board
        .history
        .closed_strokes()
        .iter()
        .filter_map(|stroke| encode(&WireMessage::EndStroke(stroke.clone())))
        .collect()
}

pub fn encode(message: &WireMessage) -> Option<String> {
    match protocol::encode(message) {
        Ok(text) => Some(text),
        Err(error) => {
            warn!("failed to encode {}: {error}", message.kind());
            None
        }
    }
}

/// Queues `text` for every peer except `sender`.
///
/// Takes the board mutably so the caller sends while still holding the
/// write lock that recorded the stroke; outbox order then matches history.
pub fn broadcast_except(board: &mut Board, sender: Uuid, text: &str) {
    deliver(board, Some(sender), text);
}

pub fn broadcast_all(board: &mut Board, text: &str) {
    deliver(board, None, text);
}

fn deliver(board: &mut Board, skip: Option<Uuid>, text: &str) {
    let mut stale = Vec::new();
    for (id, tx) in board.peers.iter() {
        if Some(*id) == skip {
            continue;
        }
        if tx.send(text.to_string()).is_err() {
            stale.push(*id);
        }
    }
    for id in stale {
        debug!("dropping stale peer {id}");
        board.peers.remove(&id);
    }
}
