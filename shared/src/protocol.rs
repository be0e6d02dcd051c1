//! JSON wire envelope shared by clients and the relay.
//!
//! Every frame is a JSON object tagged by `type`:
//! ```json
//! { "type": "end_stroke", "id": "...", "points": [10, 10, 12, 11],
//!   "color": "#000000", "strokeWidth": 5, "author": "user" }
//! { "type": "live_update", "id": "...", "points": [15, 13] }
//! ```
//! Objects with any other `type` decode as [`WireMessage::Unknown`] so newer
//! peers can extend the protocol without breaking older ones.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::{Point, Stroke, StrokeId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "new_stroke")]
    NewStroke(Stroke),
    #[serde(rename = "end_stroke")]
    EndStroke(Stroke),
    #[serde(rename = "live_update")]
    LiveUpdate {
        id: StrokeId,
        #[serde(with = "flat_points")]
        points: Vec<Point>,
    },
    #[serde(other)]
    Unknown,
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::NewStroke(_) => "new_stroke",
            WireMessage::EndStroke(_) => "end_stroke",
            WireMessage::LiveUpdate { .. } => "live_update",
            WireMessage::Unknown => "unknown",
        }
    }

    /// The full stroke carried by `new_stroke` / `end_stroke`.
    pub fn stroke(&self) -> Option<&Stroke> {
        match self {
            WireMessage::NewStroke(stroke) | WireMessage::EndStroke(stroke) => Some(stroke),
            _ => None,
        }
    }

    pub fn into_stroke(self) -> Option<Stroke> {
        match self {
            WireMessage::NewStroke(stroke) | WireMessage::EndStroke(stroke) => Some(stroke),
            _ => None,
        }
    }
}

pub fn encode(message: &WireMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(text: &str) -> Result<WireMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Serde adapter for the flat `[x, y, x, y, ...]` coordinate array.
pub mod flat_points {
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::Point;

    pub fn serialize<S>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(points.len() * 2))?;
        for point in points {
            seq.serialize_element(&point.x)?;
            seq.serialize_element(&point.y)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let flat = Vec::<f64>::deserialize(deserializer)?;
        if flat.len() % 2 != 0 {
            return Err(D::Error::custom(format!(
                "points must hold x,y pairs, got {} numbers",
                flat.len()
            )));
        }
        Ok(flat
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrokeState;
    use serde_json::json;

    fn stroke() -> Stroke {
        Stroke {
            id: StrokeId::from("s-1"),
            points: vec![Point::new(10.0, 10.0), Point::new(12.0, 11.0)],
            color: "#000000".to_string(),
            stroke_width: 5.0,
            author: "user".to_string(),
            state: StrokeState::Closed,
        }
    }

    #[test]
    fn test_end_stroke_wire_shape() {
        let text = encode(&WireMessage::EndStroke(stroke())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "end_stroke",
                "id": "s-1",
                "points": [10.0, 10.0, 12.0, 11.0],
                "color": "#000000",
                "strokeWidth": 5.0,
                "author": "user",
            })
        );
    }

    #[test]
    fn test_decode_accepts_legacy_agent_key() {
        let text = r##"{"type":"new_stroke","id":"j-1","points":[1,2,51,52],
            "color":"#0000FF","strokeWidth":5,"agent":"jarvis"}"##;
        let message = decode(text).unwrap();
        let stroke = message.stroke().unwrap();
        assert_eq!(stroke.author, "jarvis");
        assert_eq!(stroke.points, vec![Point::new(1.0, 2.0), Point::new(51.0, 52.0)]);
        assert_eq!(stroke.state, StrokeState::Closed);
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let message = decode(r#"{"type":"cursor","x":4,"y":5}"#).unwrap();
        assert_eq!(message, WireMessage::Unknown);
        assert_eq!(message.kind(), "unknown");
    }

    #[test]
    fn test_live_update_carries_only_points() {
        let message = decode(r#"{"type":"live_update","id":"s-1","points":[3,4]}"#).unwrap();
        assert_eq!(
            message,
            WireMessage::LiveUpdate {
                id: StrokeId::from("s-1"),
                points: vec![Point::new(3.0, 4.0)],
            }
        );
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"id":"missing-type"}"#).is_err());
        assert!(decode(r##"{"type":"end_stroke","id":"s","points":[1,2,3],
            "color":"#000","strokeWidth":5,"author":"user"}"##)
            .is_err());
    }
}
