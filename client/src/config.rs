use serde::Deserialize;

use didboard_shared::{DEFAULT_COLOR, DEFAULT_STROKE_WIDTH, USER_AUTHOR};

pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8000/ws/draw";

/// Who is drawing, with what pen, and where strokes are sent.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub endpoint: String,
    pub author: String,
    pub color: String,
    pub stroke_width: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            author: USER_AUTHOR.to_string(),
            color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl ClientConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}
