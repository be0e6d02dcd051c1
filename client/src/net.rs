use wasm_bindgen::JsValue;
use web_sys::Window;

use crate::config::ClientConfig;

pub const WS_PATH: &str = "/ws/draw";

/// Relay endpoint on the host that served the page.
pub fn websocket_url(window: &Window) -> Result<String, JsValue> {
    let location = window.location();
    let protocol = location.protocol()?;
    let host = location.host()?;
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    Ok(format!("{scheme}://{host}{WS_PATH}"))
}

pub fn config_from_window(window: &Window) -> Result<ClientConfig, JsValue> {
    Ok(ClientConfig::default().with_endpoint(websocket_url(window)?))
}
