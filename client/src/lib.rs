//! Drawing client: pointer input, the WebSocket transports and, in the
//! browser, the canvas page itself.

pub mod config;
pub mod input;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod net;
#[cfg(target_arch = "wasm32")]
mod render;
#[cfg(target_arch = "wasm32")]
pub mod ws;

pub use config::ClientConfig;
pub use input::{Pen, PointerPhase};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeChannel;

#[cfg(target_arch = "wasm32")]
pub use app::run;
#[cfg(target_arch = "wasm32")]
pub use ws::WsChannel;

/// Platform WebSocket channel type.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformChannel = NativeChannel;

#[cfg(target_arch = "wasm32")]
pub type PlatformChannel = WsChannel;
