use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, PointerEvent, Window};

use didboard_shared::{ChannelState, Point};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn set_status(status_el: &Element, state: ChannelState) {
    let text = match state {
        ChannelState::Connecting => "Connecting...",
        ChannelState::Open => "Live connection",
        ChannelState::Closed => "Offline",
    };
    let _ = status_el.set_attribute("data-state", state.label());
    status_el.set_text_content(Some(text));
}

/// Matches the backing store to the element size; returns the CSS size.
pub fn resize_canvas(window: &Window, canvas: &HtmlCanvasElement) -> (f64, f64) {
    let rect = canvas.get_bounding_client_rect();
    let dpr = window.device_pixel_ratio();
    canvas.set_width((rect.width() * dpr) as u32);
    canvas.set_height((rect.height() * dpr) as u32);
    (rect.width(), rect.height())
}

pub fn event_to_point(canvas: &HtmlCanvasElement, event: &PointerEvent) -> Option<Point> {
    let rect = canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    let point = Point::new(
        event.client_x() as f64 - rect.left(),
        event.client_y() as f64 - rect.top(),
    );
    point.is_finite().then_some(point)
}
