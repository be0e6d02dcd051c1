use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Element, Event, HtmlCanvasElement, PointerEvent, Window};

use didboard_shared::{Session, SyncChannel};

use crate::dom::{event_to_point, get_element, resize_canvas, set_status};
use crate::input::{Pen, PointerPhase};
use crate::net::config_from_window;
use crate::render::redraw;
use crate::ws::{WsChannel, WsEvent};

struct Board {
    window: Window,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    drawn_version: Cell<Option<u64>>,
}

impl Board {
    fn resize(&mut self) {
        let (width, height) = resize_canvas(&self.window, &self.canvas);
        self.width = width;
        self.height = height;
        self.drawn_version.set(None);
    }

    /// Repaints unless the snapshot version is already on screen.
    fn refresh(&self, session: &Session<WsChannel>) {
        let snapshot = session.snapshot();
        if self.drawn_version.get() == Some(snapshot.version) {
            return;
        }
        redraw(
            &self.ctx,
            self.width,
            self.height,
            self.window.device_pixel_ratio(),
            &snapshot,
        );
        self.drawn_version.set(Some(snapshot.version));
    }
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    let status_el: Option<Element> = document.get_element_by_id("status");

    let config = config_from_window(&window)?;
    log::info!("connecting to {} as {}", config.endpoint, config.author);
    let channel = WsChannel::connect(&config.endpoint)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let board = Rc::new(RefCell::new(Board {
        window: window.clone(),
        canvas: canvas.clone(),
        ctx,
        width: 0.0,
        height: 0.0,
        drawn_version: Cell::new(None),
    }));
    board.borrow_mut().resize();

    let session = Rc::new(RefCell::new(Session::new(channel)));
    let pen = Rc::new(RefCell::new(Pen::new(&config)));

    if let Some(status_el) = &status_el {
        set_status(status_el, session.borrow().channel_state());
    }

    {
        let session_cb = session.clone();
        let board = board.clone();
        let status_el = status_el.clone();
        session.borrow().channel().on_event(move |event| {
            let Ok(mut session) = session_cb.try_borrow_mut() else {
                return;
            };
            match event {
                WsEvent::Message => {
                    if session.pump() > 0 {
                        board.borrow().refresh(&session);
                    }
                }
                WsEvent::Open | WsEvent::Close | WsEvent::Error => {
                    if let Some(status_el) = &status_el {
                        set_status(status_el, session.channel().state());
                    }
                }
            }
        });
    }

    for (name, phase) in [
        ("pointerdown", PointerPhase::Down),
        ("pointermove", PointerPhase::Move),
        ("pointerup", PointerPhase::Up),
        ("pointercancel", PointerPhase::Cancel),
        ("lostpointercapture", PointerPhase::Cancel),
    ] {
        let session = session.clone();
        let pen = pen.clone();
        let board = board.clone();
        let canvas_cb = canvas.clone();
        let handler = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let point = event_to_point(&canvas_cb, &event);
            if phase == PointerPhase::Down {
                event.prevent_default();
                let _ = canvas_cb.set_pointer_capture(event.pointer_id());
            }
            let mut session = session.borrow_mut();
            let mut pen = pen.borrow_mut();
            let result = match (phase, point) {
                (_, Some(point)) => pen.pointer(&mut session, phase, point).map(|_| ()),
                // A release must close the stroke even when the canvas has
                // no usable geometry.
                (PointerPhase::Up | PointerPhase::Cancel, None) => {
                    pen.release(&mut session).map(|_| ())
                }
                (PointerPhase::Down | PointerPhase::Move, None) => return,
            };
            if let Err(error) = result {
                log::error!("{name}: {error}");
            }
            session.pump();
            board.borrow().refresh(&session);
        });
        canvas.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
        handler.forget();
    }

    {
        let session = session.clone();
        let board = board.clone();
        let onresize = Closure::<dyn FnMut(Event)>::new(move |_| {
            board.borrow_mut().resize();
            board.borrow().refresh(&session.borrow());
        });
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let session = session.clone();
        let onbeforeunload = Closure::<dyn FnMut(Event)>::new(move |_| {
            if let Ok(mut session) = session.try_borrow_mut() {
                session.close();
            }
        });
        window.add_event_listener_with_callback(
            "beforeunload",
            onbeforeunload.as_ref().unchecked_ref(),
        )?;
        onbeforeunload.forget();
    }

    board.borrow().refresh(&session.borrow());
    Ok(())
}
