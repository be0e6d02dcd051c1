use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use didboard_shared::protocol;
use didboard_shared::{ChannelError, ChannelState, ReceiveHandler, SyncChannel, WireMessage};

#[derive(Debug)]
pub enum WsEvent {
    Open,
    Close,
    Error,
    Message,
}

type Listener = Rc<RefCell<Option<Box<dyn FnMut(WsEvent)>>>>;

/// Browser WebSocket channel.
///
/// Socket callbacks only queue messages and notify the listener; the page
/// applies them by calling [`SyncChannel::poll`] from its own handlers.
pub struct WsChannel {
    socket: WebSocket,
    inbound: Rc<RefCell<VecDeque<WireMessage>>>,
    handler: Option<ReceiveHandler>,
    listener: Listener,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
}

impl WsChannel {
    pub fn connect(endpoint: &str) -> Result<Self, ChannelError> {
        let socket = WebSocket::new(endpoint)
            .map_err(|e| ChannelError::Connection(format!("{endpoint}: {e:?}")))?;
        let inbound = Rc::new(RefCell::new(VecDeque::new()));
        let listener: Listener = Rc::new(RefCell::new(None));

        let on_open = {
            let listener = listener.clone();
            Closure::<dyn FnMut(Event)>::new(move |_| notify(&listener, WsEvent::Open))
        };
        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let on_close = {
            let listener = listener.clone();
            Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
                log::warn!(
                    "socket closed code={} was_clean={} reason={:?}",
                    event.code(),
                    event.was_clean(),
                    event.reason()
                );
                notify(&listener, WsEvent::Close);
            })
        };
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let on_error = {
            let listener = listener.clone();
            Closure::<dyn FnMut(Event)>::new(move |_| {
                log::error!("socket error");
                notify(&listener, WsEvent::Error);
            })
        };
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let on_message = {
            let listener = listener.clone();
            let inbound = inbound.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    log::error!("ignoring non-text frame");
                    return;
                };
                match protocol::decode(&text) {
                    Ok(message) => inbound.borrow_mut().push_back(message),
                    Err(error) => {
                        let snippet: String = text.chars().take(200).collect();
                        log::error!("message parse error: {error} payload={snippet:?}");
                        return;
                    }
                }
                notify(&listener, WsEvent::Message);
            })
        };
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            inbound,
            handler: None,
            listener,
            _on_open: on_open,
            _on_close: on_close,
            _on_error: on_error,
            _on_message: on_message,
        })
    }

    /// Registers the page-level listener for connection and message events.
    pub fn on_event(&self, listener: impl FnMut(WsEvent) + 'static) {
        *self.listener.borrow_mut() = Some(Box::new(listener));
    }
}

fn notify(listener: &Listener, event: WsEvent) {
    // Take the callback out so it may re-enter the channel.
    let callback = listener.borrow_mut().take();
    if let Some(mut callback) = callback {
        callback(event);
        let mut slot = listener.borrow_mut();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

impl SyncChannel for WsChannel {
    fn state(&self) -> ChannelState {
        match self.socket.ready_state() {
            WebSocket::CONNECTING => ChannelState::Connecting,
            WebSocket::OPEN => ChannelState::Open,
            _ => ChannelState::Closed,
        }
    }

    fn send(&self, message: &WireMessage) -> Result<(), ChannelError> {
        let state = self.state();
        if state != ChannelState::Open {
            return Err(ChannelError::Closed(state));
        }
        let text = protocol::encode(message)?;
        self.socket
            .send_with_str(&text)
            .map_err(|_| ChannelError::Closed(self.state()))
    }

    fn on_receive(&mut self, handler: ReceiveHandler) {
        self.handler = Some(handler);
    }

    fn poll(&mut self) -> usize {
        let Some(handler) = self.handler.as_mut() else {
            return 0;
        };
        let mut delivered = 0;
        loop {
            let Some(message) = self.inbound.borrow_mut().pop_front() else {
                break;
            };
            handler(message);
            delivered += 1;
        }
        delivered
    }

    fn close(&mut self) {
        let _ = self.socket.close();
        self.inbound.borrow_mut().clear();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.socket.set_onopen(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
        self.socket.set_onmessage(None);
        let _ = self.socket.close();
    }
}
