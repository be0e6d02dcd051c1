//! Native WebSocket channel.
//!
//! The handshake runs in `connect`; afterwards a worker thread owns the
//! socket, writing queued frames and reading inbound ones with a short read
//! timeout. Inbound messages wait in a channel until the owner polls.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use didboard_shared::protocol;
use didboard_shared::{ChannelError, ChannelState, ReceiveHandler, SyncChannel, WireMessage};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Send(String),
    Close,
}

#[derive(Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn new(state: ChannelState) -> Self {
        let shared = Self(Arc::new(AtomicU8::new(0)));
        shared.set(state);
        shared
    }

    fn get(&self) -> ChannelState {
        match self.0.load(Ordering::Acquire) {
            0 => ChannelState::Connecting,
            1 => ChannelState::Open,
            _ => ChannelState::Closed,
        }
    }

    fn set(&self, state: ChannelState) {
        let value = match state {
            ChannelState::Connecting => 0,
            ChannelState::Open => 1,
            ChannelState::Closed => 2,
        };
        self.0.store(value, Ordering::Release);
    }
}

pub struct NativeChannel {
    state: SharedState,
    cmd_tx: Sender<Command>,
    inbound_rx: Receiver<WireMessage>,
    handler: Option<ReceiveHandler>,
    // Set by `close`; nothing is delivered afterwards.
    released: bool,
    _worker: Option<JoinHandle<()>>,
}

impl NativeChannel {
    pub fn connect(endpoint: &str) -> Result<Self, ChannelError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ChannelError::Connection(format!("invalid url {endpoint}: {e}")))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ChannelError::Connection(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let (mut socket, response) = tungstenite::connect(endpoint)
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        log::info!("connected to {endpoint}, status {}", response.status());
        configure_timeouts(&mut socket);

        let state = SharedState::new(ChannelState::Open);
        let (cmd_tx, cmd_rx) = channel::<Command>();
        let (inbound_tx, inbound_rx) = channel::<WireMessage>();
        let worker_state = state.clone();
        let worker = thread::Builder::new()
            .name("didboard-ws".to_string())
            .spawn(move || run_worker(socket, cmd_rx, inbound_tx, worker_state))
            .map_err(|e| ChannelError::Connection(format!("failed to spawn worker: {e}")))?;

        Ok(Self {
            state,
            cmd_tx,
            inbound_rx,
            handler: None,
            released: false,
            _worker: Some(worker),
        })
    }
}

impl SyncChannel for NativeChannel {
    fn state(&self) -> ChannelState {
        self.state.get()
    }

    fn send(&self, message: &WireMessage) -> Result<(), ChannelError> {
        let state = self.state.get();
        if state != ChannelState::Open {
            return Err(ChannelError::Closed(state));
        }
        let text = protocol::encode(message)?;
        self.cmd_tx
            .send(Command::Send(text))
            .map_err(|_| ChannelError::Closed(ChannelState::Closed))
    }

    fn on_receive(&mut self, handler: ReceiveHandler) {
        self.handler = Some(handler);
    }

    fn poll(&mut self) -> usize {
        if self.released {
            while self.inbound_rx.try_recv().is_ok() {}
            return 0;
        }
        let Some(handler) = self.handler.as_mut() else {
            return 0;
        };
        let mut delivered = 0;
        while let Ok(message) = self.inbound_rx.try_recv() {
            handler(message);
            delivered += 1;
        }
        delivered
    }

    fn close(&mut self) {
        // The worker may already have marked the socket closed after the
        // server hung up; undelivered frames are discarded either way.
        if self.state.get() != ChannelState::Closed {
            self.state.set(ChannelState::Closed);
            let _ = self.cmd_tx.send(Command::Close);
        }
        self.released = true;
        while self.inbound_rx.try_recv().is_ok() {}
        self._worker = None;
    }
}

impl Drop for NativeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn configure_timeouts(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    match socket.get_mut() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
            let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("non-plain stream, relying on default timeouts"),
    }
}

fn run_worker(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    cmd_rx: Receiver<Command>,
    inbound_tx: Sender<WireMessage>,
    state: SharedState,
) {
    'session: loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(Command::Send(text)) => {
                    // Frames queued before close() are dropped, not flushed.
                    if state.get() == ChannelState::Closed {
                        break 'session;
                    }
                    if let Err(e) = socket.send(Message::Text(text)) {
                        log::error!("send failed: {e}");
                        break 'session;
                    }
                }
                Ok(Command::Close) => break 'session,
                Err(TryRecvError::Disconnected) => break 'session,
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => match protocol::decode(&text) {
                Ok(message) => {
                    if inbound_tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("dropping malformed frame: {e}"),
            },
            Ok(Message::Close(_)) => {
                log::info!("server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("read failed: {e}");
                break;
            }
        }
    }

    state.set(ChannelState::Closed);
    let _ = socket.close(None);
    let _ = socket.flush();
    log::info!("connection worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::net::TcpListener;
    use std::rc::Rc;
    use std::time::Instant;

    use didboard_shared::{Point, Stroke, StrokeId, StrokeState};

    fn stroke(id: &str, author: &str) -> Stroke {
        Stroke {
            id: StrokeId::from(id),
            points: vec![Point::new(10.0, 10.0), Point::new(15.0, 13.0)],
            color: "#000000".to_string(),
            stroke_width: 5.0,
            author: author.to_string(),
            state: StrokeState::Closed,
        }
    }

    fn poll_until(channel: &mut NativeChannel, received: &Rc<RefCell<Vec<WireMessage>>>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while received.borrow().len() < count && Instant::now() < deadline {
            channel.poll();
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_round_trip_through_a_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            let frame = ws.read().unwrap();
            let text = frame.into_text().unwrap();
            let reply = protocol::encode(&WireMessage::NewStroke(stroke("j-1", "jarvis"))).unwrap();
            ws.send(Message::Text(r#"{"type":"cursor","x":1}"#.to_string()))
                .unwrap();
            ws.send(Message::Text(reply)).unwrap();
            let _ = ws.read();
            text
        });

        let mut channel = NativeChannel::connect(&format!("ws://{addr}/ws/draw")).unwrap();
        assert_eq!(channel.state(), ChannelState::Open);
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        channel.on_receive(Box::new(move |message| sink.borrow_mut().push(message)));

        channel
            .send(&WireMessage::EndStroke(stroke("s-1", "user")))
            .unwrap();
        poll_until(&mut channel, &received, 2);

        assert_eq!(received.borrow()[0], WireMessage::Unknown);
        assert_eq!(received.borrow()[1].stroke().unwrap().author, "jarvis");

        channel.close();
        let sent = server.join().unwrap();
        let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(value["type"], "end_stroke");
        assert_eq!(value["points"], serde_json::json!([10.0, 10.0, 15.0, 13.0]));
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(matches!(
            NativeChannel::connect(&format!("ws://{addr}/ws/draw")),
            Err(ChannelError::Connection(_))
        ));
        assert!(matches!(
            NativeChannel::connect("http://127.0.0.1:1/ws/draw"),
            Err(ChannelError::Connection(_))
        ));
    }

    #[test]
    fn test_send_after_close_fails_fast() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            while ws.read().is_ok() {}
        });

        let mut channel = NativeChannel::connect(&format!("ws://{addr}/ws/draw")).unwrap();
        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(matches!(
            channel.send(&WireMessage::EndStroke(stroke("s-1", "user"))),
            Err(ChannelError::Closed(ChannelState::Closed))
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_close_discards_frames_left_by_a_hung_up_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            let frame = protocol::encode(&WireMessage::EndStroke(stroke("s-9", "user"))).unwrap();
            ws.send(Message::Text(frame)).unwrap();
            let _ = ws.close(None);
            while ws.read().is_ok() {}
        });

        let mut channel = NativeChannel::connect(&format!("ws://{addr}/ws/draw")).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while channel.state() != ChannelState::Closed && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(channel.state(), ChannelState::Closed);

        channel.close();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        channel.on_receive(Box::new(move |message| sink.borrow_mut().push(message)));
        assert_eq!(channel.poll(), 0);
        assert!(received.borrow().is_empty());
        server.join().unwrap();
    }
}
