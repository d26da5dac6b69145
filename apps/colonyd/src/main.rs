use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn, Level};

use colonycore::hub::FrameHandler;
use colonycore::{
    ClientSocket, ColonyService, ConnectionHub, RoomRegistry, SocketError, TickerLifecycle,
    WorldConfig,
};

const DEFAULT_ROOM: &str = "lobby";
const SEND_QUEUE: usize = 256;
const PING_PERIOD: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    world_width: i32,
    world_height: i32,
    seed: Option<u64>,
    tick_ms: u64,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "colonyd\n\n\
USAGE:\n  colonyd [--bind HOST:PORT] [--seed N] [--tick-ms N]\n\n\
ENV:\n  COLONY_BIND     default 127.0.0.1:4200\n  WORLD_SEED      unset = process-random worlds\n  COLONY_WORLD_W  default 32\n  COLONY_WORLD_H  default 32\n  COLONY_TICK_MS  default 1000\n"
    );
    std::process::exit(2);
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("COLONY_BIND")
        .unwrap_or_else(|_| "127.0.0.1:4200".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());
    let mut seed: Option<u64> = std::env::var("WORLD_SEED").ok().and_then(|v| v.parse().ok());
    let mut tick_ms: u64 = env_or("COLONY_TICK_MS", 1000);
    let world_width: i32 = env_or("COLONY_WORLD_W", 32);
    let world_height: i32 = env_or("COLONY_WORLD_H", 32);

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--seed" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                seed = Some(v.parse().unwrap_or_else(|_| usage_and_exit()));
            }
            "--tick-ms" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                tick_ms = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        world_width,
        world_height,
        seed,
        tick_ms,
    }
}

/// Room selection: the `room` query parameter, defaulting to the lobby.
fn room_from_uri(uri: &str) -> String {
    let Some((_, query)) = uri.split_once('?') else {
        return DEFAULT_ROOM.to_string();
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("room=") {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    DEFAULT_ROOM.to_string()
}

/// `ClientSocket` over one accepted WebSocket. Outbound frames go through a
/// bounded queue drained by the connection's write pump; `send` never blocks.
struct WsSocket {
    tx: mpsc::Sender<Message>,
    inbound: tokio::sync::Mutex<Option<SplitStream<WebSocketStream<TcpStream>>>>,
    closed: AtomicBool,
}

impl WsSocket {
    fn new(tx: mpsc::Sender<Message>, stream: SplitStream<WebSocketStream<TcpStream>>) -> Self {
        Self {
            tx,
            inbound: tokio::sync::Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
        }
    }
}

impl ClientSocket for WsSocket {
    fn send(&self, frame: Bytes) -> Result<(), SocketError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SocketError::Closed);
        }
        let text = String::from_utf8_lossy(&frame).into_owned();
        self.tx.try_send(Message::Text(text)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SocketError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => SocketError::Closed,
        })
    }

    fn listen<'a>(&'a self, mut on_frame: FrameHandler<'a>) -> BoxFuture<'a, Result<(), SocketError>> {
        Box::pin(async move {
            let mut stream = self
                .inbound
                .lock()
                .await
                .take()
                .ok_or(SocketError::Closed)?;
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(s)) => on_frame(Bytes::from(s.into_bytes())),
                    Ok(Message::Close(_)) => {
                        self.close(CloseCode::Normal.into());
                        return Ok(());
                    }
                    Ok(Message::Binary(_))
                    | Ok(Message::Ping(_))
                    | Ok(Message::Pong(_))
                    | Ok(Message::Frame(_)) => {}
                    Err(e) => {
                        self.close(CloseCode::Error.into());
                        return Err(SocketError::Transport(e.to_string()));
                    }
                }
            }
            // Stream ended without a close frame: treat as a clean close.
            self.close(CloseCode::Normal.into());
            Ok(())
        })
    }

    fn close(&self, code: u16) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.try_send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        })));
    }
}

/// Drains the outbound queue into the sink and keeps the peer alive with a
/// periodic ping. Ends when the queue closes, a close frame goes out, or the
/// transport errors.
async fn write_pump(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    let start = tokio::time::Instant::now() + PING_PERIOD;
    let mut ping = tokio::time::interval_at(start, PING_PERIOD);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else { break; };
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() {
                    break;
                }
                if closing {
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn handle_conn(
    stream: TcpStream,
    peer: SocketAddr,
    service: ColonyService,
) -> anyhow::Result<()> {
    let mut request_uri = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        request_uri = req.uri().to_string();
        Ok::<Response, ErrorResponse>(resp)
    })
    .await
    .context("accept ws")?;

    let room_id = room_from_uri(&request_uri);
    let (sink, stream) = ws.split();
    let (tx, rx) = mpsc::channel::<Message>(SEND_QUEUE);
    let writer = tokio::spawn(write_pump(sink, rx));

    let socket = Arc::new(WsSocket::new(tx, stream));
    info!(peer = %peer, room_id = %room_id, "client connected");

    let res = service.handle_client(&room_id, socket.clone()).await;

    // Dropping the last sender ends the write pump.
    drop(socket);
    let _ = writer.await;
    info!(peer = %peer, room_id = %room_id, "client disconnected");
    res
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,colonyd=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();

    let hub = Arc::new(ConnectionHub::new());
    let lifecycle = Arc::new(TickerLifecycle::new(
        hub.clone(),
        Duration::from_millis(cfg.tick_ms.max(1)),
        cfg.seed,
    ));
    let registry = Arc::new(RoomRegistry::new(
        WorldConfig {
            width: cfg.world_width,
            height: cfg.world_height,
            seed: cfg.seed,
        },
        Some(lifecycle),
    ));
    let service = ColonyService::new(registry, hub);

    let listener = TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    info!(bind = %cfg.bind, "colonyd listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, peer, service).await {
                warn!(peer = %peer, err = %e, "connection ended with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_query_parameter_selects_the_room() {
        assert_eq!(room_from_uri("/ws?room=arena"), "arena");
        assert_eq!(room_from_uri("/?foo=1&room=cave&bar=2"), "cave");
    }

    #[test]
    fn missing_or_empty_room_falls_back_to_the_lobby() {
        assert_eq!(room_from_uri("/ws"), DEFAULT_ROOM);
        assert_eq!(room_from_uri("/ws?other=x"), DEFAULT_ROOM);
        assert_eq!(room_from_uri("/ws?room="), DEFAULT_ROOM);
    }
}
