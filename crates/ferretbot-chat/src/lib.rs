//! Chat server adapter (websocket).
//!
//! Implements the `ferretbot-core` [`ChatPort`] and turns inbound frames into
//! [`ChatEvent`]s. One background task owns the socket; outbound frames reach
//! it through a channel so sends never block the handler.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::{header, HeaderValue},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use ferretbot_core::{
    config::Config,
    domain::ChatEvent,
    errors::Error,
    ports::ChatPort,
    protocol::{decode_frame, encode_private, encode_public},
    Result,
};

pub mod runner;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Debug)]
pub struct WsChat {
    outbound: mpsc::UnboundedSender<Message>,
}

/// Everything needed to (re)open the socket.
#[derive(Clone, Debug)]
struct Endpoint {
    url: String,
    cookie: String,
}

impl Endpoint {
    fn request(&self) -> Result<Request> {
        let mut req = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Config(format!("invalid CHAT_URL {}: {e}", self.url)))?;
        let cookie = HeaderValue::from_str(&self.cookie)
            .map_err(|e| Error::Config(format!("invalid auth token: {e}")))?;
        req.headers_mut().insert(header::COOKIE, cookie);
        Ok(req)
    }
}

impl WsChat {
    /// Validate the endpoint and start the connection task.
    ///
    /// The returned receiver yields connection events until the task gives up
    /// (immediately after the first close unless reconnect is enabled).
    pub fn connect(
        cfg: &Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>, JoinHandle<()>)> {
        let endpoint = Endpoint {
            url: cfg.chat_url.clone(),
            cookie: cfg.auth_cookie(),
        };
        endpoint.request()?;

        let policy = Policy {
            reconnect: cfg.reconnect.then_some(cfg.reconnect_delay),
            keepalive: cfg.keepalive,
        };
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(supervise(endpoint, policy, out_rx, ev_tx));

        Ok((Self { outbound: out_tx }, ev_rx, handle))
    }

    fn push(&self, msg: Message) -> Result<()> {
        self.outbound
            .send(msg)
            .map_err(|_| Error::Transport("chat connection is closed".to_string()))
    }
}

#[async_trait]
impl ChatPort for WsChat {
    async fn send_public(&self, text: &str) -> Result<()> {
        self.push(Message::text(encode_public(text)?))
    }

    async fn send_private(&self, nick: &str, text: &str) -> Result<()> {
        self.push(Message::text(encode_private(nick, text)?))
    }

    async fn send_ping(&self) -> Result<()> {
        self.push(Message::Ping(Default::default()))
    }
}

/// Payload of the watchdog pings, so their pongs are not mistaken for a
/// `!fping` acknowledgement.
const KEEPALIVE_PAYLOAD: &[u8] = b"ferretbot-keepalive";

/// Connection settings that outlive a single socket.
#[derive(Clone, Copy, Debug, Default)]
struct Policy {
    reconnect: Option<Duration>,
    keepalive: Option<Duration>,
}

async fn supervise(
    endpoint: Endpoint,
    policy: Policy,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<ChatEvent>,
) {
    loop {
        info!(url = %endpoint.url, "connecting to chat");
        let attempt = match endpoint.request() {
            Ok(req) => connect_async(req).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match attempt {
            Ok((socket, _)) => {
                let _ = events.send(ChatEvent::Connected);
                if !pump(socket, policy.keepalive, &mut outbound, &events).await {
                    return;
                }
            }
            Err(e) => {
                let _ = events.send(ChatEvent::Error(format!("connect failed: {e}")));
            }
        }

        // Reconnect is opt-in; by default the first close ends the event stream.
        let Some(delay) = policy.reconnect else {
            return;
        };
        info!("reconnecting in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Shuttle frames until the socket closes. Returns `false` once the bot side
/// has dropped its sender and there is nothing left to do.
///
/// With a keepalive interval, a watchdog ping goes out every tick and the
/// socket is dropped when the previous one was never answered.
async fn pump(
    socket: Socket,
    keepalive: Option<Duration>,
    outbound: &mut mpsc::UnboundedReceiver<Message>,
    events: &mpsc::UnboundedSender<ChatEvent>,
) -> bool {
    let (mut sink, mut stream) = socket.split();
    let mut watchdog = keepalive.map(|every| {
        let mut t = interval_at(Instant::now() + every, every);
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        let _ = events.send(ChatEvent::Error(format!("send failed: {e}")));
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return false;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Pong(payload))) if is_keepalive(&payload) => {
                    awaiting_pong = false;
                }
                Some(Ok(msg)) => {
                    if let Some(event) = translate(msg) {
                        let _ = events.send(event);
                    }
                }
                Some(Err(e)) => {
                    warn!("websocket read error: {e}");
                    let _ = events.send(ChatEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },
            _ = next_tick(&mut watchdog) => {
                if awaiting_pong {
                    warn!("keepalive pong missed, dropping connection");
                    let _ = events.send(ChatEvent::Error("keepalive pong missed".to_string()));
                    break;
                }
                if let Err(e) = sink.send(Message::Ping(KEEPALIVE_PAYLOAD.into())).await {
                    let _ = events.send(ChatEvent::Error(format!("keepalive ping failed: {e}")));
                    break;
                }
                awaiting_pong = true;
            },
        }
    }

    let _ = events.send(ChatEvent::Closed);
    true
}

fn is_keepalive(payload: &[u8]) -> bool {
    payload == KEEPALIVE_PAYLOAD
}

fn translate(msg: Message) -> Option<ChatEvent> {
    match msg {
        Message::Text(text) => {
            let decoded = decode_frame(text.as_str());
            if decoded.is_none() {
                debug!("ignoring frame: {}", text.as_str().chars().take(80).collect::<String>());
            }
            decoded.map(ChatEvent::Message)
        }
        Message::Pong(payload) if is_keepalive(&payload) => None,
        Message::Pong(_) => Some(ChatEvent::Ping),
        // Binary frames are not part of the chat protocol; pings are answered by tungstenite.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferretbot_core::domain::IncomingMessage;
    use tokio::net::TcpListener;

    fn endpoint(url: &str) -> Endpoint {
        Endpoint {
            url: url.to_string(),
            cookie: "authtoken=secret;".to_string(),
        }
    }

    #[test]
    fn handshake_carries_auth_cookie() {
        let req = endpoint("wss://chat.example.test/ws").request().unwrap();
        assert_eq!(
            req.headers().get(header::COOKIE).unwrap(),
            "authtoken=secret;"
        );
        assert_eq!(req.uri().host(), Some("chat.example.test"));
    }

    #[test]
    fn bad_url_is_a_config_error() {
        assert!(matches!(
            endpoint("not a url").request(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn translates_chat_frames_and_pongs() {
        let ev = translate(Message::text(
            r#"MSG {"nick":"Polecat","data":"!fuptime"}"#,
        ));
        assert_eq!(
            ev,
            Some(ChatEvent::Message(IncomingMessage {
                sender: "Polecat".to_string(),
                text: "!fuptime".to_string(),
            }))
        );
        assert_eq!(
            translate(Message::Pong(Default::default())),
            Some(ChatEvent::Ping)
        );
    }

    #[test]
    fn ignores_non_chat_frames() {
        assert_eq!(translate(Message::text(r#"JOIN {"nick":"x"}"#)), None);
        assert_eq!(translate(Message::text("MSG {broken")), None);
        assert_eq!(translate(Message::Binary(vec![1u8, 2, 3].into())), None);
        assert_eq!(translate(Message::Ping(Default::default())), None);
    }

    #[test]
    fn keepalive_pong_does_not_answer_a_ping_test() {
        assert_eq!(translate(Message::Pong(KEEPALIVE_PAYLOAD.into())), None);
        assert_eq!(
            translate(Message::Pong(b"other".as_slice().into())),
            Some(ChatEvent::Ping)
        );
    }

    #[tokio::test]
    async fn sends_fail_once_connection_task_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let chat = WsChat { outbound: tx };
        assert!(matches!(
            chat.send_public("hi").await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn refused_connection_ends_event_stream_without_reconnect() {
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();

        supervise(endpoint("ws://127.0.0.1:1/ws"), Policy::default(), out_rx, ev_tx).await;

        assert!(matches!(ev_rx.recv().await, Some(ChatEvent::Error(_))));
        assert_eq!(ev_rx.recv().await, None);
    }

    #[tokio::test]
    async fn missed_keepalive_pong_drops_the_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            // Complete the handshake, then never read so no pong is sent back.
            let _ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
        let policy = Policy {
            reconnect: None,
            keepalive: Some(Duration::from_millis(100)),
        };

        tokio::time::timeout(
            Duration::from_secs(5),
            supervise(endpoint(&format!("ws://{addr}/ws")), policy, out_rx, ev_tx),
        )
        .await
        .expect("watchdog should end the connection");

        assert_eq!(ev_rx.recv().await, Some(ChatEvent::Connected));
        assert_eq!(
            ev_rx.recv().await,
            Some(ChatEvent::Error("keepalive pong missed".to_string()))
        );
        assert_eq!(ev_rx.recv().await, Some(ChatEvent::Closed));
        assert_eq!(ev_rx.recv().await, None);
        server.abort();
    }
}
