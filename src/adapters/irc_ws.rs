//! Production chat transport: Twitch IRC over WebSocket.
//!
//! Implements [`ChatTransport`] against `irc-ws.chat.twitch.tv`. Each
//! `connect()` performs the capability/login handshake and spawns an IO
//! task that answers PING, translates PRIVMSG/NOTICE lines into
//! [`TransportEvent`]s, and executes join/part commands queued by the
//! returned sink.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::irc;
use crate::traits::{ChatConnection, ChatError, ChatSink, ChatTransport, TransportEvent};

pub const TWITCH_IRC_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Buffer for transport events awaiting the session read loop.
const EVENT_BUFFER: usize = 100;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Credentials presented during the IRC handshake.
#[derive(Debug, Clone)]
pub enum IrcLogin {
    /// Read-only guest login; the server accepts any `justinfan` nick.
    Anonymous,
    /// Authenticated login. `token` is the bare OAuth token, with or
    /// without the `oauth:` prefix.
    Authenticated { login: String, token: String },
}

impl IrcLogin {
    fn nick(&self) -> String {
        match self {
            IrcLogin::Anonymous => {
                let digits = 10_000 + Uuid::new_v4().as_fields().0 % 90_000;
                format!("justinfan{}", digits)
            }
            IrcLogin::Authenticated { login, .. } => login.clone(),
        }
    }
}

/// Chat transport over the Twitch IRC WebSocket gateway.
pub struct IrcWsTransport {
    pub url: String,
    login: IrcLogin,
}

impl IrcWsTransport {
    /// Create a transport against the production gateway.
    pub fn new(login: IrcLogin) -> Self {
        Self::with_url(TWITCH_IRC_WS_URL.to_string(), login)
    }

    /// Create a transport against a custom gateway URL.
    pub fn with_url(url: String, login: IrcLogin) -> Self {
        Self { url, login }
    }
}

#[async_trait]
impl ChatTransport for IrcWsTransport {
    async fn connect(&self) -> Result<ChatConnection, ChatError> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;

        info!(url = %self.url, "connected to chat gateway");

        let (mut ws_sink, ws_source) = ws_stream.split();

        // Handshake before handing the sink to the IO task, so login
        // failures surface from connect(). PASS must precede NICK.
        send_line(&mut ws_sink, "CAP REQ :twitch.tv/tags twitch.tv/commands").await?;
        if let IrcLogin::Authenticated { token, .. } = &self.login {
            let token = token.trim_start_matches("oauth:");
            send_line(&mut ws_sink, &format!("PASS oauth:{}", token)).await?;
        }
        send_line(&mut ws_sink, &format!("NICK {}", self.login.nick())).await?;

        let (events_tx, events_rx) = mpsc::channel::<TransportEvent>(EVENT_BUFFER);
        let (command_tx, command_rx) = mpsc::unbounded_channel::<IrcCommand>();

        tokio::spawn(run_io_loop(ws_sink, ws_source, events_tx, command_rx));

        Ok(ChatConnection {
            sink: Arc::new(IrcSink {
                commands: command_tx,
            }),
            events: events_rx,
        })
    }
}

async fn send_line(ws_sink: &mut WsSink, line: &str) -> Result<(), ChatError> {
    ws_sink
        .send(Message::Text(line.to_string()))
        .await
        .map_err(|e| ChatError::SendFailed(e.to_string()))
}

enum IrcCommand {
    Join(String),
    Part(String),
    Close,
}

struct IrcSink {
    commands: mpsc::UnboundedSender<IrcCommand>,
}

#[async_trait]
impl ChatSink for IrcSink {
    async fn join(&self, channel_login: &str) -> Result<(), ChatError> {
        self.commands
            .send(IrcCommand::Join(channel_login.to_string()))
            .map_err(|_| ChatError::Closed)
    }

    fn part(&self, channel_login: &str) {
        // Fire-and-forget: a closed command channel means the connection
        // is already gone and the part is moot.
        let _ = self.commands.send(IrcCommand::Part(channel_login.to_string()));
    }

    fn disconnect(&self) {
        let _ = self.commands.send(IrcCommand::Close);
    }
}

#[derive(PartialEq)]
enum LineFlow {
    Continue,
    Stop,
}

/// IO loop owning both halves of the socket. Ends when the server closes,
/// the sink requests Close, or the event receiver is dropped.
async fn run_io_loop(
    mut ws_sink: WsSink,
    mut ws_source: WsSource,
    events_tx: mpsc::Sender<TransportEvent>,
    mut command_rx: mpsc::UnboundedReceiver<IrcCommand>,
) {
    'io: loop {
        tokio::select! {
            msg = ws_source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // The gateway batches several IRC lines per frame.
                        for raw in text.lines() {
                            if raw.is_empty() {
                                continue;
                            }
                            if handle_line(raw, &mut ws_sink, &events_tx).await == LineFlow::Stop {
                                break 'io;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("chat gateway closed the connection");
                        let _ = events_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error, closing chat connection");
                        let _ = events_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(IrcCommand::Join(channel)) => {
                        debug!(channel = %channel, "joining channel");
                        let _ = ws_sink.send(Message::Text(format!("JOIN #{}", channel))).await;
                    }
                    Some(IrcCommand::Part(channel)) => {
                        debug!(channel = %channel, "parting channel");
                        let _ = ws_sink.send(Message::Text(format!("PART #{}", channel))).await;
                    }
                    Some(IrcCommand::Close) | None => {
                        debug!("closing chat connection");
                        let _ = ws_sink.close().await;
                        let _ = events_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("chat io loop ended");
}

async fn handle_line(
    raw: &str,
    ws_sink: &mut WsSink,
    events_tx: &mpsc::Sender<TransportEvent>,
) -> LineFlow {
    let line = match irc::parse_line(raw) {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, raw, "skipping unparseable irc line");
            return LineFlow::Continue;
        }
    };

    match line.command.as_str() {
        "PING" => {
            let target = line
                .params
                .first()
                .map(String::as_str)
                .unwrap_or("tmi.twitch.tv");
            let _ = ws_sink.send(Message::Text(format!("PONG :{}", target))).await;
            LineFlow::Continue
        }
        "PRIVMSG" => match irc::inbound_from_privmsg(&line) {
            Ok(inbound) => {
                if events_tx.send(TransportEvent::Message(inbound)).await.is_err() {
                    debug!("event receiver dropped, stopping chat io loop");
                    return LineFlow::Stop;
                }
                LineFlow::Continue
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed PRIVMSG");
                LineFlow::Continue
            }
        },
        "NOTICE" => {
            let text = line.params.last().cloned().unwrap_or_default();
            if events_tx.send(TransportEvent::Notice(text)).await.is_err() {
                return LineFlow::Stop;
            }
            LineFlow::Continue
        }
        "RECONNECT" => {
            // The server is about to drop us; surface it as a close so the
            // session can re-establish on the next visibility transition.
            info!("chat gateway requested reconnect");
            let _ = events_tx.send(TransportEvent::Closed).await;
            LineFlow::Stop
        }
        _ => LineFlow::Continue,
    }
}
