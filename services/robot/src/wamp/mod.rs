//! Minimal WAMP v2 client for talking to the robot platform.
//!
//! The robot exposes its speech, motors and sensors as WAMP procedures and
//! topics. A single driver task owns the WebSocket and the tables of pending
//! requests; [`WampSession`] handles talk to it over a channel, so they are
//! cheap to clone and share between tasks.

pub mod message;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use message::{CALL, Dict, SUBSCRIBE, WampMessage};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{Instrument, debug, error, info, warn};

/// WebSocket subprotocol for the JSON serialization.
pub const SUBPROTOCOL: &str = "wamp.2.json";

const COMMAND_CHANNEL_SIZE: usize = 64;

/// How long [`WampSession::call`] waits for a RESULT or ERROR by default.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum WampError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("WAMP protocol violation: {0}")]
    Protocol(String),
    #[error("Session aborted by router: {0}")]
    Aborted(String),
    #[error("Call to {procedure} failed: {error} {args:?}")]
    Call {
        procedure: String,
        error: String,
        args: Vec<Value>,
    },
    #[error("Subscription to {topic} failed: {error}")]
    Subscribe { topic: String, error: String },
    #[error("Call to {procedure} got no answer within {after:?}")]
    Timeout { procedure: String, after: Duration },
    #[error("WAMP session is closed")]
    Closed,
}

/// Positional and keyword results of a successful call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
    pub args: Vec<Value>,
    pub kwargs: Dict,
}

/// Payload of a published event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WampEvent {
    pub args: Vec<Value>,
    pub kwargs: Dict,
}

enum Command {
    Call {
        procedure: String,
        args: Vec<Value>,
        kwargs: Dict,
        reply: oneshot::Sender<Result<CallResult, WampError>>,
    },
    Subscribe {
        topic: String,
        events: mpsc::Sender<WampEvent>,
        reply: oneshot::Sender<Result<u64, WampError>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a joined WAMP session.
#[derive(Clone, Debug)]
pub struct WampSession {
    commands: mpsc::Sender<Command>,
    session_id: u64,
    call_timeout: Duration,
}

impl WampSession {
    /// Opens the WebSocket, joins `realm` and starts the driver task.
    pub async fn connect(url: &str, realm: &str) -> Result<Self, WampError> {
        let mut request = url.into_client_request()?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            SUBPROTOCOL
                .parse()
                .map_err(|_| WampError::Protocol("invalid subprotocol header".to_string()))?,
        );

        let (ws_stream, _) = connect_async(request).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let hello = WampMessage::Hello {
            realm: realm.to_string(),
            details: dict(json!({
                "agent": "riddler-robot",
                "roles": { "caller": {}, "subscriber": {} }
            })),
        };
        sink.send(WsMessage::Text(hello.to_text().into())).await?;

        let session_id = loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => match WampMessage::parse(&text)? {
                    WampMessage::Welcome { session, .. } => break session,
                    WampMessage::Abort { reason, .. } => return Err(WampError::Aborted(reason)),
                    other => {
                        return Err(WampError::Protocol(format!(
                            "expected WELCOME, got {other:?}"
                        )));
                    }
                },
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(WampError::Closed),
            }
        };
        info!(session_id, realm, "Joined WAMP realm");

        let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let span = tracing::info_span!("wamp_driver", session_id);
        tokio::spawn(
            async move {
                if let Err(e) = drive(sink, stream, rx).await {
                    error!(error = %e, "WAMP session terminated with error");
                }
                info!("WAMP driver finished");
            }
            .instrument(span),
        );

        Ok(Self {
            commands,
            session_id,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Sets how long each call may wait for the router's answer.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Calls `procedure` and waits for its result. `kwargs` must be a JSON
    /// object or `null`. Fails with [`WampError::Timeout`] if the router does
    /// not answer within the session's call timeout.
    pub async fn call(
        &self,
        procedure: &str,
        args: Vec<Value>,
        kwargs: Value,
    ) -> Result<CallResult, WampError> {
        let kwargs = match kwargs {
            Value::Object(map) => map,
            Value::Null => Dict::new(),
            other => {
                return Err(WampError::Protocol(format!(
                    "kwargs must be an object, got {other}"
                )));
            }
        };
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Call {
                procedure: procedure.to_string(),
                args,
                kwargs,
                reply,
            })
            .await
            .map_err(|_| WampError::Closed)?;
        match tokio::time::timeout(self.call_timeout, response).await {
            Ok(answer) => answer.map_err(|_| WampError::Closed)?,
            Err(_) => {
                warn!(procedure, timeout_secs = self.call_timeout.as_secs_f64(), "WAMP call timed out");
                Err(WampError::Timeout {
                    procedure: procedure.to_string(),
                    after: self.call_timeout,
                })
            }
        }
    }

    /// Subscribes to `topic`; events arrive on the returned receiver.
    pub async fn subscribe(
        &self,
        topic: &str,
        buffer: usize,
    ) -> Result<mpsc::Receiver<WampEvent>, WampError> {
        let (events, receiver) = mpsc::channel(buffer.max(1));
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Subscribe {
                topic: topic.to_string(),
                events,
                reply,
            })
            .await
            .map_err(|_| WampError::Closed)?;
        let subscription = response.await.map_err(|_| WampError::Closed)??;
        debug!(topic, subscription, "Subscribed");
        Ok(receiver)
    }

    /// Sends GOODBYE and waits for the router to acknowledge it.
    pub async fn leave(&self) -> Result<(), WampError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Leave { reply })
            .await
            .map_err(|_| WampError::Closed)?;
        response.await.map_err(|_| WampError::Closed)
    }
}

/// Converts a JSON object into a WAMP dict; anything else becomes empty.
pub fn dict(value: Value) -> Dict {
    match value {
        Value::Object(map) => map,
        _ => Dict::new(),
    }
}

struct PendingCall {
    procedure: String,
    reply: oneshot::Sender<Result<CallResult, WampError>>,
}

struct PendingSubscribe {
    topic: String,
    events: mpsc::Sender<WampEvent>,
    reply: oneshot::Sender<Result<u64, WampError>>,
}

#[derive(Default)]
struct Tables {
    next_request: u64,
    calls: HashMap<u64, PendingCall>,
    subscribing: HashMap<u64, PendingSubscribe>,
    subscriptions: HashMap<u64, mpsc::Sender<WampEvent>>,
}

impl Tables {
    fn request_id(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    /// Drops pending calls whose caller has stopped waiting.
    fn forget_abandoned(&mut self) {
        let before = self.calls.len();
        self.calls.retain(|_, call| !call.reply.is_closed());
        let dropped = before - self.calls.len();
        if dropped > 0 {
            debug!(dropped, "Forgot abandoned calls");
        }
    }

    fn fail_all(&mut self) {
        for (_, call) in self.calls.drain() {
            let _ = call.reply.send(Err(WampError::Closed));
        }
        for (_, sub) in self.subscribing.drain() {
            let _ = sub.reply.send(Err(WampError::Closed));
        }
        self.subscriptions.clear();
    }
}

enum Flow {
    Continue,
    Stop,
}

async fn send<S>(sink: &mut S, message: WampMessage) -> Result<(), WampError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    sink.send(WsMessage::Text(message.to_text().into())).await?;
    Ok(())
}

/// Main event loop: forwards commands to the router and routes replies back.
async fn drive<S, R>(
    mut sink: S,
    mut stream: R,
    mut commands: mpsc::Receiver<Command>,
) -> Result<(), WampError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let mut tables = Tables::default();
    let mut leaving: Option<oneshot::Sender<()>> = None;

    let result = loop {
        tokio::select! {
            command = commands.recv(), if leaving.is_none() => {
                match command {
                    Some(Command::Call { procedure, args, kwargs, reply }) => {
                        let request = tables.request_id();
                        debug!(request, %procedure, "CALL");
                        let message = WampMessage::Call {
                            request,
                            options: Dict::new(),
                            procedure: procedure.clone(),
                            args,
                            kwargs,
                        };
                        if let Err(e) = send(&mut sink, message).await {
                            let _ = reply.send(Err(WampError::Closed));
                            break Err(e);
                        }
                        tables.forget_abandoned();
                        tables.calls.insert(request, PendingCall { procedure, reply });
                    }
                    Some(Command::Subscribe { topic, events, reply }) => {
                        let request = tables.request_id();
                        let message = WampMessage::Subscribe {
                            request,
                            options: Dict::new(),
                            topic: topic.clone(),
                        };
                        if let Err(e) = send(&mut sink, message).await {
                            let _ = reply.send(Err(WampError::Closed));
                            break Err(e);
                        }
                        tables.subscribing.insert(request, PendingSubscribe { topic, events, reply });
                    }
                    Some(Command::Leave { reply }) => {
                        let goodbye = WampMessage::Goodbye {
                            details: Dict::new(),
                            reason: "wamp.close.system_shutdown".to_string(),
                        };
                        if let Err(e) = send(&mut sink, goodbye).await {
                            let _ = reply.send(());
                            break Err(e);
                        }
                        leaving = Some(reply);
                    }
                    None => {
                        // Every handle is gone; nobody can use the session any more.
                        let goodbye = WampMessage::Goodbye {
                            details: Dict::new(),
                            reason: "wamp.close.system_shutdown".to_string(),
                        };
                        let _ = send(&mut sink, goodbye).await;
                        break Ok(());
                    }
                }
            },
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let message = match WampMessage::parse(&text) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!(error = %e, "Ignoring malformed WAMP message");
                                continue;
                            }
                        };
                        match route(&mut tables, &mut sink, message, &mut leaving).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Stop) => break Ok(()),
                            Err(e) => break Err(e),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Router closed the connection");
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            },
        }
    };

    tables.fail_all();
    if let Some(reply) = leaving.take() {
        let _ = reply.send(());
    }
    let _ = sink.close().await;
    result
}

async fn route<S>(
    tables: &mut Tables,
    sink: &mut S,
    message: WampMessage,
    leaving: &mut Option<oneshot::Sender<()>>,
) -> Result<Flow, WampError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    match message {
        WampMessage::Result { request, args, kwargs, .. } => match tables.calls.remove(&request) {
            Some(call) => {
                let _ = call.reply.send(Ok(CallResult { args, kwargs }));
            }
            None => debug!(request, "RESULT for unknown or abandoned request"),
        },
        WampMessage::Error { request_type, request, error, args, .. } if request_type == CALL => {
            match tables.calls.remove(&request) {
                Some(call) => {
                    let _ = call.reply.send(Err(WampError::Call {
                        procedure: call.procedure,
                        error,
                        args,
                    }));
                }
                None => warn!(request, %error, "ERROR for unknown call"),
            }
        }
        WampMessage::Error { request_type, request, error, .. } if request_type == SUBSCRIBE => {
            if let Some(sub) = tables.subscribing.remove(&request) {
                let _ = sub.reply.send(Err(WampError::Subscribe { topic: sub.topic, error }));
            }
        }
        WampMessage::Subscribed { request, subscription } => {
            if let Some(sub) = tables.subscribing.remove(&request) {
                tables.subscriptions.insert(subscription, sub.events);
                let _ = sub.reply.send(Ok(subscription));
            }
        }
        WampMessage::Event { subscription, args, kwargs, .. } => {
            if let Some(events) = tables.subscriptions.get(&subscription) {
                if let Err(e) = events.try_send(WampEvent { args, kwargs }) {
                    warn!(subscription, error = %e, "Dropping event");
                }
            }
        }
        WampMessage::Goodbye { reason, .. } => {
            match leaving.take() {
                Some(reply) => {
                    let _ = reply.send(());
                }
                None => {
                    info!(%reason, "Router ended the session");
                    let ack = WampMessage::Goodbye {
                        details: Dict::new(),
                        reason: "wamp.close.goodbye_and_out".to_string(),
                    };
                    send(sink, ack).await?;
                }
            }
            return Ok(Flow::Stop);
        }
        WampMessage::Abort { reason, .. } => return Err(WampError::Aborted(reason)),
        other => warn!(message = ?other, "Unexpected WAMP message"),
    }
    Ok(Flow::Continue)
}
