use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time,
};
use tracing::{debug, info, instrument, warn};

use super::{
    ChangeEvent, ClientSelector, LinkItem, PlaybackCommand, Snapshot, SnapcastError,
    StreamCapabilities,
    protocol::{self, Request, Server},
};

/// Connection to a Snapcast server.
///
/// The link reports errors and never retries on its own: when the session
/// drops, the subscription ends with [`ChangeEvent::Disconnected`] and the
/// caller is expected to `connect` again, fetch `current_state`, and
/// `subscribe` anew.
#[async_trait]
pub trait SnapcastLink: Send + Sync + 'static {
    /// Open a new session, replacing any existing one.
    async fn connect(&self, address: &str) -> Result<(), SnapcastError>;

    /// Fetch the full server state and resolve the selected client.
    async fn current_state(&self, target: &ClientSelector) -> Result<Snapshot, SnapcastError>;

    /// Take the change event sequence of the current session.
    ///
    /// Each session's sequence can be taken once; it ends with
    /// `Disconnected`.
    fn subscribe(&self) -> BoxStream<'static, LinkItem>;

    /// Set the client volume level (0-100).
    async fn set_volume(&self, client_id: &str, level: u8) -> Result<(), SnapcastError>;

    /// Set the client mute flag.
    async fn set_mute(&self, client_id: &str, muted: bool) -> Result<(), SnapcastError>;

    /// Send a playback command to a stream.
    ///
    /// Fails with `Unsupported` without touching the wire when `capabilities`
    /// disallow the command.
    async fn send_playback_command(
        &self,
        stream_id: &str,
        command: PlaybackCommand,
        capabilities: &StreamCapabilities,
    ) -> Result<(), SnapcastError>;

    /// Close the current session, if any.
    async fn disconnect(&self);
}

struct PendingRequest {
    method: &'static str,
    /// Client whose volume the response confirms
    echo_client: Option<String>,
    reply: oneshot::Sender<Result<Value, SnapcastError>>,
}

type PendingRequests = Arc<Mutex<HashMap<u64, PendingRequest>>>;

struct Session {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    pending: PendingRequests,
    events: Option<mpsc::UnboundedReceiver<LinkItem>>,
    reader: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`SnapcastLink`] over the newline-delimited JSON-RPC control port.
pub struct TcpLink {
    request_timeout: Duration,
    next_id: AtomicU64,
    session: Mutex<Option<Session>>,
}

impl TcpLink {
    /// Create an unconnected link.
    ///
    /// # Arguments
    /// * `request_timeout` - How long a request may wait for its response
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            next_id: AtomicU64::new(1),
            session: Mutex::new(None),
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(u64) -> Request + Send,
        echo_client: Option<String>,
    ) -> Result<Value, SnapcastError> {
        let (writer, pending) = {
            let session = lock(&self.session);
            let session = session
                .as_ref()
                .ok_or_else(|| SnapcastError::Connection("not connected".to_string()))?;
            (Arc::clone(&session.writer), Arc::clone(&session.pending))
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = build(id);
        let method = request.method;
        let line = request.to_line()?;

        let (reply, response) = oneshot::channel();
        lock(&pending).insert(
            id,
            PendingRequest {
                method,
                echo_client,
                reply,
            },
        );

        debug!(id, method, "Sending snapcast request");
        if let Err(e) = writer.lock().await.write_all(line.as_bytes()).await {
            lock(&pending).remove(&id);
            return Err(e.into());
        }

        match time::timeout(self.request_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SnapcastError::Connection(
                "session closed before response".to_string(),
            )),
            Err(_) => {
                lock(&pending).remove(&id);
                Err(SnapcastError::Request {
                    method: method.to_string(),
                    reason: format!("no response within {:?}", self.request_timeout),
                })
            }
        }
    }
}

#[async_trait]
impl SnapcastLink for TcpLink {
    #[instrument(skip(self))]
    async fn connect(&self, address: &str) -> Result<(), SnapcastError> {
        lock(&self.session).take();

        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&pending), events_tx));

        *lock(&self.session) = Some(Session {
            writer: Arc::new(tokio::sync::Mutex::new(write_half)),
            pending,
            events: Some(events_rx),
            reader,
        });

        info!("Connected to snapcast server at {address}");
        Ok(())
    }

    async fn current_state(&self, target: &ClientSelector) -> Result<Snapshot, SnapcastError> {
        let result = self.request(Request::get_status, None).await?;
        Server::from_status_result(result)?.resolve(target)
    }

    fn subscribe(&self) -> BoxStream<'static, LinkItem> {
        let receiver = lock(&self.session)
            .as_mut()
            .and_then(|session| session.events.take());

        Box::pin(stream! {
            let Some(mut receiver) = receiver else {
                yield Ok(ChangeEvent::Disconnected {
                    reason: "no active session".to_string(),
                });
                return;
            };

            while let Some(item) = receiver.recv().await {
                let terminal = matches!(&item, Ok(event) if event.is_terminal());
                yield item;
                if terminal {
                    return;
                }
            }

            yield Ok(ChangeEvent::Disconnected {
                reason: "session closed".to_string(),
            });
        })
    }

    async fn set_volume(&self, client_id: &str, level: u8) -> Result<(), SnapcastError> {
        self.request(
            |id| Request::set_volume(id, client_id, level),
            Some(client_id.to_string()),
        )
        .await
        .map(|_| ())
    }

    async fn set_mute(&self, client_id: &str, muted: bool) -> Result<(), SnapcastError> {
        self.request(
            |id| Request::set_mute(id, client_id, muted),
            Some(client_id.to_string()),
        )
        .await
        .map(|_| ())
    }

    async fn send_playback_command(
        &self,
        stream_id: &str,
        command: PlaybackCommand,
        capabilities: &StreamCapabilities,
    ) -> Result<(), SnapcastError> {
        if !command.is_allowed_by(capabilities) {
            return Err(SnapcastError::Unsupported {
                stream_id: stream_id.to_string(),
                command,
            });
        }

        self.request(|id| Request::stream_control(id, stream_id, command), None)
            .await
            .map(|_| ())
    }

    async fn disconnect(&self) {
        if lock(&self.session).take().is_some() {
            info!("Closed snapcast session");
        }
    }
}

async fn read_loop(
    read_half: OwnedReadHalf,
    pending: PendingRequests,
    events: mpsc::UnboundedSender<LinkItem>,
) {
    let mut lines = BufReader::new(read_half).lines();

    let reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => handle_line(&line, &pending, &events),
            Ok(None) => break "server closed the connection".to_string(),
            Err(e) => break format!("read failed: {e}"),
        }
    };

    warn!("Snapcast session ended: {reason}");

    for (_, request) in lock(&pending).drain() {
        let _ = request
            .reply
            .send(Err(SnapcastError::Connection(reason.clone())));
    }

    let _ = events.send(Ok(ChangeEvent::Disconnected { reason }));
}

fn handle_line(line: &str, pending: &PendingRequests, events: &mpsc::UnboundedSender<LinkItem>) {
    let messages = match protocol::parse_line(line) {
        Ok(messages) => messages,
        Err(e) => {
            let _ = events.send(Err(e));
            return;
        }
    };

    for message in messages {
        if let Some(id) = message.id {
            let Some(request) = lock(pending).remove(&id) else {
                debug!(id, "Response for unknown request");
                continue;
            };

            let outcome = match (message.error, message.result) {
                (Some(error), _) => Err(SnapcastError::Request {
                    method: request.method.to_string(),
                    reason: error.message,
                }),
                (None, Some(result)) => {
                    if let Some(client_id) = &request.echo_client {
                        forward(
                            protocol::decode_volume_result(client_id, result.clone()),
                            events,
                        );
                    }
                    Ok(result)
                }
                (None, None) => Err(SnapcastError::Protocol(format!(
                    "response {id} has neither result nor error"
                ))),
            };

            let _ = request.reply.send(outcome);
        } else if let Some(method) = message.method {
            forward(protocol::decode_notification(&method, message.params), events);
        } else {
            let _ = events.send(Err(SnapcastError::Protocol(format!(
                "unexpected message: {line}"
            ))));
        }
    }
}

fn forward(
    decoded: Result<Vec<ChangeEvent>, SnapcastError>,
    events: &mpsc::UnboundedSender<LinkItem>,
) {
    match decoded {
        Ok(decoded) => {
            for event in decoded {
                let _ = events.send(Ok(event));
            }
        }
        Err(e) => {
            let _ = events.send(Err(e));
        }
    }
}
