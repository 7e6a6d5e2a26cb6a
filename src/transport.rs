use crate::data::Payload;
use crate::participant::Participant;
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("timed out connecting to {0}")]
    Timeout(String),
    #[error("connection closed")]
    Closed,
}

/// Lifecycle and data events surfaced by a connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connecting,
    Connected,
    Message(Payload),
    Closed(Option<String>),
    Error(String),
}

/// Server address plus the participant the connection speaks for.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub participant: Participant,
}

impl Endpoint {
    pub fn new(host: &str, participant: Participant) -> Self {
        Self {
            host: normalize_host(host),
            participant,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}{}", self.host, self.participant.path())
    }
}

/// Strips a leading `scheme://` and trailing `/` from operator input.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = match host.find("://") {
        Some(index) => &host[index + 3..],
        None => host,
    };
    host.trim_end_matches('/').to_owned()
}

/// Duplex message channel as seen from a single threaded caller.
pub trait Channel {
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    fn send_binary(&mut self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Next pending event, never blocks.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

/// WebSocket connection driven on its own thread.
pub struct Connection {
    endpoint: Endpoint,
    sender: Option<Sender<Payload>>,
    events: UnboundedReceiver<TransportEvent>,
    join_handle: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn open(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let url = endpoint.url();
        let handle = thread::spawn(move || {
            if let Err(error) = run_connection(url, connect_timeout, &mut rx, &event_tx) {
                error!("connection failed [{}]", error);
                let _ = event_tx.send(TransportEvent::Error(error.to_string()));
            }
            // the outbound queue closes only after the cause was reported
            drop(rx);
        });
        Connection {
            endpoint,
            sender: Some(tx),
            events: event_rx,
            join_handle: Some(handle),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        match self.sender {
            Some(ref sender) => sender
                .blocking_send(payload)
                .map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }
}

impl Channel for Connection {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.send(Payload::Text(text))
    }

    fn send_binary(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.send(Payload::Binary(data))
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("closing connection to {}", self.endpoint.url());
        drop(self.sender.take());
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("transport thread for {} panicked", self.endpoint.url());
            }
        }
    }
}

fn run_connection(
    url: String,
    connect_timeout: Duration,
    outbound: &mut Receiver<Payload>,
    events: &UnboundedSender<TransportEvent>,
) -> Result<(), TransportError> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let _ = events.send(TransportEvent::Connecting);
        info!("connecting to {}", url);
        let (stream, _response) =
            tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| TransportError::Timeout(url.clone()))??;
        info!("connected to {}", url);
        let _ = events.send(TransportEvent::Connected);

        let (mut write, mut read) = stream.split();
        loop {
            tokio::select! {
                outgoing = outbound.recv() => match outgoing {
                    Some(Payload::Text(text)) => write.send(Message::Text(text)).await?,
                    Some(Payload::Binary(data)) => write.send(Message::Binary(data)).await?,
                    None => {
                        // owner dropped the connection
                        let _ = write.send(Message::Close(None)).await;
                        let _ = events.send(TransportEvent::Closed(None));
                        return Ok(());
                    }
                },
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(TransportEvent::Message(Payload::Text(text)));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = events.send(TransportEvent::Message(Payload::Binary(data)));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("connection closing [{:?}]", frame);
                        let reason = frame.map(|frame| frame.reason.into_owned());
                        let _ = events.send(TransportEvent::Closed(reason));
                        return Ok(());
                    }
                    Some(Ok(message)) => trace!("unused message [{:?}]", message),
                    Some(Err(error)) => return Err(error.into()),
                    None => {
                        let _ = events.send(TransportEvent::Closed(None));
                        return Ok(());
                    }
                },
            }
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantKind;

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_host("https://pong.local:42069/"), "pong.local:42069");
        assert_eq!(normalize_host("ws://10.0.0.2:42069"), "10.0.0.2:42069");
        assert_eq!(normalize_host(" localhost:42069 "), "localhost:42069");
    }

    #[test]
    fn endpoint_url_carries_participant_path() {
        let endpoint = Endpoint::new(
            "http://pong.local:42069/",
            Participant::new(ParticipantKind::Observer, 5),
        );
        assert_eq!(endpoint.url(), "ws://pong.local:42069/observer/5");
    }

    #[test]
    fn unreachable_host_reports_error() {
        // nothing listens on port 9 of the loopback interface
        let endpoint = Endpoint::new(
            "127.0.0.1:9",
            Participant::new(ParticipantKind::Racket, 0),
        );
        let mut connection = Connection::open(endpoint, Duration::from_secs(5));
        let mut seen = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            match connection.poll_event() {
                Some(event) => {
                    let done = matches!(event, TransportEvent::Error(_));
                    seen.push(event);
                    if done {
                        break;
                    }
                }
                None => thread::sleep(Duration::from_millis(10)),
            }
        }
        assert_eq!(seen.first(), Some(&TransportEvent::Connecting));
        assert!(matches!(seen.last(), Some(TransportEvent::Error(_))));
    }

    #[test]
    fn failed_connect_reports_cause_before_refusing_sends() {
        let endpoint = Endpoint::new(
            "127.0.0.1:9",
            Participant::new(ParticipantKind::Head, 1),
        );
        let mut connection = Connection::open(endpoint, Duration::from_secs(5));
        let mut attempts = 0;
        while connection.send_text("{}".to_owned()).is_ok() {
            attempts += 1;
            assert!(attempts < 10_000, "sends never failed");
            thread::sleep(Duration::from_millis(1));
        }
        let events: Vec<_> = std::iter::from_fn(|| connection.poll_event()).collect();
        assert!(events
            .iter()
            .any(|event| matches!(event, TransportEvent::Error(_))));
    }
}
