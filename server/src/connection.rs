use npong_shared::protocol::ServerMsg;
use tokio::sync::mpsc;

/// Frames queued for a participant's socket task.
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(ServerMsg),
    /// Ask the socket task to close the connection.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The outbound queue is full (slow client)
    Full,
    /// The socket task has gone away
    Closed,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Full => write!(f, "outbound queue full"),
            SendError::Closed => write!(f, "connection closed"),
        }
    }
}

/// Handle to a participant's transport. Sending never blocks the game loop.
#[derive(Debug, Clone)]
pub struct Connection {
    id: String,
    tx: mpsc::Sender<Outbound>,
}

impl Connection {
    pub fn new(id: impl Into<String>, tx: mpsc::Sender<Outbound>) -> Self {
        Self { id: id.into(), tx }
    }

    /// Create a connection together with the receiving end of its queue.
    pub fn channel(id: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn send(&self, msg: ServerMsg) -> Result<(), SendError> {
        self.tx.try_send(Outbound::Message(msg)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Best-effort close; a connection that is already gone is fine.
    pub fn close(&self) {
        let _ = self.tx.try_send(Outbound::Close);
    }
}
