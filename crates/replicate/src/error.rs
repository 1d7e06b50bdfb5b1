use ripple_binary::DecodeError;

pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors surfaced by the replication transport.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt delta stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("table error: {0}")]
    Table(#[from] ripple_core::Error),

    /// The peer closed the connection.
    #[error("peer disconnected")]
    Disconnected,
}
