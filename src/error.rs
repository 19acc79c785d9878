use thiserror::Error;

/// Alias for results produced by this driver.
pub type Result<T> = std::result::Result<T, StageError>;

/// Failure modes of a stage session.
///
/// Open failures and pre-flight rejections leave no bytes on the wire and
/// may be retried. Every other variant means the byte stream can no longer
/// be trusted and the session must be reopened.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("no connection on port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("unsupported device: model {model}, firmware {firmware}")]
    UnsupportedDevice { model: String, firmware: u32 },

    #[error("expected a reply of {expected} bytes but read {actual} bytes")]
    ReplyLength { expected: usize, actual: usize },

    #[error("reply carries unexpected opcode {opcode:#06x}")]
    UnexpectedReply { opcode: u16 },

    #[error("{count} unread bytes left on the port after an exchange")]
    LeftoverBytes { count: usize },

    #[error("enable state byte must be 1 or 2, device sent {0}")]
    InvalidEnableState(u8),

    #[error("enable state mismatch: requested {requested}, device reports {actual}")]
    EnableMismatch { requested: bool, actual: bool },

    #[error(
        "target {target_mm:.4} mm outside travel range \
         {min_mm} mm..{max_mm} mm (tolerance {tol_mm} mm)"
    )]
    OutOfRange {
        target_mm: f64,
        min_mm: f64,
        max_mm: f64,
        tol_mm: f64,
    },

    #[error("no channel id established; query the position before moving")]
    ChannelNotEstablished,

    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Whether the session is unusable after this error.
    ///
    /// Errors raised before any byte reaches the device are recoverable:
    /// the caller can retry with a corrected port name or target. Once an
    /// exchange has gone wrong the device and driver may disagree on the
    /// stream position, so everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StageError::Connection { .. }
                | StageError::OutOfRange { .. }
                | StageError::ChannelNotEstablished
        )
    }
}
