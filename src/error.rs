use crate::core::SlotId;
use thiserror::Error;

/// エンジンプロセスまわりのエラー
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn engine `{path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine process for slot {slot} has no {pipe} pipe")]
    MissingPipe { slot: SlotId, pipe: &'static str },

    #[error("engine session for slot {0} is closed")]
    Closed(SlotId),

    #[error("engine output for slot {0} already has a subscriber")]
    AlreadySubscribed(SlotId),
}

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("invalid FEN `{fen}`: {reason}")]
    InvalidFen { fen: String, reason: String },
}
