use thiserror::Error;

use crate::host::{ScreenId, WindowId};

#[derive(Error, Debug)]
pub enum ShowdeskError {
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectError),

    #[error("X11 reply error: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X11 reply or ID error: {0}")]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),

    #[error("X11 connection error: {0}")]
    ConnectionError(#[from] x11rb::errors::ConnectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid window match '{expr}': {reason}")]
    InvalidMatch { expr: String, reason: String },

    #[error("Unknown slide direction '{0}'")]
    InvalidDirection(String),

    #[error("Screen {0} is not attached")]
    UnknownScreen(ScreenId),

    #[error("Window 0x{0:x} is not known to the host")]
    UnknownWindow(WindowId),
}

pub type Result<T> = std::result::Result<T, ShowdeskError>;
