use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("http {status}: {text}")]
    HttpStatus { status: StatusCode, text: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("socket error: {0}")]
    Socket(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for DeskError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match &err {
            WsError::Http(resp) if resp.status().as_u16() == 401 || resp.status().as_u16() == 403 => {
                Self::Unauthorized(format!("socket handshake rejected ({})", resp.status()))
            }
            _ => Self::Socket(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
