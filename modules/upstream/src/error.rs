#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("object not found")]
    NotFound,

    #[error("unexpected payload: {0}")]
    Payload(String),

    #[error("remote fault {code}: {message}")]
    Fault { code: i64, message: String },
}
