use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModemError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient buffered data: requested {requested}, available {available}")]
    InsufficientData { requested: usize, available: usize },

    #[error("Message does not fit the configured length field")]
    MessageTooLong,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Malformed packet length field: {0}")]
    MalformedLength(u128),

    #[error("Malformed padding field: {0}")]
    MalformedModulo(u128),

    #[error("Invalid bit character: {0:?}")]
    InvalidBitChar(char),
}

pub type Result<T> = std::result::Result<T, ModemError>;
