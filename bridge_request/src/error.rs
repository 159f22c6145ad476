//! Errors produced while building bridge-and-call requests.

/// Request building error
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("amount has {given} fractional digits, token allows {max}")]
    TooManyDecimals { given: usize, max: u8 },

    #[error("amount does not fit in 128 bits")]
    AmountOverflow,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("unknown token {symbol} on chain {chain_id}")]
    UnknownToken { symbol: String, chain_id: u64 },

    #[error("no distributor deployment on chain {0}")]
    NoDeployment(u64),

    #[error("duplicate token {symbol} on chain {chain_id}")]
    DuplicateToken { symbol: String, chain_id: u64 },

    #[error("recipient list is empty")]
    EmptyRecipients,

    #[error("{count} recipients exceed the limit of {max}")]
    TooManyRecipients { count: usize, max: usize },

    #[error("recipient {index} has share {share_bps} bps, above 10000")]
    InvalidShare { index: usize, share_bps: u32 },

    #[error("shares add up to {0} bps, above 10000")]
    InvalidShareTotal(u32),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RequestError>;
