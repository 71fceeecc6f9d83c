use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Types(#[from] safenode_types::SafenodeError),

    #[error("key error: {0}")]
    Key(#[from] safenode_crypto::KeyError),

    #[error("could not create announcement: {0}")]
    Create(#[from] safenode_messages::CreateError),

    #[error("decode error: {0}")]
    Codec(#[from] safenode_messages::CodecError),

    #[error("wallet is locked")]
    WalletLocked,

    #[error("no collateral keys for {0}")]
    CollateralNotFound(String),

    #[error("unknown alias: {0}")]
    UnknownAlias(String),

    #[error("safenode list is not synced yet")]
    NotSynced,

    #[error("chain unavailable: {0}")]
    Chain(String),

    #[error("could not connect to {0}")]
    ConnectFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
