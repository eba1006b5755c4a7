use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("Wallet {wallet_id} does not belong to user {user_id}")]
    WalletOwnershipMismatch { wallet_id: String, user_id: String },
    #[error("Wallet {0} is not active")]
    WalletInactive(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient balance in wallet {0}")]
    InsufficientBalance(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Transaction already exists: {0}")]
    DuplicateTransaction(String),
    #[error("Settlement failure: {0}")]
    SettlementFailure(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Token error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PaymentError {
    /// Stable machine-readable code for the response surface.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidRequest(_) => "INVALID_REQUEST",
            PaymentError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            PaymentError::WalletOwnershipMismatch { .. } => "WALLET_OWNERSHIP_MISMATCH",
            PaymentError::WalletInactive(_) => "WALLET_INACTIVE",
            PaymentError::InvalidAmount(_) => "INVALID_AMOUNT",
            PaymentError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            PaymentError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            PaymentError::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
            PaymentError::SettlementFailure(_) => "SETTLEMENT_FAILURE",
            PaymentError::InvalidCredentials => "INVALID_CREDENTIALS",
            PaymentError::InvalidToken => "INVALID_TOKEN",
            PaymentError::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}
