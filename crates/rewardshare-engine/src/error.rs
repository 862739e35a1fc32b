use rewardshare_ledger::LedgerError;
use rewardshare_store::StoreError;
use thiserror::Error;

/// Action-boundary error taxonomy. Every failure is local to one action;
/// nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("already processed: {collection}/{id}")]
    AlreadyProcessed {
        collection: &'static str,
        id: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("identity provider error: {0}")]
    Identity(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Overflow => EngineError::Validation(e.to_string()),
            _ => EngineError::PreconditionFailed(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
