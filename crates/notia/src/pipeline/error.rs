use thiserror::Error;

use crate::db::DatabaseError;
use crate::email::EmailError;

/// A failure confined to one message. The run logs it and moves on.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(EmailError),

    #[error("Decode failed: {0}")]
    Decode(EmailError),

    #[error("Persistence failed: {0}")]
    Persist(#[from] DatabaseError),
}
