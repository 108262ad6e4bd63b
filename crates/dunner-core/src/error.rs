use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("invalid phone format")]
    InvalidPhoneFormat,
    #[error("level table must start at day 0 and strictly ascend")]
    InvalidLevelTable,
    #[error("escalation would lower the level")]
    WouldDeescalate,
    #[error("escalation is paused")]
    EscalationPaused,
    #[error("escalation is already paused")]
    AlreadyPaused,
    #[error("escalation is not paused")]
    NotPaused,
    #[error("payment claim is already resolved")]
    ClaimAlreadyResolved,
    #[error("an active payment claim already exists for this invoice")]
    ClaimAlreadyPending,
    #[error("principal must be greater than zero")]
    InvalidPrincipal,
    #[error("due date cannot be in the future")]
    DueDateInFuture,
}
