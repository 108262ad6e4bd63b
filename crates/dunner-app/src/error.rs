use dunner_core::error::DomainError;
use dunner_ports::error::{PortError, SendError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("port error: {0}")]
    Port(#[from] PortError),
    #[error("send error: {0}")]
    Send(#[from] SendError),
}
