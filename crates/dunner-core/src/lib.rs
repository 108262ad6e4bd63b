pub mod channel;
pub mod claim;
pub mod config;
pub mod contact;
pub mod error;
pub mod escalation;
pub mod ids;
pub mod interest;
pub mod invoice;
pub mod timeline;
