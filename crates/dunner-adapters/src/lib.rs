pub mod analytics;
pub mod channels;
pub mod consent;
pub mod notify;
pub mod persistence;
pub mod throttle;
