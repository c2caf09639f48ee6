//! Utility modules: timeout, reconnect policy.

pub mod reconnect;
pub mod timeout;
