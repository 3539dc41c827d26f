// Session-based authentication

pub mod audit_logger;
pub mod identity;
pub mod session;
