//! HTTP endpoint modules.

pub mod audit;
pub mod debug;
pub mod home;
pub mod status;
