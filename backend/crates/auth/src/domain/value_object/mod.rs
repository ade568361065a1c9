//! Value Object Module

pub mod user_name;

pub use kernel::id::{SessionId, UserId};
pub use user_name::{UserName, UserNameError};
