//! Type definitions

pub mod character;
pub mod messages;
pub mod user;

pub use character::*;
pub use messages::*;
pub use user::*;
