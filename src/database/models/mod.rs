pub mod dates;
pub mod employee;
pub mod leave;
pub(crate) mod macros;
pub mod user;

// Re-export all models for easy importing
pub use employee::*;
pub use leave::*;
pub use user::*;
