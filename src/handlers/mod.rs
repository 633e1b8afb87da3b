pub mod auth;
pub mod employees;
pub mod leaves;
pub mod shared;
