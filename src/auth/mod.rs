pub mod handlers;
pub mod password;
pub mod provision;
pub mod token;
pub mod validation;
