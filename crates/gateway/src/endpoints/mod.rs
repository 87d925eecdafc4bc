//! # Gatewayエンドポイント

pub mod health;
pub mod signed_upload;

pub use health::handle_health;
pub use signed_upload::{handle_method_not_allowed, handle_signed_upload};
