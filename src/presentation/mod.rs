// Presentation layer - HTTP handlers and state
pub mod api_error;
pub mod app_state;
pub mod handlers;
