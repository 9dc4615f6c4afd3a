// Presentation layer - HTTP control surface and the terminal power monitor
pub mod app_state;
pub mod handlers;
pub mod monitor;
pub mod routes;
