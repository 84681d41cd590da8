mod api;
mod health;
mod ws;

pub use api::{greetings_handler, hearts_handler};
pub use health::health_handler;
pub use ws::{resolve_identity, ws_handler};
