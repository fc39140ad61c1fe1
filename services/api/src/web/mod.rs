pub mod auth;
pub mod map_session;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod ws_handler;

// Re-export the pieces the binary needs to assemble the server.
pub use middleware::require_auth;
pub use router::build_router;
pub use ws_handler::ws_handler;
