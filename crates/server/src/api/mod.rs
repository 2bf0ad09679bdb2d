pub mod handlers;
pub mod middleware;
pub mod playback;
pub mod routes;
pub mod sessions;
pub mod torrents;

pub use handlers::ErrorResponse;
pub use routes::create_router;
