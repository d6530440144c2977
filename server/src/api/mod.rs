pub mod auth;
pub mod error;
pub mod extract;
pub mod leaderboard;
pub mod scores;
pub mod server;

pub use error::ApiError;
pub use extract::ApiJson;
pub use server::{AppState, build_router, run_api_server};
