mod ai;
mod constants;
mod game_engine;
mod game_state;
mod snake;

pub mod api;
pub mod leaderboard;
pub mod util;

pub use ai::*;
pub use constants::*;
pub use game_engine::*;
pub use game_state::*;
pub use leaderboard::{LeaderboardEntry, RankedLeaderboard, SortKey, SortOrder};
pub use snake::*;
pub use util::PseudoRandom;
