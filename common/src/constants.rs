/// Side length of a single grid cell in arena units
pub const CELL_SIZE: i32 = 20;

/// Default arena width in arena units (20 cells)
pub const ARENA_WIDTH: i32 = 400;

/// Default arena height in arena units (20 cells)
pub const ARENA_HEIGHT: i32 = 400;

/// Default tick interval in milliseconds for the game loop
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 120;

/// Number of entries returned by the public leaderboard
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Upper bound for a caller supplied leaderboard limit
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
