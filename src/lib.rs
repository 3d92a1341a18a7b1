pub mod app;
pub mod config;
pub mod document;
pub mod errors;
pub mod handlers;
pub mod leaderboard;
pub mod models;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod streak;
pub mod validation;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use stats::{compute_trend, last_7_days, MissingDayLimit};
pub use storage::load_data;
pub use streak::compute_streak;
