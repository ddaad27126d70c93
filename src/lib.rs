pub mod app;
pub mod chart;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fetcher;
pub mod handlers;
pub mod mock;
pub mod models;
pub mod reconciler;
pub mod schedule;
pub mod state;
pub mod svg;
pub mod timer;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use dashboard::Dashboard;
pub use state::AppState;
