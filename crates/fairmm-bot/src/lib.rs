//! fairmm quoting engine.
//!
//! Wires the library crates into a running bot:
//! - `AppConfig`: TOML configuration composing every crate's config
//! - `Engine`: single-writer interval loop (estimate → detect → plan → reconcile)
//! - `PortfolioView` / `MarketDataFeed`: collaborator seams
//! - `RandomWalkFeed`, `PaperVenue`, `PaperPortfolio`: simulated marketplace

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod portfolio;

pub use config::{AppConfig, AssetConfig, PaperConfig};
pub use engine::{directive_for, Engine, EngineStats, IntervalSummary};
pub use error::{AppError, AppResult};
pub use feed::{spawn_paper_market, MarketDataFeed, MarketEvent, PaperVenue, RandomWalkFeed};
pub use portfolio::{PaperPortfolio, PortfolioView};
