pub mod app_config;
pub mod config;
pub mod products;
pub mod ranking;
pub mod search;
pub mod urls;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{discount_percent, reconcile_original_price, Marketplace, Product};
pub use ranking::{merge, quality_score};
pub use search::{MarketplaceStatus, SearchResult};
pub use urls::canonicalize_product_url;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown marketplace: {0}")]
    UnknownMarketplace(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
