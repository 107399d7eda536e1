pub mod browser;
pub(crate) mod dom;
pub mod error;
pub mod marketplaces;
pub(crate) mod parse;
pub(crate) mod throttle;

pub use browser::{
    BrowserSessionManager, BrowserSettings, BrowserStatus, Session, SessionGuard, SessionSource,
};
pub use error::ScraperError;
pub use marketplaces::{default_extractors, Extractor, ScraperSettings};
