// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod keys;
pub mod output;
pub mod session;
pub mod sources;
pub mod tokens;
pub mod types;
pub mod utils;

pub use config::ProviderConfig;
pub use engine::Finder;
pub use extractor::Extractor;
pub use session::Session;
pub use sources::{Source, SourceContext};
pub use types::{FinderError, FinderOptions, Keys, SessionConfig, SourceResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
