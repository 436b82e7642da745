//! jpxbrl - XBRL taxonomy resolution and statement tables for Japanese
//! disclosure filings (EDINET and TDnet)
//!
//! Licensed under AGPL-3.0

pub mod cache;
pub mod instance;
pub mod linkbase;
pub mod loader;
pub mod model;
pub mod network;
pub mod reader;
pub mod schema;
pub mod schema_tree;
pub mod statement;
pub mod taxonomy;

#[cfg(test)]
mod testing;

// Re-export main types
pub use instance::FactStore;
pub use loader::{DocumentLoader, ReportProfile};
pub use model::{Context, ElementSchema, Fact, Period, QName, RoleSchema};
pub use network::{ArcKind, MergePolicy, Network};
pub use reader::{Reader, ReaderOptions, Table, TableOptions, TableRow};
pub use schema::SchemaRegistry;
pub use schema_tree::{LinkbaseKind, SchemaTree};
pub use statement::Statement;
pub use taxonomy::{PeriodKind, RepositoryConfig, TaxonomyFamily, TaxonomyRepository};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML error: {0}")]
    Tree(#[from] roxmltree::Error),

    #[error("Invalid URI: {0}")]
    Uri(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Unresolved role: {0}")]
    UnresolvedRole(String),

    #[error("Failed to acquire taxonomy {version}: {reason}")]
    Acquisition { version: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),
}
