//! filmshelf - a personal movie catalog kept in a single JSON or CSV file.
//!
//! Titles are looked up with a three-stage cascade (exact, substring,
//! fuzzy) over Unicode-normalized titles. When a stage yields several
//! candidates a [`Disambiguator`] decides which one was meant.
//!
//! # Quick start
//!
//! ```no_run
//! use filmshelf::{MatchCascade, Rating, Record, Resolution, StoreConfig};
//!
//! let config = StoreConfig::resolve(None).unwrap();
//! let store = filmshelf::storage::open(&config).unwrap();
//!
//! store
//!     .add(Record::new("The Godfather", "1972").with_rating(
//!         Rating::new(9.2).unwrap(),
//!     ))
//!     .unwrap();
//!
//! let catalog = store.list().unwrap();
//! match MatchCascade::new().resolve(catalog.titles(), "godfather") {
//!     Resolution::Unique(title) => println!("found {title}"),
//!     Resolution::Ambiguous { candidates, .. } => {
//!         println!("{} candidates", candidates.len())
//!     }
//!     Resolution::NoMatch => println!("nothing"),
//! }
//! ```

pub mod cli;
pub mod disambiguate;
pub mod error;
pub mod fuzzy;
pub mod migration;
pub mod normalize;
pub mod prompt;
pub mod record;
pub mod report;
pub mod resolve;
pub mod storage;
pub mod store_config;

pub use disambiguate::{Choice, Disambiguator, Selection};
pub use error::{Error, Result};
pub use record::{Catalog, Rating, Record};
pub use resolve::{Candidate, MatchCascade, Resolution, Stage};
pub use storage::Storage;
pub use store_config::{StoreConfig, StoreKind};
