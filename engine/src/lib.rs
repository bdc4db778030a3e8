//! # Stash Engine
//!
//! An in-memory record store with a structured query engine.
//!
//! Records are JSON objects with one distinguished identifier field. The
//! [`Service`] exposes `get`, `find`, `create`, `update`, `patch` and `remove`;
//! `find` takes a query that filters, sorts, paginates and projects.
//!
//! ## Design Principles
//!
//! - **No IO**: nothing is persisted, nothing is sent over a network
//! - **Parse, then evaluate**: queries become a closed [`Query`] structure
//!   before touching any record, so malformed queries fail up front
//! - **Typed failures**: every error is an [`Error`] variant with an
//!   [`ErrorKind`] callers can branch on
//!
//! ## Queries
//!
//! A query object mixes field constraints with `$`-prefixed directives:
//!
//! - `field: value` - strict equality
//! - `field: { $in, $nin, $lt, $lte, $gt, $gte, $ne, $not }` - operators
//! - `$or`, `$and`, `$not` - boolean combinators over sub-filters
//! - `$sort`, `$skip`, `$limit`, `$select` - result shape
//!
//! ## Quick Start
//!
//! ```rust
//! use stash_engine::{Params, Service, ServiceConfig};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let people = Service::new(ServiceConfig::default());
//!
//! people
//!     .create(Some(json!([
//!         {"name": "Bob", "age": 25},
//!         {"name": "Alice", "age": 19},
//!     ])), &Params::new())
//!     .await
//!     .unwrap();
//!
//! let adults = people
//!     .find(&Params::with_query(json!({
//!         "age": {"$gte": 21},
//!         "$select": ["name"]
//!     })))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(adults.len(), 1);
//! assert_eq!(adults[0]["name"], "Bob");
//! # });
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod predicate;
pub mod query;
pub mod record;
pub mod service;
pub mod store;

// Re-export main types at crate root
pub use config::{ConfigError, IdStrategy, Paginate, ServiceConfig, DEFAULT_ID_FIELD};
pub use error::{Error, ErrorKind};
pub use pipeline::Outcome;
pub use query::{Clause, FieldCondition, Filter, Operator, Query, SortDirection, SortKey};
pub use record::{Record, RecordId};
pub use service::{Created, Page, Params, Service};
pub use store::Store;
