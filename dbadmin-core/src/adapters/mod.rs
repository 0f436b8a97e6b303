//! Concrete collaborators behind the core traits.
//!
//! # Module Structure
//! - `mysql`: [`crate::catalog::SchemaCatalog`], [`crate::operations::SqlExecutor`]
//!   and [`crate::operations::Disconnect`] over one sqlx MySQL connection
//! - `mongodb`: [`crate::sink::DocumentStore`] over the MongoDB driver
//!
//! Both are feature-gated (`mysql`, `mongodb`; enabled by default).

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mongodb")]
pub mod mongodb;

#[cfg(feature = "mysql")]
pub use mysql::MySqlServer;

#[cfg(feature = "mongodb")]
pub use mongodb::MongoStore;
