//! # Bookstore Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database holding the bookstore catalog.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** This crate encapsulates all database-specific logic. It provides a
//!   clean API to the rest of the application, hiding the underlying SQL.
//! - **Explicit Schema:** Tables are declared as plain DDL in [`schema`]; relationships
//!   are foreign keys plus navigation methods on [`CatalogRepository`].
//! - **All-or-nothing Loads:** A fixture batch is inserted inside one transaction that
//!   rolls back on any failure.
//!
//! ## Public API
//!
//! - `connect`: Opens the single-connection pool used for a run.
//! - `database_exists` / `create_database` / `drop_database`: Lifecycle of the database itself.
//! - `install_schema`: Drops and recreates every catalog table.
//! - `FixtureBatch`: A decoded fixture file.
//! - `CatalogRepository`: Loading, navigation and the publisher sales query.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod fixtures;
pub mod repository;
pub mod schema;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, create_database, database_exists, drop_database};
pub use error::DbError;
pub use fixtures::{FixtureBatch, FixtureRecord};
pub use repository::CatalogRepository;
pub use schema::install as install_schema;
