pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ModelKind, SearchTerm};
pub use error::CoreError;
pub use structs::{Book, Publisher, Sale, SaleLine, Shop, Stock, NAME_MAX_LEN};
