use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown fixture model '{0}' (expected one of: publisher, book, shop, stock, sale)")]
    UnknownModel(String),
}
