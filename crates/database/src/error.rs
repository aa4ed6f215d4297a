use core_types::ModelKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Database query failed: {0}")]
    QueryError(#[source] sqlx::Error),

    #[error("Constraint violation{}: {detail}", on_constraint(.constraint))]
    ConstraintViolation {
        constraint: Option<String>,
        detail: String,
    },

    #[error("Fixture #{index}: unknown model '{model}' (expected one of: publisher, book, shop, stock, sale)")]
    UnknownModel { index: usize, model: String },

    #[error("Fixture #{index} ({model} pk={pk}) has invalid fields: {reason}")]
    InvalidFixture {
        index: usize,
        model: ModelKind,
        pk: i32,
        reason: String,
    },

    #[error("{model} pk={pk} references missing {parent} pk={parent_pk}")]
    DanglingReference {
        model: ModelKind,
        pk: i32,
        parent: ModelKind,
        parent_pk: i32,
    },

    #[error("Failed to read fixture file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An error occurred during JSON deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

fn on_constraint(constraint: &Option<String>) -> String {
    constraint
        .as_deref()
        .map(|name| format!(" on '{name}'"))
        .unwrap_or_default()
}

/// Splits driver errors into constraint violations (SQLSTATE class 23 and
/// `string_data_right_truncation`) and everything else.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let is_constraint = db_err
                .code()
                .is_some_and(|code| code.starts_with("23") || code == "22001");
            if is_constraint {
                return DbError::ConstraintViolation {
                    constraint: db_err.constraint().map(str::to_string),
                    detail: db_err.message().to_string(),
                };
            }
        }
        DbError::QueryError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_stay_query_errors() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::QueryError(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn constraint_violation_message_names_the_constraint() {
        let err = DbError::ConstraintViolation {
            constraint: Some("publisher_name_key".to_string()),
            detail: "duplicate key value violates unique constraint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Constraint violation on 'publisher_name_key': duplicate key value violates unique constraint"
        );

        let err = DbError::ConstraintViolation {
            constraint: None,
            detail: "null value in column \"title\"".to_string(),
        };
        assert_eq!(err.to_string(), "Constraint violation: null value in column \"title\"");
    }
}
