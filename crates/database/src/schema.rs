//! Table definitions for the catalog and the installer that resets them.
//!
//! Relationships are expressed as foreign keys only; navigation between
//! entities lives in [`crate::repository::CatalogRepository`]. No foreign key
//! cascades, so deleting a parent row with dependents fails instead of
//! orphaning them.

use crate::error::DbError;
use core_types::ModelKind;
use sqlx::PgPool;

/// The DDL of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub kind: ModelKind,
    pub ddl: &'static str,
}

/// All catalog tables, parents before children.
pub const TABLES: &[TableDef] = &[
    TableDef {
        kind: ModelKind::Publisher,
        ddl: r#"
            CREATE TABLE publisher (
                id   INTEGER PRIMARY KEY,
                name VARCHAR(40) UNIQUE
            )
        "#,
    },
    TableDef {
        kind: ModelKind::Shop,
        ddl: r#"
            CREATE TABLE shop (
                id   INTEGER PRIMARY KEY,
                name VARCHAR(40) UNIQUE
            )
        "#,
    },
    TableDef {
        kind: ModelKind::Book,
        ddl: r#"
            CREATE TABLE book (
                id           INTEGER PRIMARY KEY,
                title        VARCHAR(40) NOT NULL,
                id_publisher INTEGER NOT NULL REFERENCES publisher (id)
            )
        "#,
    },
    TableDef {
        kind: ModelKind::Stock,
        ddl: r#"
            CREATE TABLE stock (
                id      INTEGER PRIMARY KEY,
                id_book INTEGER NOT NULL REFERENCES book (id),
                id_shop INTEGER NOT NULL REFERENCES shop (id),
                count   INTEGER
            )
        "#,
    },
    TableDef {
        kind: ModelKind::Sale,
        ddl: r#"
            CREATE TABLE sale (
                id        INTEGER PRIMARY KEY,
                price     DOUBLE PRECISION,
                date_sale DATE NOT NULL,
                id_stock  INTEGER NOT NULL REFERENCES stock (id),
                count     INTEGER
            )
        "#,
    },
];

/// Drops every catalog table that exists and creates all of them again.
///
/// Runs in one transaction, so a failure leaves the previous schema intact.
/// Any existing catalog data is destroyed.
pub async fn install(pool: &PgPool) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for table in TABLES.iter().rev() {
        let drop_sql = format!("DROP TABLE IF EXISTS {}", table.kind);
        sqlx::query(&drop_sql).execute(&mut *tx).await?;
        tracing::debug!(table = %table.kind, "Dropped table (if present).");
    }

    for table in TABLES {
        sqlx::query(table.ddl).execute(&mut *tx).await?;
        tracing::debug!(table = %table.kind, "Created table.");
    }

    tx.commit().await?;
    tracing::info!(tables = TABLES.len(), "Catalog schema installed.");
    Ok(())
}
