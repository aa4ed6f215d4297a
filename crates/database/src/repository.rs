use crate::fixtures::{FixtureBatch, FixtureRecord};
use crate::schema;
use crate::DbError;
use core_types::{Book, ModelKind, Publisher, Sale, SaleLine, SearchTerm, Shop, Stock};
use sqlx::postgres::{PgConnection, PgPool};
use std::collections::BTreeMap;
use std::path::Path;

/// The `CatalogRepository` provides a high-level, application-specific interface
/// to the bookstore catalog. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

const SALES_BY_PUBLISHER_ID: &str = r#"
    SELECT
        b.title, sh.name AS shop_name, sa.price, sa.date_sale
    FROM
        publisher AS p
    JOIN
        book AS b ON b.id_publisher = p.id
    JOIN
        stock AS st ON st.id_book = b.id
    JOIN
        sale AS sa ON sa.id_stock = st.id
    JOIN
        shop AS sh ON sh.id = st.id_shop
    WHERE
        p.id = $1
    ORDER BY
        sa.id
"#;

const SALES_BY_PUBLISHER_NAME: &str = r#"
    SELECT
        b.title, sh.name AS shop_name, sa.price, sa.date_sale
    FROM
        publisher AS p
    JOIN
        book AS b ON b.id_publisher = p.id
    JOIN
        stock AS st ON st.id_book = b.id
    JOIN
        sale AS sa ON sa.id_stock = st.id
    JOIN
        shop AS sh ON sh.id = st.id_shop
    WHERE
        p.name ILIKE $1 ESCAPE '\'
    ORDER BY
        sa.id
"#;

/// Turns a name fragment into an `ILIKE` pattern matching it literally anywhere.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

impl CatalogRepository {
    /// Creates a new `CatalogRepository` over an open connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drops and recreates every catalog table. See [`schema::install`].
    pub async fn install_schema(&self) -> Result<(), DbError> {
        schema::install(&self.pool).await
    }

    /// Reads a fixture file and loads it with [`Self::load_fixtures`].
    pub async fn load_fixture_file(&self, path: impl AsRef<Path>) -> Result<usize, DbError> {
        let path = path.as_ref();
        let batch = FixtureBatch::read(path).await?;
        tracing::info!(path = %path.display(), records = batch.len(), "Fixture file decoded.");
        self.load_fixtures(&batch).await
    }

    /// Inserts a whole fixture batch within a single transaction for atomicity.
    ///
    /// Records are inserted parents-first. Before each insert the parents it
    /// references are looked up inside the same transaction, so a dangling
    /// foreign key fails with [`DbError::DanglingReference`]. Any failure drops
    /// the transaction, which rolls back every row staged so far.
    ///
    /// Returns the number of inserted rows.
    pub async fn load_fixtures(&self, batch: &FixtureBatch) -> Result<usize, DbError> {
        batch.validate()?;

        let mut tx = self.pool.begin().await?;

        for record in batch.in_insert_order() {
            for (parent, parent_pk) in record.references() {
                if !row_exists(&mut *tx, parent, parent_pk).await? {
                    return Err(DbError::DanglingReference {
                        model: record.kind(),
                        pk: record.pk(),
                        parent,
                        parent_pk,
                    });
                }
            }
            insert_record(&mut *tx, record).await?;
            tracing::debug!(model = %record.kind(), pk = record.pk(), "Staged fixture record.");
        }

        tx.commit().await?;

        for (kind, count) in batch.counts() {
            tracing::info!(table = %kind, rows = count, "Loaded fixture rows.");
        }
        Ok(batch.len())
    }

    /// Returns the number of rows in every catalog table.
    pub async fn table_counts(&self) -> Result<BTreeMap<ModelKind, i64>, DbError> {
        let mut counts = BTreeMap::new();
        for kind in ModelKind::ALL {
            let sql = format!("SELECT COUNT(*) FROM {kind}");
            let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }

    /// Fetches one report line per sale of the books of every publisher
    /// matching `term`.
    ///
    /// Publishers are matched by exact id or by case-insensitive substring of
    /// their name. Books, stock rows, sales and shops are inner-joined, so
    /// publishers without sales contribute nothing. Every stock row of a book
    /// is joined once, which yields exactly one line per sale.
    pub async fn sales_for_publisher(&self, term: &SearchTerm) -> Result<Vec<SaleLine>, DbError> {
        let lines = match term {
            SearchTerm::Id(id) => {
                sqlx::query_as::<_, SaleLine>(SALES_BY_PUBLISHER_ID)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            SearchTerm::Name(fragment) => {
                sqlx::query_as::<_, SaleLine>(SALES_BY_PUBLISHER_NAME)
                    .bind(contains_pattern(fragment))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        tracing::info!(?term, lines = lines.len(), "Publisher sales fetched.");
        Ok(lines)
    }

    /// Fetches a single publisher by id.
    pub async fn find_publisher(&self, id: i32) -> Result<Publisher, DbError> {
        sqlx::query_as::<_, Publisher>("SELECT id, name FROM publisher WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    /// Fetches a single book by id. Pair with [`Self::find_publisher`] on
    /// `id_publisher` to reach its owner.
    pub async fn find_book(&self, id: i32) -> Result<Book, DbError> {
        sqlx::query_as::<_, Book>("SELECT id, title, id_publisher FROM book WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    /// Fetches a single shop by id.
    pub async fn find_shop(&self, id: i32) -> Result<Shop, DbError> {
        sqlx::query_as::<_, Shop>("SELECT id, name FROM shop WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    /// Fetches a single stock row by id.
    pub async fn find_stock(&self, id: i32) -> Result<Stock, DbError> {
        sqlx::query_as::<_, Stock>("SELECT id, id_book, id_shop, count FROM stock WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    /// Fetches all books owned by a publisher.
    pub async fn publisher_books(&self, publisher_id: i32) -> Result<Vec<Book>, DbError> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, id_publisher FROM book WHERE id_publisher = $1 ORDER BY id",
        )
        .bind(publisher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Fetches every stock row of a book, across all shops.
    pub async fn book_stock(&self, book_id: i32) -> Result<Vec<Stock>, DbError> {
        let stock = sqlx::query_as::<_, Stock>(
            "SELECT id, id_book, id_shop, count FROM stock WHERE id_book = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stock)
    }

    /// Fetches every stock row held by a shop.
    pub async fn shop_stock(&self, shop_id: i32) -> Result<Vec<Stock>, DbError> {
        let stock = sqlx::query_as::<_, Stock>(
            "SELECT id, id_book, id_shop, count FROM stock WHERE id_shop = $1 ORDER BY id",
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stock)
    }

    /// Fetches all sales recorded against a stock row.
    pub async fn stock_sales(&self, stock_id: i32) -> Result<Vec<Sale>, DbError> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT id, price, date_sale, id_stock, count FROM sale WHERE id_stock = $1 ORDER BY id",
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }
}

async fn row_exists(conn: &mut PgConnection, kind: ModelKind, id: i32) -> Result<bool, DbError> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {kind} WHERE id = $1)");
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

async fn insert_record(conn: &mut PgConnection, record: &FixtureRecord) -> Result<(), DbError> {
    let query = match record {
        FixtureRecord::Publisher(publisher) => {
            sqlx::query("INSERT INTO publisher (id, name) VALUES ($1, $2)")
                .bind(publisher.id)
                .bind(&publisher.name)
        }
        FixtureRecord::Shop(shop) => sqlx::query("INSERT INTO shop (id, name) VALUES ($1, $2)")
            .bind(shop.id)
            .bind(&shop.name),
        FixtureRecord::Book(book) => {
            sqlx::query("INSERT INTO book (id, title, id_publisher) VALUES ($1, $2, $3)")
                .bind(book.id)
                .bind(&book.title)
                .bind(book.id_publisher)
        }
        FixtureRecord::Stock(stock) => {
            sqlx::query("INSERT INTO stock (id, id_book, id_shop, count) VALUES ($1, $2, $3, $4)")
                .bind(stock.id)
                .bind(stock.id_book)
                .bind(stock.id_shop)
                .bind(stock.count)
        }
        FixtureRecord::Sale(sale) => sqlx::query(
            "INSERT INTO sale (id, price, date_sale, id_stock, count) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sale.id)
        .bind(sale.price)
        .bind(sale.date_sale)
        .bind(sale.id_stock)
        .bind(sale.count),
    };

    query.execute(&mut *conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_fragment_is_wrapped_for_substring_match() {
        assert_eq!(contains_pattern("Ace"), "%Ace%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn like_wildcards_in_fragment_are_escaped() {
        assert_eq!(contains_pattern("100%"), r"%100\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }
}
