//! Decoding and pre-flight validation of JSON fixture files.
//!
//! A fixture file is a JSON array of `{"model": ..., "pk": ..., "fields": {...}}`
//! objects. Each `model` tag maps to exactly one [`ModelKind`]; its `fields`
//! object must name only the columns of that table.

use crate::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use core_types::{Book, ModelKind, Publisher, Sale, Shop, Stock, NAME_MAX_LEN};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// A fixture element before its `model` tag has been resolved.
#[derive(Debug, Deserialize)]
struct RawFixture {
    model: String,
    pk: i32,
    #[serde(default = "empty_fields")]
    fields: JsonValue,
}

fn empty_fields() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamedFields {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BookFields {
    title: String,
    id_publisher: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StockFields {
    id_book: i32,
    id_shop: i32,
    count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SaleFields {
    price: Option<f64>,
    #[serde(deserialize_with = "date_or_timestamp")]
    date_sale: NaiveDate,
    id_stock: i32,
    count: Option<i32>,
}

/// Accepts `YYYY-MM-DD` as well as full timestamps, keeping only the date.
fn date_or_timestamp<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|timestamp| timestamp.date())
        .map_err(|_| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

/// One decoded fixture element, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureRecord {
    Publisher(Publisher),
    Shop(Shop),
    Book(Book),
    Stock(Stock),
    Sale(Sale),
}

impl FixtureRecord {
    pub fn kind(&self) -> ModelKind {
        match self {
            FixtureRecord::Publisher(_) => ModelKind::Publisher,
            FixtureRecord::Shop(_) => ModelKind::Shop,
            FixtureRecord::Book(_) => ModelKind::Book,
            FixtureRecord::Stock(_) => ModelKind::Stock,
            FixtureRecord::Sale(_) => ModelKind::Sale,
        }
    }

    pub fn pk(&self) -> i32 {
        match self {
            FixtureRecord::Publisher(publisher) => publisher.id,
            FixtureRecord::Shop(shop) => shop.id,
            FixtureRecord::Book(book) => book.id,
            FixtureRecord::Stock(stock) => stock.id,
            FixtureRecord::Sale(sale) => sale.id,
        }
    }

    /// The (parent kind, parent pk) pairs this record points at.
    pub fn references(&self) -> Vec<(ModelKind, i32)> {
        match self {
            FixtureRecord::Publisher(_) | FixtureRecord::Shop(_) => Vec::new(),
            FixtureRecord::Book(book) => vec![(ModelKind::Publisher, book.id_publisher)],
            FixtureRecord::Stock(stock) => vec![
                (ModelKind::Book, stock.id_book),
                (ModelKind::Shop, stock.id_shop),
            ],
            FixtureRecord::Sale(sale) => vec![(ModelKind::Stock, sale.id_stock)],
        }
    }

    /// Bounded text columns as (column, value) pairs.
    fn bounded_text(&self) -> Vec<(&'static str, &str)> {
        match self {
            FixtureRecord::Publisher(Publisher { name, .. })
            | FixtureRecord::Shop(Shop { name, .. }) => {
                name.as_deref().map(|name| ("name", name)).into_iter().collect()
            }
            FixtureRecord::Book(book) => vec![("title", book.title.as_str())],
            FixtureRecord::Stock(_) | FixtureRecord::Sale(_) => Vec::new(),
        }
    }

    /// The value of the table's unique column, if it has one and it is set.
    fn unique_name(&self) -> Option<&str> {
        match self {
            FixtureRecord::Publisher(publisher) => publisher.name.as_deref(),
            FixtureRecord::Shop(shop) => shop.name.as_deref(),
            _ => None,
        }
    }

    fn publisher(pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        let NamedFields { name } = serde_json::from_value(fields)?;
        Ok(FixtureRecord::Publisher(Publisher { id: pk, name }))
    }

    fn shop(pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        let NamedFields { name } = serde_json::from_value(fields)?;
        Ok(FixtureRecord::Shop(Shop { id: pk, name }))
    }

    fn book(pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        let BookFields {
            title,
            id_publisher,
        } = serde_json::from_value(fields)?;
        Ok(FixtureRecord::Book(Book {
            id: pk,
            title,
            id_publisher,
        }))
    }

    fn stock(pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        let StockFields {
            id_book,
            id_shop,
            count,
        } = serde_json::from_value(fields)?;
        Ok(FixtureRecord::Stock(Stock {
            id: pk,
            id_book,
            id_shop,
            count,
        }))
    }

    fn sale(pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        let SaleFields {
            price,
            date_sale,
            id_stock,
            count,
        } = serde_json::from_value(fields)?;
        Ok(FixtureRecord::Sale(Sale {
            id: pk,
            price,
            date_sale,
            id_stock,
            count,
        }))
    }

    fn build(kind: ModelKind, pk: i32, fields: JsonValue) -> Result<Self, serde_json::Error> {
        match kind {
            ModelKind::Publisher => Self::publisher(pk, fields),
            ModelKind::Shop => Self::shop(pk, fields),
            ModelKind::Book => Self::book(pk, fields),
            ModelKind::Stock => Self::stock(pk, fields),
            ModelKind::Sale => Self::sale(pk, fields),
        }
    }
}

/// The decoded contents of one fixture file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureBatch {
    records: Vec<FixtureRecord>,
}

impl FixtureBatch {
    /// Reads and decodes a fixture file.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DbError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&contents)
    }

    /// Decodes a fixture document. Fails on the first element whose `model`
    /// tag is unknown or whose `fields` do not fit that model.
    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        let raw: Vec<RawFixture> = serde_json::from_str(json)?;

        let records = raw
            .into_iter()
            .enumerate()
            .map(|(index, RawFixture { model, pk, fields })| {
                let kind: ModelKind = model
                    .parse()
                    .map_err(|_| DbError::UnknownModel { index, model })?;
                FixtureRecord::build(kind, pk, fields).map_err(|err| DbError::InvalidFixture {
                    index,
                    model: kind,
                    pk,
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { records })
    }

    pub fn records(&self) -> &[FixtureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered parents-first, keeping file order within each model.
    pub fn in_insert_order(&self) -> Vec<&FixtureRecord> {
        let mut ordered: Vec<&FixtureRecord> = self.records.iter().collect();
        ordered.sort_by_key(|record| record.kind());
        ordered
    }

    /// Number of records per model. Models absent from the batch map to zero.
    pub fn counts(&self) -> BTreeMap<ModelKind, usize> {
        let mut counts: BTreeMap<ModelKind, usize> =
            ModelKind::ALL.into_iter().map(|kind| (kind, 0)).collect();
        for record in &self.records {
            *counts.entry(record.kind()).or_default() += 1;
        }
        counts
    }

    /// Checks the column constraints that can be decided without the
    /// database: primary keys unique per model, unique names unique within
    /// the batch, and bounded text no longer than [`NAME_MAX_LEN`] characters.
    pub fn validate(&self) -> Result<(), DbError> {
        let mut seen_pks: HashSet<(ModelKind, i32)> = HashSet::new();
        let mut seen_names: HashSet<(ModelKind, &str)> = HashSet::new();

        for record in &self.records {
            let kind = record.kind();
            let pk = record.pk();

            if !seen_pks.insert((kind, pk)) {
                return Err(DbError::ConstraintViolation {
                    constraint: Some(format!("{kind}_pkey")),
                    detail: format!("duplicate {kind} pk={pk} in fixture batch"),
                });
            }

            for (column, value) in record.bounded_text() {
                let length = value.chars().count();
                if length > NAME_MAX_LEN {
                    return Err(DbError::ConstraintViolation {
                        constraint: None,
                        detail: format!(
                            "{kind}.{column} of pk={pk} is {length} characters long (limit {NAME_MAX_LEN})"
                        ),
                    });
                }
            }

            if let Some(name) = record.unique_name() {
                if !seen_names.insert((kind, name)) {
                    return Err(DbError::ConstraintViolation {
                        constraint: Some(format!("{kind}_name_key")),
                        detail: format!("duplicate {kind} name '{name}' at pk={pk}"),
                    });
                }
            }
        }

        Ok(())
    }
}
