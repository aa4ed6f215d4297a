use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Maximum length, in characters, of every bounded text column.
pub const NAME_MAX_LEN: usize = 40;

/// A row of the `publisher` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Publisher {
    pub id: i32,
    /// Unique when present.
    pub name: Option<String>,
}

/// A row of the `book` table. Always owned by one publisher.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub id_publisher: i32,
}

/// A row of the `shop` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Shop {
    pub id: i32,
    /// Unique when present.
    pub name: Option<String>,
}

/// A row of the `stock` table: the on-hand count of one book at one shop.
/// The same (book, shop) pair may appear in several rows.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Stock {
    pub id: i32,
    pub id_book: i32,
    pub id_shop: i32,
    pub count: Option<i32>,
}

/// A row of the `sale` table, recorded against one stock entry.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Sale {
    pub id: i32,
    pub price: Option<f64>,
    pub date_sale: NaiveDate,
    pub id_stock: i32,
    pub count: Option<i32>,
}

/// One line of the publisher sales report.
///
/// Renders as `<title> | <shop name> | <price> | <date>`, with `-` standing
/// in for a missing shop name or price.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SaleLine {
    pub title: String,
    pub shop_name: Option<String>,
    pub price: Option<f64>,
    pub date_sale: NaiveDate,
}

/// Whole prices keep one decimal place (`16.0`), others print as-is (`9.99`).
fn format_price(price: f64) -> String {
    if price.is_finite() && price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        price.to_string()
    }
}

impl fmt::Display for SaleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shop_name = self.shop_name.as_deref().unwrap_or("-");
        let price = self
            .price
            .map(format_price)
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} | {} | {} | {}",
            self.title, shop_name, price, self.date_sale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sale_line_is_pipe_delimited() {
        let line = SaleLine {
            title: "Dune".to_string(),
            shop_name: Some("Corner".to_string()),
            price: Some(9.99),
            date_sale: date(2024, 1, 1),
        };
        assert_eq!(line.to_string(), "Dune | Corner | 9.99 | 2024-01-01");
    }

    #[test]
    fn whole_prices_keep_one_decimal_place() {
        let line = SaleLine {
            title: "Dune".to_string(),
            shop_name: Some("Corner".to_string()),
            price: Some(50.0),
            date_sale: date(2022, 11, 9),
        };
        assert_eq!(line.to_string(), "Dune | Corner | 50.0 | 2022-11-09");
    }

    #[test]
    fn missing_values_render_as_dash() {
        let line = SaleLine {
            title: "Dune".to_string(),
            shop_name: None,
            price: None,
            date_sale: date(2024, 1, 1),
        };
        assert_eq!(line.to_string(), "Dune | - | - | 2024-01-01");
    }

    #[test]
    fn fractional_prices_print_unpadded() {
        assert_eq!(format_price(16.0), "16.0");
        assert_eq!(format_price(10.5), "10.5");
        assert_eq!(format_price(50.05), "50.05");
        assert_eq!(format_price(0.0), "0.0");
    }
}
