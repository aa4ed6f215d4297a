use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of entity kinds a fixture record may describe.
///
/// Variants are declared parent-first, so the derived `Ord` is also a valid
/// insertion order: every kind only references kinds that sort before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Publisher,
    Shop,
    Book,
    Stock,
    Sale,
}

impl ModelKind {
    /// Every kind, in insertion order.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Publisher,
        ModelKind::Shop,
        ModelKind::Book,
        ModelKind::Stock,
        ModelKind::Sale,
    ];

    /// The fixture tag, which is also the table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Publisher => "publisher",
            ModelKind::Shop => "shop",
            ModelKind::Book => "book",
            ModelKind::Stock => "stock",
            ModelKind::Sale => "sale",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownModel(s.to_string()))
    }
}

/// How a publisher lookup is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// Exact match on the publisher id.
    Id(i32),
    /// Case-insensitive substring match on the publisher name.
    Name(String),
}

impl SearchTerm {
    /// Interprets user input as a publisher id when it parses as one,
    /// falling back to a name fragment otherwise.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<i32>() {
            Ok(id) => SearchTerm::Id(id),
            Err(_) => SearchTerm::Name(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tags_round_trip_through_from_str() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_model_tag_is_rejected() {
        let err = "author".parse::<ModelKind>().unwrap_err();
        assert_eq!(err, CoreError::UnknownModel("author".to_string()));
        // Tags are matched exactly, like the fixture format requires.
        assert!("Publisher".parse::<ModelKind>().is_err());
    }

    #[test]
    fn insertion_order_puts_parents_first() {
        assert!(ModelKind::Publisher < ModelKind::Book);
        assert!(ModelKind::Shop < ModelKind::Stock);
        assert!(ModelKind::Book < ModelKind::Stock);
        assert!(ModelKind::Stock < ModelKind::Sale);
    }

    #[test]
    fn numeric_input_becomes_an_id() {
        assert_eq!(SearchTerm::parse("1"), SearchTerm::Id(1));
        assert_eq!(SearchTerm::parse(" 42 "), SearchTerm::Id(42));
        assert_eq!(SearchTerm::parse("-3"), SearchTerm::Id(-3));
    }

    #[test]
    fn non_numeric_input_becomes_a_name_fragment() {
        assert_eq!(SearchTerm::parse("Ace"), SearchTerm::Name("Ace".to_string()));
        assert_eq!(SearchTerm::parse("1st"), SearchTerm::Name("1st".to_string()));
        assert_eq!(SearchTerm::parse(""), SearchTerm::Name(String::new()));
        // Out of range for the id column, so it is treated as text.
        assert_eq!(
            SearchTerm::parse("99999999999"),
            SearchTerm::Name("99999999999".to_string())
        );
    }
}
