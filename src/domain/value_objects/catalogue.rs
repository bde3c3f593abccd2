use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogueItem {
    pub name: String,
    pub amount_usd_minor: i32,
}

/// Read-only catalogue of purchasable item codes, loaded once at startup and
/// injected into the transaction use case.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalogue {
    items: HashMap<String, CatalogueItem>,
}

impl ItemCatalogue {
    pub fn new(items: HashMap<String, CatalogueItem>) -> Self {
        Self { items }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let items: HashMap<String, CatalogueItem> =
            serde_json::from_str(raw).context("failed to parse item catalogue JSON")?;
        Ok(Self { items })
    }

    pub fn lookup(&self, code: &str) -> Option<&CatalogueItem> {
        self.items.get(code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalogue_json() {
        let catalogue = ItemCatalogue::from_json(
            r#"{"hideaway": {"name": "Hideaway", "amount_usd_minor": 1000}}"#,
        )
        .unwrap();
        assert_eq!(catalogue.len(), 1);
        let item = catalogue.lookup("hideaway").unwrap();
        assert_eq!(item.name, "Hideaway");
        assert_eq!(item.amount_usd_minor, 1000);
    }

    #[test]
    fn lookup_misses_unknown_codes() {
        let catalogue = ItemCatalogue::from_json("{}").unwrap();
        assert!(catalogue.lookup("anything").is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ItemCatalogue::from_json("not json").is_err());
    }
}
