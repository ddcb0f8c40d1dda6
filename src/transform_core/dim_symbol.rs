//! Symbol dimension: base/quote decomposition per traded symbol

use super::fact::FactRow;
use super::table::{CellValue, Column, TableRow};
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SymbolDimRow {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl TableRow for SymbolDimRow {
    const TABLE: &'static str = "dim_symbol";

    const COLUMNS: &'static [Column] = &[
        Column::text("symbol"),
        Column::text("base_asset"),
        Column::text("quote_asset"),
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.symbol.clone()),
            CellValue::Text(self.base_asset.clone()),
            CellValue::Text(self.quote_asset.clone()),
        ]
    }
}

pub struct SymbolDimBuilder {
    quote_suffix: String,
    fallback_quote_len: usize,
}

impl SymbolDimBuilder {
    pub fn new(quote_suffix: impl Into<String>, fallback_quote_len: usize) -> Self {
        Self {
            quote_suffix: quote_suffix.into(),
            fallback_quote_len,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new("USDC", 4)
    }

    /// One row per distinct symbol, sorted by symbol
    pub fn build(&self, fact: &[FactRow]) -> Vec<SymbolDimRow> {
        let symbols: BTreeSet<&str> = fact.iter().map(|row| row.symbol.as_str()).collect();
        symbols.into_iter().map(|s| self.decompose(s)).collect()
    }

    /// Split a symbol into (base, quote).
    ///
    /// The fallback assumes a fixed-length quote currency and is only right
    /// for quotes of that length; it is not checked against an asset registry.
    pub fn decompose(&self, symbol: &str) -> SymbolDimRow {
        let (base, quote) = match symbol.strip_suffix(self.quote_suffix.as_str()) {
            Some(base) if !self.quote_suffix.is_empty() => (base, self.quote_suffix.as_str()),
            _ => split_tail(symbol, self.fallback_quote_len),
        };

        SymbolDimRow {
            symbol: symbol.to_string(),
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
        }
    }
}

fn split_tail(symbol: &str, tail_chars: usize) -> (&str, &str) {
    let char_count = symbol.chars().count();
    let split_at = symbol
        .char_indices()
        .nth(char_count.saturating_sub(tail_chars))
        .map(|(idx, _)| idx)
        .unwrap_or(symbol.len());
    symbol.split_at(split_at)
}
