use std::{collections::HashMap, sync::OnceLock};

use anyhow::Context;
use serde::Deserialize;

use crate::language::Language;

/// Boundary pad symbol. It is always id 0, which is also the interspersed blank.
pub const PAD: &str = "_";

const WAITAU_SYMBOLS: &str = include_str!("../assets/waitau_symbols.json");
const HAKKA_SYMBOLS: &str = include_str!("../assets/hakka_symbols.json");

#[derive(Deserialize)]
struct SymbolFile {
    pad: String,
    symbols: Vec<String>,
}

/// Immutable symbol -> id mapping of one language. The id of a symbol is its
/// position in the inventory it was built from.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    ids: HashMap<String, i64>,
}

impl SymbolTable {
    /// Build a table from an ordered inventory. The pad must come first.
    pub fn from_symbols<I, S>(symbols: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = HashMap::new();
        for (id, symbol) in symbols.into_iter().enumerate() {
            let symbol = symbol.into();
            if id == 0 && symbol != PAD {
                anyhow::bail!("first symbol must be the pad '{PAD}', found '{symbol}'");
            }
            if ids.insert(symbol.clone(), id as i64).is_some() {
                anyhow::bail!("duplicate symbol '{symbol}'");
            }
        }
        if ids.is_empty() {
            anyhow::bail!("symbol inventory is empty");
        }
        Ok(Self { ids })
    }

    /// Parse a JSON inventory of the form `{"pad": "_", "symbols": [...]}`
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let file: SymbolFile = serde_json::from_str(text).context("symbol file is not valid JSON")?;
        if file.pad != PAD {
            anyhow::bail!("unsupported pad symbol '{}'", file.pad);
        }
        Self::from_symbols(file.symbols)
    }

    /// Built-in inventory of a language, parsed on first use
    pub fn builtin(language: Language) -> &'static SymbolTable {
        static WAITAU: OnceLock<SymbolTable> = OnceLock::new();
        static HAKKA: OnceLock<SymbolTable> = OnceLock::new();

        let (cell, text) = match language {
            Language::Waitau => (&WAITAU, WAITAU_SYMBOLS),
            Language::Hakka => (&HAKKA, HAKKA_SYMBOLS),
        };
        // The assets are compiled in and covered by tests.
        cell.get_or_init(|| match Self::from_json(text) {
            Ok(table) => table,
            Err(e) => panic!("built-in {language} symbol table is corrupt: {e:#}"),
        })
    }

    pub fn lookup(&self, symbol: &str) -> Option<i64> {
        self.ids.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.ids.contains_key(symbol)
    }

    /// Vocabulary size
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
