//! Interface strings per language.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

const EMBEDDED: &str = include_str!("i18n/translations.json");

pub type Strings = BTreeMap<String, String>;

/// Translation table keyed by language code, then by string key.
#[derive(Debug, Clone)]
pub struct Translations {
    table: BTreeMap<String, Strings>,
    default_lang: String,
}

impl Translations {
    /// The table compiled into the binary (`pt` and `en`).
    pub fn embedded(default_lang: &str) -> Result<Self> {
        Self::from_json(EMBEDDED, default_lang)
    }

    pub fn from_file(path: &Path, default_lang: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read translations from {}", path.display()))?;
        Self::from_json(&raw, default_lang)
            .with_context(|| format!("Invalid translations file {}", path.display()))
    }

    /// Parses a `{lang: {key: text}}` table. `default_lang` must be present.
    pub fn from_json(raw: &str, default_lang: &str) -> Result<Self> {
        let table: BTreeMap<String, Strings> =
            serde_json::from_str(raw).context("Failed to parse translations JSON")?;

        if !table.contains_key(default_lang) {
            return Err(anyhow!(
                "default language {default_lang:?} missing from translations"
            ));
        }

        Ok(Self {
            table,
            default_lang: default_lang.to_string(),
        })
    }

    pub fn table(&self) -> &BTreeMap<String, Strings> {
        &self.table
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn contains(&self, lang: &str) -> bool {
        self.table.contains_key(lang)
    }

    /// The language to use for a session preference, falling back to the
    /// default when unset or unknown.
    pub fn resolve<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        match lang {
            Some(lang) if self.contains(lang) => lang,
            _ => &self.default_lang,
        }
    }

    /// Strings for `lang`, or the default language's.
    pub fn strings(&self, lang: &str) -> &Strings {
        self.table
            .get(lang)
            .or_else(|| self.table.get(&self.default_lang))
            .unwrap_or_else(|| empty_strings())
    }
}

fn empty_strings() -> &'static Strings {
    static EMPTY: Strings = BTreeMap::new();
    &EMPTY
}
