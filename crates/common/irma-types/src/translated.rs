use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A string with one translation per language code (`en`, `nl`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslatedString(BTreeMap<String, String>);

impl TranslatedString {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same text for every supported language. Legacy requests carry
    /// plain labels which are lifted this way.
    pub fn trivial(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut map = BTreeMap::new();
        map.insert("en".to_string(), text.clone());
        map.insert("nl".to_string(), text);
        Self(map)
    }

    pub fn with(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(lang.into(), text.into());
        self
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// English if present, otherwise any translation.
    pub fn preferred(&self) -> Option<&str> {
        self.get("en")
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
