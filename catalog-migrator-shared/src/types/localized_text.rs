use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text keyed by language, one entry per language at most.
///
/// Blank text never makes it in: a language whose text is empty or only
/// whitespace is treated as absent, so callers never see (or write) an empty
/// translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText(BTreeMap<Language, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `text` for `language`, replacing any previous text for that
    /// language. Blank text removes nothing and is ignored.
    pub fn insert(&mut self, language: Language, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.0.insert(language, text);
    }

    pub fn with(mut self, language: Language, text: impl Into<String>) -> Self {
        self.insert(language, text);
        self
    }

    pub fn get(&self, language: &Language) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.0.contains_key(language)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Language, &str)> {
        self.0.iter().map(|(language, text)| (language, text.as_str()))
    }
}

impl FromIterator<(Language, String)> for LocalizedText {
    fn from_iter<T: IntoIterator<Item = (Language, String)>>(iter: T) -> Self {
        let mut text = LocalizedText::new();
        for (language, value) in iter {
            text.insert(language, value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_absent() {
        let text = LocalizedText::new()
            .with(Language::hebrew(), "שיעור")
            .with(Language::russian(), "   ")
            .with(Language::english(), "");

        assert_eq!(text.len(), 1);
        assert!(text.contains(&Language::hebrew()));
        assert!(!text.contains(&Language::russian()));
        assert_eq!(text.get(&Language::english()), None);
    }

    #[test]
    fn test_insert_replaces_only_that_language() {
        let mut text = LocalizedText::new()
            .with(Language::hebrew(), "old")
            .with(Language::russian(), "урок");
        text.insert(Language::hebrew(), "new");

        assert_eq!(text.get(&Language::hebrew()), Some("new"));
        assert_eq!(text.get(&Language::russian()), Some("урок"));
    }

    #[test]
    fn test_from_iterator_drops_blank_entries() {
        let text: LocalizedText = vec![
            (Language::english(), "Lesson".to_string()),
            (Language::russian(), String::new()),
        ]
        .into_iter()
        .collect();

        assert_eq!(text.languages().cloned().collect::<Vec<_>>(), vec![Language::english()]);
    }
}
