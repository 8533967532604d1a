use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A short language code as used by both catalogs (`HEB`, `RUS`, `ENG`, ...).
///
/// Codes are 2 or 3 ASCII letters and are always stored upper-case, so `heb`
/// and `HEB` name the same language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

/// Returned when a string is not a valid language code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid language code: {0:?}")]
pub struct LanguageCodeError(pub String);

impl Language {
    pub fn hebrew() -> Self {
        Self("HEB".to_string())
    }

    pub fn russian() -> Self {
        Self("RUS".to_string())
    }

    pub fn english() -> Self {
        Self("ENG".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a comma separated list such as `"HEB, rus,ENG"`.
    ///
    /// Empty items are ignored; duplicates are kept once, in first-seen order.
    pub fn parse_list(list: &str) -> Result<Vec<Language>, LanguageCodeError> {
        let mut languages: Vec<Language> = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let language = item.parse::<Language>()?;
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        Ok(languages)
    }
}

impl FromStr for Language {
    type Err = LanguageCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(LanguageCodeError(s.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for Language {
    type Error = LanguageCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
