//! Language and theme preferences.

use serde::{Deserialize, Serialize};

use super::{StoreError, VisitorStore, keys, read_json, write_json};

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Uz,
    Ru,
}

impl Language {
    pub const ALL: [Self; 3] = [Self::En, Self::Uz, Self::Ru];

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Uz => "uz",
            Self::Ru => "ru",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Uz => "O'zbekcha",
            Self::Ru => "Русский",
        }
    }

    /// Parse a language code, `None` for unsupported codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }
}

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Preferences of one visitor.
pub struct Preferences<S> {
    store: S,
    language: Language,
    theme: Theme,
}

impl<S: VisitorStore> Preferences<S> {
    /// Load preferences, defaulting to English and the light theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn load(store: S) -> Result<Self, StoreError> {
        let language = read_json(&store, keys::LANGUAGE).await?.unwrap_or_default();
        let theme = read_json(&store, keys::THEME).await?.unwrap_or_default();
        Ok(Self {
            store,
            language,
            theme,
        })
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn set_language(&mut self, language: Language) -> Result<(), StoreError> {
        write_json(&self.store, keys::LANGUAGE, &language).await?;
        self.language = language;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn set_theme(&mut self, theme: Theme) -> Result<(), StoreError> {
        write_json(&self.store, keys::THEME, &theme).await?;
        self.theme = theme;
        Ok(())
    }

    /// Switch between light and dark; returns the new theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn toggle_theme(&mut self) -> Result<Theme, StoreError> {
        let next = self.theme.toggled();
        self.set_theme(next).await?;
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults() {
        let prefs = Preferences::load(InMemoryStore::new()).await.unwrap();
        assert_eq!(prefs.language(), Language::En);
        assert_eq!(prefs.theme(), Theme::Light);
    }

    #[tokio::test]
    async fn test_toggle_theme_persists() {
        let store = InMemoryStore::new();
        let mut prefs = Preferences::load(store.clone()).await.unwrap();

        assert_eq!(prefs.toggle_theme().await.unwrap(), Theme::Dark);
        assert_eq!(store.get(keys::THEME), Some(json!("dark")));

        let reloaded = Preferences::load(store).await.unwrap();
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_unknown_stored_language_falls_back() {
        let store = InMemoryStore::new();
        store.set(keys::LANGUAGE, json!("fr"));

        let prefs = Preferences::load(store).await.unwrap();
        assert_eq!(prefs.language(), Language::En);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("uz"), Some(Language::Uz));
        assert_eq!(Language::from_code("de"), None);
    }
}
