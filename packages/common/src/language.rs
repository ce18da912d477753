use crate::config::LANGUAGE_WILDCARD;

/// Decides which events are worth persisting, by language code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFilter {
    accept_all: bool,
    languages: Vec<String>,
}

impl LanguageFilter {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accept_all = false;
        let mut codes = Vec::new();
        for lang in languages {
            let lang = lang.as_ref().trim();
            if lang.eq_ignore_ascii_case(LANGUAGE_WILDCARD) {
                accept_all = true;
            } else if !lang.is_empty() {
                codes.push(lang.to_ascii_lowercase());
            }
        }
        Self {
            accept_all,
            languages: codes,
        }
    }

    /// Events without a language code only pass the wildcard.
    pub fn accepts(&self, lang: Option<&str>) -> bool {
        if self.accept_all {
            return true;
        }
        match lang {
            Some(lang) => self
                .languages
                .iter()
                .any(|code| code.eq_ignore_ascii_case(lang.trim())),
            None => false,
        }
    }

    pub fn accepts_all(&self) -> bool {
        self.accept_all
    }
}
