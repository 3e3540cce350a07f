use std::collections::BTreeSet;
use std::sync::RwLock;

use serde::Serialize;

use crate::config::LgrConfig;

/// Descriptive metadata of an LGR plus the scripts derived from its
/// languages.
#[derive(Debug, Default)]
pub struct Metadata {
    pub version: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub unicode_version: Option<String>,
    pub scopes: Vec<String>,
    languages: Vec<String>,
    /// Scripts derived from `languages`, tagged with the list they came from.
    script_cache: RwLock<Option<(Vec<String>, BTreeSet<String>)>>,
}

/// Plain copy of the descriptive fields, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSummary {
    pub version: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub unicode_version: Option<String>,
    pub scopes: Vec<String>,
    pub languages: Vec<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn set_languages(&mut self, languages: Vec<String>) {
        self.languages = languages;
        self.invalidate_scripts();
    }

    /// Add a language tag; returns false if it was already declared.
    pub fn add_language(&mut self, tag: &str) -> bool {
        if self.languages.iter().any(|l| l.eq_ignore_ascii_case(tag)) {
            return false;
        }
        self.languages.push(tag.to_string());
        self.invalidate_scripts();
        true
    }

    fn invalidate_scripts(&self) {
        if let Ok(mut cache) = self.script_cache.write() {
            *cache = None;
        }
    }

    /// Scripts covered by the declared languages. Empty when no language is
    /// declared or none maps to a script.
    pub fn scripts(&self, config: &LgrConfig) -> BTreeSet<String> {
        if let Ok(cache) = self.script_cache.read() {
            if let Some((langs, scripts)) = cache.as_ref() {
                if *langs == self.languages {
                    return scripts.clone();
                }
            }
        }
        let scripts: BTreeSet<String> = self
            .languages
            .iter()
            .filter_map(|tag| script_of_tag(tag, config))
            .flat_map(expand_composite)
            .collect();
        if let Ok(mut cache) = self.script_cache.write() {
            *cache = Some((self.languages.clone(), scripts.clone()));
        }
        scripts
    }

    pub fn summary(&self) -> MetadataSummary {
        MetadataSummary {
            version: self.version.clone(),
            date: self.date.clone(),
            description: self.description.clone(),
            unicode_version: self.unicode_version.clone(),
            scopes: self.scopes.clone(),
            languages: self.languages.clone(),
        }
    }
}

/// Script of a BCP 47 tag: the explicit script subtag if any, otherwise the
/// configured default for the primary language.
fn script_of_tag(tag: &str, config: &LgrConfig) -> Option<String> {
    let mut subtags = tag.split(['-', '_']);
    let primary = subtags.next()?.to_lowercase();
    for subtag in subtags {
        if subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
            let mut chars = subtag.chars();
            let first = chars.next()?.to_ascii_uppercase();
            let rest = chars.map(|c| c.to_ascii_lowercase());
            return Some(std::iter::once(first).chain(rest).collect());
        }
    }
    config.language_scripts.get(&primary).cloned()
}

/// Writing systems made of several scripts.
fn expand_composite(script: String) -> Vec<String> {
    let parts: &[&str] = match script.as_str() {
        "Jpan" => &["Hani", "Hira", "Kana"],
        "Kore" => &["Hang", "Hani"],
        "Hanb" => &["Hani", "Bopo"],
        _ => return vec![script],
    };
    parts.iter().map(|s| s.to_string()).collect()
}
