use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_yml::Value;

use crate::unicode::NEUTRAL_SCRIPTS;

/// What to do with a code point failing a Unicode validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Reject,
    Warn,
}

impl Policy {
    pub fn from_str(s: &str) -> Option<Policy> {
        match s.to_lowercase().as_str() {
            "reject" => Some(Policy::Reject),
            "warn" => Some(Policy::Warn),
            _ => None,
        }
    }
}

/// Scripts pulled in by the mixed-script filter when any script of `when`
/// is present in a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnlargementRule {
    pub when: Vec<String>,
    pub add: Vec<String>,
}

impl EnlargementRule {
    pub fn new(when: &[&str], add: &[&str]) -> Self {
        Self {
            when: when.iter().map(|s| s.to_string()).collect(),
            add: add.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Engine configuration, read from a YAML file such as `lgr.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LgrConfig {
    pub idna_policy: Policy,
    pub script_policy: Policy,
    /// Upper bound on the estimated number of variants enumerated by
    /// `compute_label_disposition`.
    pub max_variants: u64,
    /// Type for transitive edges whose chain types disagree.
    pub populated_variant_type: String,
    pub neutral_scripts: Vec<String>,
    pub script_enlargement: Vec<EnlargementRule>,
    /// Language subtag to script, for tags without a script subtag.
    pub language_scripts: BTreeMap<String, String>,
}

impl Default for LgrConfig {
    fn default() -> Self {
        let language_scripts = [
            ("ar", "Arab"),
            ("de", "Latn"),
            ("el", "Grek"),
            ("en", "Latn"),
            ("es", "Latn"),
            ("fr", "Latn"),
            ("he", "Hebr"),
            ("hi", "Deva"),
            ("ja", "Jpan"),
            ("ko", "Kore"),
            ("ru", "Cyrl"),
            ("th", "Thai"),
            ("uk", "Cyrl"),
            ("zh", "Hani"),
        ]
        .into_iter()
        .map(|(l, s)| (l.to_string(), s.to_string()))
        .collect();
        Self {
            idna_policy: Policy::Reject,
            script_policy: Policy::Warn,
            max_variants: 10_000,
            populated_variant_type: "blocked".to_string(),
            neutral_scripts: NEUTRAL_SCRIPTS.iter().map(|s| s.to_string()).collect(),
            script_enlargement: vec![
                EnlargementRule::new(&["Kana", "Hira"], &["Hani", "Latn", "Kana", "Hira"]),
                EnlargementRule::new(&["Hang"], &["Hani", "Latn"]),
                EnlargementRule::new(&["Hani"], &["Latn"]),
            ],
            language_scripts,
        }
    }
}

impl LgrConfig {
    /// Apply the enlargement rules until nothing changes.
    pub fn enlarge_scripts(&self, scripts: &BTreeSet<String>) -> BTreeSet<String> {
        let mut out = scripts.clone();
        loop {
            let before = out.len();
            for rule in &self.script_enlargement {
                if rule.when.iter().any(|s| out.contains(s)) {
                    out.extend(rule.add.iter().cloned());
                }
            }
            if out.len() == before {
                return out;
            }
        }
    }

    pub fn is_neutral_script(&self, script: &str) -> bool {
        self.neutral_scripts.iter().any(|s| s == script)
    }
}

/// Load config from the given path, or look for `lgr.yml` in the current
/// directory. Returns the defaults if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<LgrConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => Path::new("lgr.yml").to_path_buf(),
    };

    if !config_path.exists() {
        return Ok(LgrConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let raw: Value = serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    parse_config(&raw)
}

fn parse_config(raw: &Value) -> Result<LgrConfig> {
    let mut config = LgrConfig::default();
    let Value::Mapping(map) = raw else {
        return Ok(config);
    };

    for (key, value) in map {
        let key_str = match key.as_str() {
            Some(s) => s,
            None => continue,
        };
        match key_str {
            "UnicodeValidity" => {
                if let Some(p) = policy_at(value, "Idna")? {
                    config.idna_policy = p;
                }
                if let Some(p) = policy_at(value, "Script")? {
                    config.script_policy = p;
                }
            }
            "MaxVariants" => {
                config.max_variants = value
                    .as_u64()
                    .with_context(|| "MaxVariants must be a non-negative integer")?;
            }
            "PopulatedVariantType" => {
                config.populated_variant_type = value
                    .as_str()
                    .with_context(|| "PopulatedVariantType must be a string")?
                    .to_string();
            }
            "NeutralScripts" => {
                if let Some(list) = value_to_string_list(value) {
                    config.neutral_scripts = list;
                }
            }
            "ScriptEnlargement" => {
                config.script_enlargement = parse_enlargement(value)?;
            }
            "LanguageScripts" => {
                if let Value::Mapping(langs) = value {
                    for (lang, script) in langs {
                        if let (Some(lang), Some(script)) = (lang.as_str(), script.as_str()) {
                            config
                                .language_scripts
                                .insert(lang.to_lowercase(), script.to_string());
                        }
                    }
                }
            }
            // Unknown keys are left for other consumers of the file.
            _ => {}
        }
    }

    Ok(config)
}

fn policy_at(value: &Value, key: &str) -> Result<Option<Policy>> {
    let Some(v) = value.as_mapping().and_then(|m| m.get(&Value::String(key.to_string()))) else {
        return Ok(None);
    };
    let s = v
        .as_str()
        .with_context(|| format!("UnicodeValidity.{key} must be a string"))?;
    match Policy::from_str(s) {
        Some(p) => Ok(Some(p)),
        None => bail!("UnicodeValidity.{key}: unknown policy {s:?}, expected reject or warn"),
    }
}

fn parse_enlargement(value: &Value) -> Result<Vec<EnlargementRule>> {
    let seq = value
        .as_sequence()
        .with_context(|| "ScriptEnlargement must be a list")?;
    let mut rules = Vec::new();
    for item in seq {
        let when = extract_string_list(item, "When")
            .with_context(|| "ScriptEnlargement entry without a When list")?;
        let add = extract_string_list(item, "Add")
            .with_context(|| "ScriptEnlargement entry without an Add list")?;
        rules.push(EnlargementRule { when, add });
    }
    Ok(rules)
}

fn extract_string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value
        .as_mapping()?
        .get(&Value::String(key.to_string()))
        .and_then(value_to_string_list)
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}
