//! Display formatting for raw model identifiers
//!
//! Ollama identifiers look like `namespace/base-name:tag`, where the tag
//! often carries a parameter-size token (`7b`, `1.5b`). The formatter
//! turns that into a human-readable display name plus a size hint and a
//! family key used to group models in the picker.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Known family names with their canonical casing, in match order.
/// Matching is whole-word, so prefix keys (wizard vs wizardlm) cannot
/// shadow each other.
const FAMILY_NAMES: &[(&str, &str)] = &[
    ("llama", "Llama"),
    ("mistral", "Mistral"),
    ("codellama", "CodeLlama"),
    ("wizardlm", "WizardLM"),
    ("wizard", "Wizard"),
    ("gemma", "Gemma"),
    ("falcon", "Falcon"),
    ("phi", "Phi"),
    ("stablelm", "StableLM"),
    ("tinyllama", "TinyLlama"),
    ("vicuna", "Vicuna"),
    ("nous", "Nous"),
    ("orca", "Orca"),
    ("yi", "Yi"),
];

/// Marker substituted for the word "uncensored"
const UNCENSORED_MARKER: &str = "(🗽)";

static SIZE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?[bB]").expect("size token pattern"));

static UNCENSORED: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\buncensored\b")
        .case_insensitive(true)
        .build()
        .expect("uncensored pattern")
});

static FAMILY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    FAMILY_NAMES
        .iter()
        .map(|(key, value)| {
            let pattern = RegexBuilder::new(&format!(r"\b{key}\b"))
                .case_insensitive(true)
                .build()
                .expect("family pattern");
            (pattern, *value)
        })
        .collect()
});

/// Display information derived from a raw model identifier.
///
/// Produced on demand; nothing here is stored beyond the call that
/// needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Human-readable name, e.g. "CodeLlama 7b Instruct"
    pub formatted_name: String,
    /// Size token as written, e.g. "7b"; empty when absent
    pub size_hint: String,
    /// The identifier the descriptor was parsed from
    pub original_identifier: String,
    /// First word of the formatted name, used for grouping
    pub family_key: String,
}

impl ModelDescriptor {
    /// Parse a raw identifier into display form.
    pub fn parse(raw: &str) -> Self {
        // Strip any namespace prefix up to the last '/'
        let mut name = raw.rsplit('/').next().unwrap_or(raw).to_string();

        // The tag region after ':' is discarded, keeping only a size
        // token if one is present. Identifiers like "codellama-7b"
        // carry the size in the base name instead, so fall back to it.
        let mut size_hint = String::new();
        if let Some((base, tag)) = name.split_once(':') {
            if let Some(m) = SIZE_TOKEN.find(tag) {
                size_hint = m.as_str().to_string();
            }
            name = base.to_string();
        }
        if size_hint.is_empty() {
            if let Some(m) = SIZE_TOKEN.find(&name) {
                size_hint = m.as_str().to_string();
            }
        }

        let name = name.replace(['-', '_'], " ");

        let mut name = name;
        for (pattern, value) in FAMILY_PATTERNS.iter() {
            name = pattern.replace_all(&name, *value).into_owned();
        }
        let name = UNCENSORED.replace_all(&name, UNCENSORED_MARKER).into_owned();

        let formatted_name = capitalize_remaining(&name);
        let family_key = formatted_name
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();

        Self {
            formatted_name,
            size_hint,
            original_identifier: raw.to_string(),
            family_key,
        }
    }

    /// Numeric parameter count for template substitution: the size
    /// hint with the trailing b/B stripped, or "unknown" when absent.
    pub fn param_count(&self) -> String {
        if self.size_hint.is_empty() {
            return "unknown".to_string();
        }
        self.size_hint.trim_end_matches(['b', 'B']).to_string()
    }

    /// Display label: formatted name plus the size hint when known.
    pub fn label(&self) -> String {
        if self.size_hint.is_empty() {
            self.formatted_name.clone()
        } else {
            format!("{} ({})", self.formatted_name, self.size_hint)
        }
    }
}

/// Capitalize the first letter of every word not already produced by
/// the family table or the uncensored marker.
fn capitalize_remaining(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let keep = word == UNCENSORED_MARKER
                || FAMILY_NAMES
                    .iter()
                    .any(|(_, value)| value.eq_ignore_ascii_case(word));
            if keep {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group raw identifiers by family key, families sorted alphabetically
/// and models sorted by formatted name within each family.
pub fn group_by_family<I, S>(names: I) -> BTreeMap<String, Vec<ModelDescriptor>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<ModelDescriptor>> = BTreeMap::new();
    for name in names {
        let descriptor = ModelDescriptor::parse(name.as_ref());
        groups
            .entry(descriptor.family_key.clone())
            .or_default()
            .push(descriptor);
    }
    for models in groups.values_mut() {
        models.sort_by(|a, b| a.formatted_name.cmp(&b.formatted_name));
    }
    groups
}
