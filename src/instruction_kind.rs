//! Coarse instruction classification by mnemonic
//!
//! Decoded text is opaque to the analysis; only its leading mnemonic is
//! matched against an ordered table of patterns. First match wins, and
//! anything unmatched is `Compute`.

use crate::config::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind reported for mnemonics no rule matches
pub const FALLBACK_KIND: &str = "Compute";

/// One row of a classification table, as written in configuration
///
/// ```toml
/// [[instruction_kind]]
/// name = "Vector"
/// pattern = "^v(add|mul)"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRule {
    pub name: String,
    /// Regex matched against the lower-cased mnemonic
    pub pattern: String,
}

impl KindRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    pub fn compile(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.pattern).map_err(|e| ConfigError::InvalidKindPattern {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// Prefix table used when configuration supplies none
fn default_rules() -> Vec<KindRule> {
    vec![
        KindRule::new("Load", "^(lb|lh|lw|lbu|lhu)"),
        KindRule::new("Store", "^(sb|sh|sw)"),
        KindRule::new("Branch", "^(beq|bne|blt|bge|bltu|bgeu|jal|jalr)"),
        KindRule::new("Stream", "^cal_stream"),
        KindRule::new("StreamControl", "^(step_i|cfg_)"),
        KindRule::new("MulDiv", "^(mul|div|rem)"),
    ]
}

/// Ordered mnemonic → kind table
#[derive(Debug, Clone)]
pub struct InstructionClassifier {
    rules: Vec<(String, Regex)>,
}

impl Default for InstructionClassifier {
    fn default() -> Self {
        Self::from_rules(&default_rules())
            .unwrap_or_else(|_| Self { rules: Vec::new() })
    }
}

impl InstructionClassifier {
    pub fn from_rules(rules: &[KindRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| Ok((rule.name.clone(), rule.compile()?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { rules })
    }

    /// Built-in table unless `rules` is non-empty
    pub fn from_config_rules(rules: &[KindRule]) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            Ok(Self::default())
        } else {
            Self::from_rules(rules)
        }
    }

    /// Kind name for a line of decoded text such as `"lw a0, 0(sp)"`
    pub fn classify(&self, asm: &str) -> &str {
        let mnemonic = asm
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        self.rules
            .iter()
            .find(|(_, pattern)| pattern.is_match(&mnemonic))
            .map_or(FALLBACK_KIND, |(name, _)| name.as_str())
    }
}
