//! Instance scanner rules, optionally read from a TOML file.

use crate::model::Category;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One instance-line file and how to read tile numbers out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// File name relative to the instances directory.
    pub file: PathBuf,
    /// Trigger keywords, matched as whole tokens.
    pub keywords: Vec<String>,
    /// Position of the tile argument after the keyword, `1` being the
    /// token right after it.
    pub offset: usize,
    pub bitmap: Category,
}

impl Rule {
    fn new(file: &str, keywords: &[&str], offset: usize, bitmap: Category) -> Self {
        Self {
            file: PathBuf::from(file),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            offset,
            bitmap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    pub rule: Vec<Rule>,
}

impl Default for Rules {
    fn default() -> Self {
        use Category::*;
        Self {
            rule: vec![
                Rule::new("actor_instances.txt", &["actor"], 1, Actor),
                Rule::new("useractor_instances.txt", &["useractor"], 2, Actor),
                Rule::new(
                    "spawn_instances.txt",
                    &["spawn", "espawn", "qspawn", "eqspawn", "spawnvar"],
                    1,
                    Spawn,
                ),
                Rule::new("cactor_lines.txt", &["cactor"], 1, Spawn),
                Rule::new("projectile_instances.txt", &["defineprojectile"], 1, Projectile),
                Rule::new("myospal.txt", &["myospal", "myospalx"], 3, Screen),
                Rule::new("rotatesprite.txt", &["rotatesprite", "rotatespritea"], 5, Screen),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read rules file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rules file {path}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("rule for {file} has offset 0; the argument must follow the keyword")]
    ZeroOffset { file: PathBuf },
    #[error("rule for {file} has no keywords")]
    NoKeywords { file: PathBuf },
}

impl Rules {
    pub fn from_toml(src: &str, path: &Path) -> Result<Self, ConfigError> {
        let rules: Rules = toml::from_str(src).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&src, path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.rule {
            if rule.offset == 0 {
                return Err(ConfigError::ZeroOffset {
                    file: rule.file.clone(),
                });
            }
            if rule.keywords.is_empty() {
                return Err(ConfigError::NoKeywords {
                    file: rule.file.clone(),
                });
            }
        }
        Ok(())
    }
}
