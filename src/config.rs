use crate::level::SeverityLevel;
use crate::rule::RuleSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct BugscanConfig {
    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub refactor: RefactorConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(flatten)]
    pub levels: HashMap<String, SeverityLevel>,
}

/// Which rules' fixes `--fix` applies. Empty means all of them.
#[derive(Debug, Default, Deserialize)]
pub struct RefactorConfig {
    #[serde(default)]
    pub only: Vec<String>,
}

impl BugscanConfig {
    pub fn rule_settings(&self) -> RuleSettings {
        RuleSettings::default()
            .with_config_levels(self.rules.levels.clone())
            .disable(self.rules.disabled.clone())
    }

    pub fn refactors(&self, rule: &str) -> bool {
        self.refactor.only.is_empty() || self.refactor.only.iter().any(|r| r == rule)
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "bugscan.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<BugscanConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: BugscanConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, BugscanConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleCategory, RuleDescriptor};

    static REF_EQ: RuleDescriptor =
        RuleDescriptor::warning("ReferenceEquality", RuleCategory::Correctness, "x");

    #[test]
    fn parses_levels_disabled_and_refactor() {
        let cfg: BugscanConfig = toml::from_str(
            r#"
[rules]
disabled = ["BooleanLiteralComparison"]
ReferenceEquality = "error"

[refactor]
only = ["MultipleVariableDeclarations"]
"#,
        )
        .unwrap();

        assert_eq!(cfg.rules.disabled, vec!["BooleanLiteralComparison"]);
        assert_eq!(
            cfg.rules.levels.get("ReferenceEquality"),
            Some(&SeverityLevel::Error)
        );
        assert_eq!(cfg.rule_settings().severity_for(&REF_EQ), SeverityLevel::Error);
        assert!(cfg.refactors("MultipleVariableDeclarations"));
        assert!(!cfg.refactors("ReferenceEquality"));
    }

    #[test]
    fn empty_file_is_default() {
        let cfg: BugscanConfig = toml::from_str("").unwrap();
        assert!(cfg.rules.levels.is_empty());
        assert!(cfg.refactors("Anything"));
    }

    #[test]
    fn discovers_config_in_ancestor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src/main/java");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE_NAME),
            "[rules]\nReferenceEquality = \"off\"\n",
        )
        .unwrap();

        let (path, cfg) = load_config(None, &nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(DEFAULT_CONFIG_FILE_NAME));
        assert!(!cfg.rule_settings().is_enabled(&REF_EQ));
    }

    #[test]
    fn unknown_level_is_an_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "[rules]\nReferenceEquality = \"loud\"\n").unwrap();

        let err = load_config(Some(&path), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }
}
