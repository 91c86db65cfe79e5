//! Runtime configuration for the `agro` binary.

use std::path::{Path, PathBuf};

use agro_engine::EngineConfig;
use anyhow::Context as _;
use serde::Deserialize;

fn default_reference_db() -> PathBuf { PathBuf::from("agro-reference.db") }

/// Deserialised from the TOML file plus `AGRO_*` environment variables.
/// Engine tunables sit at the top level next to the paths.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_reference_db")]
  pub reference_db:     PathBuf,
  #[serde(default)]
  pub knowledge_base:   Option<PathBuf>,
  #[serde(default)]
  pub classifier_model: Option<PathBuf>,
  #[serde(default)]
  pub regressor_model:  Option<PathBuf>,
  #[serde(flatten)]
  pub engine:           EngineConfig,
}

impl CliConfig {
  /// Read `path` if it exists, then overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("AGRO").try_parsing(true))
      .build()
      .context("failed to read config file")?;
    Self::from_settings(settings)
  }

  fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
    let mut cfg: CliConfig = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.engine.validate().context("invalid engine settings")?;
    cfg.reference_db = expand_tilde(&cfg.reference_db);
    cfg.knowledge_base = cfg.knowledge_base.as_deref().map(expand_tilde);
    cfg.classifier_model = cfg.classifier_model.as_deref().map(expand_tilde);
    cfg.regressor_model = cfg.regressor_model.as_deref().map(expand_tilde);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> anyhow::Result<CliConfig> {
    CliConfig::from_settings(
      Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?,
    )
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("").unwrap();
    assert_eq!(cfg.reference_db, PathBuf::from("agro-reference.db"));
    assert!(cfg.classifier_model.is_none());
    assert_eq!(cfg.engine, EngineConfig::default());
  }

  #[test]
  fn engine_keys_sit_at_top_level() {
    let cfg = parse(
      r#"
      reference_db = "/var/lib/agro/ref.db"
      regressor_model = "/opt/agro/yield.json"
      min_cohort_samples = 8
      interval_z = 1.64
      "#,
    )
    .unwrap();
    assert_eq!(cfg.reference_db, PathBuf::from("/var/lib/agro/ref.db"));
    assert_eq!(cfg.regressor_model, Some(PathBuf::from("/opt/agro/yield.json")));
    assert_eq!(cfg.engine.min_cohort_samples, 8);
    assert_eq!(cfg.engine.interval_z, 1.64);
    assert_eq!(cfg.engine.classifier_top_k, 5);
  }

  #[test]
  fn invalid_engine_settings_are_rejected() {
    assert!(parse("low_confidence_ceiling = 2.0").is_err());
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/agro/ref.db")),
      PathBuf::from(home).join("agro/ref.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
