//! Infrastructure implementation of the `ConfigStore` port.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{CONFIG_PATH_ENV, SiteforgeConfig};

/// YAML configuration file, `~/.siteforge/config.yaml` unless
/// `SITEFORGE_CONFIG` names another location.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Resolve the file location from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `SITEFORGE_CONFIG` is unset and the home directory
    /// cannot be determined.
    pub fn locate() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(Self::at(path));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(Self::at(home.join(".siteforge").join("config.yaml")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<SiteforgeConfig> {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(SiteforgeConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: SiteforgeConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Writes a sibling temp file and renames it over the target, so a
    /// crash never leaves a truncated config behind. The file is private to
    /// the owner on unix.
    fn save(&self, config: &SiteforgeConfig) -> Result<()> {
        let path = &self.path;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot create a temporary file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| format!("cannot write {}", tmp.path().display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", tmp.path().display()))?;
        }

        tmp.persist(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
