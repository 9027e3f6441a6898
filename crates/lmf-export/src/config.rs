//! Export settings read from a TOML file.
//!
//! Every key is optional; missing keys keep the value they had before the
//! file was applied.
//!
//! ```toml
//! max_depth = 12
//! criterion = "volume"
//! threshold = 250.0
//! format = "pos,normal,uv0,tangent"
//! encoding = "binary"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use lmf_tree::ExportSettings;
use serde::Deserialize;

/// Contents of a settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub max_depth: Option<i32>,
    /// `polycount`, `volume`, `area` or `extent`.
    pub criterion: Option<String>,
    pub threshold: Option<f64>,
    /// Comma separated channel names.
    pub format: Option<String>,
    /// `ascii` or `binary`.
    pub encoding: Option<String>,
}

impl SettingsFile {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings TOML: {}", path.display()))
    }

    /// Overwrites the fields of `settings` that this file sets.
    pub fn apply(&self, settings: &mut ExportSettings) -> Result<()> {
        if let Some(max_depth) = self.max_depth {
            settings.max_depth = max_depth;
        }
        if let Some(criterion) = &self.criterion {
            settings.criterion = criterion.parse().context("Invalid criterion in settings file")?;
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(format) = &self.format {
            settings.vertex_format = format.parse().context("Invalid format in settings file")?;
        }
        if let Some(encoding) = &self.encoding {
            settings.encoding = encoding.parse().context("Invalid encoding in settings file")?;
        }
        Ok(())
    }
}
