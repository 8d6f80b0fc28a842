use crate::history::MAX_HISTORY;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Auto,
    Manual,
}

impl LayoutMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub member_width: f32,
    pub member_height: f32,
    /// Side of the square junction marker; placement offsets by half of it.
    pub junction_size: f32,
    pub margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 80.0,
            rank_spacing: 120.0,
            member_width: 180.0,
            member_height: 80.0,
            junction_size: 8.0,
            margin: 8.0,
        }
    }
}

impl LayoutConfig {
    pub fn junction_offset(&self) -> f32 {
        self.junction_size / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: LayoutMode,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Auto,
            history_limit: MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOverrides {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    member_width: Option<f32>,
    member_height: Option<f32>,
    junction_size: Option<f32>,
    margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    mode: Option<String>,
    history_limit: Option<usize>,
    layout: Option<LayoutOverrides>,
}

/// Loads a JSON (or JSON5) config file on top of the defaults. Missing keys
/// keep their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    apply_config_str(&mut config, &contents)?;
    Ok(config)
}

pub fn apply_config_str(config: &mut Config, contents: &str) -> anyhow::Result<()> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(contents)?,
    };

    if let Some(mode) = parsed.mode.as_deref() {
        config.engine.mode = LayoutMode::from_token(mode)
            .ok_or_else(|| anyhow::anyhow!("unknown layout mode `{mode}`"))?;
    }
    if let Some(limit) = parsed.history_limit {
        if limit == 0 {
            return Err(anyhow::anyhow!("historyLimit must be at least 1"));
        }
        config.engine.history_limit = limit;
    }
    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.rank_spacing {
            config.layout.rank_spacing = v;
        }
        if let Some(v) = layout.member_width {
            config.layout.member_width = v;
        }
        if let Some(v) = layout.member_height {
            config.layout.member_height = v;
        }
        if let Some(v) = layout.junction_size {
            config.layout.junction_size = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = Config::default();
        assert_eq!(config.engine.history_limit, 20);
        assert_eq!(config.engine.mode, LayoutMode::Auto);
        assert_eq!(config.layout.junction_offset(), 4.0);
    }

    #[test]
    fn json5_overrides_apply_partially() {
        let mut config = Config::default();
        let raw = r#"{
            // comments are allowed
            mode: 'manual',
            layout: { rankSpacing: 200 },
        }"#;
        apply_config_str(&mut config, raw).unwrap();
        assert_eq!(config.engine.mode, LayoutMode::Manual);
        assert_eq!(config.layout.rank_spacing, 200.0);
        assert_eq!(config.layout.node_spacing, 80.0);
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut config = Config::default();
        assert!(apply_config_str(&mut config, r#"{"mode":"sideways"}"#).is_err());
    }
}
