use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::MeetingStyle;

/// Style-specific tangent-confidence thresholds (§4.5). `chatting` has no
/// threshold — tangent checks never fire in that style (see `Trigger::Tangent`
/// handling in the gate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangentThresholds {
    #[serde(default = "default_gentle_threshold")]
    pub gentle: f64,
    #[serde(default = "default_moderate_threshold")]
    pub moderate: f64,
}

impl Default for TangentThresholds {
    fn default() -> Self {
        Self { gentle: default_gentle_threshold(), moderate: default_moderate_threshold() }
    }
}

fn default_gentle_threshold() -> f64 {
    0.80
}
fn default_moderate_threshold() -> f64 {
    0.70
}

/// Recognised configuration surface (§6.4). Loaded once per process; the
/// per-room `style` override parsed from room metadata takes precedence
/// over this file/env default for that session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    #[serde(default)]
    pub style: MeetingStyle,

    #[serde(default = "bool_true")]
    pub deterministic_time_queries: bool,

    #[serde(default = "default_monitoring_interval")]
    pub monitoring_interval_seconds: u64,

    #[serde(default = "default_cooldown")]
    pub intervention_cooldown_seconds: u64,

    #[serde(default = "default_override_grace")]
    pub override_grace_seconds: u64,

    #[serde(default = "default_silence_window")]
    pub silence_window_seconds: u64,

    #[serde(default = "default_transcript_window")]
    pub transcript_window_seconds: u64,

    #[serde(default)]
    pub tangent_confidence_thresholds: TangentThresholds,

    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,

    /// Display name used for named-address detection and the intro utterance.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            style: MeetingStyle::default(),
            deterministic_time_queries: bool_true(),
            monitoring_interval_seconds: default_monitoring_interval(),
            intervention_cooldown_seconds: default_cooldown(),
            override_grace_seconds: default_override_grace(),
            silence_window_seconds: default_silence_window(),
            transcript_window_seconds: default_transcript_window(),
            tangent_confidence_thresholds: TangentThresholds::default(),
            warning_ratio: default_warning_ratio(),
            bot_name: default_bot_name(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_monitoring_interval() -> u64 {
    15
}
fn default_cooldown() -> u64 {
    30
}
fn default_override_grace() -> u64 {
    120
}
fn default_silence_window() -> u64 {
    300
}
fn default_transcript_window() -> u64 {
    120
}
fn default_warning_ratio() -> f64 {
    0.80
}
fn default_bot_name() -> String {
    "Beat".to_string()
}

impl FacilitatorConfig {
    /// Load config from a TOML file with `BEAT_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, then `~/.beat/beat.toml`.
    /// Any field missing from both layers falls back to its documented
    /// default, so a missing/unreadable file is not an error.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.map(String::from).unwrap_or_else(default_config_path);

        let config: FacilitatorConfig = Figment::from(figment::providers::Serialized::defaults(
            FacilitatorConfig::default(),
        ))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("BEAT_").split("_"))
        .extract()
        .map_err(|e| crate::error::ExternalError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.beat/beat.toml", home)
}
