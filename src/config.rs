use crate::clock::service::{IdlePolicy, TimerConfig};
use crate::view::style::StyleAttributes;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device pixels per density-independent unit.
    #[serde(default = "default_density")]
    pub density: f32,

    #[serde(default)]
    pub style: StyleAttributes,

    #[serde(default = "default_timer")]
    pub timer: TimerSettings,

    #[serde(default = "default_demo")]
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    #[serde(default)]
    pub idle_policy: IdlePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSettings {
    #[serde(default = "default_clock_count")]
    pub clock_count: u32,
    /// Side of each clock cell, in pixels.
    #[serde(default = "default_clock_size")]
    pub clock_size: u32,
    #[serde(default = "default_max_random_padding_dp")]
    pub max_random_padding_dp: f32,
    #[serde(default = "default_button_height")]
    pub button_height: u32,
    #[serde(default = "default_gap")]
    pub gap: u32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_button_color")]
    pub button_color: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            density: default_density(),
            style: StyleAttributes::default(),
            timer: default_timer(),
            demo: default_demo(),
        }
    }
}

fn default_timer() -> TimerSettings {
    TimerSettings {
        period_ms: default_period_ms(),
        idle_policy: IdlePolicy::default(),
    }
}

fn default_period_ms() -> u64 {
    1000
}

fn default_demo() -> DemoSettings {
    DemoSettings {
        clock_count: default_clock_count(),
        clock_size: default_clock_size(),
        max_random_padding_dp: default_max_random_padding_dp(),
        button_height: default_button_height(),
        gap: default_gap(),
        background: default_background(),
        button_color: default_button_color(),
    }
}

fn default_clock_count() -> u32 {
    3
}

fn default_clock_size() -> u32 {
    200
}

fn default_max_random_padding_dp() -> f32 {
    50.0
}

fn default_button_height() -> u32 {
    48
}

fn default_gap() -> u32 {
    8
}

fn default_background() -> String {
    "#f5f5f5".to_string()
}

fn default_button_color() -> String {
    "#4a9eff".to_string()
}

fn default_density() -> f32 {
    1.0
}

impl TimerSettings {
    pub fn to_timer_config(&self) -> TimerConfig {
        TimerConfig {
            // A zero period would spin the timer thread.
            period: Duration::from_millis(self.period_ms.max(1)),
            idle_policy: self.idle_policy,
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join("analog-clock").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::parse(&contents)
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::path()?;
        if let Some(config_dir) = config_path.parent() {
            std::fs::create_dir_all(config_dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        Ok(())
    }
}
