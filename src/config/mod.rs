//! # Config
//!
//! This module covers the live configuration patches read from.
//!
//! The configuration is owned by the host: it loads it, and it swaps it when a multiplayer session
//! hands down a different one. This crate only reads snapshots through a [`LiveConfig`] handle. An
//! empty handle means the configuration is unavailable, and every patch treats that as "disabled".

use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use thiserror::Error;

/// Errors while reading the live configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No configuration has been loaded, or it was cleared
    #[error("configuration is unavailable")]
    Unavailable,
}

/// Day/night cycle
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Section toggle
    pub enabled: bool,
    /// Pin the part of the day instead of rescaling it
    pub force_part_of_day: bool,
    /// Day fraction to pin to, `0.0..=1.0`
    pub force_part_of_day_time: f32,
    /// Share of the day that is night, in percent
    pub night_percent: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            force_part_of_day: false,
            force_part_of_day_time: 0.5,
            night_percent: 30.0,
        }
    }
}

/// General game settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Section toggle
    pub enabled: bool,
    /// Player range used for difficulty scaling
    pub difficulty_scale_range: f32,
    /// Report this many nearby players when positive
    pub set_fixed_player_count_to: i32,
    /// Added to the nearby player count
    pub extra_player_count_nearby: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            difficulty_scale_range: 200.0,
            set_fixed_player_count_to: 0,
            extra_player_count_nearby: 0,
        }
    }
}

/// Crafting from nearby containers
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CraftFromChestConfig {
    /// Section toggle
    pub enabled: bool,
    /// Keep cooking stations from pulling from containers
    pub disable_cooking_station: bool,
}

/// Pickable yield
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PickableConfig {
    /// Section toggle
    pub enabled: bool,
}

/// Turrets
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TurretConfig {
    /// Section toggle
    pub enabled: bool,
    /// Turrets never consume ammo
    pub unlimited_ammo: bool,
}

/// Building
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildingConfig {
    /// Section toggle
    pub enabled: bool,
    /// Radius in which pieces count towards comfort
    pub piece_comfort_radius: f32,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            piece_comfort_radius: 10.0,
        }
    }
}

/// Auto-stacking into containers
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoStackConfig {
    /// Section toggle
    pub enabled: bool,
    /// Never stack equipped items
    pub auto_stack_all_ignore_equipment: bool,
}

/// Free placement rotation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FreePlacementRotationConfig {
    /// Section toggle
    pub enabled: bool,
}

/// Dedicated server settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Section toggle
    pub enabled: bool,
    /// Allow public servers without a password
    pub disable_server_password: bool,
}

/// Full configuration, grouped by feature area
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Day/night cycle
    pub time: TimeConfig,
    /// General game settings
    pub game: GameConfig,
    /// Crafting from containers
    pub craft_from_chest: CraftFromChestConfig,
    /// Pickable yield
    pub pickable: PickableConfig,
    /// Turrets
    pub turret: TurretConfig,
    /// Building
    pub building: BuildingConfig,
    /// Auto-stacking
    pub auto_stack: AutoStackConfig,
    /// Free placement rotation
    pub free_placement_rotation: FreePlacementRotationConfig,
    /// Dedicated server
    pub server: ServerConfig,
}

/// Shared handle to the host's current configuration.
///
/// Clones share one slot. Readers take an [`Arc`] snapshot, so a swap never changes a configuration
/// someone is halfway through reading.
#[derive(Debug, Clone, Default)]
pub struct LiveConfig {
    /// Current snapshot, `None` while unavailable
    slot: Arc<RwLock<Option<Arc<Configuration>>>>,
}

impl LiveConfig {
    /// Creates a handle holding `config`
    pub fn new(config: Configuration) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(Arc::new(config)))),
        }
    }

    /// Creates a handle with no configuration loaded
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Swaps in a new configuration
    pub fn replace(&self, config: Configuration) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(config));
    }

    /// Drops the current configuration, making it unavailable
    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Snapshot of the current configuration
    pub fn snapshot(&self) -> Result<Arc<Configuration>, ConfigError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.clone().ok_or(ConfigError::Unavailable)
    }
}

impl From<Configuration> for LiveConfig {
    fn from(config: Configuration) -> Self {
        Self::new(config)
    }
}
