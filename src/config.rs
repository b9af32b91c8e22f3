use serde::{Deserialize, Serialize};

/// Engine options, constructed once at session start and threaded through
/// the engine context. Reading these from a file is the embedder's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Block non-owners from harvesting or striking owned crops.
    pub enforce_crop_ownership: bool,
    /// Block non-owners from using or striking owned machines.
    pub enforce_machine_ownership: bool,
    /// Block non-owners from opening or striking owned chests.
    pub enforce_chest_ownership: bool,
    /// Block non-owners from striking owned buildings.
    pub enforce_building_ownership: bool,
    /// Protect pasture zones around animal buildings from non-owners.
    pub enforce_pasture_protection: bool,

    /// Percentage of each non-host player's private shipping revenue paid
    /// to the host in Landlord mode.
    pub landlord_cut_percent: u32,

    /// Expiration applied when a grant does not specify one.
    pub default_trust_days: u32,

    /// Pasture zone edge length for coops, in tiles.
    pub coop_pasture_size: i32,
    /// Pasture zone edge length for barns, in tiles.
    pub barn_pasture_size: i32,

    /// Ticks between boundary checks.
    pub boundary_check_interval: u64,
    /// Ticks between machine output sweeps.
    pub machine_sweep_interval: u64,
    /// Ticks after day start before tagging reactions resume; lets
    /// day-transition world churn settle so pre-existing resources are not
    /// mis-tagged to whoever happens to be local.
    pub day_settle_ticks: u64,
    /// Ticks a player's denial message stays suppressed after showing one.
    pub denial_cooldown_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_crop_ownership: true,
            enforce_machine_ownership: true,
            enforce_chest_ownership: true,
            enforce_building_ownership: true,
            enforce_pasture_protection: true,
            landlord_cut_percent: 10,
            default_trust_days: 7,
            coop_pasture_size: 12,
            barn_pasture_size: 16,
            boundary_check_interval: 8,
            machine_sweep_interval: 60,
            day_settle_ticks: 120,
            denial_cooldown_ticks: 120,
        }
    }
}
