use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating mode of an aircon as it appears on the wire.
///
/// Hubs omit the field on rarely-touched systems; the firmware treats a
/// missing mode as heat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Heat,
    Cool,
    Dry,
    Fan,
}

impl Mode {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Mode::Heat => "heat",
            Mode::Cool => "cool",
            Mode::Dry => "dry",
            Mode::Fan => "fan",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "heat" => Some(Mode::Heat),
            "cool" => Some(Mode::Cool),
            "dry" => Some(Mode::Dry),
            "fan" => Some(Mode::Fan),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Target mode for [`set_hvac_mode`](crate::MyPlaceIqClient::set_hvac_mode).
///
/// Zones only support `Auto` (damper open) and `Off` (damper closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Dry,
    FanOnly,
    Auto,
}

impl HvacMode {
    /// Wire mode for an aircon, if this target maps to one.
    pub fn as_aircon_mode(&self) -> Option<Mode> {
        match self {
            HvacMode::Heat => Some(Mode::Heat),
            HvacMode::Cool => Some(Mode::Cool),
            HvacMode::Dry => Some(Mode::Dry),
            HvacMode::FanOnly => Some(Mode::Fan),
            HvacMode::Off | HvacMode::Auto => None,
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::Dry => "dry",
            HvacMode::FanOnly => "fan_only",
            HvacMode::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// One air-conditioning system as reported by a full-data response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirconState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_on: bool,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub actual_temperature: Option<f64>,
    #[serde(default)]
    pub target_temperature_heat: Option<f64>,
    #[serde(default)]
    pub target_temperature_cool: Option<f64>,
    /// Zone ids in display order. Defines the parent-child relation;
    /// every consumer traversal goes through this list.
    #[serde(default)]
    pub zone_order: Vec<String>,
}

/// One damper-controlled zone. `is_on` means the damper is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_on: bool,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_clickable: bool,
    #[serde(default)]
    pub temperature_sensor_value: Option<f64>,
    #[serde(default)]
    pub target_temperature_heat: Option<f64>,
    #[serde(default)]
    pub target_temperature_cool: Option<f64>,
}

/// Full cached device state at a point in time.
///
/// Replaced wholesale on every successful refresh; optimistic patches
/// mutate it in place and are superseded by the next replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub aircons: HashMap<String, AirconState>,
    #[serde(default)]
    pub zones: HashMap<String, ZoneState>,
}

impl Snapshot {
    pub fn aircon(&self, aircon_id: &str) -> Option<&AirconState> {
        self.aircons.get(aircon_id)
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneState> {
        self.zones.get(zone_id)
    }

    /// The aircon whose zone order references `zone_id`.
    ///
    /// A zone belongs to exactly one aircon; the back-reference is derived
    /// rather than stored.
    pub fn aircon_for_zone(&self, zone_id: &str) -> Option<(&str, &AirconState)> {
        self.aircons
            .iter()
            .find(|(_, aircon)| aircon.zone_order.iter().any(|z| z == zone_id))
            .map(|(id, aircon)| (id.as_str(), aircon))
    }

    /// Zones of `aircon_id` in zone order, skipping ids that are missing
    /// from the zones map or not visible.
    pub fn visible_zones<'a>(
        &'a self,
        aircon_id: &str,
    ) -> impl Iterator<Item = (&'a str, &'a ZoneState)> {
        let order = self
            .aircons
            .get(aircon_id)
            .map(|a| a.zone_order.as_slice())
            .unwrap_or_default();
        order.iter().filter_map(|zone_id| {
            self.zones
                .get(zone_id)
                .filter(|zone| zone.is_visible)
                .map(|zone| (zone_id.as_str(), zone))
        })
    }
}
