//! Common types for the printer environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a player (device owner, friend, or operator).
///
/// Uses UUID v4, matching the identity scheme of the host server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Creates a new random ActorId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an ActorId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic ActorId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A block position in a named world. The sole key of a device.
///
/// The textual form is `<world>_<x>_<y>_<z>`. Parsing splits from the
/// right, so world names may themselves contain underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpatialKey {
    /// World identifier
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SpatialKey {
    /// Creates a key from a world name and block coordinates.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}_{}", self.world, self.x, self.y, self.z)
    }
}

impl FromStr for SpatialKey {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(4, '_');
        let (z, y, x, world) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(z), Some(y), Some(x), Some(world)) if !world.is_empty() => (z, y, x, world),
            _ => return Err(EnvError::InvalidKey(s.to_string())),
        };

        let coord = |part: &str| {
            part.parse::<i32>()
                .map_err(|_| EnvError::InvalidKey(s.to_string()))
        };

        Ok(Self::new(world, coord(x)?, coord(y)?, coord(z)?))
    }
}

/// An owner-facing event raised by the periodic sweep.
///
/// Rendering into chat text is the presenter's job; the payload carries
/// the values its message templates need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// The device ran out of fuel.
    FuelEmpty {
        key: SpatialKey,
        /// Identity of the resource that refuels the device
        fuel_resource: String,
    },

    /// The device's stored earnings reached capacity.
    StorageFull {
        key: SpatialKey,
        /// Amount currently stored
        stored: f64,
    },
}

impl Notification {
    /// Returns the device this notification is about.
    pub fn key(&self) -> &SpatialKey {
        match self {
            Notification::FuelEmpty { key, .. } => key,
            Notification::StorageFull { key, .. } => key,
        }
    }
}
