use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::EntityKind;
use crate::types::{AirconState, Mode, Snapshot, ZoneState};

pub(crate) type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// Single-attribute mutation applied ahead of server confirmation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Patch {
    IsOn(bool),
    Mode(Mode),
    TargetTemperatureHeat(f64),
    TargetTemperatureCool(f64),
}

/// Owner of the cached [`Snapshot`].
///
/// Writes come from two producers only, the poller's replace and the
/// facade's optimistic patches, serialized by the write lock. Readers get
/// a consistent clone and never observe a partial update. Registered
/// observers are notified after every mutation, outside the lock.
pub(crate) struct StateCache {
    snapshot: RwLock<Snapshot>,
    /// Optimistic edits ahead of the server; cleared by the next replace.
    dirty: AtomicBool,
    available: AtomicBool,
    callbacks: Vec<SnapshotCallback>,
}

impl StateCache {
    pub fn new(callbacks: Vec<SnapshotCallback>) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot::default()),
            dirty: AtomicBool::new(false),
            available: AtomicBool::new(false),
            callbacks,
        }
    }

    pub fn current(&self) -> Snapshot {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Wholesale overwrite with authoritative state. Always wins over any
    /// pending optimistic edit.
    pub fn replace(&self, snapshot: Snapshot) {
        let current = {
            let mut guard = self.snapshot.write().expect("snapshot lock poisoned");
            *guard = snapshot;
            guard.clone()
        };
        self.dirty.store(false, Ordering::SeqCst);
        self.available.store(true, Ordering::SeqCst);
        debug!(
            aircons = current.aircons.len(),
            zones = current.zones.len(),
            "snapshot replaced"
        );
        self.notify(&current);
    }

    /// A refresh failed; keep the stale snapshot but flag it.
    pub fn mark_unavailable(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    /// Patch one attribute in place. An absent target logs and no-ops;
    /// the command was still sent and the next refresh settles it.
    pub fn apply_optimistic(&self, kind: EntityKind, id: &str, patch: Patch) -> bool {
        let updated = {
            let mut guard = self.snapshot.write().expect("snapshot lock poisoned");
            let applied = match kind {
                EntityKind::Aircon => guard
                    .aircons
                    .get_mut(id)
                    .is_some_and(|aircon| apply_aircon_patch(aircon, patch)),
                EntityKind::Zone => guard
                    .zones
                    .get_mut(id)
                    .is_some_and(|zone| apply_zone_patch(zone, patch)),
            };
            applied.then(|| guard.clone())
        };
        match updated {
            Some(current) => {
                self.dirty.store(true, Ordering::SeqCst);
                debug!(%kind, id, ?patch, "optimistic update applied");
                self.notify(&current);
                true
            }
            None => {
                warn!(%kind, id, ?patch, "optimistic update target not in cache");
                false
            }
        }
    }

    fn notify(&self, snapshot: &Snapshot) {
        for cb in &self.callbacks {
            cb(snapshot);
        }
    }
}

fn apply_aircon_patch(aircon: &mut AirconState, patch: Patch) -> bool {
    match patch {
        Patch::IsOn(on) => aircon.is_on = on,
        Patch::Mode(mode) => aircon.mode = mode,
        Patch::TargetTemperatureHeat(t) => aircon.target_temperature_heat = Some(t),
        Patch::TargetTemperatureCool(t) => aircon.target_temperature_cool = Some(t),
    }
    true
}

fn apply_zone_patch(zone: &mut ZoneState, patch: Patch) -> bool {
    match patch {
        Patch::IsOn(on) => zone.is_on = on,
        Patch::TargetTemperatureHeat(t) => zone.target_temperature_heat = Some(t),
        Patch::TargetTemperatureCool(t) => zone.target_temperature_cool = Some(t),
        // zones carry no mode of their own
        Patch::Mode(_) => return false,
    }
    true
}
