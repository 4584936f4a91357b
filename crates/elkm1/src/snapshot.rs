//! Fast-load snapshot: a JSON value projection of the entity arena
//!
//! Written at quiet boundaries (pause, shutdown) and restored before the
//! first transport read so applications see last-known values while the
//! scanner refreshes everything. Restore is forgiving in both directions:
//! unknown fields in the file are ignored and missing fields leave the
//! entity at its unknown default until the next scan.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{
    Area, Counter, Keypad, Output, Setting, Task, Thermostat, User, X10Device, Zone,
};
use crate::error::Error;
use crate::panel::PanelState;

/// Top-level snapshot document, keyed by entity class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub zone: Vec<Zone>,
    #[serde(default)]
    pub output: Vec<Output>,
    #[serde(default)]
    pub area: Vec<Area>,
    #[serde(default)]
    pub keypad: Vec<Keypad>,
    #[serde(default)]
    pub thermostat: Vec<Thermostat>,
    #[serde(default)]
    pub x10: Vec<X10Device>,
    #[serde(default)]
    pub task: Vec<Task>,
    #[serde(default)]
    pub user: Vec<User>,
    #[serde(default)]
    pub counter: Vec<Counter>,
    #[serde(default)]
    pub setting: Vec<Setting>,
}

impl Snapshot {
    /// Project the current entity values.
    pub fn capture(panel: &PanelState) -> Self {
        Self {
            zone: panel.zones.clone(),
            output: panel.outputs.clone(),
            area: panel.areas.clone(),
            keypad: panel.keypads.clone(),
            thermostat: panel.thermostats.clone(),
            x10: panel.x10.clone(),
            task: panel.tasks.clone(),
            user: panel.users.clone(),
            counter: panel.counters.clone(),
            setting: panel.settings.clone(),
        }
    }

    /// Merge the snapshot into a fresh arena. Entries match by wire
    /// number (house and unit for power-line devices); anything out of
    /// range is skipped. Derived membership is rebuilt afterwards rather
    /// than trusted from the file.
    pub fn restore_into(self, panel: &mut PanelState) {
        for zone in self.zone {
            if let Some(slot) = panel.zones.get_mut(usize::from(zone.number).wrapping_sub(1)) {
                *slot = zone;
            }
        }
        for output in self.output {
            if let Some(slot) = panel.outputs.get_mut(usize::from(output.number).wrapping_sub(1)) {
                *slot = output;
            }
        }
        for area in self.area {
            if let Some(slot) = panel.areas.get_mut(usize::from(area.number).wrapping_sub(1)) {
                *slot = area;
                slot.reset_membership();
            }
        }
        for keypad in self.keypad {
            if let Some(slot) = panel.keypads.get_mut(usize::from(keypad.number).wrapping_sub(1)) {
                *slot = keypad;
            }
        }
        for thermostat in self.thermostat {
            if let Some(slot) =
                panel.thermostats.get_mut(usize::from(thermostat.number).wrapping_sub(1))
            {
                *slot = thermostat;
            }
        }
        for device in self.x10 {
            let index = device.index();
            if index < panel.x10.len() {
                panel.x10[index] = device;
            }
        }
        for task in self.task {
            if let Some(slot) = panel.tasks.get_mut(usize::from(task.number).wrapping_sub(1)) {
                *slot = task;
            }
        }
        for user in self.user {
            if let Some(slot) = panel.users.get_mut(usize::from(user.number).wrapping_sub(1)) {
                *slot = user;
            }
        }
        for counter in self.counter {
            if let Some(slot) = panel.counters.get_mut(usize::from(counter.number).wrapping_sub(1))
            {
                *slot = counter;
            }
        }
        for setting in self.setting {
            if let Some(slot) = panel.settings.get_mut(usize::from(setting.number).wrapping_sub(1))
            {
                *slot = setting;
            }
        }
        panel.rebuild_memberships();
    }
}

/// Write the snapshot for `panel` to `path`.
pub async fn save(panel: &PanelState, path: &Path) -> Result<(), Error> {
    let snapshot = Snapshot::capture(panel);
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| Error::Snapshot(format!("serialize failed: {e}")))?;
    tokio::fs::write(path, json).await?;
    debug!(path = %path.display(), "snapshot written");
    Ok(())
}

/// Read a snapshot from `path`. A missing or invalid file is reported as
/// `Error::Snapshot` so the caller can fall back to a cold start.
pub async fn load(path: &Path) -> Result<Snapshot, Error> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Snapshot(format!("{}: {e}", path.display())))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .map_err(|e| Error::Snapshot(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "snapshot loaded");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn round_trip_preserves_entity_values() {
        let mut panel = PanelState::new();
        let now = Utc::now();
        panel.zones[3].set_state_status(1, 2, now);
        panel.zones[3].description = Some("Front Door".into());
        panel.outputs[9].set_status(true, now);
        panel.counters[0].set_value(1234, now);
        panel.x10[66].set_level_state(40, now);

        let json = serde_json::to_string(&Snapshot::capture(&panel)).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        let mut restored = PanelState::new();
        parsed.restore_into(&mut restored);

        assert_eq!(restored.zones[3], panel.zones[3]);
        assert_eq!(restored.outputs[9], panel.outputs[9]);
        assert_eq!(restored.counters[0], panel.counters[0]);
        assert_eq!(restored.x10[66], panel.x10[66]);
    }

    #[test]
    fn membership_is_rebuilt_not_trusted() {
        let mut panel = PanelState::new();
        let now = Utc::now();
        panel.zones[0].set_area(1, now);
        panel.keypads[2].set_area(1, now);
        let snapshot = Snapshot::capture(&panel);
        let mut restored = PanelState::new();
        snapshot.restore_into(&mut restored);
        assert!(restored.areas[0].member_zone[0]);
        assert!(restored.areas[0].member_keypad[2]);
    }

    #[test]
    fn unknown_fields_and_missing_classes_are_ignored() {
        let raw = r#"{
            "zone": [{"number": 2, "area": 1, "future_field": true}],
            "unknown_class": []
        }"#;
        let parsed: Snapshot = serde_json::from_str(raw).unwrap();
        let mut panel = PanelState::new();
        parsed.restore_into(&mut panel);
        assert_eq!(panel.zones[1].area, 1);
        // Fields missing from the file stay unknown.
        assert_eq!(panel.zones[1].state, None);
        assert!(!panel.zones[1].enabled());
    }

    #[tokio::test]
    async fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fastload.json");
        let mut panel = PanelState::new();
        panel.counters[5].set_value(77, Utc::now());
        save(&panel, &path).await.unwrap();

        let snapshot = load(&path).await.unwrap();
        let mut restored = PanelState::new();
        snapshot.restore_into(&mut restored);
        assert_eq!(restored.counters[5].value, Some(77));
    }

    #[tokio::test]
    async fn missing_file_reports_snapshot_error() {
        let err = load(Path::new("/nonexistent/fastload.json")).await.unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));
    }
}
