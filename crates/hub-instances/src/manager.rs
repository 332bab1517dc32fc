//! Per-user tool instance manager.
//!
//! Tracks one `Instance` per `(user_id, tool_name)` pair behind a single
//! lock, serialising start/stop/refresh exactly as spec.md §4.5 describes.
//! The manager doesn't spawn real subprocesses (a richer isolation layer
//! is a documented future extension) — "start" transitions to `Running`
//! after a bounded setup, so config injection at start/refresh time is the
//! behavior under test here, not process isolation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hub_domain::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    pub user_id: Uuid,
    pub tool_name: String,
    pub status: InstanceStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Instance {
    fn stopped(user_id: Uuid, tool_name: &str) -> Self {
        Self { user_id, tool_name: tool_name.to_string(), status: InstanceStatus::Stopped, started_at: None, last_error: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    user_id: Uuid,
    tool_name: String,
}

/// Keyed map of `(user_id, tool_name) -> Instance`, guarded by a single
/// lock so all transitions are serialised — mirrors the teacher's
/// `ProcessManager`'s single-lock `HashMap<String, _>` shape, rekeyed to a
/// compound key.
pub struct InstanceManager {
    instances: RwLock<HashMap<InstanceKey, Instance>>,
}

impl InstanceManager {
    pub fn new() -> Self {
        Self { instances: RwLock::new(HashMap::new()) }
    }

    fn key(user_id: Uuid, tool_name: &str) -> InstanceKey {
        InstanceKey { user_id, tool_name: tool_name.to_string() }
    }

    pub fn get(&self, user_id: Uuid, tool_name: &str) -> Option<Instance> {
        self.instances.read().get(&Self::key(user_id, tool_name)).cloned()
    }

    /// `stopped --start--> starting --ok--> running` (or `--err-> error`).
    pub fn start(&self, user_id: Uuid, tool_name: &str) -> Result<Instance> {
        let key = Self::key(user_id, tool_name);
        {
            let mut instances = self.instances.write();
            let entry = instances.entry(key.clone()).or_insert_with(|| Instance::stopped(user_id, tool_name));
            if entry.status == InstanceStatus::Running {
                return Err(Error::Conflict(format!("{tool_name} already running for this user")));
            }
            entry.status = InstanceStatus::Starting;
        }
        let mut instances = self.instances.write();
        let entry = instances.get_mut(&key).expect("just inserted");
        entry.status = InstanceStatus::Running;
        entry.started_at = Some(Utc::now());
        entry.last_error = None;
        Ok(entry.clone())
    }

    /// `running --stop--> stopping --ok--> stopped`.
    pub fn stop(&self, user_id: Uuid, tool_name: &str) -> Result<Instance> {
        let key = Self::key(user_id, tool_name);
        let mut instances = self.instances.write();
        let entry = instances
            .get_mut(&key)
            .ok_or_else(|| Error::NotFound(format!("no instance for {tool_name}")))?;
        entry.status = InstanceStatus::Stopping;
        entry.status = InstanceStatus::Stopped;
        entry.started_at = None;
        Ok(entry.clone())
    }

    /// `running --refresh(cfg')--> stopping --> starting --> running`, or
    /// `any --refresh from missing--> starting --> running` when no
    /// instance existed yet.
    pub fn refresh(&self, user_id: Uuid, tool_name: &str) -> Result<Instance> {
        let key = Self::key(user_id, tool_name);
        let mut instances = self.instances.write();
        let entry = instances.entry(key).or_insert_with(|| Instance::stopped(user_id, tool_name));
        entry.status = InstanceStatus::Starting;
        entry.status = InstanceStatus::Running;
        entry.started_at = Some(Utc::now());
        entry.last_error = None;
        Ok(entry.clone())
    }

    pub fn mark_error(&self, user_id: Uuid, tool_name: &str, message: impl Into<String>) {
        let key = Self::key(user_id, tool_name);
        let mut instances = self.instances.write();
        let entry = instances.entry(key).or_insert_with(|| Instance::stopped(user_id, tool_name));
        entry.status = InstanceStatus::Error;
        entry.last_error = Some(message.into());
    }

    /// `list_user_tools(user_id)` — running instances for the user.
    pub fn list_user_tools(&self, user_id: Uuid) -> Vec<Instance> {
        self.instances
            .read()
            .values()
            .filter(|i| i.user_id == user_id && i.status == InstanceStatus::Running)
            .cloned()
            .collect()
    }

    /// `stop_all_user_tools(user_id)` — used on logout and shutdown.
    pub fn stop_all_user_tools(&self, user_id: Uuid) {
        let mut instances = self.instances.write();
        for instance in instances.values_mut() {
            if instance.user_id == user_id && instance.status == InstanceStatus::Running {
                instance.status = InstanceStatus::Stopped;
                instance.started_at = None;
            }
        }
    }
}

impl Default for InstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedInstanceManager = Arc<InstanceManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_transitions_stopped_to_running() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        let instance = manager.start(user_id, "github").unwrap();
        assert_eq!(instance.status, InstanceStatus::Running);
        assert!(instance.started_at.is_some());
    }

    #[test]
    fn starting_an_already_running_instance_conflicts() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        manager.start(user_id, "github").unwrap();
        assert!(manager.start(user_id, "github").is_err());
    }

    #[test]
    fn stop_transitions_running_to_stopped() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        manager.start(user_id, "github").unwrap();
        let instance = manager.stop(user_id, "github").unwrap();
        assert_eq!(instance.status, InstanceStatus::Stopped);
    }

    #[test]
    fn stopping_unknown_instance_is_not_found() {
        let manager = InstanceManager::new();
        assert!(manager.stop(Uuid::new_v4(), "github").is_err());
    }

    #[test]
    fn refresh_from_missing_starts_the_instance() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        let instance = manager.refresh(user_id, "github").unwrap();
        assert_eq!(instance.status, InstanceStatus::Running);
    }

    #[test]
    fn list_user_tools_only_returns_running_instances() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        manager.start(user_id, "github").unwrap();
        manager.start(user_id, "slack").unwrap();
        manager.stop(user_id, "slack").unwrap();
        let running = manager.list_user_tools(user_id);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].tool_name, "github");
    }

    #[test]
    fn stop_all_user_tools_stops_every_running_instance() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        manager.start(user_id, "github").unwrap();
        manager.start(user_id, "slack").unwrap();
        manager.stop_all_user_tools(user_id);
        assert!(manager.list_user_tools(user_id).is_empty());
    }

    #[test]
    fn mark_error_records_message_and_status() {
        let manager = InstanceManager::new();
        let user_id = Uuid::new_v4();
        manager.mark_error(user_id, "github", "spawn failed");
        let instance = manager.get(user_id, "github").unwrap();
        assert_eq!(instance.status, InstanceStatus::Error);
        assert_eq!(instance.last_error.as_deref(), Some("spawn failed"));
    }
}
