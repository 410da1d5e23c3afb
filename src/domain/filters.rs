// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Selection Filters
//!
//! A device is selected when it passes every include filter (no include
//! filters selects everything) and no exclude filter.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::device::LandscapeDevice;

/// Filter that admits devices
pub trait IncludeFilter: Send + Sync {
    fn include(&self, device: &LandscapeDevice) -> bool;
}

/// Filter that rejects devices
pub trait ExcludeFilter: Send + Sync {
    fn exclude(&self, device: &LandscapeDevice) -> bool;
}

/// Filter over raw device configuration entries
pub trait ConfigIncludeFilter: Send + Sync {
    fn include(&self, entry: &Map<String, Value>) -> bool;
}

fn name_set<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Include devices of any of the given device types
#[derive(Debug, Clone)]
pub struct IncludeDeviceByDeviceType {
    device_types: BTreeSet<String>,
}

impl IncludeDeviceByDeviceType {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(device_types: I) -> Self {
        Self {
            device_types: name_set(device_types),
        }
    }
}

impl IncludeFilter for IncludeDeviceByDeviceType {
    fn include(&self, device: &LandscapeDevice) -> bool {
        self.device_types.contains(device.device_type())
    }
}

/// Include devices matching a device type and a role
#[derive(Debug, Clone)]
pub struct IncludeDeviceByDeviceTypeAndRole {
    device_type: String,
    role: String,
}

impl IncludeDeviceByDeviceTypeAndRole {
    pub fn new(device_type: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            role: role.into(),
        }
    }
}

impl IncludeFilter for IncludeDeviceByDeviceTypeAndRole {
    fn include(&self, device: &LandscapeDevice) -> bool {
        device.device_type() == self.device_type && device.role() == Some(self.role.as_str())
    }
}

/// Include devices belonging to any of the given groups
#[derive(Debug, Clone)]
pub struct IncludeDeviceByGroup {
    groups: BTreeSet<String>,
}

impl IncludeDeviceByGroup {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(groups: I) -> Self {
        Self {
            groups: name_set(groups),
        }
    }
}

impl IncludeFilter for IncludeDeviceByGroup {
    fn include(&self, device: &LandscapeDevice) -> bool {
        device.group().is_some_and(|g| self.groups.contains(g))
    }
}

/// Include devices by friendly identifier
#[derive(Debug, Clone)]
pub struct IncludeDeviceByName {
    names: BTreeSet<String>,
}

impl IncludeDeviceByName {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(names: I) -> Self {
        Self {
            names: name_set(names),
        }
    }
}

impl IncludeFilter for IncludeDeviceByName {
    fn include(&self, device: &LandscapeDevice) -> bool {
        self.names.contains(device.identity().as_str())
    }
}

/// Include devices with any of the given roles
#[derive(Debug, Clone)]
pub struct IncludeDeviceByRole {
    roles: BTreeSet<String>,
}

impl IncludeDeviceByRole {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(roles: I) -> Self {
        Self {
            roles: name_set(roles),
        }
    }
}

impl IncludeFilter for IncludeDeviceByRole {
    fn include(&self, device: &LandscapeDevice) -> bool {
        device.role().is_some_and(|r| self.roles.contains(r))
    }
}

/// Exclude devices belonging to any of the given groups
#[derive(Debug, Clone)]
pub struct ExcludeDeviceByGroup {
    groups: BTreeSet<String>,
}

impl ExcludeDeviceByGroup {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(groups: I) -> Self {
        Self {
            groups: name_set(groups),
        }
    }
}

impl ExcludeFilter for ExcludeDeviceByGroup {
    fn exclude(&self, device: &LandscapeDevice) -> bool {
        device.group().is_some_and(|g| self.groups.contains(g))
    }
}

/// Exclude devices by friendly identifier
#[derive(Debug, Clone)]
pub struct ExcludeDeviceByName {
    names: BTreeSet<String>,
}

impl ExcludeDeviceByName {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(names: I) -> Self {
        Self {
            names: name_set(names),
        }
    }
}

impl ExcludeFilter for ExcludeDeviceByName {
    fn exclude(&self, device: &LandscapeDevice) -> bool {
        self.names.contains(device.identity().as_str())
    }
}

/// Include configuration entries by their `deviceType`
#[derive(Debug, Clone)]
pub struct IncludeDeviceConfigByDeviceType {
    device_types: BTreeSet<String>,
}

impl IncludeDeviceConfigByDeviceType {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(device_types: I) -> Self {
        Self {
            device_types: name_set(device_types),
        }
    }
}

impl ConfigIncludeFilter for IncludeDeviceConfigByDeviceType {
    fn include(&self, entry: &Map<String, Value>) -> bool {
        entry
            .get("deviceType")
            .and_then(Value::as_str)
            .is_some_and(|t| self.device_types.contains(t))
    }
}

/// Apply include and exclude filters, keeping input order
pub fn select_devices(
    devices: &[Arc<LandscapeDevice>],
    includes: &[&dyn IncludeFilter],
    excludes: &[&dyn ExcludeFilter],
) -> Vec<Arc<LandscapeDevice>> {
    devices
        .iter()
        .filter(|d| includes.iter().all(|f| f.include(d)))
        .filter(|d| !excludes.iter().any(|f| f.exclude(d)))
        .cloned()
        .collect()
}

/// Apply configuration include filters, keeping input order
pub fn select_device_configs(
    entries: &[Map<String, Value>],
    includes: &[&dyn ConfigIncludeFilter],
) -> Vec<Map<String, Value>> {
    entries
        .iter()
        .filter(|e| includes.iter().all(|f| f.include(e)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn devices() -> Vec<Arc<LandscapeDevice>> {
        [
            json!({"identifier": "node-a", "role": "primary", "group": "rack-1"}),
            json!({"identifier": "node-b", "role": "secondary", "group": "rack-1"}),
            json!({"identifier": "node-c", "role": "primary", "group": "rack-2"}),
        ]
        .into_iter()
        .map(|v| {
            Arc::new(LandscapeDevice::from_config("ssh", v.as_object().cloned().unwrap()).unwrap())
        })
        .collect()
    }

    fn names(selected: &[Arc<LandscapeDevice>]) -> Vec<&str> {
        selected.iter().map(|d| d.identity().as_str()).collect()
    }

    #[test]
    fn test_no_filters_selects_all() {
        let all = devices();
        assert_eq!(select_devices(&all, &[], &[]).len(), 3);
    }

    #[test]
    fn test_includes_are_conjunctive() {
        let all = devices();
        let role = IncludeDeviceByRole::new(["primary"]);
        let group = IncludeDeviceByGroup::new(["rack-1"]);

        let selected = select_devices(&all, &[&role, &group], &[]);
        assert_eq!(names(&selected), vec!["node-a"]);
    }

    #[test]
    fn test_excludes_win() {
        let all = devices();
        let dtype = IncludeDeviceByDeviceType::new(["ssh"]);
        let not_b = ExcludeDeviceByName::new(["node-b"]);
        let not_rack2 = ExcludeDeviceByGroup::new(["rack-2"]);

        let selected = select_devices(&all, &[&dtype], &[&not_b, &not_rack2]);
        assert_eq!(names(&selected), vec!["node-a"]);
    }

    #[test]
    fn test_type_and_role() {
        let all = devices();
        let filter = IncludeDeviceByDeviceTypeAndRole::new("ssh", "secondary");
        let by_name = IncludeDeviceByName::new(["node-b", "node-c"]);

        assert_eq!(names(&select_devices(&all, &[&filter], &[])), vec!["node-b"]);
        assert_eq!(
            names(&select_devices(&all, &[&by_name], &[])),
            vec!["node-b", "node-c"]
        );
    }

    #[test]
    fn test_config_filter() {
        let entries: Vec<Map<String, Value>> = [
            json!({"deviceType": "ssh", "identifier": "a"}),
            json!({"deviceType": "unknown-proto", "identifier": "b"}),
            json!({"identifier": "c"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let filter = IncludeDeviceConfigByDeviceType::new(["ssh"]);
        let selected = select_device_configs(&entries, &[&filter]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["identifier"], "a");
    }
}
