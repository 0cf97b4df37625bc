//! Group/subgroup classification of devices for display.
//!
//! A device's grouping comes from its explicit `group_name`/`subgroup_name`
//! columns when those are filled in, and otherwise from its free-text notes,
//! which by convention read `"group | subgroup | anything else"`.
//!
//! The result is rebuilt from scratch on every call. Groups and subgroups
//! appear in the order they are first seen, and devices keep their relative
//! input order inside a bucket.

use crate::device::Device;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Bucket for devices that carry no usable grouping hint.
pub const DEFAULT_GROUP: &str = "Dispositivos por Adotar";

/// Resolved `(group, subgroup)` pair. `group` is never empty; an empty
/// `subgroup` means "no subgroup".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupingKey {
    pub group: String,
    pub subgroup: String,
}

impl GroupingKey {
    pub fn new(group: impl Into<String>, subgroup: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            subgroup: subgroup.into(),
        }
    }

    /// The default bucket with no subgroup
    pub fn unassigned() -> Self {
        Self::new(DEFAULT_GROUP, "")
    }
}

/// Derive a grouping from notes alone.
pub fn parse_notes(notes: Option<&str>) -> GroupingKey {
    let trimmed = notes.unwrap_or("").trim();
    if trimmed.is_empty() {
        return GroupingKey::unassigned();
    }

    let mut parts = trimmed.split('|').map(str::trim).filter(|p| !p.is_empty());
    let group = parts.next().unwrap_or(DEFAULT_GROUP);
    let subgroup = parts.next().unwrap_or("");

    GroupingKey::new(group, subgroup)
}

/// Resolve a device's grouping. Explicit columns win field by field over
/// the note-derived pair.
pub fn resolve_grouping(device: &Device) -> GroupingKey {
    let mut key = parse_notes(device.notes.as_deref());

    if let Some(group) = non_blank(device.group_name.as_deref()) {
        key.group = group.to_string();
    }
    if let Some(subgroup) = non_blank(device.subgroup_name.as_deref()) {
        key.subgroup = subgroup.to_string();
    }

    key
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Partition devices into groups and subgroups in a single pass.
pub fn group_devices<'a, I>(devices: I) -> GroupedDevices
where
    I: IntoIterator<Item = &'a Device>,
{
    let mut grouped = GroupedDevices::default();
    for device in devices {
        let key = resolve_grouping(device);
        grouped.push(key, device.clone());
    }
    grouped
}

// ============================================================================
// Grouped result
// ============================================================================

/// Devices sharing one `(group, subgroup)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    pub name: String,
    pub devices: Vec<Device>,
}

/// One top-level group and its subgroups in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub name: String,
    subgroups: Vec<Subgroup>,
    index: HashMap<String, usize>,
}

impl DeviceGroup {
    fn new(name: String) -> Self {
        Self {
            name,
            subgroups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Devices of a subgroup, if the subgroup exists
    pub fn get(&self, subgroup: &str) -> Option<&[Device]> {
        self.index
            .get(subgroup)
            .map(|&i| self.subgroups[i].devices.as_slice())
    }

    pub fn subgroups(&self) -> &[Subgroup] {
        &self.subgroups
    }

    pub fn device_count(&self) -> usize {
        self.subgroups.iter().map(|s| s.devices.len()).sum()
    }

    fn push(&mut self, subgroup: String, device: Device) {
        let slot = match self.index.get(&subgroup) {
            Some(&i) => i,
            None => {
                self.index.insert(subgroup.clone(), self.subgroups.len());
                self.subgroups.push(Subgroup {
                    name: subgroup,
                    devices: Vec::new(),
                });
                self.subgroups.len() - 1
            }
        };
        self.subgroups[slot].devices.push(device);
    }
}

/// Two-level ordered mapping: group -> subgroup -> devices.
///
/// Serializes as a nested JSON object whose keys keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedDevices {
    groups: Vec<DeviceGroup>,
    index: HashMap<String, usize>,
}

impl GroupedDevices {
    /// Append a device to its bucket, creating group and subgroup as needed
    pub fn push(&mut self, key: GroupingKey, device: Device) {
        let slot = match self.index.get(&key.group) {
            Some(&i) => i,
            None => {
                self.index.insert(key.group.clone(), self.groups.len());
                self.groups.push(DeviceGroup::new(key.group));
                self.groups.len() - 1
            }
        };
        self.groups[slot].push(key.subgroup, device);
    }

    pub fn get(&self, group: &str) -> Option<&DeviceGroup> {
        self.index.get(group).map(|&i| &self.groups[i])
    }

    /// Groups in first-seen order
    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of devices across every bucket
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(DeviceGroup::device_count).sum()
    }
}

impl Serialize for Subgroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.devices.serialize(serializer)
    }
}

impl Serialize for DeviceGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.subgroups.len()))?;
        for sub in &self.subgroups {
            map.serialize_entry(&sub.name, sub)?;
        }
        map.end()
    }
}

impl Serialize for GroupedDevices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.name, group)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notes_empty_and_null() {
        assert_eq!(parse_notes(None), GroupingKey::unassigned());
        assert_eq!(parse_notes(Some("")), GroupingKey::unassigned());
        assert_eq!(parse_notes(Some("   \t ")), GroupingKey::unassigned());
    }

    #[test]
    fn test_parse_notes_only_pipes() {
        // Non-empty text but every segment blank
        assert_eq!(parse_notes(Some(" | | ")), GroupingKey::unassigned());
    }

    #[test]
    fn test_parse_notes_group_only() {
        assert_eq!(parse_notes(Some("  Loja Norte ")), GroupingKey::new("Loja Norte", ""));
    }

    #[test]
    fn test_parse_notes_skips_blank_segments() {
        assert_eq!(
            parse_notes(Some("| Armazém || Cais 2 |")),
            GroupingKey::new("Armazém", "Cais 2")
        );
    }

    #[test]
    fn test_resolve_blank_override_falls_back_to_notes() {
        let device = Device::new("1", "dev-1", "u1")
            .with_notes("X | Y")
            .with_group("   ")
            .with_subgroup("");
        assert_eq!(resolve_grouping(&device), GroupingKey::new("X", "Y"));
    }

    #[test]
    fn test_resolve_override_is_trimmed() {
        let device = Device::new("1", "dev-1", "u1").with_group("  Loja  ");
        assert_eq!(resolve_grouping(&device), GroupingKey::new("Loja", ""));
    }

    #[test]
    fn test_subgroup_override_without_group() {
        let device = Device::new("1", "dev-1", "u1").with_subgroup("Balcão");
        assert_eq!(resolve_grouping(&device), GroupingKey::new(DEFAULT_GROUP, "Balcão"));
    }

    #[test]
    fn test_serialize_keeps_first_seen_order() {
        let devices = vec![
            Device::new("1", "a", "u").with_notes("Zeta | 2"),
            Device::new("2", "b", "u").with_notes("Alpha"),
            Device::new("3", "c", "u").with_notes("Zeta | 1"),
        ];
        let json = serde_json::to_string(&group_devices(&devices)).unwrap();
        let zeta = json.find("\"Zeta\"").unwrap();
        let alpha = json.find("\"Alpha\"").unwrap();
        let two = json.find("\"2\"").unwrap();
        let one = json.find("\"1\":[").unwrap();
        assert!(zeta < alpha);
        assert!(two < one);
    }

    #[test]
    fn test_empty_input() {
        let grouped = group_devices(&[]);
        assert!(grouped.is_empty());
        assert_eq!(serde_json::to_string(&grouped).unwrap(), "{}");
    }
}
