//! Tests for device grouping and note parsing.

use mesh_shared::grouping::*;
use mesh_shared::Device;

fn ids(devices: &[Device]) -> Vec<&str> {
    devices.iter().map(|d| d.device_id.as_str()).collect()
}

#[test]
fn test_empty_and_null_notes_go_to_default_group() {
    let empty = parse_notes(Some(""));
    let null = parse_notes(None);
    assert_eq!(empty.group, "Dispositivos por Adotar");
    assert_eq!(null.group, "Dispositivos por Adotar");
    assert_eq!(empty.subgroup, "");
    assert_eq!(null.subgroup, "");
}

#[test]
fn test_extracts_group_and_subgroup_ignoring_extra_segments() {
    let parsed = parse_notes(Some("Grupo A | Sub A | comentário extra"));
    assert_eq!(parsed.group, "Grupo A");
    assert_eq!(parsed.subgroup, "Sub A");
}

#[test]
fn test_missing_notes_keep_input_order_in_default_bucket() {
    let grouped = group_devices(&[
        Device::new("1", "dev-1", "u1"),
        Device::new("2", "dev-2", "u1").with_notes(""),
    ]);

    let bucket = grouped
        .get(DEFAULT_GROUP)
        .and_then(|g| g.get(""))
        .expect("default bucket");
    assert_eq!(ids(bucket), vec!["dev-1", "dev-2"]);
}

#[test]
fn test_backend_grouping_wins_over_notes() {
    let grouped = group_devices(&[Device::new("1", "dev-1", "u1")
        .with_notes("Outro | Sítio")
        .with_group("Backend Group")
        .with_subgroup("Backend Sub")]);

    let group = grouped.get("Backend Group").expect("backend group");
    assert!(group.get("Backend Sub").is_some());
    assert!(grouped.get("Outro").is_none());
}

#[test]
fn test_partial_override_mixes_sources() {
    let device = Device::new("1", "dev-1", "u1").with_group("G").with_notes("X | Y");
    assert_eq!(resolve_grouping(&device), GroupingKey::new("G", "Y"));

    let grouped = group_devices(std::slice::from_ref(&device));
    assert_eq!(ids(grouped.get("G").unwrap().get("Y").unwrap()), vec!["dev-1"]);
}

#[test]
fn test_every_device_lands_in_exactly_one_bucket() {
    let devices = vec![
        Device::new("1", "a", "u").with_notes("Loja | Caixa"),
        Device::new("2", "b", "u"),
        Device::new("3", "c", "u").with_notes("Loja"),
        Device::new("4", "d", "u").with_notes("Loja | Caixa | 2º andar"),
        Device::new("5", "e", "u").with_group("Armazém"),
        Device::new("6", "f", "u").with_notes(" | "),
    ];
    let grouped = group_devices(&devices);

    assert_eq!(grouped.device_count(), devices.len());

    let mut seen: Vec<&str> = grouped
        .groups()
        .iter()
        .flat_map(|g| g.subgroups())
        .flat_map(|s| s.devices.iter())
        .map(|d| d.id.as_str())
        .collect();
    seen.sort();
    assert_eq!(seen, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_groups_and_subgroups_follow_first_encounter() {
    let devices = vec![
        Device::new("1", "a", "u").with_notes("Loja | Caixa"),
        Device::new("2", "b", "u"),
        Device::new("3", "c", "u").with_notes("Loja"),
        Device::new("4", "d", "u").with_notes("Loja | Caixa"),
    ];
    let grouped = group_devices(&devices);

    let names: Vec<&str> = grouped.groups().iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Loja", DEFAULT_GROUP]);

    let loja = grouped.get("Loja").unwrap();
    let subs: Vec<&str> = loja.subgroups().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(subs, vec!["Caixa", ""]);
    assert_eq!(ids(loja.get("Caixa").unwrap()), vec!["a", "d"]);
}

#[test]
fn test_grouped_json_shape() {
    let grouped = group_devices(&[Device::new("1", "dev-1", "u1").with_notes("Loja | Caixa")]);
    let value = serde_json::to_value(&grouped).unwrap();
    assert_eq!(value["Loja"]["Caixa"][0]["device_id"], "dev-1");
}
