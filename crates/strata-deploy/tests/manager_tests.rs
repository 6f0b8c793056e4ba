//! Plugin and profile management through the manager

mod common;

use common::{DeployTree, RecordingServices};
use strata_core::{Error, Settings, Value};
use strata_deploy::DeployError;
use strata_plugins::PluginError;

#[test]
fn test_plugin_enable_and_disable() {
    let tree = DeployTree::new();
    tree.base("").plugin("hosts", "[plugin]\nversion = 1\n");
    let services = RecordingServices::new();
    let mut manager = tree.manager(&[], &services);

    manager.plugin_enable("hosts").unwrap();
    let saved = Settings::load(tree.path().join("strata.conf")).unwrap();
    assert_eq!(saved.plugins(), ["hosts".to_string()]);

    assert!(matches!(
        manager.plugin_enable("hosts"),
        Err(DeployError::Plugin(PluginError::AlreadyEnabled { .. }))
    ));
    assert!(matches!(
        manager.plugin_enable("vpn"),
        Err(DeployError::Plugin(PluginError::NotInstalled { .. }))
    ));

    manager.plugin_disable("hosts").unwrap();
    assert!(matches!(
        manager.plugin_disable("hosts"),
        Err(DeployError::Plugin(PluginError::NotEnabled { .. }))
    ));
    let saved = Settings::load(tree.path().join("strata.conf")).unwrap();
    assert!(saved.plugins().is_empty());
}

#[test]
fn test_plugins_infos() {
    let tree = DeployTree::new();
    tree.base("")
        .plugin("environment", "[plugin]\nversion = 1.0\n")
        .plugin("hosts", "[plugin]\nversion = 1.0\n[dependency:environment]\nge = 1\n");
    let services = RecordingServices::new();
    let manager = tree.manager(&["hosts"], &services);

    let infos = manager.plugins_infos(None).unwrap();
    assert_eq!(infos.len(), 2);
    assert!(!infos[0].enabled);
    assert!(infos[1].enabled);

    let only = manager
        .plugins_infos(Some(&["environment".to_string()]))
        .unwrap();
    assert_eq!(only.len(), 1);
}

#[test]
fn test_profiles() {
    let tree = DeployTree::new();
    tree.base("[net]\nmtu = 1500\n")
        .write("conf/profiles/jumbo.conf", "[net]\nmtu = 9000\n");
    let services = RecordingServices::new();
    let mut manager = tree.manager(&[], &services);

    manager.profile_enable("jumbo", 1).unwrap();
    assert_eq!(
        manager.config().effective().get("net", "mtu").unwrap(),
        Value::from("9000")
    );
    let infos = manager.profiles_infos().unwrap();
    assert_eq!(infos[0].name, "jumbo");
    assert_eq!(infos[0].level, Some(1));

    assert!(matches!(
        manager.profile_enable("jumbo", 2),
        Err(DeployError::Core(Error::ProfileAlreadyEnabled { level: 1, .. }))
    ));
    manager.profile_disable("jumbo").unwrap();
    assert_eq!(
        manager.config().effective().get("net", "mtu").unwrap(),
        Value::from("1500")
    );
    assert!(matches!(
        manager.profile_disable("jumbo"),
        Err(DeployError::Core(Error::ProfileNotEnabled { .. }))
    ));
}

#[test]
fn test_with_plugin_types() {
    let tree = DeployTree::new();
    tree.base("[environment]\npaths = /bin, /sbin\n[other]\npaths = a, b\n")
        .plugin("environment", "[plugin]\nversion = 1.0\n");
    let services = RecordingServices::new();
    let manager = tree.manager(&["environment"], &services);

    let typed = manager
        .with_plugin_types(manager.config().effective())
        .unwrap()
        .typed_view()
        .unwrap();

    assert_eq!(
        typed["environment"]["paths"],
        Value::List(vec!["/bin".to_string(), "/sbin".to_string()])
    );
    assert_eq!(typed["other"]["paths"], Value::from("a, b"));
}
