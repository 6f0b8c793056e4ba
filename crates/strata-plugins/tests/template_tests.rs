//! Descriptor-driven template plugins

mod common;

use common::PluginTree;
use strata_core::{ConfigStore, Value};
use strata_plugins::PluginError;

#[test]
fn test_template_plugin_renders_files() {
    let tree = PluginTree::new();
    tree.plugin(
        "ntp",
        "[plugin]\nversion = 4.2\nfiles = ntp.conf\nbackup = ntp.conf\n\
         restart = ntp\ntypes = servers:list\n",
    )
    .template("ntp.tpl", "# %(comment)s\nserver %(servers)s iburst\ndrift 100%%\n");

    let effective = ConfigStore::parse(
        "[ntp]\ntemplate_ntp = ntp.tpl\ncomment = managed\nservers = 0.pool, 1.pool\n",
    )
    .unwrap();
    let ntp = tree.registry().instantiate("ntp", &effective).unwrap();

    assert_eq!(ntp.services_to_restart(), vec!["ntp"]);
    assert_eq!(
        ntp.conf().get("ntp", "servers_list").unwrap(),
        Value::List(vec!["0.pool".to_string(), "1.pool".to_string()])
    );

    let files = ntp.conf_files().unwrap();
    assert_eq!(files[0].path, tree.etc().join("ntp.conf"));
    assert_eq!(
        files[0].content.as_deref(),
        Some("# managed\nserver 0.pool, 1.pool iburst\ndrift 100%\n")
    );
    assert_eq!(ntp.files_to_backup()[0].path, tree.etc().join("ntp.conf"));
}

#[test]
fn test_template_missing_key() {
    let tree = PluginTree::new();
    tree.plugin("motd", "[plugin]\nversion = 1\nfiles = motd\n")
        .template("motd.tpl", "%(banner)s\n");

    let effective = ConfigStore::parse("[motd]\ntemplate = motd.tpl\n").unwrap();
    let motd = tree.registry().instantiate("motd", &effective).unwrap();
    assert!(matches!(
        motd.conf_files(),
        Err(PluginError::Template { ref message, .. }) if message.contains("banner")
    ));
}

#[test]
fn test_template_file_missing() {
    let tree = PluginTree::new();
    tree.plugin("motd", "[plugin]\nversion = 1\nfiles = motd\n");

    let effective = ConfigStore::parse("[motd]\ntemplate = absent.tpl\n").unwrap();
    let motd = tree.registry().instantiate("motd", &effective).unwrap();
    assert!(matches!(motd.conf_files(), Err(PluginError::Core(_))));
}
