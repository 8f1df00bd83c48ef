use objplane_plugin_sdk::SdkConfig;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn load_from_reads_every_section() {
    let file = write_config(
        r#"
        [audit]
        enabled = false

        [operations]
        hard_delete = true

        [composite]
        strict_related_keys = true
        link_related = false

        [hooks]
        fire_after_commit = false
        "#,
    );

    let config = SdkConfig::load_from(file.path());

    assert!(!config.audit.enabled);
    assert!(config.operations.hard_delete);
    assert!(config.composite.strict_related_keys);
    assert!(!config.composite.link_related);
    assert!(!config.hooks.fire_after_commit);
}

#[test]
fn unparsable_file_falls_back_to_defaults() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let file = write_config("[operations\nhard_delete = yes");

    assert_eq!(SdkConfig::load_from(file.path()), SdkConfig::default());
}

#[test]
fn empty_file_is_all_defaults() {
    let file = write_config("");
    assert_eq!(SdkConfig::load_from(file.path()), SdkConfig::default());
}
