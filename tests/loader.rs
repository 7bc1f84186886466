//! File loading through [`Core::from_files`], format sniffed by
//! extension.

use std::fs;
use std::path::PathBuf;

use schemagate::{Core, CoreError};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn yaml_data_against_yaml_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write(
        &dir,
        "schema.yaml",
        "type: map\nmapping:\n  name:\n    type: str\n    required: true\n",
    );
    let data = write(&dir, "data.yaml", "name: kaka\n");

    let mut core = Core::from_files(&data, &[schema]).expect("both files load");
    assert!(core.validate().is_ok());
}

#[test]
fn json_data_against_yaml_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write(
        &dir,
        "schema.yml",
        "type: seq\nsequence:\n  - type: int\n",
    );
    let data = write(&dir, "data.json", "[1, 2, \"three\"]");

    let mut core = Core::from_files(&data, &[schema]).expect("both files load");
    let errors = core.validate_all().expect("no fatal error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path(), "/2");
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let schema = write(&dir, "schema.yaml", "type: str\n");
    let data = write(&dir, "data.toml", "name = \"kaka\"\n");

    let err = Core::from_files(&data, &[schema]).expect_err("format is unsniffable");
    assert!(matches!(err, CoreError::UnknownFileFormat { .. }));
}

#[test]
fn malformed_yaml_propagates_as_parse_error() {
    let dir = TempDir::new().unwrap();
    let schema = write(&dir, "schema.yaml", "type: [unclosed\n");
    let data = write(&dir, "data.yaml", "name: kaka\n");

    let err = Core::from_files(&data, &[schema]).expect_err("schema file is broken");
    assert!(matches!(err, CoreError::Yaml(_)));
}
