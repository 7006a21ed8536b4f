#![allow(dead_code)]

use std::fs;
use std::path::Path;

use atf_config::{ConfigFile, VarsMap, read_config};

pub const HEADER: &str = "Content-Type: application/X-atf-config; version=\"1\"\n\n";

/// Prefix `body` with a valid header block.
pub fn with_header(body: &str) -> String {
    format!("{HEADER}{body}")
}

/// Read `body` behind a valid header block.
pub fn read_body(body: &str) -> ConfigFile {
    read_config(with_header(body).as_bytes()).unwrap_or_else(|e| {
        panic!("read failed: {e}\n--- body ---\n{body}")
    })
}

/// Write a config file with a valid header, creating parent directories.
pub fn write_config(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dir");
    }
    fs::write(path, with_header(body)).expect("write config");
}

pub fn vars(pairs: &[(&str, &str)]) -> VarsMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
