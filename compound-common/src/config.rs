//! Config layer shared by every binary in the workspace: flags, a merged
//! YAML file, and environment overrides for every flag (spec §6).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Loads a YAML document from `path` (if given) and deserializes it as `T`.
/// Missing file is not an error — callers fall back to flag/env defaults.
pub fn load_yaml_file<T>(path: Option<&Path>) -> anyhow::Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(path) = path else { return Ok(None) };
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_yaml::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolves the config file path from an explicit flag, falling back to
/// the `COMPOUND_CONFIG` environment variable.
pub fn config_path(flag: Option<&str>) -> Option<PathBuf> {
    flag.map(PathBuf::from)
        .or_else(|| std::env::var_os("COMPOUND_CONFIG").map(PathBuf::from))
}
