use crate::types::{Leg, MotorRegistry};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RegistryFile {
    legs: Vec<Leg>,
}

impl MotorRegistry {
    /// Parse a `legs:` table (four entries of `hip_id`, `knee_id`, `wheel_id`).
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let file: RegistryFile = serde_yaml::from_str(raw).context("parsing motor table yaml")?;
        let registry = MotorRegistry::from_leg_list(&file.legs)?;
        Ok(registry)
    }
}

pub fn load_registry_file(path: impl AsRef<Path>) -> anyhow::Result<MotorRegistry> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading motor table: {}", path.display()))?;
    let registry = MotorRegistry::from_yaml_str(&raw)
        .with_context(|| format!("decoding motor table: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "motor table loaded");
    Ok(registry)
}
