use anyhow::Context;
use dxl_protocol::ProtocolVersion;
use motor_registry::{Leg, MotorRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorBusConfig {
    pub port: String,
    pub baud_rate: u32,
    pub tx_timeout_ms: u64,
}

impl Default for MotorBusConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 1_000_000,
            tx_timeout_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Quiet time on the line that counts as end of a reading.
    pub idle_ms: u64,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB1".to_string(),
            baud_rate: 115_200,
            idle_ms: 2,
        }
    }
}

/// Parameter-byte ceilings per protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLimits {
    pub v1_params: usize,
    pub v2_params: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            v1_params: ProtocolVersion::V1.default_param_capacity(),
            v2_params: ProtocolVersion::V2.default_param_capacity(),
        }
    }
}

impl FrameLimits {
    pub fn capacity(&self, version: ProtocolVersion) -> usize {
        match version {
            ProtocolVersion::V1 => self.v1_params,
            ProtocolVersion::V2 => self.v2_params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub motor_bus: MotorBusConfig,
    pub imu: ImuConfig,
    pub inter_frame_gap_ms: u64,
    pub frame_limits: FrameLimits,
    /// Replaces the built-in motor table when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legs: Option<Vec<Leg>>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            motor_bus: MotorBusConfig::default(),
            imu: ImuConfig::default(),
            inter_frame_gap_ms: 5,
            frame_limits: FrameLimits::default(),
            legs: None,
        }
    }
}

impl ControlConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parsing config: {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: ControlConfig = serde_yaml::from_str(raw)?;
        // Validate the table now rather than at first use.
        cfg.registry()?;
        Ok(cfg)
    }

    pub fn registry(&self) -> Result<MotorRegistry, RegistryError> {
        match &self.legs {
            Some(legs) => MotorRegistry::from_leg_list(legs),
            None => Ok(MotorRegistry::default()),
        }
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.motor_bus.tx_timeout_ms)
    }

    pub fn inter_frame_gap(&self) -> Duration {
        Duration::from_millis(self.inter_frame_gap_ms)
    }

    pub fn imu_idle(&self) -> Duration {
        Duration::from_millis(self.imu.idle_ms)
    }
}
