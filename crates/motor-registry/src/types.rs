use crate::RegistryError;
use dxl_protocol::{ProtocolVersion, BROADCAST_ID, MAX_DEVICE_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const LEG_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointRole {
    Hip,
    Knee,
    Wheel,
}

impl JointRole {
    /// Protocol spoken by the actuator in this role.
    pub fn protocol(self) -> ProtocolVersion {
        match self {
            JointRole::Hip | JointRole::Knee => ProtocolVersion::V2,
            JointRole::Wheel => ProtocolVersion::V1,
        }
    }
}

/// Leg slots in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegPosition {
    FrontRight,
    FrontLeft,
    RearRight,
    RearLeft,
}

impl LegPosition {
    pub const ALL: [LegPosition; LEG_COUNT] = [
        LegPosition::FrontRight,
        LegPosition::FrontLeft,
        LegPosition::RearRight,
        LegPosition::RearLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub hip_id: u8,
    pub knee_id: u8,
    pub wheel_id: u8,
}

impl Leg {
    pub const fn new(hip_id: u8, knee_id: u8, wheel_id: u8) -> Self {
        Self {
            hip_id,
            knee_id,
            wheel_id,
        }
    }

    pub fn id(&self, role: JointRole) -> u8 {
        match role {
            JointRole::Hip => self.hip_id,
            JointRole::Knee => self.knee_id,
            JointRole::Wheel => self.wheel_id,
        }
    }
}

/// Read-only table of the four legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotorRegistry {
    legs: [Leg; LEG_COUNT],
}

impl Default for MotorRegistry {
    fn default() -> Self {
        Self {
            legs: [
                Leg::new(1, 2, 3),
                Leg::new(11, 12, 13),
                Leg::new(21, 22, 23),
                Leg::new(31, 32, 33),
            ],
        }
    }
}

impl MotorRegistry {
    /// Build a table, rejecting duplicated or reserved IDs.
    pub fn from_legs(legs: [Leg; LEG_COUNT]) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for leg in &legs {
            for id in [leg.hip_id, leg.knee_id, leg.wheel_id] {
                if id == BROADCAST_ID || id > MAX_DEVICE_ID {
                    return Err(RegistryError::ReservedId(id));
                }
                if !seen.insert(id) {
                    return Err(RegistryError::DuplicateId(id));
                }
            }
        }
        Ok(Self { legs })
    }

    pub fn from_leg_list(legs: &[Leg]) -> Result<Self, RegistryError> {
        let table: [Leg; LEG_COUNT] = legs
            .try_into()
            .map_err(|_| RegistryError::LegCount(legs.len()))?;
        Self::from_legs(table)
    }

    pub fn legs(&self) -> &[Leg; LEG_COUNT] {
        &self.legs
    }

    pub fn leg(&self, position: LegPosition) -> Leg {
        self.legs[position.index()]
    }

    /// Bus ID of `role` on leg `index` (0 = front right).
    pub fn id(&self, index: usize, role: JointRole) -> Option<u8> {
        self.legs.get(index).map(|leg| leg.id(role))
    }

    /// Protocol 2.0 joints: hip then knee of each leg, in leg order.
    pub fn joints(&self) -> impl Iterator<Item = (LegPosition, JointRole, u8)> + '_ {
        LegPosition::ALL.into_iter().flat_map(move |pos| {
            let leg = self.leg(pos);
            [
                (pos, JointRole::Hip, leg.hip_id),
                (pos, JointRole::Knee, leg.knee_id),
            ]
        })
    }

    /// Protocol 1.0 wheels, in leg order.
    pub fn wheels(&self) -> impl Iterator<Item = (LegPosition, u8)> + '_ {
        LegPosition::ALL
            .into_iter()
            .map(move |pos| (pos, self.leg(pos).wheel_id))
    }
}
