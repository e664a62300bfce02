//! Sync-write entry tables for the fixed leg groups.
//!
//! Entries come out in registry order (joints: hip, knee per leg; wheels: one
//! per leg) as fixed arrays, so a control loop can build them without touching
//! the heap.

use crate::{MotorRegistry, LEG_COUNT};
use dxl_protocol::value::{joint_position, torque_flag, wheel_speed};
use dxl_protocol::SyncEntry;

pub const JOINT_COUNT: usize = LEG_COUNT * 2;

impl MotorRegistry {
    /// Torque flags for hips and knees; each joint gets the flag for its own role.
    pub fn joint_torque_entries(&self, hip_on: bool, knee_on: bool) -> [SyncEntry; JOINT_COUNT] {
        let mut out = [SyncEntry::new(0, 0); JOINT_COUNT];
        for (slot, leg) in out.chunks_exact_mut(2).zip(self.legs()) {
            slot[0] = SyncEntry::new(leg.hip_id, torque_flag(hip_on));
            slot[1] = SyncEntry::new(leg.knee_id, torque_flag(knee_on));
        }
        out
    }

    pub fn wheel_torque_entries(&self, on: bool) -> [SyncEntry; LEG_COUNT] {
        let legs = self.legs();
        core::array::from_fn(|i| SyncEntry::new(legs[i].wheel_id, torque_flag(on)))
    }

    /// Goal positions per leg, clamped to the joint range.
    pub fn joint_position_entries(
        &self,
        hips: [u32; LEG_COUNT],
        knees: [u32; LEG_COUNT],
    ) -> [SyncEntry; JOINT_COUNT] {
        let mut out = [SyncEntry::new(0, 0); JOINT_COUNT];
        for (i, (slot, leg)) in out.chunks_exact_mut(2).zip(self.legs()).enumerate() {
            slot[0] = SyncEntry::new(leg.hip_id, joint_position(hips[i]));
            slot[1] = SyncEntry::new(leg.knee_id, joint_position(knees[i]));
        }
        out
    }

    /// Signed wheel speeds per leg as AX wheel-mode words.
    pub fn wheel_speed_entries(&self, speeds: [i16; LEG_COUNT]) -> [SyncEntry; LEG_COUNT] {
        let legs = self.legs();
        core::array::from_fn(|i| {
            SyncEntry::new(legs[i].wheel_id, u32::from(wheel_speed(speeds[i])))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[SyncEntry]) -> Vec<(u8, u32)> {
        entries.iter().map(|e| (e.id, e.value)).collect()
    }

    #[test]
    fn test_joint_torque_uses_per_role_flag() {
        let reg = MotorRegistry::default();
        let entries = reg.joint_torque_entries(true, false);
        assert_eq!(
            pairs(&entries),
            vec![(1, 1), (2, 0), (11, 1), (12, 0), (21, 1), (22, 0), (31, 1), (32, 0)]
        );
    }

    #[test]
    fn test_wheel_torque_entries() {
        let reg = MotorRegistry::default();
        assert_eq!(
            pairs(&reg.wheel_torque_entries(true)),
            vec![(3, 1), (13, 1), (23, 1), (33, 1)]
        );
    }

    #[test]
    fn test_joint_positions_clamped() {
        let reg = MotorRegistry::default();
        let entries = reg.joint_position_entries([0, 2048, 4095, 9000], [1, 2, 3, u32::MAX]);
        assert_eq!(
            pairs(&entries),
            vec![
                (1, 0),
                (2, 1),
                (11, 2048),
                (12, 2),
                (21, 4095),
                (22, 3),
                (31, 4095),
                (32, 4095)
            ]
        );
    }

    #[test]
    fn test_wheel_speeds_encode_direction() {
        let reg = MotorRegistry::default();
        let entries = reg.wheel_speed_entries([100, -100, 2000, -2000]);
        assert_eq!(
            pairs(&entries),
            vec![(3, 100), (13, 1124), (23, 1023), (33, 2047)]
        );
    }
}
