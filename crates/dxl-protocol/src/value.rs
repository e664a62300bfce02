//! Conversions from command units to control-table values.
//!
//! Out-of-range inputs are clamped to the nearest representable value, never
//! zeroed: a saturated command still moves the actuator in the requested
//! direction.

use crate::control_table::{ax, mx};

/// AX-12 wheel-mode speed word for a signed speed in `-1023..=1023`.
///
/// Positive speeds turn counter-clockwise and pass through unchanged; negative
/// speeds set the clockwise bit over their magnitude.
pub fn wheel_speed(speed: i16) -> u16 {
    let s = speed.clamp(-ax::SPEED_MAX, ax::SPEED_MAX);
    if s < 0 {
        s.unsigned_abs() + ax::SPEED_CW_BIT
    } else {
        s as u16
    }
}

/// MX joint-mode goal position, clamped to `0..=4095`.
pub fn joint_position(ticks: u32) -> u32 {
    ticks.min(mx::POSITION_MAX)
}

pub fn torque_flag(on: bool) -> u32 {
    u32::from(on)
}
