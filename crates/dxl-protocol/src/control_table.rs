//! Control-table items used by this robot.
//!
//! `mx` covers the Protocol 2.0 joints (MX-106 hips, MX-64 knees), `ax` the
//! Protocol 1.0 AX-12 wheels.

pub mod mx {
    use crate::{ControlAddress, DataWidth, ProtocolVersion};

    const fn item(address: u16, width: DataWidth) -> ControlAddress {
        ControlAddress::new(ProtocolVersion::V2, address, width)
    }

    pub const TORQUE_ENABLE: ControlAddress = item(64, DataWidth::Byte);
    pub const LED: ControlAddress = item(65, DataWidth::Byte);
    pub const GOAL_PWM: ControlAddress = item(100, DataWidth::Word);
    pub const GOAL_VELOCITY: ControlAddress = item(112, DataWidth::DWord);
    pub const GOAL_POSITION: ControlAddress = item(116, DataWidth::DWord);
    pub const PRESENT_CURRENT: ControlAddress = item(126, DataWidth::Word);
    pub const PRESENT_POSITION: ControlAddress = item(132, DataWidth::DWord);
    pub const PRESENT_TEMPERATURE: ControlAddress = item(146, DataWidth::Byte);

    /// Joint-mode position range in encoder ticks.
    pub const POSITION_MAX: u32 = 4095;
    /// Tick value of the mechanical centre.
    pub const POSITION_CENTER: u32 = 2048;
}

pub mod ax {
    use crate::{ControlAddress, DataWidth, ProtocolVersion};

    const fn item(address: u16, width: DataWidth) -> ControlAddress {
        ControlAddress::new(ProtocolVersion::V1, address, width)
    }

    pub const TORQUE_ENABLE: ControlAddress = item(24, DataWidth::Byte);
    pub const LED: ControlAddress = item(25, DataWidth::Byte);
    pub const GOAL_POSITION: ControlAddress = item(30, DataWidth::Word);
    pub const MOVING_SPEED: ControlAddress = item(32, DataWidth::Word);
    pub const TORQUE_LIMIT: ControlAddress = item(34, DataWidth::Word);
    pub const PRESENT_POSITION: ControlAddress = item(36, DataWidth::Word);
    pub const PRESENT_LOAD: ControlAddress = item(40, DataWidth::Word);
    pub const PRESENT_TEMPERATURE: ControlAddress = item(43, DataWidth::Byte);

    /// Wheel-mode speed magnitude limit.
    pub const SPEED_MAX: i16 = 1023;
    /// Direction bit of a wheel-mode speed word (set = clockwise).
    pub const SPEED_CW_BIT: u16 = 1024;
}
