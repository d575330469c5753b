// Timeouts, addresses and axis limits for the OE10 pan-tilt unit
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ptu::packet::CONTROLLER;

// Read and write timeouts applied to the transport when a driver is created
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

// Serial line settings used when the device URI does not give a baud rate
pub const DEFAULT_BAUDRATE: u32 = 9600;

// Speed used by the CLI pan/tilt commands when none is given (fraction of max)
pub const DEFAULT_MOVE_SPEED: f32 = 0.1;

// Largest settable angle on an axis, in degrees
pub const FULL_TURN_DEG: u16 = 360;
// Some units only accept tilt targets up to this bound
pub const RESTRICTED_TILT_DEG: u16 = 270;

/// Upper bound, in degrees, of the angles accepted by the position commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub pan_max_deg: u16,
    pub tilt_max_deg: u16,
}

impl AxisLimits {
    /// Both axes accept the full [0, 360] range
    pub const fn full_turn() -> Self {
        Self {
            pan_max_deg: FULL_TURN_DEG,
            tilt_max_deg: FULL_TURN_DEG,
        }
    }

    /// Pan accepts [0, 360], tilt is restricted to [0, 270]
    pub const fn restricted_tilt() -> Self {
        Self {
            pan_max_deg: FULL_TURN_DEG,
            tilt_max_deg: RESTRICTED_TILT_DEG,
        }
    }
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self::full_turn()
    }
}

/// Settings a [`Driver`](crate::ptu::Driver) is built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Source address written in every outgoing packet
    pub controller_id: u8,
    pub limits: AxisLimits,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            controller_id: CONTROLLER,
            limits: AxisLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.controller_id, 0x01);
        assert_eq!(config.limits, AxisLimits::full_turn());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "read_timeout": { "secs": 1, "nanos": 0 },
            "write_timeout": { "secs": 3, "nanos": 0 },
            "controller_id": 2,
            "limits": { "pan_max_deg": 360, "tilt_max_deg": 270 }
        }"#;
        let config: DriverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.write_timeout, Duration::from_secs(3));
        assert_eq!(config.controller_id, 2);
        assert_eq!(config.limits, AxisLimits::restricted_tilt());
    }
}
