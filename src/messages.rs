// Status reports returned by the OE10 command layer

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Features of the camera mounted on the unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    pub enabled: bool,
    pub focus: bool,
    pub zoom: bool,
    pub auto_focus: bool,
    pub manual_exposure: bool,
    pub stills: bool,
    pub wipers: bool,
    pub washer: bool,
    pub lamp_control: bool,
    pub flash: bool,
    pub flash_charged: bool,
}

/// Axes the unit can move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtuCapabilities {
    pub pan: bool,
    pub tilt: bool,
}

/// Reply to the ST (status) command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub camera: CameraCapabilities,
    pub ptu: PtuCapabilities,
    /// When the reply was received
    pub time: SystemTime,
    /// Internal temperature, degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
    /// Pan position, radians
    pub pan: f64,
    /// Tilt position, radians
    pub tilt: f64,
}

/// Reply to the AS (pan/tilt status) command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanTiltStatus {
    /// When the reply was received
    pub time: SystemTime,
    /// Pan position, radians
    pub pan: f64,
    /// Tilt position, radians
    pub tilt: f64,
    /// Pan speed as a fraction of the maximum (0.0 stopped, 1.0 full speed)
    pub pan_speed: f32,
    /// Tilt speed as a fraction of the maximum
    pub tilt_speed: f32,
    pub uses_pan_stop: bool,
    pub uses_tilt_stop: bool,
}
