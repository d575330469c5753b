// OE10 command set
//
// Each command is a two letter mnemonic with an optional payload. Replies
// echo the mnemonic, which the transaction layer strips, followed by a
// fixed number of command specific bytes.

use std::time::SystemTime;
use tracing::debug;

use super::angle::{ANGLE_SIZE, encode_angle, parse_angle};
use super::error::{InputError, ProtocolError, Result};
use super::protocol::Driver;
use crate::messages::{CameraCapabilities, PanTiltStatus, PtuCapabilities, Status};

/// Command mnemonics
pub mod mnemonic {
    pub const STATUS: &[u8; 2] = b"ST";
    pub const PAN_TILT_STATUS: &[u8; 2] = b"AS";
    pub const PAN_POSITION: &[u8; 2] = b"PP";
    pub const TILT_POSITION: &[u8; 2] = b"TP";
    // Pan and tilt speed use unrelated mnemonics
    pub const PAN_SPEED: &[u8; 2] = b"DS";
    pub const TILT_SPEED: &[u8; 2] = b"TA";
    pub const TILT_UP: &[u8; 2] = b"TU";
    pub const TILT_DOWN: &[u8; 2] = b"TD";
    pub const TILT_STOP: &[u8; 2] = b"TS";
    pub const USE_END_STOPS: &[u8; 2] = b"ES";
    pub const PAN_POSITIVE_END_STOP: &[u8; 2] = b"CW";
    pub const PAN_NEGATIVE_END_STOP: &[u8; 2] = b"AW";
    pub const TILT_POSITIVE_END_STOP: &[u8; 2] = b"UT";
    pub const TILT_NEGATIVE_END_STOP: &[u8; 2] = b"DT";
}

/// Reply sizes, echo excluded
pub const STATUS_SIZE: usize = 9;
pub const PAN_TILT_STATUS_SIZE: usize = 10;

const FLAG_ON: u8 = b'1';
const FLAG_OFF: u8 = b'0';

/// Pan or tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pan,
    Tilt,
}

impl Axis {
    fn position_command(self) -> &'static [u8; 2] {
        match self {
            Axis::Pan => mnemonic::PAN_POSITION,
            Axis::Tilt => mnemonic::TILT_POSITION,
        }
    }

    fn speed_command(self) -> &'static [u8; 2] {
        match self {
            Axis::Pan => mnemonic::PAN_SPEED,
            Axis::Tilt => mnemonic::TILT_SPEED,
        }
    }
}

/// Convert a speed fraction to the 0-100 percentage sent on the wire
pub fn encode_speed(speed: f32) -> std::result::Result<u8, InputError> {
    if !(0.0..=1.0).contains(&speed) {
        return Err(InputError::SpeedOutOfRange(speed));
    }
    Ok((speed * 100.0).round() as u8)
}

/// Decode the 9 byte ST reply
pub fn decode_status(data: &[u8], time: SystemTime) -> std::result::Result<Status, ProtocolError> {
    if data.len() != STATUS_SIZE {
        return Err(ProtocolError::UnexpectedDataSize {
            command: "ST".to_string(),
            expected: STATUS_SIZE,
            actual: data.len(),
        });
    }
    let (b0, b1, b2) = (data[0], data[1], data[2]);

    let camera = CameraCapabilities {
        enabled: b0 & 0x01 != 0,
        focus: b0 & 0x02 != 0,
        zoom: b0 & 0x04 != 0,
        auto_focus: b0 & 0x20 != 0,
        manual_exposure: b0 & 0x40 != 0,
        stills: b0 & 0x80 != 0,
        wipers: b1 & 0x01 != 0,
        washer: b1 & 0x02 != 0,
        lamp_control: b1 & 0x04 != 0,
        flash: b1 & 0x08 != 0,
        flash_charged: b1 & 0x10 != 0,
    };
    let ptu = PtuCapabilities {
        pan: b0 & 0x08 != 0,
        tilt: b0 & 0x10 != 0,
    };

    // Low nibble: temperature in 5 degree steps from -5 C
    // High nibble: humidity in sixteenths
    let temperature = f32::from(b2 & 0x0F) * 5.0 - 5.0;
    let humidity = f32::from(u16::from(b2 >> 4) * 100 / 16);

    Ok(Status {
        camera,
        ptu,
        time,
        temperature,
        humidity,
        pan: parse_angle(&data[3..3 + ANGLE_SIZE])?,
        tilt: parse_angle(&data[6..6 + ANGLE_SIZE])?,
    })
}

/// Decode the 10 byte AS reply
pub fn decode_pan_tilt_status(
    data: &[u8],
    time: SystemTime,
) -> std::result::Result<PanTiltStatus, ProtocolError> {
    if data.len() != PAN_TILT_STATUS_SIZE {
        return Err(ProtocolError::UnexpectedDataSize {
            command: "AS".to_string(),
            expected: PAN_TILT_STATUS_SIZE,
            actual: data.len(),
        });
    }

    Ok(PanTiltStatus {
        time,
        pan_speed: f32::from(data[0]) / 100.0,
        tilt_speed: f32::from(data[1]) / 100.0,
        pan: parse_angle(&data[2..2 + ANGLE_SIZE])?,
        tilt: parse_angle(&data[5..5 + ANGLE_SIZE])?,
        uses_pan_stop: data[8] == FLAG_ON,
        uses_tilt_stop: data[9] == FLAG_ON,
    })
}

impl Driver {
    /// Query capabilities, environment and positions of a unit
    pub fn get_status(&mut self, device_id: u8) -> Result<Status> {
        let packet = self.command_packet(device_id, mnemonic::STATUS)?;
        let response = self.send_and_receive(&packet, STATUS_SIZE)?;
        Ok(decode_status(response.data(), SystemTime::now())?)
    }

    /// Send a pan/tilt status request without waiting for the reply
    ///
    /// Collect the reply with [`read_pan_tilt_status`](Self::read_pan_tilt_status)
    /// before issuing any other command.
    pub fn request_pan_tilt_status(&mut self, device_id: u8) -> Result<()> {
        let packet = self.command_packet(device_id, mnemonic::PAN_TILT_STATUS)?;
        self.write_packet(&packet)
    }

    /// Read the reply to an earlier [`request_pan_tilt_status`](Self::request_pan_tilt_status)
    pub fn read_pan_tilt_status(&mut self, device_id: u8) -> Result<PanTiltStatus> {
        let packet = self.command_packet(device_id, mnemonic::PAN_TILT_STATUS)?;
        let response = self.read_response(&packet, PAN_TILT_STATUS_SIZE)?;
        Ok(decode_pan_tilt_status(response.data(), SystemTime::now())?)
    }

    /// Query positions, speeds and end stop usage of a unit
    pub fn get_pan_tilt_status(&mut self, device_id: u8) -> Result<PanTiltStatus> {
        self.request_pan_tilt_status(device_id)?;
        self.read_pan_tilt_status(device_id)
    }

    /// Move the pan axis to `pan` radians
    pub fn set_pan_position(&mut self, device_id: u8, pan: f64) -> Result<()> {
        self.set_position(device_id, Axis::Pan, pan)
    }

    /// Move the tilt axis to `tilt` radians
    pub fn set_tilt_position(&mut self, device_id: u8, tilt: f64) -> Result<()> {
        self.set_position(device_id, Axis::Tilt, tilt)
    }

    pub fn set_position(&mut self, device_id: u8, axis: Axis, angle: f64) -> Result<()> {
        let limits = self.config().limits;
        let max_deg = match axis {
            Axis::Pan => limits.pan_max_deg,
            Axis::Tilt => limits.tilt_max_deg,
        };
        let encoded = encode_angle(angle, max_deg)?;

        let mut packet = self.command_packet(device_id, axis.position_command())?;
        packet.set_data(&encoded)?;
        debug!(
            "Moving {:?} of device {} to {:?}",
            axis,
            device_id,
            angle.to_degrees()
        );
        self.send_and_receive(&packet, ANGLE_SIZE)?;
        Ok(())
    }

    /// Set the pan speed as a fraction of the maximum, in [0, 1]
    pub fn set_pan_speed(&mut self, device_id: u8, speed: f32) -> Result<()> {
        self.set_speed(device_id, Axis::Pan, speed)
    }

    /// Set the tilt speed as a fraction of the maximum, in [0, 1]
    pub fn set_tilt_speed(&mut self, device_id: u8, speed: f32) -> Result<()> {
        self.set_speed(device_id, Axis::Tilt, speed)
    }

    pub fn set_speed(&mut self, device_id: u8, axis: Axis, speed: f32) -> Result<()> {
        let percent = encode_speed(speed)?;
        let mut packet = self.command_packet(device_id, axis.speed_command())?;
        packet.set_data(&[percent])?;
        self.send_and_receive(&packet, 0)?;
        Ok(())
    }

    /// Start tilting up; returns the tilt angle reported by the unit
    pub fn tilt_up(&mut self, device_id: u8) -> Result<f64> {
        self.simple_movement(device_id, mnemonic::TILT_UP)
    }

    /// Start tilting down; returns the tilt angle reported by the unit
    pub fn tilt_down(&mut self, device_id: u8) -> Result<f64> {
        self.simple_movement(device_id, mnemonic::TILT_DOWN)
    }

    /// Stop the tilt axis; returns the tilt angle it stopped at
    pub fn tilt_stop(&mut self, device_id: u8) -> Result<f64> {
        self.simple_movement(device_id, mnemonic::TILT_STOP)
    }

    fn simple_movement(&mut self, device_id: u8, command: &[u8]) -> Result<f64> {
        let packet = self.command_packet(device_id, command)?;
        let response = self.send_and_receive(&packet, ANGLE_SIZE)?;
        Ok(parse_angle(response.data())?)
    }

    /// Enable or disable the configured end stops
    pub fn use_end_stops(&mut self, device_id: u8, enable: bool) -> Result<()> {
        let flag = if enable { FLAG_ON } else { FLAG_OFF };
        let mut packet = self.command_packet(device_id, mnemonic::USE_END_STOPS)?;
        packet.set_data(&[flag])?;
        let response = self.send_and_receive(&packet, 1)?;

        let received = response.data()[0];
        if received != flag {
            return Err(ProtocolError::EndStopFlagMismatch {
                sent: enable,
                received,
            }
            .into());
        }
        Ok(())
    }

    /// Store the current pan position as the clockwise end stop
    pub fn set_pan_positive_end_stop(&mut self, device_id: u8) -> Result<()> {
        self.set_end_stop(device_id, mnemonic::PAN_POSITIVE_END_STOP)
    }

    /// Store the current pan position as the anticlockwise end stop
    pub fn set_pan_negative_end_stop(&mut self, device_id: u8) -> Result<()> {
        self.set_end_stop(device_id, mnemonic::PAN_NEGATIVE_END_STOP)
    }

    /// Store the current tilt position as the upper end stop
    pub fn set_tilt_positive_end_stop(&mut self, device_id: u8) -> Result<()> {
        self.set_end_stop(device_id, mnemonic::TILT_POSITIVE_END_STOP)
    }

    /// Store the current tilt position as the lower end stop
    pub fn set_tilt_negative_end_stop(&mut self, device_id: u8) -> Result<()> {
        self.set_end_stop(device_id, mnemonic::TILT_NEGATIVE_END_STOP)
    }

    fn set_end_stop(&mut self, device_id: u8, command: &[u8]) -> Result<()> {
        let packet = self.command_packet(device_id, command)?;
        self.send_and_receive(&packet, 0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_encode_speed() {
        assert_eq!(encode_speed(0.0), Ok(0));
        assert_eq!(encode_speed(0.1), Ok(10));
        assert_eq!(encode_speed(0.25), Ok(25));
        assert_eq!(encode_speed(1.0), Ok(100));
        assert_eq!(encode_speed(-0.01), Err(InputError::SpeedOutOfRange(-0.01)));
        assert_eq!(encode_speed(1.01), Err(InputError::SpeedOutOfRange(1.01)));
        assert!(encode_speed(f32::NAN).is_err());
    }

    #[test]
    fn test_decode_status() {
        // camera enabled + zoom + pan + tilt, wipers + flash charged
        // temperature nibble 5 -> 20 C, humidity nibble 8 -> 50 %
        let data = [0x1D, 0x11, 0x85, b'1', b'8', b'0', b'0', b'9', b'0'];
        let time = SystemTime::UNIX_EPOCH;
        let status = decode_status(&data, time).unwrap();

        assert!(status.camera.enabled);
        assert!(!status.camera.focus);
        assert!(status.camera.zoom);
        assert!(!status.camera.auto_focus);
        assert!(status.camera.wipers);
        assert!(!status.camera.washer);
        assert!(status.camera.flash_charged);
        assert!(!status.camera.flash);
        assert!(status.ptu.pan && status.ptu.tilt);
        assert_eq!(status.temperature, 20.0);
        assert_eq!(status.humidity, 50.0);
        assert!((status.pan - PI).abs() < 1e-12);
        assert!((status.tilt - PI / 2.0).abs() < 1e-12);
        assert_eq!(status.time, time);
    }

    #[test]
    fn test_decode_status_all_flags() {
        let data = [0xFF, 0x1F, 0x00, b'0', b'0', b'0', b'9', b'9', b'9'];
        let status = decode_status(&data, SystemTime::UNIX_EPOCH).unwrap();
        assert_eq!(
            status.camera,
            CameraCapabilities {
                enabled: true,
                focus: true,
                zoom: true,
                auto_focus: true,
                manual_exposure: true,
                stills: true,
                wipers: true,
                washer: true,
                lamp_control: true,
                flash: true,
                flash_charged: true,
            }
        );
        assert_eq!(status.temperature, -5.0);
        assert_eq!(status.humidity, 0.0);
        assert_eq!(status.tilt, 0.0);
    }

    #[test]
    fn test_decode_status_bad_angle() {
        let data = [0, 0, 0, b'1', b'?', b'0', b'0', b'0', b'0'];
        assert_eq!(
            decode_status(&data, SystemTime::UNIX_EPOCH),
            Err(ProtocolError::InvalidAngle {
                byte: b'?',
                position: 1,
            })
        );
    }

    #[test]
    fn test_decode_pan_tilt_status() {
        let data = [50, 100, b'0', b'4', b'5', 0, 0, 0, b'1', b'0'];
        let time = SystemTime::UNIX_EPOCH;
        let status = decode_pan_tilt_status(&data, time).unwrap();
        assert_eq!(status.pan_speed, 0.5);
        assert_eq!(status.tilt_speed, 1.0);
        assert!((status.pan - PI / 4.0).abs() < 1e-12);
        assert_eq!(status.tilt, 0.0);
        assert!(status.uses_pan_stop);
        assert!(!status.uses_tilt_stop);
    }

    #[test]
    fn test_decode_wrong_sizes() {
        assert!(matches!(
            decode_status(&[0; 8], SystemTime::UNIX_EPOCH),
            Err(ProtocolError::UnexpectedDataSize {
                expected: 9,
                actual: 8,
                ..
            })
        ));
        assert!(matches!(
            decode_pan_tilt_status(&[0; 11], SystemTime::UNIX_EPOCH),
            Err(ProtocolError::UnexpectedDataSize {
                expected: 10,
                actual: 11,
                ..
            })
        ));
    }

    #[test]
    fn test_axis_mnemonics() {
        assert_eq!(Axis::Pan.position_command(), b"PP");
        assert_eq!(Axis::Tilt.position_command(), b"TP");
        assert_eq!(Axis::Pan.speed_command(), b"DS");
        assert_eq!(Axis::Tilt.speed_command(), b"TA");
    }
}
