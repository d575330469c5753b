// ASCII angle fields
//
// Angles travel as three ASCII digits giving whole degrees, e.g. "045".
// Some firmware revisions report "999" or three NUL bytes where they mean
// zero.

use super::error::{InputError, ProtocolError};

/// Size of an encoded angle
pub const ANGLE_SIZE: usize = 3;

const ZERO_SENTINELS: [[u8; ANGLE_SIZE]; 2] = [[0, 0, 0], *b"999"];

// Slack for radian -> degree conversion noise at the range bounds
const DEGREE_TOLERANCE: f64 = 1e-6;

/// Encode an angle in radians as three ASCII digits, rejecting anything
/// outside [0, max_deg]
pub fn encode_angle(radians: f64, max_deg: u16) -> Result<[u8; ANGLE_SIZE], InputError> {
    let degrees = radians.to_degrees();
    let max = f64::from(max_deg.min(999));
    if !degrees.is_finite() || degrees < -DEGREE_TOLERANCE || degrees > max + DEGREE_TOLERANCE {
        return Err(InputError::AngleOutOfRange { degrees, max_deg });
    }

    let whole = degrees.round().clamp(0.0, max) as u16;
    Ok([
        b'0' + (whole / 100) as u8,
        b'0' + (whole / 10 % 10) as u8,
        b'0' + (whole % 10) as u8,
    ])
}

/// Decode a three digit ASCII angle into radians
pub fn parse_angle(field: &[u8]) -> Result<f64, ProtocolError> {
    let digits: [u8; ANGLE_SIZE] = field
        .try_into()
        .map_err(|_| ProtocolError::AngleFieldSize(field.len()))?;
    if ZERO_SENTINELS.contains(&digits) {
        return Ok(0.0);
    }

    let mut degrees: u16 = 0;
    for (position, &byte) in digits.iter().enumerate() {
        if !byte.is_ascii_digit() {
            return Err(ProtocolError::InvalidAngle { byte, position });
        }
        degrees = degrees * 10 + u16::from(byte - b'0');
    }
    Ok(f64::from(degrees).to_radians())
}
