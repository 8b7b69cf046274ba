//! Frame encoding/decoding
//!
//! Implements the fixed Modbus-like frame shape the laser sensors speak.
//!
//! Request format (9 bytes):
//! - 1 byte: device id
//! - 1 byte: function code (always 0x04, read input registers)
//! - 2 bytes: start address (always 0x0000)
//! - 2 bytes: register count (always 0x0002)
//! - 1 byte: vendor tail (0x71, required by the sensor firmware)
//! - 2 bytes: CRC16, low byte first
//!
//! Response format (9 bytes nominal):
//! - 1 byte: device id
//! - 1 byte: function code
//! - 1 byte: payload byte count
//! - 4 bytes: register value (big-endian, distance x 100)
//! - 2 bytes: CRC16, low byte first

use byteorder::{BigEndian, ByteOrder};

use super::FrameError;

/// Function code for the read-distance request
pub const FUNCTION_READ_DISTANCE: u8 = 0x04;

/// Vendor-specific trailing byte the sensors require before the CRC
pub const VENDOR_TAIL: u8 = 0x71;

/// Smallest device id addressable on the bus
pub const DEVICE_ID_MIN: u8 = 1;

/// Largest device id addressable on the bus
pub const DEVICE_ID_MAX: u8 = 247;

/// Minimum response length carrying a decodable register value
pub const MIN_RESPONSE_LEN: usize = 7;

/// Encoded request length including CRC
pub const REQUEST_LEN: usize = 9;

const START_ADDRESS: u16 = 0x0000;
const REGISTER_COUNT: u16 = 0x0002;

/// A decoded sensor response
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Responding device id
    pub device_id: u8,
    /// Echoed function code
    pub function: u8,
    /// Raw register value (distance x 100)
    pub raw: u32,
    /// Distance value, raw / 100 rounded to 2 decimals
    pub value: f32,
}

/// Calculate the Modbus CRC16 (poly 0xA001, init 0xFFFF) of `data`
///
/// The remote device validates this checksum, so it must be bit-exact.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Build a read-distance request for `device_id`, CRC appended low byte first
pub fn build_read_request(device_id: u8) -> Result<Vec<u8>, FrameError> {
    if !(DEVICE_ID_MIN..=DEVICE_ID_MAX).contains(&device_id) {
        return Err(FrameError::InvalidDeviceId(device_id));
    }

    let mut frame = Vec::with_capacity(REQUEST_LEN);
    frame.push(device_id);
    frame.push(FUNCTION_READ_DISTANCE);

    let mut addr = [0u8; 2];
    BigEndian::write_u16(&mut addr, START_ADDRESS);
    frame.extend_from_slice(&addr);

    let mut count = [0u8; 2];
    BigEndian::write_u16(&mut count, REGISTER_COUNT);
    frame.extend_from_slice(&count);

    frame.push(VENDOR_TAIL);

    let crc = crc16(&frame);
    frame.push((crc & 0xFF) as u8);
    frame.push((crc >> 8) as u8);

    Ok(frame)
}

/// Total response length implied by the byte-count field
///
/// header (id + function + count) + payload + trailing CRC. The protocol has
/// no other delimiter, so the reception side cuts frames at this boundary.
pub fn response_len(byte_count: u8) -> usize {
    3 + byte_count as usize + 2
}

/// Decode a raw response buffer into a structured frame
///
/// Requires at least [`MIN_RESPONSE_LEN`] bytes. Frames long enough to carry
/// a trailing CRC must pass verification.
pub fn decode_response(buf: &[u8]) -> Result<DecodedFrame, FrameError> {
    if buf.len() < MIN_RESPONSE_LEN {
        return Err(FrameError::Truncated {
            needed: MIN_RESPONSE_LEN,
            got: buf.len(),
        });
    }

    let device_id = buf[0];
    let function = buf[1];
    if function != FUNCTION_READ_DISTANCE {
        return Err(FrameError::UnexpectedFunction(function));
    }

    // Trailing CRC covers everything before the final two bytes
    if buf.len() > MIN_RESPONSE_LEN + 1 {
        let (body, tail) = buf.split_at(buf.len() - 2);
        let expected = crc16(body);
        let actual = u16::from(tail[0]) | (u16::from(tail[1]) << 8);
        if expected != actual {
            return Err(FrameError::CrcMismatch { expected, actual });
        }
    }

    let raw = BigEndian::read_u32(&buf[3..7]);
    let value = ((raw as f64 / 100.0 * 100.0).round() / 100.0) as f32;

    Ok(DecodedFrame {
        device_id,
        function,
        raw,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_crc16_golden_value() {
        // Pinned reference value for the sensor A request body
        let body = [0x01, 0x04, 0x00, 0x00, 0x00, 0x02, 0x71];
        assert_eq!(crc16(&body), 0x00CB);
    }

    #[test]
    fn test_crc16_empty_is_init() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_build_read_request() {
        let frame = build_read_request(1).expect("valid id");
        assert_eq!(
            frame,
            vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x02, 0x71, 0xCB, 0x00]
        );
    }

    #[test]
    fn test_build_read_request_deterministic() {
        let a = build_read_request(2).unwrap();
        let b = build_read_request(2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], 0x02);
        assert_eq!(a.len(), REQUEST_LEN);
    }

    #[test]
    fn test_build_read_request_rejects_bad_ids() {
        assert_eq!(
            build_read_request(0),
            Err(FrameError::InvalidDeviceId(0))
        );
        assert_eq!(
            build_read_request(248),
            Err(FrameError::InvalidDeviceId(248))
        );
        assert!(build_read_request(247).is_ok());
    }

    #[test]
    fn test_decode_response() {
        // Register value 0x0000012C = 300 -> 3.00
        let buf = [0x01, 0x04, 0x04, 0x00, 0x00, 0x01, 0x2C, 0xFB, 0xC9];
        let frame = decode_response(&buf).expect("valid response");
        assert_eq!(frame.device_id, 1);
        assert_eq!(frame.function, 0x04);
        assert_eq!(frame.raw, 300);
        assert_eq!(frame.value, 3.00);
    }

    #[test]
    fn test_decode_response_rounding() {
        // 12345 -> 123.45
        let buf = [0x02, 0x04, 0x04, 0x00, 0x00, 0x30, 0x39, 0x1C, 0x96];
        let frame = decode_response(&buf).expect("valid response");
        assert_eq!(frame.device_id, 2);
        assert_eq!(frame.value, 123.45);
    }

    #[test]
    fn test_decode_response_without_crc_tail() {
        // 7-byte frame has no CRC to verify but still carries the value
        let buf = [0x01, 0x04, 0x04, 0x00, 0x00, 0x01, 0x2C];
        let frame = decode_response(&buf).expect("short but decodable");
        assert_eq!(frame.value, 3.00);
    }

    #[test]
    fn test_decode_response_truncated() {
        let buf = [0x01, 0x04, 0x04, 0x00];
        assert_eq!(
            decode_response(&buf),
            Err(FrameError::Truncated { needed: 7, got: 4 })
        );
    }

    #[test]
    fn test_decode_response_unexpected_function() {
        let buf = [0x01, 0x10, 0x04, 0x00, 0x00, 0x01, 0x2C, 0xF8, 0xDD];
        assert_eq!(
            decode_response(&buf),
            Err(FrameError::UnexpectedFunction(0x10))
        );
    }

    #[test]
    fn test_decode_response_crc_mismatch() {
        let mut buf = [0x01, 0x04, 0x04, 0x00, 0x00, 0x01, 0x2C, 0xFB, 0xC9];
        buf[4] ^= 0xFF;
        assert!(matches!(
            decode_response(&buf),
            Err(FrameError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_response_len() {
        assert_eq!(response_len(0x04), 9);
        assert_eq!(response_len(0x02), 7);
    }
}
