//! Sensor bus communication
//!
//! Implements the Modbus-like request/response exchange the laser distance
//! sensors speak, and the serialized async channel that carries it over a
//! shared half-duplex serial line.

mod channel;
mod error;
pub mod frame;
pub mod serial;

pub use channel::{ChannelConfig, CommandChannel, DynTransport, Transport};
pub use error::{ChannelError, FrameError};
pub use frame::{build_read_request, crc16, decode_response, DecodedFrame};
pub use serial::{list_ports, open_port, PortInfo};

use std::time::Duration;

/// Default baud rate for the sensor bus
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Interval at which a pending call polls for a captured response
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
