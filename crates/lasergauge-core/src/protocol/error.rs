//! Protocol errors

use thiserror::Error;

/// Errors from encoding or decoding a sensor frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Device id outside the addressable bus range
    #[error("Device id {0} outside valid range 1-247")]
    InvalidDeviceId(u8),

    /// Fewer bytes than the frame layout requires
    #[error("Response truncated: need {needed} bytes, got {got}")]
    Truncated {
        /// Bytes the layout requires
        needed: usize,
        /// Bytes actually present
        got: usize,
    },

    /// Function code other than the read-distance reply
    #[error("Unexpected function code {0:#04x}")]
    UnexpectedFunction(u8),

    /// Trailing checksum does not match the frame body
    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch {
        /// Checksum computed over the body
        expected: u16,
        /// Checksum carried by the frame
        actual: u16,
    },
}

/// Errors from the serialized command channel
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No response captured within the caller's deadline
    #[error("No response within the deadline")]
    Timeout,

    /// The channel was closed while the call was pending
    #[error("Channel closed while the call was pending")]
    Canceled,

    /// The serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Transport-level read or write failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChannelError {
    /// Timeouts are steady-state events the caller may retry; cancellation
    /// and transport faults are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Timeout)
    }
}
