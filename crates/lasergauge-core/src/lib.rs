//! # LaserGauge Core Library
//!
//! Core functionality for the LaserGauge thickness measurement software.
//!
//! This library provides:
//! - The Modbus-like frame codec the laser distance sensors speak
//! - A serialized async command channel over the shared half-duplex bus
//! - Measurement point state with freshness-guarded thickness derivation
//! - An orchestrator sequencing reads over 8 points and 2 sensors
//! - A demo mode simulating the sensor bus for UI work without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use lasergauge_core::gauge::{GaugeConfig, Orchestrator, Sensor};
//! use lasergauge_core::protocol::{ChannelConfig, CommandChannel};
//! use std::sync::Arc;
//!
//! let config = ChannelConfig {
//!     port_name: "/dev/ttyUSB0".into(),
//!     ..Default::default()
//! };
//! let channel = Arc::new(CommandChannel::open(&config)?);
//! let mut gauge = Orchestrator::new(channel, GaugeConfig::default());
//!
//! let (a, b) = gauge.read_point_both(1).await?;
//! println!("P1: A={a} B={b} thickness={:?}", gauge.thickness(1));
//! ```

#![warn(missing_docs)]

pub mod demo;
pub mod gauge;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::gauge::{
        GaugeConfig, GaugeError, LimitCheck, Limits, MeasurementPoint, Orchestrator, PointUpdate,
        Sensor,
    };
    pub use crate::protocol::{ChannelConfig, ChannelError, CommandChannel, FrameError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
