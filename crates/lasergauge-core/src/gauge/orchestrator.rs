//! Measurement orchestration
//!
//! Drives the read cycle across the 8 measurement points and both sensors,
//! routes decoded responses into point state, and publishes updates for the
//! UI layer to consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::protocol::{
    build_read_request, decode_response, ChannelError, CommandChannel, FrameError,
    DEFAULT_TIMEOUT_MS,
};

use super::MeasurementPoint;

/// Number of measurement points per session
pub const POINT_COUNT: u8 = 8;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Which of the two lasers a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sensor {
    /// Sensor above the material
    A,
    /// Sensor below the material
    B,
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensor::A => write!(f, "A"),
            Sensor::B => write!(f, "B"),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeConfig {
    /// Bus device id of sensor A
    pub sensor_a_id: u8,
    /// Bus device id of sensor B
    pub sensor_b_id: u8,
    /// Calibration offset subtracted from sensor A readings
    pub offset_a: f32,
    /// Calibration offset subtracted from sensor B readings
    pub offset_b: f32,
    /// Fixed A-B sensor separation for the session
    pub ab_distance: f32,
    /// Per-read response timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            sensor_a_id: 1,
            sensor_b_id: 2,
            offset_a: 0.0,
            offset_b: 0.0,
            ab_distance: 0.0,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Errors from a single point read, with point/sensor context attached
#[derive(Error, Debug)]
pub enum GaugeError {
    /// The command channel failed (timeout, cancellation or I/O)
    #[error("point {point} sensor {sensor}: {source}")]
    Channel {
        /// Point index being read
        point: u8,
        /// Sensor being read
        sensor: Sensor,
        /// Underlying channel failure
        #[source]
        source: ChannelError,
    },

    /// The response frame failed to decode
    #[error("point {point} sensor {sensor}: {source}")]
    Frame {
        /// Point index being read
        point: u8,
        /// Sensor being read
        sensor: Sensor,
        /// Underlying decode failure
        #[source]
        source: FrameError,
    },

    /// A well-formed response arrived from an unexpected device id
    #[error("point {point} sensor {sensor}: response from device {got}, expected {want}")]
    DeviceMismatch {
        /// Point index being read
        point: u8,
        /// Sensor being read
        sensor: Sensor,
        /// Device id the request targeted
        want: u8,
        /// Device id found in the response
        got: u8,
    },

    /// Point index outside the configured range
    #[error("point index {0} outside 1-{max}", max = POINT_COUNT)]
    InvalidPoint(u8),
}

/// A decoded, calibrated reading published to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct PointUpdate {
    /// Point index (1-8)
    pub point: u8,
    /// Originating sensor
    pub sensor: Sensor,
    /// Calibrated distance value
    pub value: f32,
    /// Thickness derived by this reading, when it completed a fresh pair
    pub thickness: Option<f32>,
    /// Reception timestamp
    pub at: DateTime<Utc>,
}

/// Advance a rotating point counter: 1..8 then back to 1
pub fn cycle_index(current: u8) -> u8 {
    if current < POINT_COUNT {
        current + 1
    } else {
        1
    }
}

/// Sequences sensor reads and owns the measurement point state
///
/// Single writer: points are mutated only here, on receipt of a decoded
/// response. Consumers observe results through [`subscribe`](Self::subscribe)
/// or the point accessors.
pub struct Orchestrator {
    channel: Arc<CommandChannel>,
    config: GaugeConfig,
    points: Vec<MeasurementPoint>,
    next_a: u8,
    next_b: u8,
    updates: broadcast::Sender<PointUpdate>,
}

impl Orchestrator {
    /// Create an orchestrator over an open channel
    pub fn new(channel: Arc<CommandChannel>, config: GaugeConfig) -> Self {
        let points = (1..=POINT_COUNT)
            .map(|i| MeasurementPoint::new(format!("P{i}"), config.ab_distance))
            .collect();
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            channel,
            config,
            points,
            next_a: 1,
            next_b: 1,
            updates,
        }
    }

    /// Subscribe to calibrated point updates
    pub fn subscribe(&self) -> broadcast::Receiver<PointUpdate> {
        self.updates.subscribe()
    }

    /// Borrow a point's state (1-based index)
    pub fn point(&self, index: u8) -> Option<&MeasurementPoint> {
        if (1..=POINT_COUNT).contains(&index) {
            self.points.get(index as usize - 1)
        } else {
            None
        }
    }

    /// Derive the thickness for a point, consuming its freshness flags
    ///
    /// Returns `None` until both sensor sides have been refreshed since the
    /// last derivation.
    pub fn thickness(&mut self, index: u8) -> Option<f32> {
        if !(1..=POINT_COUNT).contains(&index) {
            return None;
        }
        self.points[index as usize - 1].thickness()
    }

    /// The point index the next auto-advancing read of `sensor` will target
    pub fn next_point(&self, sensor: Sensor) -> u8 {
        match sensor {
            Sensor::A => self.next_a,
            Sensor::B => self.next_b,
        }
    }

    fn device_id(&self, sensor: Sensor) -> u8 {
        match sensor {
            Sensor::A => self.config.sensor_a_id,
            Sensor::B => self.config.sensor_b_id,
        }
    }

    fn offset(&self, sensor: Sensor) -> f32 {
        match sensor {
            Sensor::A => self.config.offset_a,
            Sensor::B => self.config.offset_b,
        }
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.config.read_timeout_ms)
    }

    /// Read one sensor for one point and store the calibrated value
    ///
    /// On any failure the point's state is left untouched, preserving the
    /// last good reading and its freshness.
    pub async fn read_point(&mut self, point: u8, sensor: Sensor) -> Result<f32, GaugeError> {
        if !(1..=POINT_COUNT).contains(&point) {
            return Err(GaugeError::InvalidPoint(point));
        }

        let device = self.device_id(sensor);
        let request = build_read_request(device).map_err(|source| GaugeError::Frame {
            point,
            sensor,
            source,
        })?;

        let response = self
            .channel
            .send_and_receive(&request, self.read_timeout())
            .await
            .map_err(|source| GaugeError::Channel {
                point,
                sensor,
                source,
            })?;

        let decoded = decode_response(&response).map_err(|source| GaugeError::Frame {
            point,
            sensor,
            source,
        })?;
        if decoded.device_id != device {
            return Err(GaugeError::DeviceMismatch {
                point,
                sensor,
                want: device,
                got: decoded.device_id,
            });
        }

        // Apply the per-sensor calibration offset, keeping 2 decimals
        let value = decoded.value - self.offset(sensor);
        let value = ((value as f64 * 100.0).round() / 100.0) as f32;

        let slot = &mut self.points[point as usize - 1];
        match sensor {
            Sensor::A => slot.record_a(value),
            Sensor::B => slot.record_b(value),
        }
        let thickness = slot.thickness();
        debug!(point, %sensor, value, ?thickness, "reading stored");

        let _ = self.updates.send(PointUpdate {
            point,
            sensor,
            value,
            thickness,
            at: Utc::now(),
        });

        Ok(value)
    }

    /// Read both sensors for one point
    ///
    /// The reads are issued sequentially: the bus is physically half-duplex
    /// and the channel gate would serialize concurrent submissions anyway.
    pub async fn read_point_both(&mut self, point: u8) -> Result<(f32, f32), GaugeError> {
        let a = self.read_point(point, Sensor::A).await?;
        let b = self.read_point(point, Sensor::B).await?;
        Ok((a, b))
    }

    /// Read the next point in `sensor`'s rotation, advancing it on success
    pub async fn read_next(&mut self, sensor: Sensor) -> Result<(u8, f32), GaugeError> {
        let point = self.next_point(sensor);
        let value = self.read_point(point, sensor).await?;
        match sensor {
            Sensor::A => self.next_a = cycle_index(self.next_a),
            Sensor::B => self.next_b = cycle_index(self.next_b),
        }
        Ok((point, value))
    }

    /// Sweep every point for both sensors, skipping failed reads
    ///
    /// Returns the number of successful reads. Individual failures are
    /// reported and leave the affected point unchanged.
    pub async fn run_cycle(&mut self) -> usize {
        let mut ok = 0;
        for point in 1..=POINT_COUNT {
            for sensor in [Sensor::A, Sensor::B] {
                match self.read_point(point, sensor).await {
                    Ok(_) => ok += 1,
                    Err(e) => warn!(point, %sensor, "read failed: {e}"),
                }
            }
        }
        ok
    }

    /// Clear one sensor's values across all points and rewind its rotation
    pub fn clear_sensor(&mut self, sensor: Sensor) {
        for point in &mut self.points {
            match sensor {
                Sensor::A => point.clear_a(),
                Sensor::B => point.clear_b(),
            }
        }
        match sensor {
            Sensor::A => self.next_a = 1,
            Sensor::B => self.next_b = 1,
        }
    }

    /// Close the underlying channel, unblocking any pending read
    pub fn close(&self) {
        self.channel.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_index_rotation() {
        let mut current = 1;
        let mut seen = Vec::new();
        for _ in 0..8 {
            current = cycle_index(current);
            seen.push(current);
        }
        assert_eq!(seen, vec![2, 3, 4, 5, 6, 7, 8, 1]);
    }

    #[test]
    fn test_gauge_config_default() {
        let config = GaugeConfig::default();
        assert_eq!(config.sensor_a_id, 1);
        assert_eq!(config.sensor_b_id, 2);
        assert_eq!(config.read_timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
