//! Thickness measurement
//!
//! Measurement point state, threshold judgement and the orchestrator that
//! drives the read cycle over the sensor bus.

mod limits;
mod orchestrator;
mod point;

pub use limits::{LimitCheck, Limits};
pub use orchestrator::{
    cycle_index, GaugeConfig, GaugeError, Orchestrator, PointUpdate, Sensor, POINT_COUNT,
};
pub use point::MeasurementPoint;
