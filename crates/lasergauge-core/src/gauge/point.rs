//! Measurement point state
//!
//! One point on the measured material, seen by both sensors. Thickness is
//! derived from the pair of distance readings and the fixed sensor
//! separation: `thickness = ab_distance - a - b`.

/// Paired A/B readings for one physical measurement location
///
/// Each side carries a freshness flag set when a reading arrives and
/// consumed when a thickness is derived. Deriving only from two fresh
/// readings prevents pairing a new A value with a B value left over from a
/// previous cycle.
#[derive(Debug, Clone)]
pub struct MeasurementPoint {
    name: String,
    ab_distance: f32,
    a_value: f32,
    b_value: f32,
    a_fresh: bool,
    b_fresh: bool,
    last_thickness: Option<f32>,
}

impl MeasurementPoint {
    /// Create a point with the session's fixed A-B sensor separation
    pub fn new(name: impl Into<String>, ab_distance: f32) -> Self {
        Self {
            name: name.into(),
            ab_distance,
            a_value: 0.0,
            b_value: 0.0,
            a_fresh: false,
            b_fresh: false,
            last_thickness: None,
        }
    }

    /// Point label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured A-B sensor separation
    pub fn ab_distance(&self) -> f32 {
        self.ab_distance
    }

    /// Latest sensor A distance
    pub fn a_value(&self) -> f32 {
        self.a_value
    }

    /// Latest sensor B distance
    pub fn b_value(&self) -> f32 {
        self.b_value
    }

    /// Store a sensor A reading and mark it fresh
    pub fn record_a(&mut self, value: f32) {
        self.a_value = value;
        self.a_fresh = true;
    }

    /// Store a sensor B reading and mark it fresh
    pub fn record_b(&mut self, value: f32) {
        self.b_value = value;
        self.b_fresh = true;
    }

    /// Derive thickness if both readings are fresh, consuming the flags
    ///
    /// Returns `None` when either side has not been refreshed since the last
    /// derivation; the previous result stays available via
    /// [`last_thickness`](Self::last_thickness).
    pub fn thickness(&mut self) -> Option<f32> {
        if !(self.a_fresh && self.b_fresh) {
            return None;
        }
        self.a_fresh = false;
        self.b_fresh = false;
        let thickness = self.ab_distance - self.a_value - self.b_value;
        self.last_thickness = Some(thickness);
        Some(thickness)
    }

    /// Most recently derived thickness, if any
    pub fn last_thickness(&self) -> Option<f32> {
        self.last_thickness
    }

    /// Clear the sensor A side (value and freshness)
    pub fn clear_a(&mut self) {
        self.a_value = 0.0;
        self.a_fresh = false;
    }

    /// Clear the sensor B side (value and freshness)
    pub fn clear_b(&mut self) {
        self.b_value = 0.0;
        self.b_fresh = false;
    }

    /// Reset the point to its default numeric state
    pub fn reset(&mut self) {
        self.clear_a();
        self.clear_b();
        self.last_thickness = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thickness_requires_both_fresh() {
        let mut point = MeasurementPoint::new("P1", 20.0);
        assert_eq!(point.thickness(), None);

        point.record_a(5.0);
        assert_eq!(point.thickness(), None);

        point.record_b(3.0);
        assert_eq!(point.thickness(), Some(20.0 - 5.0 - 3.0));
    }

    #[test]
    fn test_thickness_consumes_freshness() {
        let mut point = MeasurementPoint::new("P1", 20.0);
        point.record_a(5.0);
        point.record_b(3.0);
        assert_eq!(point.thickness(), Some(12.0));
        // Flags consumed; no new readings means no new derivation
        assert_eq!(point.thickness(), None);
        assert_eq!(point.last_thickness(), Some(12.0));
    }

    #[test]
    fn test_single_side_refresh_is_not_enough() {
        let mut point = MeasurementPoint::new("P1", 20.0);
        point.record_a(5.0);
        point.record_b(3.0);
        point.thickness();

        // Only A refreshed; pairing with the stale B must not happen
        point.record_a(6.0);
        assert_eq!(point.thickness(), None);

        point.record_b(4.0);
        assert_eq!(point.thickness(), Some(10.0));
    }

    #[test]
    fn test_reset() {
        let mut point = MeasurementPoint::new("P1", 20.0);
        point.record_a(5.0);
        point.record_b(3.0);
        point.thickness();
        point.reset();
        assert_eq!(point.a_value(), 0.0);
        assert_eq!(point.b_value(), 0.0);
        assert_eq!(point.last_thickness(), None);
        assert_eq!(point.thickness(), None);
    }
}
