//! Editable envelope curve.
//!
//! `EnvelopeCurve` is the UI-owned shape behind the amplitude and pitch
//! envelopes. It is never read by the audio thread: the controller samples it
//! with [`EnvelopeCurve::sample_into`] and bakes the result into a lookup
//! table. Evaluation degrades with the number of control points:
//!
//! | points | evaluation                                   |
//! |--------|----------------------------------------------|
//! | 0      | `default_value` everywhere                   |
//! | 1      | that point's value everywhere                |
//! | 2      | linear between them, endpoints held outside  |
//! | 3+     | Catmull-Rom through the points, ends held    |

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayVec;

/// Maximum control points per curve. Adding past this is a no-op.
pub const MAX_POINTS: usize = 64;

/// Which of the voice's envelopes a curve drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeTarget {
    /// Linear output gain.
    Amplitude,
    /// Oscillator frequency in Hz.
    Pitch,
}

/// A control point on an envelope curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopePoint {
    /// Offset from note start in milliseconds (>= 0).
    pub time_ms: f32,
    /// Value at this point, inside the curve's [`ValueRange`].
    pub value: f32,
}

impl EnvelopePoint {
    /// Create a new control point.
    pub const fn new(time_ms: f32, value: f32) -> Self {
        Self { time_ms, value }
    }
}

/// Legal value range for a curve's points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    /// Create a range; bounds are swapped if given in the wrong order.
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Clamp a value into the range. NaN maps to `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// A UI-edited envelope: a default value plus ordered control points.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeCurve {
    default_value: f32,
    range: ValueRange,
    points: ArrayVec<EnvelopePoint, MAX_POINTS>,
}

impl EnvelopeCurve {
    /// Create an empty curve with the given default and legal value range.
    pub fn with_range(default_value: f32, min: f32, max: f32) -> Self {
        Self {
            default_value,
            range: ValueRange::new(min, max),
            points: ArrayVec::new(),
        }
    }

    /// Amplitude curve: unity gain by default, points limited to 0..=2.
    pub fn amplitude() -> Self {
        Self::with_range(1.0, 0.0, 2.0)
    }

    /// Pitch curve in Hz: 200 Hz by default, points limited to 20..=2000.
    pub fn pitch() -> Self {
        Self::with_range(200.0, 20.0, 2000.0)
    }

    /// Default curve for a target.
    pub fn for_target(target: EnvelopeTarget) -> Self {
        match target {
            EnvelopeTarget::Amplitude => Self::amplitude(),
            EnvelopeTarget::Pitch => Self::pitch(),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    pub fn set_default_value(&mut self, value: f32) {
        self.default_value = value;
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }

    /// Control points, ordered by ascending time.
    pub fn points(&self) -> &[EnvelopePoint] {
        &self.points
    }

    /// Whether any control point exists. A curve with points "takes over"
    /// its parameter from the static knob value.
    pub fn has_points(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Insert a point keeping ascending time order.
    ///
    /// Time is clamped to `>= 0` and value to the curve's range. A point with
    /// the same time as an existing one goes before it. Returns the insertion
    /// index, or `None` when the curve is full.
    pub fn add_point(&mut self, time_ms: f32, value: f32) -> Option<usize> {
        if self.points.is_full() {
            return None;
        }
        let point = EnvelopePoint::new(time_ms.max(0.0), self.range.clamp(value));
        let index = self.points.partition_point(|p| p.time_ms < point.time_ms);
        self.points.insert(index, point);
        Some(index)
    }

    /// Move a point, clamping its time between its neighbours so the
    /// sequence never needs re-sorting.
    ///
    /// The first point is bounded below by 0, the last is unbounded above.
    /// Out-of-range indices are ignored. Returns `index` unchanged.
    pub fn move_point(&mut self, index: usize, time_ms: f32, value: f32) -> usize {
        let len = self.points.len();
        if index >= len {
            return index;
        }

        let min_t = if index > 0 {
            self.points[index - 1].time_ms
        } else {
            0.0
        };
        let max_t = if index + 1 < len {
            self.points[index + 1].time_ms
        } else {
            f32::MAX
        };
        let time_ms = if time_ms.is_nan() { min_t } else { time_ms };

        let value = self.range.clamp(value);
        let point = &mut self.points[index];
        point.time_ms = time_ms.clamp(min_t, max_t);
        point.value = value;
        index
    }

    /// Remove a point. Out-of-range indices are ignored.
    pub fn remove_point(&mut self, index: usize) {
        if index < self.points.len() {
            self.points.remove(index);
        }
    }

    /// Remove every point, returning the curve to its default value.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Evaluate the curve at `time_ms`.
    pub fn evaluate(&self, time_ms: f32) -> f32 {
        let pts = &self.points;
        let n = pts.len();
        if n == 0 {
            return self.default_value;
        }
        if n == 1 {
            return pts[0].value;
        }

        let time_ms = if time_ms.is_nan() { 0.0 } else { time_ms };

        // Hold the endpoint values outside the edited range
        if time_ms <= pts[0].time_ms {
            return pts[0].value;
        }
        if time_ms >= pts[n - 1].time_ms {
            return pts[n - 1].value;
        }

        let seg = (0..n - 1)
            .find(|&i| time_ms < pts[i + 1].time_ms)
            .unwrap_or(0);

        let t0 = pts[seg].time_ms;
        let t1 = pts[seg + 1].time_ms;
        let t = if t1 > t0 { (time_ms - t0) / (t1 - t0) } else { 0.0 };

        if n == 2 {
            return pts[0].value + t * (pts[1].value - pts[0].value);
        }

        // Phantom neighbours at the ends duplicate the nearest real point
        let p0 = pts[seg.saturating_sub(1)].value;
        let p1 = pts[seg].value;
        let p2 = pts[seg + 1].value;
        let p3 = pts[(seg + 2).min(n - 1)].value;
        catmull_rom(p0, p1, p2, p3, t)
    }

    /// Fill `out` with the curve sampled at evenly spaced times from 0 to
    /// `duration_ms` inclusive.
    pub fn sample_into(&self, out: &mut [f32], duration_ms: f32) {
        let n = out.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            out[0] = self.evaluate(0.0);
            return;
        }
        let step = duration_ms.max(0.0) / (n - 1) as f32;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.evaluate(i as f32 * step);
        }
    }

    /// Sample the curve into a new vector of `resolution` values.
    pub fn sampled(&self, resolution: usize, duration_ms: f32) -> Vec<f32> {
        let mut out = vec![0.0; resolution];
        self.sample_into(&mut out, duration_ms);
        out
    }
}

/// Uniform Catmull-Rom interpolation between `p1` and `p2` at `t` (0.0..=1.0).
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: &[(f32, f32)]) -> EnvelopeCurve {
        let mut c = EnvelopeCurve::amplitude();
        for &(t, v) in points {
            c.add_point(t, v);
        }
        c
    }

    #[test]
    fn empty_curve_returns_default_everywhere() {
        let mut c = EnvelopeCurve::amplitude();
        c.set_default_value(0.42);
        for t in [-10.0, 0.0, 1.0, 150.0, 1.0e6] {
            assert_eq!(c.evaluate(t), 0.42);
        }
    }

    #[test]
    fn single_point_is_constant() {
        let c = curve(&[(50.0, 0.3)]);
        assert_eq!(c.evaluate(0.0), 0.3);
        assert_eq!(c.evaluate(50.0), 0.3);
        assert_eq!(c.evaluate(999.0), 0.3);
    }

    #[test]
    fn two_points_interpolate_linearly() {
        let c = curve(&[(0.0, 1.0), (100.0, 0.0)]);
        assert!((c.evaluate(50.0) - 0.5).abs() < 1e-6);
        assert!((c.evaluate(25.0) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn two_points_hold_outside_range() {
        let c = curve(&[(10.0, 0.2), (20.0, 0.8)]);
        assert_eq!(c.evaluate(0.0), 0.2);
        assert_eq!(c.evaluate(500.0), 0.8);
    }

    #[test]
    fn spline_passes_through_knots() {
        let c = curve(&[(0.0, 0.0), (30.0, 1.5), (60.0, 0.4), (90.0, 1.0), (140.0, 0.1)]);
        for p in c.points() {
            assert_eq!(c.evaluate(p.time_ms), p.value, "knot at {}", p.time_ms);
        }
    }

    #[test]
    fn spline_is_smooth_between_knots() {
        let c = curve(&[(0.0, 0.0), (50.0, 1.0), (100.0, 0.0)]);
        let mid = c.evaluate(25.0);
        assert!(mid > 0.0 && mid < 1.0, "got {}", mid);
        // Symmetric knots give a symmetric curve
        assert!((c.evaluate(25.0) - c.evaluate(75.0)).abs() < 1e-5);
    }

    #[test]
    fn catmull_rom_endpoints() {
        assert_eq!(catmull_rom(0.0, 1.0, 2.0, 3.0, 0.0), 1.0);
        assert!((catmull_rom(0.0, 1.0, 2.0, 3.0, 1.0) - 2.0).abs() < 1e-6);
        // Collinear control points reproduce the line
        assert!((catmull_rom(0.0, 1.0, 2.0, 3.0, 0.5) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn add_point_keeps_time_order() {
        let c = curve(&[(80.0, 0.1), (10.0, 0.2), (40.0, 0.3), (0.0, 0.4)]);
        let times: Vec<f32> = c.points().iter().map(|p| p.time_ms).collect();
        assert_eq!(times, [0.0, 10.0, 40.0, 80.0]);
    }

    #[test]
    fn add_point_clamps_time_and_value() {
        let mut c = EnvelopeCurve::amplitude();
        c.add_point(-5.0, 7.0);
        assert_eq!(c.points()[0], EnvelopePoint::new(0.0, 2.0));
    }

    #[test]
    fn add_point_on_full_curve_is_noop() {
        let mut c = EnvelopeCurve::amplitude();
        for i in 0..MAX_POINTS {
            assert!(c.add_point(i as f32, 1.0).is_some());
        }
        assert_eq!(c.add_point(1000.0, 1.0), None);
        assert_eq!(c.len(), MAX_POINTS);
    }

    #[test]
    fn move_point_clamps_between_neighbours() {
        let mut c = curve(&[(0.0, 1.0), (50.0, 1.0), (100.0, 1.0)]);
        c.move_point(1, 500.0, 0.5);
        assert_eq!(c.points()[1].time_ms, 100.0);
        c.move_point(1, -20.0, 0.5);
        assert_eq!(c.points()[1].time_ms, 0.0);
        c.move_point(0, -20.0, 0.5);
        assert_eq!(c.points()[0].time_ms, 0.0);
        c.move_point(2, 1.0e5, 0.5);
        assert_eq!(c.points()[2].time_ms, 1.0e5);
    }

    #[test]
    fn move_point_never_breaks_order() {
        let mut c = curve(&[(0.0, 1.0), (20.0, 1.0), (40.0, 1.0), (60.0, 1.0)]);
        let moves = [(1, 70.0), (2, 5.0), (0, 100.0), (3, -1.0), (2, 30.0), (1, 1.0e9)];
        for (idx, t) in moves {
            c.move_point(idx, t, 0.7);
            for w in c.points().windows(2) {
                assert!(w[0].time_ms <= w[1].time_ms, "order broken: {:?}", c.points());
            }
        }
    }

    #[test]
    fn move_point_clamps_value_to_range() {
        let mut c = curve(&[(0.0, 1.0)]);
        c.move_point(0, 0.0, -3.0);
        assert_eq!(c.points()[0].value, 0.0);
        c.move_point(0, 0.0, 9.0);
        assert_eq!(c.points()[0].value, 2.0);
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let mut c = curve(&[(0.0, 1.0), (10.0, 0.5)]);
        let before = c.clone();
        assert_eq!(c.move_point(7, 3.0, 0.1), 7);
        c.remove_point(2);
        assert_eq!(c, before);
    }

    #[test]
    fn remove_point_erases() {
        let mut c = curve(&[(0.0, 1.0), (10.0, 0.5), (20.0, 0.0)]);
        c.remove_point(1);
        assert_eq!(c.len(), 2);
        assert_eq!(c.points()[1].time_ms, 20.0);
    }

    #[test]
    fn sampled_spans_duration_inclusive() {
        let c = curve(&[(0.0, 0.0), (100.0, 1.0)]);
        let s = c.sampled(5, 100.0);
        assert_eq!(s.len(), 5);
        assert!((s[0] - 0.0).abs() < 1e-6);
        assert!((s[2] - 0.5).abs() < 1e-6);
        assert!((s[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pitch_curve_has_hz_range() {
        let mut c = EnvelopeCurve::pitch();
        c.add_point(0.0, 5.0);
        assert_eq!(c.points()[0].value, 20.0);
        assert_eq!(c.evaluate(10.0), 20.0);
    }
}
