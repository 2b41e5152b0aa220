//! Arc-length parametrization of a queue's polyline.
//!
//! # Data layout
//!
//! Two parallel vectors: `points[i]` is the i-th vertex, `cum_len[i]` the
//! arc length from the start to that vertex (`cum_len[0] == 0`).  Looking up
//! an arc length is a binary search over `cum_len` followed by a linear
//! interpolation inside the segment — O(log n) with no allocation.
//!
//! Arc length 0 is the **entry** end of the line (where cars join); the
//! total length is the stop line at the booths.  Consumers that track
//! distance-to-stop-line convert with `total_length() - s` before calling in.

use bx_core::GeoPoint;

use crate::{PathError, PathResult};

/// A geographic polyline parametrized by arc length, immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct Waitline {
    points: Vec<GeoPoint>,
    /// `cum_len[i]` = metres from `points[0]` to `points[i]`.
    cum_len: Vec<f64>,
    total: f64,
}

impl Waitline {
    /// Build from an ordered vertex list, entry end first.
    ///
    /// Consecutive duplicate vertices (zero-length segments) are dropped.
    pub fn from_points(raw: Vec<GeoPoint>) -> PathResult<Self> {
        let mut points: Vec<GeoPoint> = Vec::with_capacity(raw.len());
        for p in raw {
            if points.last().is_some_and(|last| last.distance_m(p) < 1e-6) {
                continue;
            }
            points.push(p);
        }
        if points.len() < 2 {
            return Err(PathError::TooFewPoints(points.len()));
        }

        let mut cum_len = Vec::with_capacity(points.len());
        cum_len.push(0.0);
        for w in points.windows(2) {
            let seg = w[0].distance_m(w[1]);
            cum_len.push(cum_len.last().unwrap() + seg);
        }

        let total = *cum_len.last().unwrap();
        if total <= 0.0 {
            return Err(PathError::ZeroLength);
        }

        Ok(Self {
            points,
            cum_len,
            total,
        })
    }

    /// A straight two-point line starting at `origin` and running
    /// `length_m` metres along `bearing_deg` (clockwise from north).
    /// Convenient for tests and synthetic scenarios.
    pub fn straight(origin: GeoPoint, bearing_deg: f64, length_m: f64) -> PathResult<Self> {
        let b = bearing_deg.to_radians();
        let d_north = length_m * b.cos();
        let d_east = length_m * b.sin();
        let end = GeoPoint::new(
            origin.lat + d_north / bx_core::geo::METERS_PER_DEGREE,
            origin.lon
                + d_east / (bx_core::geo::METERS_PER_DEGREE * origin.lat.to_radians().cos()),
        );
        Self::from_points(vec![origin, end])
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// Total arc length L in metres.
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.total
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    // ── Arc-length lookups ────────────────────────────────────────────────

    /// Geographic position at arc length `s` from the entry end.
    /// `s` is clamped to `[0, L]`.
    pub fn point_at(&self, s: f64) -> GeoPoint {
        let (i, t) = self.locate(s);
        self.points[i].lerp(self.points[i + 1], t)
    }

    /// Travel heading at arc length `s`, degrees clockwise from north.
    pub fn heading_at(&self, s: f64) -> f64 {
        let (i, _) = self.locate(s);
        self.points[i].bearing_deg_to(self.points[i + 1])
    }

    /// Position and heading in one lookup.
    pub fn point_and_heading(&self, s: f64) -> (GeoPoint, f64) {
        let (i, t) = self.locate(s);
        (
            self.points[i].lerp(self.points[i + 1], t),
            self.points[i].bearing_deg_to(self.points[i + 1]),
        )
    }

    /// Signed path curvature κ at arc length `s`, in 1/m.  Positive turns
    /// clockwise (toward increasing bearing).
    ///
    /// Computed discretely: the wrapped heading change between the segment
    /// containing `s` and its successor, divided by the distance between the
    /// two segment midpoints.  Zero on the final segment and on straight
    /// lines.
    pub fn curvature_at(&self, s: f64) -> f64 {
        let (i, _) = self.locate(s);
        if i + 2 >= self.points.len() {
            return 0.0;
        }
        let h1 = self.points[i].bearing_deg_to(self.points[i + 1]);
        let h2 = self.points[i + 1].bearing_deg_to(self.points[i + 2]);
        let mut dpsi = (h2 - h1).to_radians();
        // Wrap to (-π, π] so a 359°→1° transition reads as +2°.
        if dpsi > std::f64::consts::PI {
            dpsi -= 2.0 * std::f64::consts::PI;
        } else if dpsi <= -std::f64::consts::PI {
            dpsi += 2.0 * std::f64::consts::PI;
        }
        let len1 = self.cum_len[i + 1] - self.cum_len[i];
        let len2 = self.cum_len[i + 2] - self.cum_len[i + 1];
        let ds = 0.5 * (len1 + len2);
        if ds <= 0.0 {
            0.0
        } else {
            dpsi / ds
        }
    }

    /// Segment index and interpolation parameter for arc length `s`.
    fn locate(&self, s: f64) -> (usize, f64) {
        let s = s.clamp(0.0, self.total);
        // First vertex with cum_len > s, minus one, bounded to a valid segment.
        let i = self
            .cum_len
            .partition_point(|&c| c <= s)
            .saturating_sub(1)
            .min(self.points.len() - 2);
        let seg_len = self.cum_len[i + 1] - self.cum_len[i];
        let t = if seg_len > 0.0 {
            (s - self.cum_len[i]) / seg_len
        } else {
            0.0
        };
        (i, t)
    }
}
