//! Uniformly resampled centerline in the vehicle's local frame

use crate::common::traits::LaneReference;
use crate::common::types::{normalize_angle, Frame, Point2D, Pose};

/// One centerline sample: absolute station and the centerline pose there
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterlineSample {
    pub station: f64,
    pub pose: Pose,
}

impl CenterlineSample {
    /// Point at signed `latitude` (positive to the left) from this sample
    pub fn offset(&self, latitude: f64) -> Point2D {
        Point2D::new(
            self.pose.x - latitude * self.pose.rot.sin(),
            self.pose.y + latitude * self.pose.rot.cos(),
        )
    }
}

/// Road-relative coordinates of a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub station: f64,
    pub latitude: f64,
    /// Index of the nearest sample, usable as the hint for the next query
    pub index: usize,
}

/// Centerline resampled at a fixed station interval for one planning cycle.
#[derive(Debug, Clone)]
pub struct Centerline {
    start_station: f64,
    interval: f64,
    samples: Vec<CenterlineSample>,
}

impl Centerline {
    /// Resample `lane` over `[start_station, end_station]` and express the
    /// samples in `frame`.
    pub fn resample<L: LaneReference + ?Sized>(
        lane: &L,
        start_station: f64,
        end_station: f64,
        interval: f64,
        frame: &Frame,
    ) -> Self {
        let num = (((end_station - start_station) / interval).ceil() as usize).max(1) + 1;
        let samples = lane
            .sample_stations(start_station, num, interval)
            .into_iter()
            .map(|s| CenterlineSample {
                station: s.station,
                pose: frame.pose_to_local(&s.pose),
            })
            .collect();
        Self {
            start_station,
            interval,
            samples,
        }
    }

    pub fn samples(&self) -> &[CenterlineSample] {
        &self.samples
    }

    pub fn start_station(&self) -> f64 {
        self.start_station
    }

    pub fn end_station(&self) -> f64 {
        self.samples[self.samples.len() - 1].station
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Nearest sample index for a station, clamped to the resampled range
    pub fn index_of(&self, station: f64) -> usize {
        let i = ((station - self.start_station) / self.interval).round();
        (i.max(0.0) as usize).min(self.samples.len() - 1)
    }

    /// Interpolated centerline sample at `station`
    pub fn sample_at(&self, station: f64) -> CenterlineSample {
        let f = (station - self.start_station) / self.interval;
        let last = self.samples.len() - 1;
        if last == 0 {
            return self.samples[0];
        }
        let i = (f.floor().max(0.0) as usize).min(last - 1);
        let t = f - i as f64;
        let a = &self.samples[i];
        let b = &self.samples[i + 1];
        let lerp = |u: f64, v: f64| u + (v - u) * t;
        CenterlineSample {
            station,
            pose: Pose::new(
                lerp(a.pose.x, b.pose.x),
                lerp(a.pose.y, b.pose.y),
                normalize_angle(a.pose.rot + normalize_angle(b.pose.rot - a.pose.rot) * t),
            )
            .with_curvature(lerp(a.pose.curv, b.pose.curv)),
        }
    }

    /// Project a local-frame point onto the centerline.
    ///
    /// With a hint the nearest sample is found by walking downhill from the
    /// hinted index; without one the whole centerline is scanned.
    pub fn project(&self, point: Point2D, hint: Option<usize>) -> Projection {
        let dist2 = |i: usize| {
            let p = &self.samples[i].pose;
            (p.x - point.x).powi(2) + (p.y - point.y).powi(2)
        };
        let last = self.samples.len() - 1;

        let nearest = match hint {
            Some(h) => {
                let mut i = h.min(last);
                let mut d = dist2(i);
                while i < last && dist2(i + 1) < d {
                    i += 1;
                    d = dist2(i);
                }
                while i > 0 && dist2(i - 1) < d {
                    i -= 1;
                    d = dist2(i);
                }
                i
            }
            None => (0..=last)
                .min_by(|&a, &b| dist2(a).total_cmp(&dist2(b)))
                .unwrap_or(0),
        };

        // Refine on the adjacent segment the point projects into
        let segment = |i: usize| -> (f64, f64, f64) {
            let a = &self.samples[i];
            let b = &self.samples[i + 1];
            let dx = b.pose.x - a.pose.x;
            let dy = b.pose.y - a.pose.y;
            let len2 = (dx * dx + dy * dy).max(f64::EPSILON);
            let px = point.x - a.pose.x;
            let py = point.y - a.pose.y;
            let t = (px * dx + py * dy) / len2;
            let latitude = (dx * py - dy * px) / len2.sqrt();
            (t, a.station + t * (b.station - a.station), latitude)
        };

        if last == 0 {
            let s = &self.samples[0];
            let px = point.x - s.pose.x;
            let py = point.y - s.pose.y;
            let (sin, cos) = s.pose.rot.sin_cos();
            return Projection {
                station: s.station + px * cos + py * sin,
                latitude: -px * sin + py * cos,
                index: 0,
            };
        }

        let (_, station, latitude) = if nearest == last {
            segment(last - 1)
        } else if nearest == 0 {
            segment(0)
        } else {
            let ahead = segment(nearest);
            if ahead.0 >= 0.0 {
                ahead
            } else {
                segment(nearest - 1)
            }
        };

        Projection {
            station,
            latitude,
            index: nearest,
        }
    }
}
