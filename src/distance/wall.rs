//! Wall geometry from two or three scan samples
//!
//! Servo angles are in degrees, 0° points right, 90° forward and 180° left. A sample
//! at angle θ and distance d lies at `(d·cos θ, d·sin θ)` with x to the right and y
//! forward.

use libm::{acosf, cosf, fabsf, roundf, sinf, sqrtf};

/// Two samples closer than this are treated as the same point
const MIN_SEPARATION_CM: f32 = 0.5;

/// One distance reading at a servo angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub angle_deg: f32,
    pub distance_cm: f32,
}

impl Sample {
    pub fn new(angle_deg: f32, distance_cm: f32) -> Self {
        Self {
            angle_deg,
            distance_cm,
        }
    }

    fn point(&self) -> (f32, f32) {
        let angle = self.angle_deg.to_radians();
        (self.distance_cm * cosf(angle), self.distance_cm * sinf(angle))
    }
}

/// Degrees to turn to drive parallel to the wall through `first` and `second`
///
/// `second` must be the sample at the larger servo angle. Positive turns left, the
/// result lies in (−90, 90]. `None` for equal distances and for coinciding points.
pub fn wall_angle(first: Sample, second: Sample) -> Option<f32> {
    let (a, b) = (first.distance_cm, second.distance_cm);
    if a < MIN_SEPARATION_CM || b < MIN_SEPARATION_CM || fabsf(a - b) < MIN_SEPARATION_CM {
        return None;
    }

    // Law of cosines for the wall segment c and its angle beta at the first sample
    let spread = (second.angle_deg - first.angle_deg).to_radians();
    let c_squared = a * a + b * b - 2.0 * a * b * cosf(spread);
    if c_squared < MIN_SEPARATION_CM * MIN_SEPARATION_CM {
        return None;
    }
    let c = sqrtf(c_squared);
    let cos_beta = ((a * a + c_squared - b * b) / (2.0 * a * c)).clamp(-1.0, 1.0);
    let beta = acosf(cos_beta).to_degrees();

    Some(normalize(first.angle_deg + 90.0 - beta))
}

/// Distance along the ray at `angle_deg` to the line through `first` and `second`
///
/// `None` if the ray runs parallel to the line or points away from it.
pub fn distance_to_line(first: Sample, second: Sample, angle_deg: f32) -> Option<f32> {
    let (px, py) = first.point();
    let (qx, qy) = second.point();
    let (vx, vy) = (qx - px, qy - py);
    let angle = angle_deg.to_radians();
    let (ux, uy) = (cosf(angle), sinf(angle));

    let denominator = ux * vy - uy * vx;
    if fabsf(denominator) < 1e-4 {
        return None;
    }
    let distance = (px * vy - py * vx) / denominator;
    (distance > 0.0).then_some(distance)
}

/// Wall angle through the outer samples of a triple, if the middle one lies on it
///
/// Returns whole degrees in (−90, 90].
pub fn wall_through(first: Sample, middle: Sample, last: Sample, tolerance_cm: f32) -> Option<i8> {
    let expected = distance_to_line(first, last, middle.angle_deg)?;
    if fabsf(expected - middle.distance_cm) > tolerance_cm {
        return None;
    }
    wall_angle(first, last).map(|angle| match roundf(angle) as i8 {
        -90 => 90,
        degrees => degrees,
    })
}

fn normalize(mut degrees: f32) -> f32 {
    while degrees > 90.0 {
        degrees -= 180.0;
    }
    while degrees <= -90.0 {
        degrees += 180.0;
    }
    degrees
}
