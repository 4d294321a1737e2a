//! Time-stamped samples and redundant-sample compression.

use smallvec::{smallvec, SmallVec};

use crate::document::Value;
use crate::util::{point3f_string, quaternion_string, Quat, Vec3};

/// A value that can be sampled over time and written as a spline point.
pub trait SampleValue: Copy {
    /// Channel `Type` for splines of this value.
    const CHANNEL_TYPE: &'static str;

    /// Components compared and interpolated during compression.
    fn components(&self) -> SmallVec<[f32; 4]>;

    fn to_value(&self) -> Value;
}

impl SampleValue for f32 {
    const CHANNEL_TYPE: &'static str = "FloatSplineLinear";

    fn components(&self) -> SmallVec<[f32; 4]> {
        smallvec![*self]
    }

    fn to_value(&self) -> Value {
        Value::Double(*self as f64)
    }
}

impl SampleValue for Vec3 {
    const CHANNEL_TYPE: &'static str = "Point3FSplineLinear";

    fn components(&self) -> SmallVec<[f32; 4]> {
        SmallVec::from_slice(&self.to_array())
    }

    fn to_value(&self) -> Value {
        point3f_string(*self).into()
    }
}

impl SampleValue for Quat {
    const CHANNEL_TYPE: &'static str = "QuaternionSplineLinear";

    fn components(&self) -> SmallVec<[f32; 4]> {
        smallvec![self.w, self.x, self.y, self.z]
    }

    fn to_value(&self) -> Value {
        quaternion_string(*self).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub time: i32,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(time: i32, value: T) -> Self {
        Self { time, value }
    }
}

/// Whether `b` lies exactly on the line from `a` to `c`.
fn is_interpolated<T: SampleValue>(a: &Sample<T>, b: &Sample<T>, c: &Sample<T>) -> bool {
    let span = (c.time - a.time) as f64;
    if span == 0.0 {
        return false;
    }
    let t = (b.time - a.time) as f64 / span;
    let (ca, cb, cc) = (a.value.components(), b.value.components(), c.value.components());
    ca.iter().zip(&cb).zip(&cc).all(|((va, vb), vc)| {
        // Held values are redundant even where the blend rounds.
        (va == vb && vb == vc) || *va as f64 * (1.0 - t) + *vc as f64 * t == *vb as f64
    })
}

/// Drop samples a linear spline through their neighbours reproduces exactly.
///
/// One left-to-right pass over consecutive triples. When the middle sample
/// is removed the same position is retried against the next sample, so a
/// constant or linear run collapses to its two end points.
pub fn remove_redundant_samples<T: SampleValue>(samples: &mut Vec<Sample<T>>) {
    let mut i = 0;
    while i + 2 < samples.len() {
        if is_interpolated(&samples[i], &samples[i + 1], &samples[i + 2]) {
            samples.remove(i + 1);
        } else {
            i += 1;
        }
    }
}
