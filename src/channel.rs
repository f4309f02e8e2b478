// Keyframe channels read from source animations

use std::cmp::Ordering;

use glam::{Quat, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// values hold (in-tangent, value, out-tangent) per key
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

pub trait Keyable: Copy {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, dt: f32) -> Self;
}

fn hermite_weights(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

impl Keyable for Vec3 {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, dt: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_weights(t);
        p0 * h00 + m0 * (h10 * dt) + p1 * h01 + m1 * (h11 * dt)
    }
}

impl Keyable for Quat {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, dt: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_weights(t);
        let v = Vec4::from(p0) * h00
            + Vec4::from(m0) * (h10 * dt)
            + Vec4::from(p1) * h01
            + Vec4::from(m1) * (h11 * dt);
        Quat::from_vec4(v).normalize()
    }
}

#[derive(Debug, Clone)]
pub struct Channel<T> {
    pub times: Box<[f32]>,
    pub values: Box<[T]>,
    pub interpolation: Interpolation,
}

fn bin_search_anim_indices(times: &[f32], val: f32) -> (usize, usize) {
    let n = times.len();
    if n <= 1 {
        return (0, 0);
    }

    match times.binary_search_by(|x| x.partial_cmp(&val).unwrap_or(Ordering::Greater)) {
        Ok(i) => (i, i),                    // exact hit, no blend
        Err(0) => (0, 0),                   // before first, clamp
        Err(i) if i >= n => (n - 1, n - 1), // after last, clamp
        Err(i) => (i - 1, i),               // between i-1 and i
    }
}

impl<T: Keyable> Channel<T> {
    /// Value at time `t` in seconds, clamped to the first and last key.
    /// None when the channel has no keys.
    pub fn sample(&self, t: f32) -> Option<T> {
        if self.times.is_empty() {
            return None;
        }
        let (i0, i1) = bin_search_anim_indices(&self.times, t);
        let (t0, t1) = (self.times[i0], self.times[i1]);
        let dt = t1 - t0;
        let alpha = if i0 == i1 || dt.abs() < f32::EPSILON {
            0.0
        } else {
            (t - t0) / dt
        };

        match self.interpolation {
            Interpolation::Step => self.values.get(i0).copied(),
            Interpolation::Linear => {
                let (v0, v1) = (*self.values.get(i0)?, *self.values.get(i1)?);
                Some(T::linear(v0, v1, alpha))
            }
            Interpolation::CubicSpline => {
                let p0 = *self.values.get(i0 * 3 + 1)?;
                if i0 == i1 {
                    return Some(p0);
                }
                let m0 = *self.values.get(i0 * 3 + 2)?;
                let m1 = *self.values.get(i1 * 3)?;
                let p1 = *self.values.get(i1 * 3 + 1)?;
                Some(T::hermite(p0, m0, p1, m1, alpha, dt))
            }
        }
    }

    pub fn first_time(&self) -> Option<f32> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<f32> {
        self.times.last().copied()
    }
}
