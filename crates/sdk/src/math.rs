//! Fixed-size math value types
//!
//! These are deliberately plain: component fields, `Copy`, and `PartialEq`
//! so that attribute storage can detect redundant sets with a simple compare.
//! Interpolation between motion blur timesteps goes through [`Lerp`].

/// Linear interpolation between a begin and end sample.
///
/// `t == 0.0` yields `self`, `t == 1.0` yields `end`. Values outside
/// `[0, 1]` extrapolate.
pub trait Lerp: Sized {
    fn lerp(&self, end: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, end: &Self, t: f32) -> Self {
        self * (1.0 - t) + end * t
    }
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, end: &Self, t: f32) -> Self {
        let t = t as f64;
        self * (1.0 - t) + end * t
    }
}

// Integers interpolate in double precision and truncate toward zero.
impl Lerp for i32 {
    #[inline]
    fn lerp(&self, end: &Self, t: f32) -> Self {
        (*self as f64).lerp(&(*end as f64), t) as i32
    }
}

impl Lerp for i64 {
    #[inline]
    fn lerp(&self, end: &Self, t: f32) -> Self {
        (*self as f64).lerp(&(*end as f64), t) as i64
    }
}

macro_rules! componentwise {
    ($name:ident<$t:ident> { $($field:ident),+ }) => {
        impl<$t: Lerp> Lerp for $name<$t> {
            #[inline]
            fn lerp(&self, end: &Self, t: f32) -> Self {
                Self { $($field: self.$field.lerp(&end.$field, t)),+ }
            }
        }
    };
    ($name:ident { $($field:ident),+ }) => {
        impl Lerp for $name {
            #[inline]
            fn lerp(&self, end: &Self, t: f32) -> Self {
                Self { $($field: self.$field.lerp(&end.$field, t)),+ }
            }
        }
    };
}

/// Two component vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2<T> {
    pub x: T,
    pub y: T,
}

/// Three component vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

/// Four component vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec4<T> {
    pub x: T,
    pub y: T,
    pub z: T,
    pub w: T,
}

impl<T> Vec2<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T> Vec3<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

impl<T> Vec4<T> {
    pub const fn new(x: T, y: T, z: T, w: T) -> Self {
        Self { x, y, z, w }
    }
}

componentwise!(Vec2<T> { x, y });
componentwise!(Vec3<T> { x, y, z });
componentwise!(Vec4<T> { x, y, z, w });

pub type Vec2f = Vec2<f32>;
pub type Vec2d = Vec2<f64>;
pub type Vec3f = Vec3<f32>;
pub type Vec3d = Vec3<f64>;
pub type Vec4f = Vec4<f32>;
pub type Vec4d = Vec4<f64>;

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Linear RGB color with alpha
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

componentwise!(Rgb { r, g, b });
componentwise!(Rgba { r, g, b, a });

/// Row-major 4x4 matrix
///
/// The default value is the zero matrix; use [`Mat4::identity`] for
/// transforms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat4<T> {
    pub rows: [[T; 4]; 4],
}

impl<T> Mat4<T> {
    pub const fn from_rows(rows: [[T; 4]; 4]) -> Self {
        Self { rows }
    }
}

macro_rules! mat4_identity {
    ($t:ty, $zero:expr, $one:expr) => {
        impl Mat4<$t> {
            pub const fn identity() -> Self {
                let (o, l) = ($zero, $one);
                Self {
                    rows: [[l, o, o, o], [o, l, o, o], [o, o, l, o], [o, o, o, l]],
                }
            }
        }
    };
}

mat4_identity!(f32, 0.0f32, 1.0f32);
mat4_identity!(f64, 0.0f64, 1.0f64);

// Element-wise. Callers wanting rigid transform blending decompose first.
impl<T: Lerp + Copy> Lerp for Mat4<T> {
    fn lerp(&self, end: &Self, t: f32) -> Self {
        let mut rows = self.rows;
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.rows[r][c].lerp(&end.rows[r][c], t);
            }
        }
        Self { rows }
    }
}

pub type Mat4f = Mat4<f32>;
pub type Mat4d = Mat4<f64>;

/// Maps a shutter-relative time onto the `[begin, end]` timestep interval.
///
/// Derived each frame from the primary camera's shutter interval and the
/// scene's motion steps. A degenerate step configuration collapses both
/// coefficients to zero, which pins every interpolation to the begin sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeRescalingCoeffs {
    pub scale: f32,
    pub offset: f32,
}

impl TimeRescalingCoeffs {
    /// Compute coefficients from a shutter interval and motion steps.
    ///
    /// Returns `None` unless there are one or two motion steps.
    pub fn from_shutter(shutter_open: f32, shutter_close: f32, motion_steps: &[f32]) -> Option<Self> {
        match motion_steps {
            [_] => Some(Self::default()),
            [s0, s1] if s0 == s1 => Some(Self::default()),
            [s0, s1] => {
                let inv = 1.0 / (s1 - s0);
                Some(Self {
                    scale: (shutter_close - shutter_open) * inv,
                    offset: (shutter_open - s0) * inv,
                })
            }
            _ => None,
        }
    }

    #[inline]
    pub fn rescale(&self, t: f32) -> f32 {
        self.scale * t + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_scalars() {
        assert_eq!(2.0f32.lerp(&4.0, 0.5), 3.0);
        assert_eq!(10i32.lerp(&20, 0.25), 12);
        assert_eq!((-1.0f64).lerp(&1.0, 0.0), -1.0);
    }

    #[test]
    fn test_lerp_componentwise() {
        let a = Vec3f::new(0.0, 1.0, 2.0);
        let b = Vec3f::new(2.0, 3.0, 4.0);
        assert_eq!(a.lerp(&b, 0.5), Vec3f::new(1.0, 2.0, 3.0));

        let c = Rgb::new(0.0, 0.0, 0.0).lerp(&Rgb::new(1.0, 1.0, 1.0), 1.0);
        assert_eq!(c, Rgb::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_mat4_lerp_identity() {
        let zero = Mat4d::default();
        let id = Mat4d::identity();
        let half = zero.lerp(&id, 0.5);
        assert_eq!(half.rows[0][0], 0.5);
        assert_eq!(half.rows[0][1], 0.0);
    }

    #[test]
    fn test_time_rescaling_coeffs() {
        let coeffs = TimeRescalingCoeffs::from_shutter(-0.25, 0.25, &[-1.0, 0.0]).unwrap();
        assert_eq!(coeffs.scale, 0.5);
        assert_eq!(coeffs.offset, 0.75);
        assert_eq!(coeffs.rescale(0.0), 0.75);
        assert_eq!(coeffs.rescale(1.0), 1.25);
    }

    #[test]
    fn test_time_rescaling_degenerate() {
        let single = TimeRescalingCoeffs::from_shutter(-0.25, 0.25, &[0.0]).unwrap();
        assert_eq!(single, TimeRescalingCoeffs::default());

        let equal = TimeRescalingCoeffs::from_shutter(-0.25, 0.25, &[1.0, 1.0]).unwrap();
        assert_eq!(equal.rescale(0.7), 0.0);

        assert!(TimeRescalingCoeffs::from_shutter(0.0, 1.0, &[]).is_none());
        assert!(TimeRescalingCoeffs::from_shutter(0.0, 1.0, &[0.0, 1.0, 2.0]).is_none());
    }
}
