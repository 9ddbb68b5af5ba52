use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A direction or displacement in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const X: Self = Self {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };
    pub const Y: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const Z: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Unit vector in the same direction, `None` when near zero.
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-15 {
            None
        } else {
            Some(*self / len)
        }
    }

    /// Unsigned angle in `[0, π]`. Zero when either vector vanishes.
    pub fn angle_to(&self, other: &Self) -> f64 {
        let len_product = self.length() * other.length();
        if len_product < 1e-15 {
            return 0.0;
        }
        (self.dot(other) / len_product).clamp(-1.0, 1.0).acos()
    }

    pub fn is_parallel_to(&self, other: &Self, angular_tol: f64) -> bool {
        let angle = self.angle_to(other);
        angle < angular_tol || (std::f64::consts::PI - angle) < angular_tol
    }

    pub fn is_perpendicular_to(&self, other: &Self, angular_tol: f64) -> bool {
        (self.angle_to(other) - std::f64::consts::FRAC_PI_2).abs() < angular_tol
    }

    /// Component of `self` orthogonal to the unit vector `normal`.
    pub fn reject_from(&self, normal: &Self) -> Self {
        *self - *normal * self.dot(normal)
    }

    /// Any unit vector orthogonal to `self`. `None` for the zero vector.
    pub fn any_perpendicular(&self) -> Option<Self> {
        let seed = if self.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        seed.cross(self).normalized()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A direction in a weld frame's 2D coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians from +x.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn perp_dot(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-15 {
            None
        } else {
            Some(*self * (1.0 / len))
        }
    }

    pub fn angle_to(&self, other: &Self) -> f64 {
        self.perp_dot(other).atan2(self.dot(other)).abs()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
