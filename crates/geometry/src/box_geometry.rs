//! Global simulation box: edge lengths, periodicity and minimum-image rule

use crate::error::{Error, Result};
use crate::DIM;

/// The global, axis-aligned simulation box with its lower corner at the
/// origin.
///
/// `length_inverse` is cached next to `length` and the two are only ever
/// updated together through [`BoxGeometry::set_length`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGeometry {
    length: [f64; 3],
    length_inverse: [f64; 3],
    periodic: [bool; 3],
}

impl Default for BoxGeometry {
    /// Unit box, periodic along every axis.
    fn default() -> Self {
        Self {
            length: [1.0; 3],
            length_inverse: [1.0; 3],
            periodic: [true; 3],
        }
    }
}

impl BoxGeometry {
    /// Create a box with the given edge lengths and periodicity flags.
    pub fn new(length: [f64; 3], periodic: [bool; 3]) -> Result<Self> {
        let mut geometry = Self {
            periodic,
            ..Self::default()
        };
        geometry.set_length(length)?;
        Ok(geometry)
    }

    /// Edge lengths of the box.
    pub fn length(&self) -> [f64; 3] {
        self.length
    }

    /// Component-wise inverse of the edge lengths.
    pub fn length_inverse(&self) -> [f64; 3] {
        self.length_inverse
    }

    /// Periodicity flags, one per axis.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Whether `axis` wraps around. Axes past the third never do.
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic.get(axis).copied().unwrap_or(false)
    }

    /// Box volume.
    pub fn volume(&self) -> f64 {
        self.length.iter().product()
    }

    /// Replace the edge lengths.
    ///
    /// Fails with [`Error::InvalidGeometry`] and leaves the box untouched if
    /// any component is not a positive finite number.
    pub fn set_length(&mut self, length: [f64; 3]) -> Result<()> {
        validate_length(length)?;
        self.length = length;
        for axis in 0..DIM {
            self.length_inverse[axis] = 1.0 / length[axis];
        }
        Ok(())
    }

    /// Replace all three periodicity flags.
    pub fn set_periodicity(&mut self, periodic: [bool; 3]) {
        self.periodic = periodic;
    }

    /// Displacement from `b` to `a` under the minimum-image convention.
    ///
    /// Periodic axes are reduced to the nearest image, i.e. into
    /// `[-L/2, L/2]`; non-periodic axes return the plain difference.
    /// The result is exactly antisymmetric in its arguments.
    pub fn minimum_image_vector(&self, a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
        let mut d = [0.0; 3];
        for axis in 0..DIM {
            let diff = a[axis] - b[axis];
            d[axis] = if self.is_periodic(axis) {
                // round() is symmetric about zero, which keeps f(-d) == -f(d)
                diff - self.length[axis] * (diff * self.length_inverse[axis]).round()
            } else {
                diff
            };
        }
        d
    }

    /// Fold a position into the primary box along every periodic axis.
    ///
    /// Returns the folded position (in `[0, L)` on periodic axes) and the
    /// number of box lengths that were removed per axis.
    pub fn fold_position(&self, position: [f64; 3]) -> ([f64; 3], [i32; 3]) {
        let mut folded = position;
        let mut image = [0_i32; 3];
        for axis in 0..DIM {
            if !self.is_periodic(axis) {
                continue;
            }
            let l = self.length[axis];
            let mut shift = (position[axis] * self.length_inverse[axis]).floor();
            let mut x = position[axis] - shift * l;
            if x < 0.0 {
                x += l;
                shift -= 1.0;
            }
            if x >= l {
                x -= l;
                shift += 1.0;
            }
            folded[axis] = x;
            image[axis] = shift as i32;
        }
        (folded, image)
    }
}

/// Check that every box length component is positive and finite.
pub fn validate_length(length: [f64; 3]) -> Result<()> {
    if length.iter().all(|&l| l.is_finite() && l > 0.0) {
        Ok(())
    } else {
        Err(Error::InvalidGeometry { length })
    }
}
