//! Planar velocity vectors and the aerodynamic body model.

use crate::imports::*;
use std::f64::consts::TAU;

/// A 2-D planar velocity in the route's north/east frame.
///
/// Heading convention: 0 rad is due north, π/2 rad is due east.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityVector {
    /// (m/s) north-south component
    north_south: f64,
    /// (m/s) east-west component
    east_west: f64,
}

impl VelocityVector {
    pub fn from_cartesian_components(north_south: f64, east_west: f64) -> Self {
        Self {
            north_south,
            east_west,
        }
    }

    /// Constructs a velocity vector from polar form.
    ///
    /// # Arguments
    /// - `speed`: (m/s) magnitude
    /// - `heading`: (rad) direction, 0 due north, π/2 due east
    pub fn from_polar_components(speed: f64, heading: f64) -> Self {
        Self {
            north_south: speed * heading.cos(),
            east_west: speed * heading.sin(),
        }
    }

    pub fn north_south(&self) -> f64 {
        self.north_south
    }

    pub fn east_west(&self) -> f64 {
        self.east_west
    }

    pub fn magnitude(&self) -> f64 {
        (self.north_south * self.north_south + self.east_west * self.east_west).sqrt()
    }

    /// Heading in `[0, 2π)`, 0 due north, π/2 due east.
    pub fn heading(&self) -> f64 {
        let angle = self.east_west.atan2(self.north_south);
        if angle < 0.0 {
            angle + TAU
        } else {
            angle
        }
    }

    /// Signed angle in `[-π, π]` from `self` to `other`.
    ///
    /// Negative when `other` lies to port of this vector; exactly 0 when
    /// either vector has zero magnitude.
    pub fn angle_between(&self, other: &Self) -> f64 {
        if self.magnitude() == 0.0 || other.magnitude() == 0.0 {
            return 0.0;
        }
        f64::atan2(
            self.east_west * other.north_south - self.north_south * other.east_west,
            self.north_south * other.north_south + self.east_west * other.east_west,
        )
    }
}

/// An apparent wind vector in its traditional polar coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApparentWindVector {
    /// (m/s) apparent wind speed
    pub speed: f64,
    /// (rad) yaw from the car's heading; positive yaw is starboard
    pub yaw: f64,
}

/// Aerodynamic body parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aerobody {
    pub drag_coefficient: f64,
    /// (m²)
    pub frontal_area: f64,
}

impl Aerobody {
    /// Computes the apparent wind seen by a car moving at `car_velocity`.
    ///
    /// `reported_wind` follows the meteorological "from" convention: the
    /// wind comes from the reported direction. Yaw in the output is the
    /// signed angle from the car's heading to the direction the apparent
    /// wind comes from.
    pub fn get_wind(
        reported_wind: &VelocityVector,
        car_velocity: &VelocityVector,
    ) -> ApparentWindVector {
        let true_wind = VelocityVector::from_cartesian_components(
            -reported_wind.north_south(),
            -reported_wind.east_west(),
        );

        let apparent_wind_velocity = VelocityVector::from_cartesian_components(
            true_wind.north_south() - car_velocity.north_south(),
            true_wind.east_west() - car_velocity.east_west(),
        );

        // where the wind appears to come from, in the car's frame
        let apparent_wind_direction = VelocityVector::from_cartesian_components(
            -apparent_wind_velocity.north_south(),
            -apparent_wind_velocity.east_west(),
        );

        ApparentWindVector {
            speed: apparent_wind_velocity.magnitude(),
            yaw: car_velocity.angle_between(&apparent_wind_direction),
        }
    }

    /// (N) aerodynamic drag from the apparent wind.
    ///
    /// Only the component of the apparent wind opposing the car is used;
    /// the attenuation is cos²(yaw), matching the race model's calibration.
    pub fn aerodynamic_drag(&self, apparent_wind: &ApparentWindVector, air_density: f64) -> f64 {
        let wind_component = apparent_wind.speed * apparent_wind.yaw.cos();
        0.5 * air_density * wind_component * wind_component * self.drag_coefficient
            * self.frontal_area
    }
}
