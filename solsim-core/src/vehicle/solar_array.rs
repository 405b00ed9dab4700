//! Photovoltaic array electrical output.

use crate::imports::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarArray {
    /// (m²) active cell area
    pub array_area: f64,
    /// (%) cell efficiency, as a percentage
    pub array_efficiency: f64,
}

impl SolarArray {
    /// (W) electrical power from the given global horizontal irradiance (W/m²).
    pub fn power_in(&self, irradiance: f64) -> f64 {
        self.array_area * (self.array_efficiency / 100.0) * irradiance
    }
}
