//! SAE-J2452-style tire rolling-resistance model.

use crate::imports::*;

/// Rolling-resistance coefficients fitted per SAE J2452.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tire {
    pub alpha: f64,
    pub beta: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// (kPa) inflation pressure at standard test conditions
    pub tire_pressure_at_stc: f64,
}

impl Tire {
    /// (N) rolling resistance of a single tire.
    ///
    /// `tire_load` is the per-tire vertical force in N; `vehicle_speed` is
    /// in m/s (the J2452 fit itself runs in km/h). When `tire_pressure` is
    /// `None` the STC inflation pressure is used.
    pub fn rolling_resistance(
        &self,
        tire_load: f64,
        vehicle_speed: f64,
        tire_pressure: Option<f64>,
    ) -> f64 {
        let pressure = tire_pressure.unwrap_or(self.tire_pressure_at_stc);
        let vehicle_speed_kmh = vehicle_speed * 3.6;

        let pressure_term = pressure.powf(self.alpha);
        let load_term = tire_load.powf(self.beta);
        let speed_term =
            self.a + self.b * vehicle_speed_kmh + self.c * vehicle_speed_kmh * vehicle_speed_kmh;

        pressure_term * load_term * speed_term
    }
}
