//! In-wheel motor power model.

use crate::imports::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    /// (W) constant hysteresis loss
    pub hysteresis_loss: f64,
    /// (W per rad/s) eddy-current loss coefficient
    pub eddy_current_loss_coefficient: f64,
}

impl Motor {
    /// (W) electrical power drawn to produce `torque` at `angular_speed`.
    ///
    /// Negative torque (regenerative braking) yields negative mechanical
    /// power; the iron losses stay additive.
    pub fn power_consumed(&self, angular_speed: f64, torque: f64) -> f64 {
        let mechanical_power = angular_speed * torque;
        let eddy_current_loss = self.eddy_current_loss_coefficient * angular_speed;

        mechanical_power + self.hysteresis_loss + eddy_current_loss
    }
}
