//! Battery pack model: linear open-circuit voltage and internal-resistance
//! loss, plus the mutable per-run energy state.

use crate::imports::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// (Wh) pack energy capacity
    pub energy_capacity: f64,
    /// (Ω) lumped pack resistance
    pub pack_resistance: f64,
    /// (V) terminal voltage at 0% state of charge
    pub min_voltage: f64,
    /// (V) terminal voltage at 100% state of charge
    pub max_voltage: f64,
}

impl Battery {
    /// State of charge as the fraction of capacity remaining. Not clamped:
    /// stationary charging can push this past 1.
    pub fn state_of_charge(&self, energy_remaining: f64) -> f64 {
        energy_remaining / self.energy_capacity
    }

    /// (V) open-circuit voltage, linear in state of charge.
    pub fn current_voltage(&self, state_of_charge: f64) -> f64 {
        self.min_voltage + state_of_charge * (self.max_voltage - self.min_voltage)
    }

    /// (W) ohmic loss incurred moving `net_power_demanded` through the pack
    /// terminals at the given state of charge, or `None` when no physically
    /// realisable current can carry that power at this voltage.
    ///
    /// Solves `I²R ± IV ∓ P = 0` for the current magnitude: discharge takes
    /// the positive root of `V² + 4RP`; charge requires `V² - 4RP'` to stay
    /// non-negative, otherwise the terminals cannot absorb the requested
    /// power.
    pub fn power_loss(&self, net_power_demanded: f64, state_of_charge: f64) -> Option<f64> {
        let open_circuit_voltage = self.current_voltage(state_of_charge);
        let resistance = self.pack_resistance;

        let current = if net_power_demanded >= 0.0 {
            let discriminant = open_circuit_voltage * open_circuit_voltage
                + 4.0 * resistance * net_power_demanded;
            if discriminant < 0.0 {
                return None;
            }
            (-open_circuit_voltage + discriminant.sqrt()) / (2.0 * resistance)
        } else {
            let power_absorbed = -net_power_demanded;
            let discriminant =
                open_circuit_voltage * open_circuit_voltage - 4.0 * resistance * power_absorbed;
            if discriminant < 0.0 {
                return None;
            }
            (open_circuit_voltage - discriminant.sqrt()) / (2.0 * resistance)
        };

        Some(current * current * resistance)
    }
}

/// Energy remaining in the pack over one simulator run.
///
/// Deliberately unclamped in both directions: the race model lets stationary
/// charging exceed nominal capacity, and the runner checks for depletion
/// itself after each update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    energy_remaining: f64,
}

impl BatteryState {
    pub fn new(energy_capacity: f64) -> Self {
        Self {
            energy_remaining: energy_capacity,
        }
    }

    pub fn energy_remaining(&self) -> f64 {
        self.energy_remaining
    }

    /// Applies a (Wh) energy delta, positive for charge.
    pub fn update_energy_remaining(&mut self, delta: f64) {
        self.energy_remaining += delta;
    }
}
