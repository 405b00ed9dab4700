//! The solar car model: a flat aggregate of its fixed subsystems.

pub mod aerobody;
pub mod battery;
pub mod motor;
pub mod solar_array;
pub mod tire;

pub use aerobody::{Aerobody, ApparentWindVector, VelocityVector};
pub use battery::{Battery, BatteryState};
pub use motor::Motor;
pub use solar_array::SolarArray;
pub use tire::Tire;

use crate::imports::*;

/// All physical parameters of a car, loadable from a YAML/JSON file.
///
/// The subsystem set is fixed, so this is plain aggregate ownership with no
/// dispatch; one immutable instance is shared by every simulator run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarCar {
    pub aerobody: Aerobody,
    pub solar_array: SolarArray,
    pub battery: Battery,
    pub motor: Motor,
    pub tire: Tire,
    /// (kg) total vehicle mass including driver
    pub mass: f64,
    /// (m)
    pub wheel_radius: f64,
}

impl SerdeAPI for SolarCar {}
impl Init for SolarCar {
    fn init(&mut self) -> anyhow::Result<()> {
        ensure!(self.mass > 0.0, "car mass must be positive");
        ensure!(self.wheel_radius > 0.0, "wheel radius must be positive");
        ensure!(
            self.battery.energy_capacity > 0.0,
            "battery capacity must be positive"
        );
        ensure!(
            self.battery.pack_resistance > 0.0,
            "pack resistance must be positive"
        );
        ensure!(
            self.battery.min_voltage <= self.battery.max_voltage,
            "battery voltage bounds are inverted"
        );
        Ok(())
    }
}

impl SolarCar {
    /// A three-wheel demonstration car with plausible cruiser-class numbers,
    /// used as test data and as a CLI fallback.
    pub fn mock() -> Self {
        Self {
            aerobody: Aerobody {
                drag_coefficient: 0.12,
                frontal_area: 1.0,
            },
            solar_array: SolarArray {
                array_area: 4.0,
                array_efficiency: 24.0,
            },
            battery: Battery {
                energy_capacity: 5250.0,
                pack_resistance: 0.15,
                min_voltage: 96.0,
                max_voltage: 134.4,
            },
            motor: Motor {
                hysteresis_loss: 1.5,
                eddy_current_loss_coefficient: 0.003,
            },
            tire: Tire {
                alpha: -0.4,
                beta: 0.9,
                a: 0.3,
                b: 1e-4,
                c: 1e-6,
                tire_pressure_at_stc: 500.0,
            },
            mass: 300.0,
            wheel_radius: 0.26,
        }
    }
}
