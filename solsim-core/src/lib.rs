//! Core crate for the solsim race-strategy simulator.
//!
//! Given a solar car's physical parameters, a discretized route, gridded
//! weather, and a per-day racing schedule, solsim searches over candidate
//! constant target speeds and reports the highest speed at which the car can
//! finish the route without depleting its battery, together with the total
//! elapsed race time at that speed.
//!
//! The main entry points are [`optimizer::BinarySearchOptimizer`] and
//! [`optimizer::LinearSearchOptimizer`], both of which drive
//! [`simrace::RaceRunner`] as their feasibility oracle.

#[macro_use]
pub mod macros;

pub mod imports;
pub mod optimizer;
pub mod prelude;
pub mod route;
pub mod schedule;
pub mod simrace;
pub mod solar_position;
pub mod traits;
pub mod utils;
pub mod vehicle;
pub mod weather;
