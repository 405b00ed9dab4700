//! Search strategies over candidate race speeds, using the simulator as the
//! feasibility oracle.

use crate::imports::*;
use crate::route::Route;
use crate::schedule::RaceSchedule;
use crate::simrace::RaceRunner;
use crate::vehicle::SolarCar;
use crate::weather::Weather;

/// The best feasible result found by an optimizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutput {
    /// (s) total elapsed race time at `speed`
    pub racetime: f64,
    /// (m/s) the fastest feasible constant target speed found
    pub speed: f64,
}

impl SerdeAPI for OptimizationOutput {}
impl Init for OptimizationOutput {}

/// A search strategy over candidate speeds.
///
/// `Ok(None)` means the search exhausted its candidates without finding any
/// feasible speed.
pub trait Optimizer {
    fn optimize_race(&self) -> anyhow::Result<Option<OptimizationOutput>>;
}

/// Bisects the speed interval, assuming feasibility is monotone
/// non-increasing in speed.
///
/// Near day boundaries that assumption can break (a slightly faster car may
/// finish a segment inside the day and pick up a checkpoint dwell), so the
/// converged speed is re-verified and stepped back by one `precision` on
/// failure before giving up.
pub struct BinarySearchOptimizer<'a> {
    runner: RaceRunner<'a>,
    pub minimum_speed: f64,
    pub maximum_speed: f64,
    /// (m/s) convergence threshold on the bisection interval
    pub precision: f64,
}

impl<'a> BinarySearchOptimizer<'a> {
    pub fn new(
        car: &'a SolarCar,
        weather: &'a Weather,
        route: &'a Route,
        schedule: &'a RaceSchedule,
        minimum_speed: f64,
        maximum_speed: f64,
        precision: f64,
    ) -> Self {
        Self {
            runner: RaceRunner::new(car, route, weather, schedule),
            minimum_speed,
            maximum_speed,
            precision,
        }
    }
}

impl Optimizer for BinarySearchOptimizer<'_> {
    fn optimize_race(&self) -> anyhow::Result<Option<OptimizationOutput>> {
        ensure!(self.precision > 0.0, "precision must be positive");
        ensure!(
            self.minimum_speed > 0.0 && self.minimum_speed <= self.maximum_speed,
            "invalid speed bounds [{}, {}]",
            self.minimum_speed,
            self.maximum_speed
        );

        let mut low = self.minimum_speed;
        let mut high = self.maximum_speed;
        let mut best_speed = 0.0;
        let mut best_racetime = 0.0;

        while high - low > self.precision {
            let mid = (low + high) / 2.0;
            match self.runner.calculate_racetime(mid)? {
                Some(racetime) => {
                    log::debug!("speed {mid:.4} m/s feasible, racetime {racetime:.1} s");
                    best_speed = mid;
                    best_racetime = racetime;
                    low = mid;
                }
                None => {
                    log::debug!("speed {mid:.4} m/s infeasible");
                    high = mid;
                }
            }
        }

        if best_speed == 0.0 {
            return Ok(None);
        }

        // verification pass: the converged sample may have been a lucky mid
        // next to a day boundary
        if self.runner.calculate_racetime(best_speed)?.is_none() {
            best_speed -= self.precision;
            match self.runner.calculate_racetime(best_speed)? {
                Some(racetime) => best_racetime = racetime,
                None => return Ok(None),
            }
        }

        Ok(Some(OptimizationOutput {
            racetime: best_racetime,
            speed: best_speed,
        }))
    }
}

/// Sweeps the speed interval inclusively in fixed steps; the highest
/// feasible sample wins.
pub struct LinearSearchOptimizer<'a> {
    runner: RaceRunner<'a>,
    pub minimum_speed: f64,
    pub maximum_speed: f64,
    /// (m/s) sweep increment
    pub speed_step: f64,
}

impl<'a> LinearSearchOptimizer<'a> {
    pub fn new(
        car: &'a SolarCar,
        weather: &'a Weather,
        route: &'a Route,
        schedule: &'a RaceSchedule,
        minimum_speed: f64,
        maximum_speed: f64,
        speed_step: f64,
    ) -> Self {
        Self {
            runner: RaceRunner::new(car, route, weather, schedule),
            minimum_speed,
            maximum_speed,
            speed_step,
        }
    }
}

impl Optimizer for LinearSearchOptimizer<'_> {
    fn optimize_race(&self) -> anyhow::Result<Option<OptimizationOutput>> {
        ensure!(self.speed_step > 0.0, "speed step must be positive");
        ensure!(
            self.minimum_speed > 0.0 && self.minimum_speed <= self.maximum_speed,
            "invalid speed bounds [{}, {}]",
            self.minimum_speed,
            self.maximum_speed
        );

        let mut best: Option<OptimizationOutput> = None;

        let mut speed = self.minimum_speed;
        while speed <= self.maximum_speed {
            if let Some(racetime) = self.runner.calculate_racetime(speed)? {
                best = Some(OptimizationOutput { racetime, speed });
            }
            speed += self.speed_step;
        }

        Ok(best)
    }
}
