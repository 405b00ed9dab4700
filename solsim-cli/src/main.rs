//! Command-line front end for the solsim race-strategy simulator.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use solsim_core::optimizer::{
    BinarySearchOptimizer, LinearSearchOptimizer, OptimizationOutput, Optimizer,
};
use solsim_core::route::Route;
use solsim_core::schedule::RaceSchedule;
use solsim_core::solar_position::solar_position;
use solsim_core::traits::SerdeAPI;
use solsim_core::vehicle::SolarCar;
use solsim_core::weather::Weather;

#[derive(Parser, Debug)]
#[command(name = "solsim")]
#[command(about = "Finds the fastest feasible constant speed for a solar race car")]
#[command(version)]
struct Args {
    /// Path to the route CSV
    #[arg(long)]
    route: PathBuf,

    /// Path(s) to weather CSV files; repeat for multi-surface weather
    #[arg(long, required = true)]
    weather: Vec<PathBuf>,

    /// Path to the race schedule (yaml or json)
    #[arg(long)]
    schedule: PathBuf,

    /// Path to the car parameter file (yaml or json)
    #[arg(long)]
    car: PathBuf,

    /// Search strategy over candidate speeds
    #[arg(long, value_enum, default_value = "binary")]
    optimizer: OptimizerKind,

    /// (m/s) lower bound of the candidate speed interval
    #[arg(long, default_value_t = 5.0)]
    min_speed: f64,

    /// (m/s) upper bound of the candidate speed interval
    #[arg(long, default_value_t = 40.0)]
    max_speed: f64,

    /// (m/s) binary-search convergence threshold
    #[arg(long, default_value_t = 0.01)]
    precision: f64,

    /// (m/s) linear-search sweep increment
    #[arg(long, default_value_t = 0.5)]
    speed_step: f64,

    /// Emit the result as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OptimizerKind {
    Binary,
    Linear,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("no feasible speed in the requested interval");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether a feasible speed was found.
fn run(args: Args) -> anyhow::Result<bool> {
    let car = SolarCar::from_file(&args.car)
        .with_context(|| format!("loading car file {:?}", args.car))?;
    let schedule = RaceSchedule::from_file(&args.schedule)
        .with_context(|| format!("loading schedule file {:?}", args.schedule))?;
    let route = Route::from_file(&args.route)?;
    let weather = Weather::from_files(&args.weather, route.weather_stations())?;

    if schedule.is_empty() {
        bail!("schedule file {:?} contains no race days", args.schedule);
    }

    let output = match args.optimizer {
        OptimizerKind::Binary => BinarySearchOptimizer::new(
            &car,
            &weather,
            &route,
            &schedule,
            args.min_speed,
            args.max_speed,
            args.precision,
        )
        .optimize_race()?,
        OptimizerKind::Linear => LinearSearchOptimizer::new(
            &car,
            &weather,
            &route,
            &schedule,
            args.min_speed,
            args.max_speed,
            args.speed_step,
        )
        .optimize_race()?,
    };

    let Some(output) = output else {
        return Ok(false);
    };

    if args.json {
        println!("{}", output.to_json()?);
    } else {
        println!(
            "best speed: {:.3} m/s ({:.1} km/h)",
            output.speed,
            output.speed * 3.6
        );
        println!(
            "race time:  {:.1} s ({})",
            output.racetime,
            format_duration(output.racetime)
        );
        report_finish_sun(&route, &weather, &schedule, &output);
    }

    Ok(true)
}

/// Prints where the sun sits over the finish line at the estimated finish
/// clock time. Best effort; reporting only.
fn report_finish_sun(
    route: &Route,
    weather: &Weather,
    schedule: &RaceSchedule,
    output: &OptimizationOutput,
) {
    let finish_clock = estimate_finish_clock(schedule, output.racetime);
    let last = &route[route.len() - 1];
    let (air_temp, pressure) = weather
        .get_weather_at(last.weather_station, finish_clock)
        .map(|wx| (Some(wx.air_temp), Some(wx.pressure)))
        .unwrap_or((None, None));
    let sun = solar_position(last.coordinate_end, finish_clock, air_temp, pressure);
    let deg = 180.0 / std::f64::consts::PI;
    println!(
        "finish sun: elevation {:.1} deg, azimuth {:.1} deg",
        90.0 - sun.zenith * deg,
        sun.azimuth * deg
    );
}

/// Maps accumulated racetime onto the wall clock by folding it over the
/// daily race windows.
fn estimate_finish_clock(schedule: &RaceSchedule, racetime: f64) -> f64 {
    let mut remaining = racetime;
    for day in schedule.days() {
        let window = day.race_end_time - day.race_start_time;
        if remaining <= window {
            return day.race_start_time + remaining;
        }
        remaining -= window;
    }
    schedule[schedule.len() - 1].race_end_time
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    format!("{h}h {m:02}m {s:02}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use solsim_core::schedule::SingleDaySchedule;

    fn schedule() -> RaceSchedule {
        let mk = |offset: f64| SingleDaySchedule {
            morning_charging_start_time: offset + 28_800.0,
            morning_charging_end_time: offset + 32_400.0,
            race_start_time: offset + 32_400.0,
            race_end_time: offset + 61_200.0,
            evening_charging_start_time: offset + 61_200.0,
            evening_charging_end_time: offset + 72_000.0,
        };
        RaceSchedule::new(vec![mk(0.0), mk(86_400.0)]).unwrap()
    }

    #[test]
    fn test_estimate_finish_clock() {
        let schedule = schedule();
        // fits in day 0
        assert_eq!(estimate_finish_clock(&schedule, 1000.0), 33_400.0);
        // spills into day 1
        let clock = estimate_finish_clock(&schedule, 30_000.0);
        assert_eq!(clock, 86_400.0 + 32_400.0 + 1200.0);
        // longer than all windows clamps to the last race end
        assert_eq!(
            estimate_finish_clock(&schedule, 1e9),
            86_400.0 + 61_200.0
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(15_000.0), "4h 10m 00s");
        assert_eq!(format_duration(59.4), "0h 00m 59s");
    }
}
