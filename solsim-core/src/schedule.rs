//! Per-day race and charging time windows.

use crate::imports::*;
use std::ops::Index;

/// One race day's windows, in absolute seconds on a common timebase.
///
/// Ordering invariant (validated by [`RaceSchedule::init`]):
/// `morning_charging_start < morning_charging_end <= race_start <=
/// race_end <= evening_charging_start < evening_charging_end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleDaySchedule {
    pub race_start_time: f64,
    pub race_end_time: f64,
    pub morning_charging_start_time: f64,
    pub morning_charging_end_time: f64,
    pub evening_charging_start_time: f64,
    pub evening_charging_end_time: f64,
}

/// The whole race calendar, indexed by day number starting at 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceSchedule(Vec<SingleDaySchedule>);

impl SerdeAPI for RaceSchedule {}
impl Init for RaceSchedule {
    fn init(&mut self) -> anyhow::Result<()> {
        for (d, day) in self.0.iter().enumerate() {
            ensure!(
                day.morning_charging_start_time < day.morning_charging_end_time
                    && day.morning_charging_end_time <= day.race_start_time
                    && day.race_start_time <= day.race_end_time
                    && day.race_end_time <= day.evening_charging_start_time
                    && day.evening_charging_start_time < day.evening_charging_end_time,
                "day {d}: charging/race windows are out of order"
            );
        }
        for (d, pair) in self.0.windows(2).enumerate() {
            ensure!(
                pair[1].race_start_time > pair[0].evening_charging_end_time,
                "day {}: race starts before day {d} finishes charging",
                d + 1
            );
        }
        Ok(())
    }
}

impl Index<usize> for RaceSchedule {
    type Output = SingleDaySchedule;
    fn index(&self, day: usize) -> &SingleDaySchedule {
        &self.0[day]
    }
}

impl RaceSchedule {
    pub fn new(days: Vec<SingleDaySchedule>) -> anyhow::Result<Self> {
        let mut schedule = Self(days);
        schedule.init()?;
        Ok(schedule)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn days(&self) -> &[SingleDaySchedule] {
        &self.0
    }
}
