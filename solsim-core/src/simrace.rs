//! The race simulator: per-segment power composition and the whole-race
//! time/energy state machine.

use crate::imports::*;
use crate::route::{Route, RouteSegment, SegmentEndCondition};
use crate::schedule::RaceSchedule;
use crate::vehicle::{Aerobody, BatteryState, SolarCar, VelocityVector};
use crate::weather::{Weather, WeatherDataPoint};

/// (s) integration step for stationary charging windows.
pub const STATIC_CHARGING_TIME_INCREMENT: f64 = 300.0;

/// (s) mandatory dwell at every control stop reached while the race day is
/// still open.
pub const CHECKPOINT_DURATION: f64 = 1800.0;

/// Composes the physics laws over a single segment at a constant speed.
pub struct SegmentRunner<'a> {
    car: &'a SolarCar,
}

impl<'a> SegmentRunner<'a> {
    pub fn new(car: &'a SolarCar) -> Self {
        Self { car }
    }

    /// (N) total force resisting the car on this segment at `speed`.
    pub fn calculate_resistive_force(
        &self,
        segment: &RouteSegment,
        weather_data: &WeatherDataPoint,
        speed: f64,
    ) -> f64 {
        // three-wheel car: the load splits evenly across the tires
        let tire_load = (self.car.mass / 3.0) * segment.gravity;
        let rolling_resistance = 3.0 * self.car.tire.rolling_resistance(tire_load, speed, None);

        let car_velocity = VelocityVector::from_polar_components(speed, segment.heading);
        let apparent_wind = Aerobody::get_wind(&weather_data.wind, &car_velocity);
        let aero_drag = self
            .car
            .aerobody
            .aerodynamic_drag(&apparent_wind, weather_data.air_density);

        let gravitational_force =
            self.car.mass * segment.gravity_times_sine_road_incline_angle;

        rolling_resistance + aero_drag + gravitational_force
    }

    /// (W) electrical power the motor draws to hold `speed` on this segment.
    pub fn calculate_power_out(
        &self,
        segment: &RouteSegment,
        weather_data: &WeatherDataPoint,
        speed: f64,
    ) -> f64 {
        let resistive_force = self.calculate_resistive_force(segment, weather_data, speed);
        let angular_speed = speed / self.car.wheel_radius;
        let torque = resistive_force * self.car.wheel_radius;
        self.car.motor.power_consumed(angular_speed, torque)
    }

    /// (W) array power available under this weather.
    pub fn calculate_power_in(&self, weather_data: &WeatherDataPoint) -> f64 {
        self.car.solar_array.power_in(weather_data.irradiance)
    }

    /// (W) net battery power, charging-positive, or `None` when the pack
    /// cannot carry the demanded power at this state of charge.
    pub fn calculate_power_net(
        &self,
        segment: &RouteSegment,
        weather_data: &WeatherDataPoint,
        state_of_charge: f64,
        speed: f64,
    ) -> Option<f64> {
        let power_in = self.calculate_power_in(weather_data);
        let power_out = self.calculate_power_out(segment, weather_data, speed);
        let net_power_demanded = power_out - power_in;

        let battery_loss = self
            .car
            .battery
            .power_loss(net_power_demanded, state_of_charge)?;

        // demand plus loss is what actually leaves the pack; negate so that
        // a positive result charges the battery
        Some(-(net_power_demanded + battery_loss))
    }
}

/// Walks the whole route against the schedule, integrating battery energy.
pub struct RaceRunner<'a> {
    car: &'a SolarCar,
    route: &'a Route,
    weather: &'a Weather,
    schedule: &'a RaceSchedule,
}

impl<'a> RaceRunner<'a> {
    pub fn new(
        car: &'a SolarCar,
        route: &'a Route,
        weather: &'a Weather,
        schedule: &'a RaceSchedule,
    ) -> Self {
        Self {
            car,
            route,
            weather,
            schedule,
        }
    }

    /// (Wh) energy gained by charging stationary at `weather_station` over
    /// `[start_time, end_time]`, integrated in
    /// [`STATIC_CHARGING_TIME_INCREMENT`] steps with the last step clipped.
    pub fn calculate_static_charging_gain(
        &self,
        weather_station: f64,
        start_time: f64,
        end_time: f64,
    ) -> anyhow::Result<f64> {
        let mut total_energy = 0.0;

        let mut current_time = start_time;
        while current_time < end_time {
            let time_end = (current_time + STATIC_CHARGING_TIME_INCREMENT).min(end_time);
            let time_delta = time_end - current_time;

            let weather_data = self
                .weather
                .get_weather_during(weather_station, current_time, time_end)
                .with_context(|| format_dbg!(weather_station))?;
            let power = self.car.solar_array.power_in(weather_data.irradiance);
            total_energy += power * time_delta / 3600.0;

            current_time += STATIC_CHARGING_TIME_INCREMENT;
        }

        Ok(total_energy)
    }

    /// Simulates the race at a constant target `speed`.
    ///
    /// Returns `Ok(Some(total_racetime_s))` when the car finishes,
    /// `Ok(None)` when the run is infeasible (battery depleted, pack limits
    /// exceeded, or the schedule runs out of days), and `Err` only for
    /// weather queries outside the known timebase.
    pub fn calculate_racetime(&self, speed: f64) -> anyhow::Result<Option<f64>> {
        ensure!(speed > 0.0, "candidate speed must be positive, got {speed}");
        ensure!(!self.schedule.is_empty(), "race schedule has no days");

        let mut battery_state = BatteryState::new(self.car.battery.energy_capacity);
        let runner = SegmentRunner::new(self.car);

        let mut total_racetime = 0.0;
        let mut current_segment_index = 0;
        let total_segments = self.route.len();
        let mut remaining_segment_distance = 0.0;

        let mut current_day = 0;
        let mut current_time = self.schedule[0].race_start_time;

        while current_segment_index < total_segments {
            let segment = &self.route[current_segment_index];
            let today = self.schedule[current_day];

            // a positive remainder means this segment was split at day end;
            // it is consumed here and not restored if the day also ends now
            let segment_distance = if remaining_segment_distance > 0.0 {
                remaining_segment_distance
            } else {
                segment.distance
            };
            remaining_segment_distance = 0.0;

            if current_time >= today.race_end_time {
                let evening_charging_gain = self.calculate_static_charging_gain(
                    segment.weather_station,
                    today.evening_charging_start_time,
                    today.evening_charging_end_time,
                )?;
                battery_state.update_energy_remaining(evening_charging_gain);

                current_day += 1;
                if current_day >= self.schedule.len() {
                    log::debug!("race not finished within {} days", self.schedule.len());
                    return Ok(None);
                }
                let tomorrow = self.schedule[current_day];

                let morning_charging_gain = self.calculate_static_charging_gain(
                    segment.weather_station,
                    tomorrow.morning_charging_start_time,
                    tomorrow.morning_charging_end_time,
                )?;
                battery_state.update_energy_remaining(morning_charging_gain);

                current_time = tomorrow.race_start_time;
                continue;
            }

            let mut segment_time = segment_distance / speed;
            let mut segment_end_time = current_time + segment_time;

            // the day ends mid-segment: drive what fits and carry the rest
            if segment_end_time > today.race_end_time {
                let time_available = today.race_end_time - current_time;
                let distance_driven = speed * time_available;
                remaining_segment_distance = segment_distance - distance_driven;

                segment_time = time_available;
                segment_end_time = today.race_end_time;
            }

            let weather_data = self
                .weather
                .get_weather_during(segment.weather_station, current_time, segment_end_time)
                .with_context(|| format_dbg!(current_segment_index))?;
            let state_of_charge = self
                .car
                .battery
                .state_of_charge(battery_state.energy_remaining());

            let net_power = match runner.calculate_power_net(
                segment,
                &weather_data,
                state_of_charge,
                speed,
            ) {
                Some(power) => power,
                None => return Ok(None),
            };

            let energy_change = net_power * segment_time / 3600.0;
            battery_state.update_energy_remaining(energy_change);
            if battery_state.energy_remaining() < 0.0 {
                return Ok(None);
            }

            total_racetime += segment_time;
            current_time = segment_end_time;

            // control-stop dwell; not clipped against race end, so an
            // overshoot surfaces as day-end handling on the next iteration
            if remaining_segment_distance == 0.0
                && segment.end_condition == SegmentEndCondition::ControlStop
                && current_time < today.race_end_time
            {
                let checkpoint_energy = self.calculate_static_charging_gain(
                    segment.weather_station,
                    current_time,
                    current_time + CHECKPOINT_DURATION,
                )?;
                battery_state.update_energy_remaining(checkpoint_energy);

                total_racetime += CHECKPOINT_DURATION;
                current_time += CHECKPOINT_DURATION;
            }

            if remaining_segment_distance == 0.0 {
                current_segment_index += 1;
            }
        }

        Ok(Some(total_racetime))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::route::{GeographicalCoordinate, SegmentType};
    use crate::schedule::SingleDaySchedule;
    use crate::utils::almost_eq;
    use crate::vehicle::{Battery, Motor, SolarArray, Tire};

    pub(crate) fn flat_segment(
        distance: f64,
        end_condition: SegmentEndCondition,
    ) -> RouteSegment {
        RouteSegment {
            coordinate_start: GeographicalCoordinate::default(),
            coordinate_end: GeographicalCoordinate::default(),
            end_condition,
            segment_type: SegmentType::Race,
            speed_limit: 33.3,
            weather_station: 0.0,
            distance,
            heading: 0.0,
            elevation: 0.0,
            grade: 0.0,
            road_incline_angle: 0.0,
            sine_road_incline_angle: 0.0,
            gravity: 9.81,
            gravity_times_sine_road_incline_angle: 0.0,
        }
    }

    pub(crate) fn flat_route(num_segments: usize, control_stop_at: Option<usize>) -> Route {
        let segments = (0..num_segments)
            .map(|i| {
                let end_condition = if control_stop_at == Some(i) {
                    SegmentEndCondition::ControlStop
                } else {
                    SegmentEndCondition::None
                };
                flat_segment(3000.0, end_condition)
            })
            .collect();
        Route::new(segments)
    }

    pub(crate) fn two_day_schedule() -> RaceSchedule {
        let day = 86_400.0;
        let mk = |offset: f64| SingleDaySchedule {
            morning_charging_start_time: offset + 8.0 * 3600.0,
            morning_charging_end_time: offset + 9.0 * 3600.0,
            race_start_time: offset + 9.0 * 3600.0,
            race_end_time: offset + 17.0 * 3600.0,
            evening_charging_start_time: offset + 17.0 * 3600.0,
            evening_charging_end_time: offset + 20.0 * 3600.0,
        };
        RaceSchedule::new(vec![mk(0.0), mk(day)]).unwrap()
    }

    pub(crate) fn constant_weather(ghi: f64) -> Weather {
        let value = WeatherDataPoint {
            wind: VelocityVector::from_cartesian_components(0.0, 0.0),
            irradiance: ghi,
            air_temp: 25.0,
            pressure: 101.3,
            air_density: 1.225,
            reciprocal_speed_of_sound: crate::weather::RECIPROCAL_SPEED_OF_SOUND,
        };
        // cover both race days with slack on each side
        Weather::constant(&value, &[0.0], 0.0, 300_000.0).unwrap()
    }

    fn s1_car() -> SolarCar {
        SolarCar {
            aerobody: crate::vehicle::Aerobody {
                drag_coefficient: 0.00541143,
                frontal_area: 3.42548,
            },
            solar_array: SolarArray {
                array_area: 4.63645,
                array_efficiency: 22.3886,
            },
            battery: Battery {
                energy_capacity: 6105.03,
                pack_resistance: 0.660223,
                min_voltage: 71.3779,
                max_voltage: 148.606,
            },
            motor: Motor {
                hysteresis_loss: 2.86961,
                eddy_current_loss_coefficient: 0.00171711,
            },
            tire: Tire {
                alpha: -8.77003,
                beta: 7.68916,
                a: 5.65872,
                b: -7.02049e-6,
                c: 0.175593,
                tire_pressure_at_stc: 181.903,
            },
            mass: 159.339,
            wheel_radius: 0.374048,
        }
    }

    #[test]
    fn test_resistive_force_known_value() {
        let car = s1_car();
        let runner = SegmentRunner::new(&car);
        let mut segment = flat_segment(1000.0, SegmentEndCondition::None);
        segment.heading = 5.18201;
        segment.gravity = 9.80449;
        segment.gravity_times_sine_road_incline_angle = -3.84563;
        let weather_data = WeatherDataPoint {
            wind: VelocityVector::from_polar_components(13.8307, 3.90525),
            irradiance: 215.042,
            air_temp: 25.0,
            pressure: 101.3,
            air_density: 1.20163,
            reciprocal_speed_of_sound: crate::weather::RECIPROCAL_SPEED_OF_SOUND,
        };
        let force = runner.calculate_resistive_force(&segment, &weather_data, 19.459);
        assert!(
            almost_eq(force, 29945.2, Some(1e-3)),
            "resistive force {force}"
        );
    }

    #[test]
    fn test_power_composition() {
        let car = SolarCar::mock();
        let runner = SegmentRunner::new(&car);
        let segment = flat_segment(3000.0, SegmentEndCondition::None);
        let weather_data = WeatherDataPoint {
            wind: VelocityVector::from_cartesian_components(0.0, 0.0),
            irradiance: 600.0,
            air_temp: 25.0,
            pressure: 101.3,
            air_density: 1.225,
            reciprocal_speed_of_sound: crate::weather::RECIPROCAL_SPEED_OF_SOUND,
        };
        let force = runner.calculate_resistive_force(&segment, &weather_data, 20.0);
        assert!(almost_eq(force, 67.8347571450, Some(1e-8)));
        let power_out = runner.calculate_power_out(&segment, &weather_data, 20.0);
        assert!(almost_eq(power_out, 1358.4259121302, Some(1e-8)));
        assert!(almost_eq(
            runner.calculate_power_in(&weather_data),
            576.0,
            None
        ));
        // net is charging-positive: this demand discharges the pack
        let net = runner
            .calculate_power_net(&segment, &weather_data, 1.0, 20.0)
            .unwrap();
        assert!(net < 0.0);
        assert!(net > -(power_out - 576.0) - 10.0);
    }

    #[test]
    fn test_power_net_infeasible_on_charge_limit() {
        // steep downhill regen far beyond what the pack can absorb
        let mut car = SolarCar::mock();
        car.battery.pack_resistance = 5.0;
        let runner = SegmentRunner::new(&car);
        let mut segment = flat_segment(3000.0, SegmentEndCondition::None);
        segment.gravity_times_sine_road_incline_angle = -3.0;
        let weather_data = WeatherDataPoint {
            wind: VelocityVector::from_cartesian_components(0.0, 0.0),
            irradiance: 0.0,
            air_temp: 25.0,
            pressure: 101.3,
            air_density: 1.225,
            reciprocal_speed_of_sound: crate::weather::RECIPROCAL_SPEED_OF_SOUND,
        };
        assert!(runner
            .calculate_power_net(&segment, &weather_data, 0.5, 20.0)
            .is_none());
    }

    #[test]
    fn test_static_charging_gain_constant_sun() {
        let car = SolarCar::mock();
        let route = flat_route(1, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        // 4 m² * 24% * 600 W/m² = 576 W for one hour
        let gain = runner
            .calculate_static_charging_gain(0.0, 1000.0, 4600.0)
            .unwrap();
        assert!(almost_eq(gain, 576.0, None));
        // clipped final step
        let gain = runner
            .calculate_static_charging_gain(0.0, 1000.0, 1450.0)
            .unwrap();
        assert!(almost_eq(gain, 72.0, None));
        // empty window
        let gain = runner
            .calculate_static_charging_gain(0.0, 1000.0, 1000.0)
            .unwrap();
        assert_eq!(gain, 0.0);
    }

    #[test]
    fn test_racetime_single_day_flat() {
        let car = SolarCar::mock();
        let route = flat_route(100, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        // 300 km at 20 m/s fits inside one 8 h race day
        let racetime = runner.calculate_racetime(20.0).unwrap().unwrap();
        assert!(almost_eq(racetime, 15_000.0, None));
    }

    #[test]
    fn test_racetime_control_stop_adds_dwell() {
        let car = SolarCar::mock();
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();

        let plain = flat_route(100, None);
        let with_stop = flat_route(100, Some(49));
        let base = RaceRunner::new(&car, &plain, &weather, &schedule)
            .calculate_racetime(20.0)
            .unwrap()
            .unwrap();
        let stopped = RaceRunner::new(&car, &with_stop, &weather, &schedule)
            .calculate_racetime(20.0)
            .unwrap()
            .unwrap();
        assert!(almost_eq(stopped - base, CHECKPOINT_DURATION, None));
    }

    #[test]
    fn test_racetime_crosses_day_boundary() {
        let car = SolarCar::mock();
        let route = flat_route(100, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        // 10 m/s: 30000 s of driving across both days; day breaks add no
        // racetime of their own
        let racetime = runner.calculate_racetime(10.0).unwrap().unwrap();
        assert!(almost_eq(racetime, 30_000.0, None));
    }

    #[test]
    fn test_day_end_split_restarts_segment() {
        let car = SolarCar::mock();
        let route = flat_route(100, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        // at 6 m/s the day ends with 1200 m of segment 57 left; the
        // remainder is consumed by the day-end branch and the segment
        // restarts in full next morning, costing 300 s over the ideal 50000
        let racetime = runner.calculate_racetime(6.0).unwrap().unwrap();
        assert!(almost_eq(racetime, 50_300.0, None));
    }

    #[test]
    fn test_racetime_out_of_days() {
        let car = SolarCar::mock();
        let route = flat_route(100, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        // 4 m/s cannot cover 300 km in two 8 h windows
        assert!(runner.calculate_racetime(4.0).unwrap().is_none());
    }

    #[test]
    fn test_racetime_depletes_battery() {
        let mut car = SolarCar::mock();
        // tiny pack, no sun: the pack drains mid-route
        car.battery.energy_capacity = 50.0;
        let route = flat_route(100, None);
        let weather = constant_weather(0.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        assert!(runner.calculate_racetime(20.0).unwrap().is_none());
    }

    #[test]
    fn test_racetime_rejects_bad_inputs() {
        let car = SolarCar::mock();
        let route = flat_route(1, None);
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        assert!(runner.calculate_racetime(0.0).is_err());
        assert!(runner.calculate_racetime(-5.0).is_err());
    }

    #[test]
    fn test_determinism() {
        let car = SolarCar::mock();
        let route = flat_route(100, Some(49));
        let weather = constant_weather(600.0);
        let schedule = two_day_schedule();
        let runner = RaceRunner::new(&car, &route, &weather, &schedule);
        let a = runner.calculate_racetime(11.7).unwrap();
        let b = runner.calculate_racetime(11.7).unwrap();
        assert_eq!(a, b);
    }
}
