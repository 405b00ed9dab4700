//! Gridded weather: CSV ingestion, bilinear (time x station) interpolation,
//! and the binary cache sidecar.

use crate::imports::*;
use crate::route::WeatherStations;
use crate::utils::find_nearest_index;
use crate::vehicle::VelocityVector;
use ndarray::Array3;

/// (s/m) constant used for Mach-dependent corrections downstream.
pub const RECIPROCAL_SPEED_OF_SOUND: f64 = 0.0029154519;

// value-channel layout within a surface grid
const CH_DHI: usize = 0;
const CH_DNI: usize = 1;
const CH_GHI: usize = 2;
const CH_WIND_NS: usize = 3;
const CH_WIND_EW: usize = 4;
const CH_AIR_TEMP: usize = 5;
const CH_PRESSURE: usize = 6;
const CH_AIR_DENSITY: usize = 7;
const NUM_CHANNELS: usize = 8;

/// Weather state at one (station, time) query point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherDataPoint {
    pub wind: VelocityVector,
    /// (W/m²) global horizontal irradiance
    pub irradiance: f64,
    /// (°C) 2 m air temperature
    pub air_temp: f64,
    /// surface pressure, in the units supplied by the weather file
    pub pressure: f64,
    /// (kg/m³)
    pub air_density: f64,
    /// (s/m)
    pub reciprocal_speed_of_sound: f64,
}

impl WeatherDataPoint {
    /// Componentwise mean of two data points; wind averages via its
    /// Cartesian components.
    pub fn average(lhs: &Self, rhs: &Self) -> Self {
        Self {
            wind: VelocityVector::from_cartesian_components(
                (lhs.wind.north_south() + rhs.wind.north_south()) / 2.0,
                (lhs.wind.east_west() + rhs.wind.east_west()) / 2.0,
            ),
            irradiance: (lhs.irradiance + rhs.irradiance) / 2.0,
            air_temp: (lhs.air_temp + rhs.air_temp) / 2.0,
            pressure: (lhs.pressure + rhs.pressure) / 2.0,
            air_density: (lhs.air_density + rhs.air_density) / 2.0,
            reciprocal_speed_of_sound: (lhs.reciprocal_speed_of_sound
                + rhs.reciprocal_speed_of_sound)
                / 2.0,
        }
    }
}

/// Raw weather CSV row; headers matched by name, extras ignored.
#[derive(Debug, Deserialize)]
struct WeatherRow {
    weather_station: f64,
    unix_period: f64,
    dhi: f64,
    dni: f64,
    ghi: f64,
    wind_velocity_ns: f64,
    wind_velocity_ew: f64,
    air_temperature_2m: f64,
    surface_pressure: f64,
    air_density: f64,
}

/// One regular (time x station) grid of weather values with bilinear lookup.
///
/// Rows in the source file are station-major: all timestamps for the first
/// station, then the same timestamps for the next. Queries beyond a grid
/// edge clamp to the edge on both axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSurface {
    start_time: f64,
    times: Vec<f64>,
    stations: Vec<f64>,
    /// indexed (station, time, channel)
    values: Array3<f64>,
}

impl WeatherSurface {
    pub fn new(times: Vec<f64>, stations: Vec<f64>, values: Array3<f64>) -> anyhow::Result<Self> {
        ensure!(
            !times.is_empty() && !stations.is_empty(),
            "weather grid axes cannot be empty"
        );
        ensure!(
            times.windows(2).all(|w| w[0] < w[1]),
            "weather grid timestamps must be strictly increasing"
        );
        ensure!(
            stations.windows(2).all(|w| w[0] < w[1]),
            "weather station coordinates must be strictly increasing"
        );
        ensure!(
            values.dim() == (stations.len(), times.len(), NUM_CHANNELS),
            "weather grid shape {:?} does not match axes ({}, {}, {})",
            values.dim(),
            stations.len(),
            times.len(),
            NUM_CHANNELS
        );
        let start_time = times[0];
        Ok(Self {
            start_time,
            times,
            stations,
            values,
        })
    }

    fn from_rows(rows: &[WeatherRow], num_stations: usize) -> anyhow::Result<Self> {
        ensure!(num_stations > 0, "weather file needs at least one station");
        ensure!(
            rows.len() % num_stations == 0,
            "weather file rows ({}) do not form a regular grid over {} stations",
            rows.len(),
            num_stations
        );
        let num_times = rows.len() / num_stations;
        ensure!(num_times > 0, "weather file contains no rows");

        let times: Vec<f64> = rows[..num_times].iter().map(|r| r.unix_period).collect();
        let stations: Vec<f64> = (0..num_stations)
            .map(|g| rows[g * num_times].weather_station)
            .collect();

        let mut values = Array3::zeros((num_stations, num_times, NUM_CHANNELS));
        for (i, row) in rows.iter().enumerate() {
            let (g, t) = (i / num_times, i % num_times);
            ensure!(
                row.weather_station == stations[g],
                "weather row {}: station {} breaks the station-major grouping",
                i + 1,
                row.weather_station
            );
            ensure!(
                row.unix_period == times[t],
                "weather row {}: timestamp {} breaks the regular time grid",
                i + 1,
                row.unix_period
            );
            values[[g, t, CH_DHI]] = row.dhi;
            values[[g, t, CH_DNI]] = row.dni;
            values[[g, t, CH_GHI]] = row.ghi;
            values[[g, t, CH_WIND_NS]] = row.wind_velocity_ns;
            values[[g, t, CH_WIND_EW]] = row.wind_velocity_ew;
            values[[g, t, CH_AIR_TEMP]] = row.air_temperature_2m;
            values[[g, t, CH_PRESSURE]] = row.surface_pressure;
            values[[g, t, CH_AIR_DENSITY]] = row.air_density;
        }

        Self::new(times, stations, values)
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Bilinear interpolation at `(station, time)`, clamped to the grid.
    fn sample(&self, station: f64, time: f64) -> anyhow::Result<WeatherDataPoint> {
        let (t_l, t_u, t_frac) = Self::axis_interval(&self.times, time)?;
        let (s_l, s_u, s_frac) = Self::axis_interval(&self.stations, station)?;

        let mut channels = [0.0; NUM_CHANNELS];
        for (ch, value) in channels.iter_mut().enumerate() {
            // interpolate in the time direction on both bracketing stations
            let c0 = self.values[[s_l, t_l, ch]] * (1.0 - t_frac)
                + self.values[[s_l, t_u, ch]] * t_frac;
            let c1 = self.values[[s_u, t_l, ch]] * (1.0 - t_frac)
                + self.values[[s_u, t_u, ch]] * t_frac;
            // then in the station direction
            *value = c0 * (1.0 - s_frac) + c1 * s_frac;
        }

        Ok(WeatherDataPoint {
            wind: VelocityVector::from_cartesian_components(
                channels[CH_WIND_NS],
                channels[CH_WIND_EW],
            ),
            irradiance: channels[CH_GHI],
            air_temp: channels[CH_AIR_TEMP],
            pressure: channels[CH_PRESSURE],
            air_density: channels[CH_AIR_DENSITY],
            reciprocal_speed_of_sound: RECIPROCAL_SPEED_OF_SOUND,
        })
    }

    /// Bracketing indices plus fractional position along one grid axis,
    /// clamping the query to the axis bounds. Degenerates gracefully for a
    /// single-point axis.
    fn axis_interval(grid: &[f64], x: f64) -> anyhow::Result<(usize, usize, f64)> {
        if grid.len() == 1 {
            return Ok((0, 0, 0.0));
        }
        let x = x.clamp(grid[0], *grid.last().unwrap());
        let lower = find_nearest_index(grid, x)?;
        let upper = lower + 1;
        let frac = (x - grid[lower]) / (grid[upper] - grid[lower]);
        Ok((lower, upper, frac))
    }
}

/// All weather known to a race: one or more surfaces sorted by start time.
///
/// Immutable after construction; the simulator treats it as a pure function
/// of `(station, time)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    surfaces: Vec<WeatherSurface>,
}

impl Weather {
    pub fn from_surfaces(mut surfaces: Vec<WeatherSurface>) -> anyhow::Result<Self> {
        ensure!(!surfaces.is_empty(), "weather needs at least one surface");
        surfaces.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(Self { surfaces })
    }

    pub fn from_file<P: AsRef<Path>>(
        filepath: P,
        stations: &WeatherStations,
    ) -> anyhow::Result<Self> {
        Self::from_files(&[filepath], stations)
    }

    /// Loads one surface per weather file, preferring each file's `.cache`
    /// bincode sidecar when present and writing one after a cold parse.
    pub fn from_files<P: AsRef<Path>>(
        filepaths: &[P],
        stations: &WeatherStations,
    ) -> anyhow::Result<Self> {
        let mut surfaces = Vec::with_capacity(filepaths.len());
        for filepath in filepaths {
            let filepath = filepath.as_ref();
            let cache_path = PathBuf::from(format!("{}.cache", filepath.display()));

            if let Some(surface) = Self::read_cache(&cache_path) {
                surfaces.push(surface);
                continue;
            }

            let file = File::open(filepath)
                .with_context(|| format!("Could not open weather file: {filepath:?}"))?;
            let surface = Self::parse_csv(file, stations.len())
                .with_context(|| format!("Failed to parse weather file: {filepath:?}"))?;
            Self::write_cache(&cache_path, &surface);
            surfaces.push(surface);
        }
        Self::from_surfaces(surfaces)
    }

    pub fn from_reader<R: std::io::Read>(rdr: R, num_stations: usize) -> anyhow::Result<Self> {
        Self::from_surfaces(vec![Self::parse_csv(rdr, num_stations)?])
    }

    fn parse_csv<R: std::io::Read>(rdr: R, num_stations: usize) -> anyhow::Result<WeatherSurface> {
        let mut csv_rdr = csv::Reader::from_reader(rdr);
        let mut rows = Vec::new();
        for (i, result) in csv_rdr.deserialize::<WeatherRow>().enumerate() {
            rows.push(result.with_context(|| format!("weather row {}", i + 1))?);
        }
        WeatherSurface::from_rows(&rows, num_stations)
    }

    fn read_cache(cache_path: &Path) -> Option<WeatherSurface> {
        if !cache_path.exists() {
            return None;
        }
        match File::open(cache_path).map_err(anyhow::Error::from).and_then(
            |f| -> anyhow::Result<WeatherSurface> { Ok(bincode::deserialize_from(f)?) },
        ) {
            Ok(surface) => {
                log::debug!("loaded weather surface from cache {cache_path:?}");
                Some(surface)
            }
            Err(err) => {
                log::warn!("ignoring unreadable weather cache {cache_path:?}: {err}");
                None
            }
        }
    }

    fn write_cache(cache_path: &Path, surface: &WeatherSurface) {
        let result = File::create(cache_path)
            .map_err(anyhow::Error::from)
            .and_then(|f| Ok(bincode::serialize_into(f, surface)?));
        if let Err(err) = result {
            // the cache is an accelerator, not a requirement
            log::warn!("could not write weather cache {cache_path:?}: {err}");
        }
    }

    /// Weather at `(station, time)` from the latest surface starting at or
    /// before `time`. Fails when `time` precedes the earliest surface.
    pub fn get_weather_at(&self, station: f64, time: f64) -> anyhow::Result<WeatherDataPoint> {
        let surface = self
            .surfaces
            .iter()
            .rev()
            .find(|s| s.start_time <= time)
            .with_context(|| {
                format!(
                    "weather queried at {time}, before the earliest surface start {}",
                    self.surfaces[0].start_time
                )
            })?;
        surface.sample(station, time)
    }

    /// Segment-averaged weather: the pairwise average of the endpoint
    /// queries.
    pub fn get_weather_during(
        &self,
        station: f64,
        start_time: f64,
        end_time: f64,
    ) -> anyhow::Result<WeatherDataPoint> {
        let start_data = self.get_weather_at(station, start_time)?;
        let end_data = self.get_weather_at(station, end_time)?;
        Ok(WeatherDataPoint::average(&start_data, &end_data))
    }

    /// A single-surface weather field holding `value` at every grid node;
    /// covers `[t_start, t_end]` at the given stations.
    pub fn constant(
        value: &WeatherDataPoint,
        stations: &[f64],
        t_start: f64,
        t_end: f64,
    ) -> anyhow::Result<Self> {
        let times = vec![t_start, t_end];
        let mut values = Array3::zeros((stations.len(), times.len(), NUM_CHANNELS));
        for g in 0..stations.len() {
            for t in 0..times.len() {
                values[[g, t, CH_GHI]] = value.irradiance;
                values[[g, t, CH_WIND_NS]] = value.wind.north_south();
                values[[g, t, CH_WIND_EW]] = value.wind.east_west();
                values[[g, t, CH_AIR_TEMP]] = value.air_temp;
                values[[g, t, CH_PRESSURE]] = value.pressure;
                values[[g, t, CH_AIR_DENSITY]] = value.air_density;
            }
        }
        Self::from_surfaces(vec![WeatherSurface::new(
            times,
            stations.to_vec(),
            values,
        )?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::almost_eq;

    const WEATHER_CSV: &str = "\
weather_station,unix_period,dhi,dni,ghi,wind_velocity_ns,wind_velocity_ew,air_temperature_2m,surface_pressure,air_density
0.0,1000.0,50.0,700.0,400.0,1.0,0.0,25.0,101.3,1.20
0.0,2000.0,60.0,720.0,500.0,2.0,0.0,26.0,101.2,1.19
0.0,3000.0,70.0,740.0,600.0,3.0,0.0,27.0,101.1,1.18
1.0,1000.0,55.0,650.0,440.0,1.0,1.0,24.0,101.0,1.21
1.0,2000.0,65.0,670.0,540.0,2.0,1.0,25.0,100.9,1.20
1.0,3000.0,75.0,690.0,640.0,3.0,1.0,26.0,100.8,1.19
";

    fn test_weather() -> Weather {
        Weather::from_reader(WEATHER_CSV.as_bytes(), 2).unwrap()
    }

    #[test]
    fn test_grid_nodes_are_exact() {
        let weather = test_weather();
        let wx = weather.get_weather_at(0.0, 1000.0).unwrap();
        assert!(almost_eq(wx.irradiance, 400.0, None));
        assert!(almost_eq(wx.wind.north_south(), 1.0, None));
        assert!(almost_eq(wx.air_density, 1.20, None));
        assert_eq!(wx.reciprocal_speed_of_sound, RECIPROCAL_SPEED_OF_SOUND);

        let wx = weather.get_weather_at(1.0, 3000.0).unwrap();
        assert!(almost_eq(wx.irradiance, 640.0, None));
        assert!(almost_eq(wx.wind.east_west(), 1.0, None));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let weather = test_weather();
        let wx = weather.get_weather_at(0.5, 1500.0).unwrap();
        // mean of the four surrounding GHI nodes: (400+500+440+540)/4
        assert!(almost_eq(wx.irradiance, 470.0, None));
        assert!(almost_eq(wx.wind.north_south(), 1.5, None));
        assert!(almost_eq(wx.wind.east_west(), 0.5, None));
    }

    #[test]
    fn test_clamps_at_grid_edges() {
        let weather = test_weather();
        let past_end = weather.get_weather_at(0.0, 9999.0).unwrap();
        let at_end = weather.get_weather_at(0.0, 3000.0).unwrap();
        assert_eq!(past_end, at_end);

        let beyond_station = weather.get_weather_at(5.0, 2000.0).unwrap();
        let last_station = weather.get_weather_at(1.0, 2000.0).unwrap();
        assert_eq!(beyond_station, last_station);
    }

    #[test]
    fn test_bounds_error_before_first_surface() {
        let weather = test_weather();
        assert!(weather.get_weather_at(0.0, 500.0).is_err());
    }

    #[test]
    fn test_weather_during_is_endpoint_average() {
        let weather = test_weather();
        let a = weather.get_weather_at(0.0, 1000.0).unwrap();
        let b = weather.get_weather_at(0.0, 3000.0).unwrap();
        let during = weather.get_weather_during(0.0, 1000.0, 3000.0).unwrap();
        assert_eq!(during, WeatherDataPoint::average(&a, &b));
        assert!(almost_eq(during.irradiance, 500.0, None));
    }

    #[test]
    fn test_irregular_grid_rejected() {
        // second station has a different timestamp set
        let broken = WEATHER_CSV.replace("1.0,2000.0", "1.0,2500.0");
        assert!(Weather::from_reader(broken.as_bytes(), 2).is_err());
    }

    #[test]
    fn test_multiple_surfaces_select_by_start_time() {
        let day1 = Weather::from_reader(WEATHER_CSV.as_bytes(), 2).unwrap().surfaces;
        let later_csv = WEATHER_CSV.replace("1000.0", "11000.0")
            .replace("2000.0", "12000.0")
            .replace("3000.0", "13000.0");
        let day2 = Weather::from_reader(later_csv.as_bytes(), 2).unwrap().surfaces;
        let weather =
            Weather::from_surfaces(day1.into_iter().chain(day2).collect()).unwrap();

        // a query in day 1 uses the first surface even though day 2 exists
        let wx = weather.get_weather_at(0.0, 2000.0).unwrap();
        assert!(almost_eq(wx.irradiance, 500.0, None));
        // a query after day 2 starts picks the later surface
        let wx = weather.get_weather_at(0.0, 12000.0).unwrap();
        assert!(almost_eq(wx.irradiance, 500.0, None));
        assert!(weather.get_weather_at(0.0, 999.0).is_err());
    }

    #[test]
    fn test_cache_round_trip() {
        let weather = test_weather();
        let surface = &weather.surfaces[0];
        let encoded = bincode::serialize(surface).unwrap();
        let decoded: WeatherSurface = bincode::deserialize(&encoded).unwrap();
        assert_eq!(surface, &decoded);
    }

    #[test]
    fn test_cache_file_preferred_and_fallback() {
        let dir = std::env::temp_dir().join("solsim-weather-cache-test");
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("weather.csv");
        std::fs::write(&csv_path, WEATHER_CSV).unwrap();
        let cache_path = dir.join("weather.csv.cache");
        let _ = std::fs::remove_file(&cache_path);

        let stations = crate::route::WeatherStations::new(vec![0.0, 1.0]);
        let cold = Weather::from_file(&csv_path, &stations).unwrap();
        assert!(cache_path.exists());
        let warm = Weather::from_file(&csv_path, &stations).unwrap();
        assert_eq!(cold, warm);

        // a corrupt cache falls back to the CSV
        std::fs::write(&cache_path, b"not bincode").unwrap();
        let fallback = Weather::from_file(&csv_path, &stations).unwrap();
        assert_eq!(cold, fallback);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
