//! The discretized race route and its CSV ingestion.

use crate::imports::*;
use std::ops::{Add, Div, Index, Mul, Sub};

/// (degrees) latitude/longitude pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeographicalCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Add for GeographicalCoordinate {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            latitude: self.latitude + rhs.latitude,
            longitude: self.longitude + rhs.longitude,
        }
    }
}

impl Sub for GeographicalCoordinate {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            latitude: self.latitude - rhs.latitude,
            longitude: self.longitude - rhs.longitude,
        }
    }
}

impl Mul<f64> for GeographicalCoordinate {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            latitude: self.latitude * rhs,
            longitude: self.longitude * rhs,
        }
    }
}

impl Div<f64> for GeographicalCoordinate {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self {
            latitude: self.latitude / rhs,
            longitude: self.longitude / rhs,
        }
    }
}

impl GeographicalCoordinate {
    pub fn average(lhs: Self, rhs: Self) -> Self {
        (lhs + rhs) / 2.0
    }
}

/// What happens at the end of a route segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentEndCondition {
    None,
    RaceStart,
    ControlStop,
    StageEnd,
    EndOfRace,
}

/// How a segment counts toward the race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentType {
    Race,
    Loop,
    Transport,
}

/// One discretized piece of the route, with its geometry pre-computed by the
/// route tooling (incline sine and gravity products come in the file).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub coordinate_start: GeographicalCoordinate,
    pub coordinate_end: GeographicalCoordinate,
    pub end_condition: SegmentEndCondition,
    pub segment_type: SegmentType,
    /// (m/s)
    pub speed_limit: f64,
    /// real-valued weather interpolation coordinate
    pub weather_station: f64,
    /// (m)
    pub distance: f64,
    /// (rad) 0 due north, π/2 due east
    pub heading: f64,
    /// (m)
    pub elevation: f64,
    pub grade: f64,
    /// (rad)
    pub road_incline_angle: f64,
    pub sine_road_incline_angle: f64,
    /// (m/s²) local gravitational acceleration
    pub gravity: f64,
    /// (m/s²) pre-computed `gravity * sine_road_incline_angle`
    pub gravity_times_sine_road_incline_angle: f64,
}

/// The ordered set of distinct weather-station coordinates a route crosses,
/// ascending. Its length fixes the station axis of the weather grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherStations(Vec<f64>);

impl WeatherStations {
    pub fn new(mut stations: Vec<f64>) -> Self {
        stations.sort_by(|a, b| a.total_cmp(b));
        stations.dedup();
        Self(stations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Raw route CSV row; headers are matched by name and extra columns are
/// ignored.
#[derive(Debug, Deserialize)]
struct RouteRow {
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
    segment_end_condition: SegmentEndCondition,
    segment_type: SegmentType,
    speed_limit: f64,
    weather_station_index: f64,
    distance: f64,
    heading: f64,
    elevation: f64,
    grade: f64,
    road_incline_angle: f64,
    sine_road_incline_angle: f64,
    gravity: f64,
    gravity_times_sine_road_angle: f64,
}

impl From<RouteRow> for RouteSegment {
    fn from(row: RouteRow) -> Self {
        RouteSegment {
            coordinate_start: GeographicalCoordinate {
                latitude: row.start_latitude,
                longitude: row.start_longitude,
            },
            coordinate_end: GeographicalCoordinate {
                latitude: row.end_latitude,
                longitude: row.end_longitude,
            },
            end_condition: row.segment_end_condition,
            segment_type: row.segment_type,
            speed_limit: row.speed_limit,
            weather_station: row.weather_station_index,
            distance: row.distance,
            heading: row.heading,
            elevation: row.elevation,
            grade: row.grade,
            road_incline_angle: row.road_incline_angle,
            sine_road_incline_angle: row.sine_road_incline_angle,
            gravity: row.gravity,
            gravity_times_sine_road_incline_angle: row.gravity_times_sine_road_angle,
        }
    }
}

/// An ordered, immutable sequence of route segments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    segments: Vec<RouteSegment>,
    total_distance: f64,
    weather_stations: WeatherStations,
}

impl Index<usize> for Route {
    type Output = RouteSegment;
    fn index(&self, index: usize) -> &RouteSegment {
        &self.segments[index]
    }
}

impl Route {
    pub fn new(segments: Vec<RouteSegment>) -> Self {
        let total_distance = segments.iter().map(|s| s.distance).sum();
        let weather_stations =
            WeatherStations::new(segments.iter().map(|s| s.weather_station).collect());
        Self {
            segments,
            total_distance,
            weather_stations,
        }
    }

    /// Reads a header-addressed route CSV; unrecognized columns are
    /// ignored and rows are taken in file order.
    pub fn from_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let file = File::open(filepath)
            .with_context(|| format!("Could not open route file: {filepath:?}"))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to parse route file: {filepath:?}"))
    }

    pub fn from_reader<R: std::io::Read>(rdr: R) -> anyhow::Result<Self> {
        let mut csv_rdr = csv::Reader::from_reader(rdr);
        let mut segments = Vec::new();
        for (i, result) in csv_rdr.deserialize::<RouteRow>().enumerate() {
            let row = result.with_context(|| format!("route row {}", i + 1))?;
            ensure!(
                row.distance >= 0.0,
                "route row {}: negative segment distance {}",
                i + 1,
                row.distance
            );
            segments.push(row.into());
        }
        ensure!(!segments.is_empty(), "route file contains no segments");
        Ok(Self::new(segments))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// (m) sum of all segment distances.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn weather_stations(&self) -> &WeatherStations {
        &self.weather_stations
    }

    /// (m) distance between two segment indices, summed over the half-open
    /// index range between them. Commutative; 0 when the indices are equal
    /// or either is past the end.
    pub fn distance_between(&self, index1: usize, index2: usize) -> f64 {
        if index1 == index2 {
            return 0.0;
        }
        let (lo, hi) = if index1 < index2 {
            (index1, index2)
        } else {
            (index2, index1)
        };
        // `len` itself is a valid exclusive endpoint of the half-open sum
        if hi > self.segments.len() {
            return 0.0;
        }
        self.segments[lo..hi].iter().map(|s| s.distance).sum()
    }
}
