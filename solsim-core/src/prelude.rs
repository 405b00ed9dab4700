pub use crate::optimizer::{
    BinarySearchOptimizer, LinearSearchOptimizer, OptimizationOutput, Optimizer,
};
pub use crate::route::{
    GeographicalCoordinate, Route, RouteSegment, SegmentEndCondition, SegmentType, WeatherStations,
};
pub use crate::schedule::{RaceSchedule, SingleDaySchedule};
pub use crate::simrace::{RaceRunner, SegmentRunner};
pub use crate::solar_position::{solar_position, SolarPositionData};
pub use crate::traits::{Init, SerdeAPI};
pub use crate::vehicle::{
    Aerobody, ApparentWindVector, Battery, BatteryState, Motor, SolarArray, SolarCar, Tire,
    VelocityVector,
};
pub use crate::weather::{Weather, WeatherDataPoint, WeatherSurface};
