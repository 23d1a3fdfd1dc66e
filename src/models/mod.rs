pub mod location;
pub mod observation;
pub mod star;

pub use location::Location;
pub use observation::RawObservation;
pub use star::{FactRow, LocationDimRow, StarSchema, TimeDimRow};
