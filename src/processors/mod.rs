pub mod integrity_checker;
pub mod star_transformer;

pub use integrity_checker::{IntegrityChecker, IntegrityReport, KeyViolation, ViolationType};
pub use star_transformer::{
    build_facts, build_location_dimension, build_time_dimension, StarTransformer,
};
