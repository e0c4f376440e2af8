//! Location sources
//!
//! The provider contract plus a trace replay implementation.

pub mod replay;
pub mod traits;

pub use replay::{parse_trace, ReplayLocationSource};
pub use traits::{
    FixBatch, LocationError, LocationFix, LocationRequest, LocationResult, LocationSource,
    Priority,
};
