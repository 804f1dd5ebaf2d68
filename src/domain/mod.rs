pub mod outcome;
pub mod scenario;
pub mod target;
pub mod timeseries;

pub use outcome::*;
pub use scenario::*;
pub use target::*;
pub use timeseries::*;
