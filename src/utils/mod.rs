pub mod macros;
pub mod math;
pub mod normalise;
