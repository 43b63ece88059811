pub mod attendance;
pub mod report;

pub use attendance::*;
pub use report::*;
