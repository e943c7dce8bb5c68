pub mod analysis;
pub mod launch;

pub use analysis::*;
pub use launch::*;
