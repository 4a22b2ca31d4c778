pub mod basic;
pub mod capability;
pub mod dod;
pub mod report;
pub mod rules;

pub use basic::*;
pub use capability::*;
pub use dod::*;
pub use report::*;
pub use rules::*;
