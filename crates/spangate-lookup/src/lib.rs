pub mod bpmn;
pub mod fs;

pub use bpmn::*;
pub use fs::*;
