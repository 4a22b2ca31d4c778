pub mod attrs;
pub mod error;
pub mod ids;
pub mod input;
pub mod span;

pub use attrs::*;
pub use error::*;
pub use ids::*;
pub use input::*;
pub use span::*;
