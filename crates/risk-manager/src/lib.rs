pub mod models;
pub mod sizer;

pub use models::*;
pub use sizer::PositionSizer;
