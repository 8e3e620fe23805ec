pub mod diagnosis;
pub mod enums;
pub mod params;
pub mod record;

pub use diagnosis::*;
pub use enums::*;
pub use params::*;
pub use record::*;
