pub mod derived;
pub mod fields;
pub mod file_properties;
pub mod location;

pub use derived::derive_fields;
pub use file_properties::{country_of, FileProperties};
pub use location::Location;
