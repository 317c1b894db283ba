//! Data models for the MamaMaps core.
//!
//! Serialized field names match the document store and the UI shell (camelCase).

mod geo;
mod identity;
mod overlay;
mod place;
mod report;
mod route;

pub use geo::*;
pub use identity::*;
pub use overlay::*;
pub use place::*;
pub use report::*;
pub use route::*;
