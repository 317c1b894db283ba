//! External collaborators and their adapters.
//!
//! Every collaborator sits behind a `Send + Sync` trait so the map view can hold
//! it as `Arc<dyn _>`. Methods return boxed futures for dyn-compatibility.

mod auth;
mod directions;
mod location;
mod places;
mod store;

pub use auth::*;
pub use directions::*;
pub use location::*;
pub use places::*;
pub use store::*;

use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Base URL of the maps web services.
pub const MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";
