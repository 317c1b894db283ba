//! Map session core: live feed, capture flow, route overlay and place resolution.

mod capture;
mod feed;
mod markers;
mod places;
mod route;
mod surface;
mod view;

pub use capture::SkipReason;
pub use markers::MarkerLedger;
pub use places::PlaceResolver;
pub use route::{RoutePlan, RouteReconciler};
pub use surface::{MapSurface, SceneSurface};
pub use view::{MapServices, MapView, ViewSettings};
