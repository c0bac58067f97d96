//! Endpoint data model shared by every strategy.

mod endpoint;

pub use endpoint::{Endpoint, FrameworkTag, HttpMethod, NavigationHandle};
