//! Client-side core of the TecMetrics attendance console: a paginated,
//! filterable resource store per entity, the list controller that drives it,
//! and the HTTP gateway both talk through.

pub mod config;
pub mod controller;
pub mod gateway;
pub mod model;
pub mod resource;
pub mod store;
pub mod validate;

pub use controller::{ListController, LoadOutcome, Modal, MutationOutcome};
pub use gateway::{Gateway, GatewayError, HttpGateway, ListQuery};
pub use resource::{Descriptor, Resource, ResourceKind, RouteStyle, UpdateMethod};
pub use store::{Filters, Pagination, ResourceStore};
