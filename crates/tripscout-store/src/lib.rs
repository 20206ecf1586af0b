//! TripScout Store — catalog of places and the photo store.

pub mod catalog;
pub mod photos;
pub mod types;

pub use catalog::CatalogStore;
pub use photos::PhotoStore;
pub use types::Place;
