//! TripScout Ingest — adding new places to the catalog.

pub mod pipeline;

pub use pipeline::{embed_place_text, seed_id_counter, Ingester, IngestOutcome, NewPlaceFields};
