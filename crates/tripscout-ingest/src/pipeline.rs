//! Place ingestion pipeline: validate → id → photo → encode → append.
//!
//! The place record is appended even when an encoder fails; such places
//! carry the pending-features flag so a later cache rebuild picks them
//! up. Ingestion never fails solely because an encoder call failed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array1;
use tracing::{info, warn};

use tripscout_cache::FeatureCache;
use tripscout_core::{Error, Result};
use tripscout_infer::{ImageEncoder, TextEncoder};
use tripscout_store::{CatalogStore, Place, PhotoStore};

/// Ids start here so they stay in the catalog's six-digit id space.
const ID_FLOOR: u64 = 100_000;

/// Validated input fields for a new place.
#[derive(Debug, Clone)]
pub struct NewPlaceFields {
    pub name: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl NewPlaceFields {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("location", &self.location),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidQuery(format!("missing required field: {}", field)));
            }
        }
        Ok(())
    }
}

/// What ingestion produced. `features_pending` signals a partial failure:
/// the record is durable but one or both vectors still need extraction.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: String,
    pub features_pending: bool,
}

/// Seed the process-wide id counter above every existing numeric id.
/// New ids can never collide, even across restarts.
pub fn seed_id_counter(catalog: &CatalogStore) -> AtomicU64 {
    let next = catalog
        .max_numeric_id()
        .map(|max| max + 1)
        .unwrap_or(ID_FLOOR)
        .max(ID_FLOOR);
    AtomicU64::new(next)
}

/// Handles place ingestion against the shared stores and caches.
///
/// The id counter is shared across all ingesters over one catalog:
/// a per-ingester counter would let two overlapping requests mint the
/// same id from the same catalog snapshot.
pub struct Ingester<'a> {
    catalog: &'a CatalogStore,
    photos: &'a PhotoStore,
    text_encoder: &'a Arc<dyn TextEncoder>,
    image_encoder: &'a Arc<dyn ImageEncoder>,
    text_cache: &'a FeatureCache,
    image_cache: &'a FeatureCache,
    next_id: &'a AtomicU64,
}

impl<'a> Ingester<'a> {
    pub fn new(
        catalog: &'a CatalogStore,
        photos: &'a PhotoStore,
        text_encoder: &'a Arc<dyn TextEncoder>,
        image_encoder: &'a Arc<dyn ImageEncoder>,
        text_cache: &'a FeatureCache,
        image_cache: &'a FeatureCache,
        next_id: &'a AtomicU64,
    ) -> Self {
        Self {
            catalog,
            photos,
            text_encoder,
            image_encoder,
            text_cache,
            image_cache,
            next_id,
        }
    }

    /// Add one place. Returns the assigned id and whether feature
    /// extraction is still pending.
    pub fn add_place(
        &self,
        fields: NewPlaceFields,
        image: Option<&[u8]>,
    ) -> Result<IngestOutcome> {
        fields.validate()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();

        let photo = match image {
            Some(bytes) if !bytes.is_empty() => Some(self.photos.save(&id, bytes)?),
            _ => None,
        };

        let mut place = Place {
            id: id.clone(),
            name: fields.name,
            location: fields.location,
            description: fields.description,
            tags: fields.tags,
            photo,
            pending_features: false,
        };

        // Encode before the append so the pending flag lands in the
        // persisted record.
        let text_vector = self.embed_text_fields(&place);
        let image_vector = match image {
            Some(bytes) if !bytes.is_empty() => match self.image_encoder.encode(bytes) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Image encoding failed for new place {}: {}", id, e);
                    None
                }
            },
            _ => None,
        };

        let text_failed = text_vector.is_none();
        let image_failed = image.map(|b| !b.is_empty()).unwrap_or(false) && image_vector.is_none();
        place.pending_features = text_failed || image_failed;

        // The record itself is never lost: append first, then vectors.
        self.catalog.append(place)?;

        let mut cache_write_failed = false;
        if let Some(v) = text_vector {
            if let Err(e) = self.text_cache.put(&id, &v) {
                warn!("Text cache write failed for {}: {}", id, e);
                cache_write_failed = true;
            }
        }
        if let Some(v) = image_vector {
            if let Err(e) = self.image_cache.put(&id, &v) {
                warn!("Image cache write failed for {}: {}", id, e);
                cache_write_failed = true;
            }
        }

        let features_pending = text_failed || image_failed || cache_write_failed;
        if cache_write_failed {
            // Partial failure: make sure the record reflects it so a
            // rebuild retries the extraction.
            self.catalog.set_pending_features(&id, true)?;
        }

        info!(
            "Added place {} ({}){}",
            id,
            self.catalog.get(&id).map(|p| p.name).unwrap_or_default(),
            if features_pending { ", features pending" } else { "" }
        );

        Ok(IngestOutcome {
            id,
            features_pending,
        })
    }

    fn embed_text_fields(&self, place: &Place) -> Option<Array1<f32>> {
        match embed_place_text(self.text_encoder.as_ref(), place) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Text encoding failed for place {}: {}", place.id, e);
                None
            }
        }
    }
}

/// Embed a place's text as the average of its per-field vectors, so a
/// long description cannot drown out the name or tags. Shared between
/// ingestion and cache rebuilds.
pub fn embed_place_text(encoder: &dyn TextEncoder, place: &Place) -> Result<Array1<f32>> {
    let fields = place.text_fields();
    let mut sum: Option<Array1<f32>> = None;
    let mut count = 0usize;

    for field in &fields {
        let v = encoder.encode(field)?;
        sum = Some(match sum {
            Some(acc) => acc + &v,
            None => v,
        });
        count += 1;
    }

    sum.map(|s| s / count as f32)
        .ok_or_else(|| Error::Encoding(format!("place {} has no text fields", place.id)))
}
