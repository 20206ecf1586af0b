//! Data types for catalogued places.

use serde::{Deserialize, Serialize};

/// One recommendable place in the catalog.
///
/// Immutable once ingested except for the pending-features flag, which is
/// cleared when a later cache rebuild catches up on failed extractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    /// Stable unique id, assigned at ingestion.
    pub id: String,
    pub name: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Filename in the photo store, e.g. `123456.jpg`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Set when an encoder failed during ingestion; a later cache rebuild
    /// picks these places up.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_features: bool,
}

impl Place {
    /// Text fields fed to the text encoder, in a fixed order.
    /// Per-field vectors are averaged into the place's text embedding.
    pub fn text_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.name.clone(),
            self.location.clone(),
            self.description.clone(),
        ];
        if !self.tags.is_empty() {
            fields.push(self.tags.join(" "));
        }
        fields.retain(|f| !f.trim().is_empty());
        fields
    }
}
