use serde::Serialize;
use tracing::debug;
use weld_engine::{FeatureList, WeldFeature};

use crate::errors::SaveError;
use crate::metadata::DocumentMetadata;

/// Format identifier written to every document.
pub const FORMAT_ID: &str = "weld-joint";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 2;

/// The top-level file structure.
#[derive(Debug, Clone, Serialize)]
pub struct WeldFile<'a> {
    /// Format identifier.
    pub format: &'a str,
    /// Format version number.
    pub version: u32,
    /// Document metadata.
    pub document: &'a DocumentMetadata,
    /// The weld features in evaluation order.
    pub welds: &'a [WeldFeature],
}

/// Serialize a weld document to a pretty-printed JSON string.
pub fn save_document(
    features: &FeatureList,
    metadata: &DocumentMetadata,
) -> Result<String, SaveError> {
    let file = WeldFile {
        format: FORMAT_ID,
        version: FORMAT_VERSION,
        document: metadata,
        welds: &features.features,
    };
    debug!(welds = file.welds.len(), "saving weld document");
    serde_json::to_string_pretty(&file).map_err(|e| SaveError::Serialize(e.to_string()))
}
