use serde::Deserialize;
use tracing::{debug, info};
use weld_engine::{FeatureList, WeldFeature};

use crate::errors::LoadError;
use crate::metadata::DocumentMetadata;
use crate::save::{FORMAT_ID, FORMAT_VERSION};

/// The top-level file structure for deserialization. `welds` is kept raw
/// because its shape depends on `version`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeldFileRaw {
    pub format: String,
    pub version: u32,
    pub document: DocumentMetadata,
    #[serde(default)]
    pub welds: serde_json::Value,
}

/// Deserialize a weld document from a JSON string.
///
/// Validates the format identifier and version and migrates older
/// documents to the current schema.
pub fn load_document(json: &str) -> Result<(FeatureList, DocumentMetadata), LoadError> {
    let raw: WeldFileRaw =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    if raw.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let welds = if raw.welds.is_null() {
        serde_json::Value::Array(Vec::new())
    } else {
        raw.welds
    };
    let features = if raw.version < FORMAT_VERSION {
        info!(from = raw.version, to = FORMAT_VERSION, "migrating weld document");
        crate::migrate::migrate(welds, raw.version, FORMAT_VERSION)?
    } else {
        serde_json::from_value::<Vec<WeldFeature>>(welds)
            .map_err(|e| LoadError::ParseError(e.to_string()))?
    };
    debug!(welds = features.len(), "loaded weld document");

    Ok((FeatureList { features }, raw.document))
}
