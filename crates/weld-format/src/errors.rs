/// Errors during weld document loading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("weld {index} uses unsupported weld type {weld_type}")]
    UnsupportedWeldType { index: usize, weld_type: String },
}

/// Errors during weld document saving.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaveError {
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}
