//! Error types for tileset traversal

/// Result type for 3D Tiles operations
pub type Tiles3dResult<T> = Result<T, Tiles3dError>;

/// Errors that can occur while reading and traversing a tileset
#[derive(Debug, thiserror::Error)]
pub enum Tiles3dError {
    /// IO error reading a local resource
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid tileset structure
    #[error("Invalid tileset: {0}")]
    InvalidTileset(String),

    /// The implicit tiling description violates a structural invariant
    #[error("Implicit tiling error: {0}")]
    ImplicitTiling(String),

    /// A subtree file could not be interpreted
    #[error("Invalid subtree: {0}")]
    InvalidSubtree(String),

    /// Metadata (schema, property table or entity) is inconsistent
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// An availability bitstream was queried outside of its length
    #[error("Availability index {index} out of range for length {length}")]
    AvailabilityOutOfRange { index: u64, length: u64 },

    /// A referenced resource could not be resolved
    #[error("Could not resolve {uri}")]
    ResourceNotFound { uri: String },

    /// Resolving the subtree at the given coordinates failed
    #[error("Failed to resolve subtree {uri} at {coordinates}: {source}")]
    SubtreeResolution {
        uri: String,
        coordinates: String,
        #[source]
        source: Box<Tiles3dError>,
    },
}

impl Tiles3dError {
    /// Convenience constructors for the structural error kinds
    pub fn invalid_tileset<T: ToString>(msg: T) -> Self {
        Self::InvalidTileset(msg.to_string())
    }

    pub fn implicit_tiling<T: ToString>(msg: T) -> Self {
        Self::ImplicitTiling(msg.to_string())
    }

    pub fn invalid_subtree<T: ToString>(msg: T) -> Self {
        Self::InvalidSubtree(msg.to_string())
    }

    pub fn invalid_metadata<T: ToString>(msg: T) -> Self {
        Self::InvalidMetadata(msg.to_string())
    }

    pub fn not_found<T: ToString>(uri: T) -> Self {
        Self::ResourceNotFound {
            uri: uri.to_string(),
        }
    }

    /// Whether this error comes from a resource that could not be fetched,
    /// as opposed to input that violates a structural invariant.
    pub fn is_resource_error(&self) -> bool {
        match self {
            Self::Io(_) | Self::ResourceNotFound { .. } => true,
            Self::SubtreeResolution { source, .. } => source.is_resource_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_errors_are_classified() {
        assert!(Tiles3dError::not_found("a.subtree").is_resource_error());
        assert!(!Tiles3dError::implicit_tiling("bad levels").is_resource_error());
        assert!(!Tiles3dError::invalid_tileset("no root volume").is_resource_error());

        let wrapped = Tiles3dError::SubtreeResolution {
            uri: "subtrees/0.0.0.subtree".into(),
            coordinates: "0-0-0".into(),
            source: Box::new(Tiles3dError::not_found("subtrees/0.0.0.subtree")),
        };
        assert!(wrapped.is_resource_error());
        assert!(wrapped.to_string().contains("0-0-0"));
    }
}
