//! Content type detection from (possibly partial) content data

use std::fmt;

/// Kinds of content a tile may refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentDataType {
    Glb,
    B3dm,
    I3dm,
    Cmpt,
    Pnts,
    Geom,
    Vctr,
    Subtree,
    /// JSON with `asset` and `root`
    Tileset,
    /// JSON that is not (or not yet known to be) a tileset
    Json,
    /// ZIP based `.3tz` package
    Package3tz,
    /// SQLite based `.3dtiles` package
    Package3dtiles,
    Unknown,
}

impl ContentDataType {
    /// Whether the content is an archive holding a whole tileset
    pub fn is_package(self) -> bool {
        matches!(self, Self::Package3tz | Self::Package3dtiles)
    }

    /// Whether the content may be a tileset once it is fully resolved
    pub fn may_be_tileset(self) -> bool {
        matches!(self, Self::Tileset | Self::Json)
    }
}

impl fmt::Display for ContentDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Glb => "GLB",
            Self::B3dm => "B3DM",
            Self::I3dm => "I3DM",
            Self::Cmpt => "CMPT",
            Self::Pnts => "PNTS",
            Self::Geom => "GEOM",
            Self::Vctr => "VCTR",
            Self::Subtree => "SUBTREE",
            Self::Tileset => "TILESET",
            Self::Json => "JSON",
            Self::Package3tz => "3TZ",
            Self::Package3dtiles => "3DTILES",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Determines the type of content from its URI and leading bytes
pub trait ContentTypeDetector: fmt::Debug {
    fn detect(&self, uri: &str, data: &[u8]) -> ContentDataType;
}

const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Detects content types from magic bytes, falling back to JSON inspection
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicContentTypeDetector;

impl MagicContentTypeDetector {
    fn detect_json(data: &[u8]) -> Option<ContentDataType> {
        let first = data.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first != b'{' {
            return None;
        }
        // Partial data usually does not parse; it stays generic JSON
        match serde_json::from_slice::<serde_json::Value>(data) {
            Ok(value) if value.get("asset").is_some() && value.get("root").is_some() => {
                Some(ContentDataType::Tileset)
            }
            _ => Some(ContentDataType::Json),
        }
    }
}

impl ContentTypeDetector for MagicContentTypeDetector {
    fn detect(&self, uri: &str, data: &[u8]) -> ContentDataType {
        if data.starts_with(SQLITE_MAGIC) {
            return ContentDataType::Package3dtiles;
        }
        if data.starts_with(ZIP_MAGIC) {
            return ContentDataType::Package3tz;
        }
        if data.len() >= 4 {
            let magic = match &data[..4] {
                b"glTF" => Some(ContentDataType::Glb),
                b"b3dm" => Some(ContentDataType::B3dm),
                b"i3dm" => Some(ContentDataType::I3dm),
                b"cmpt" => Some(ContentDataType::Cmpt),
                b"pnts" => Some(ContentDataType::Pnts),
                b"geom" => Some(ContentDataType::Geom),
                b"vctr" => Some(ContentDataType::Vctr),
                b"subt" => Some(ContentDataType::Subtree),
                _ => None,
            };
            if let Some(kind) = magic {
                return kind;
            }
        }
        if let Some(kind) = Self::detect_json(data) {
            return kind;
        }
        let path = uri.split(['?', '#']).next().unwrap_or(uri).to_ascii_lowercase();
        if path.ends_with(".3tz") {
            ContentDataType::Package3tz
        } else if path.ends_with(".3dtiles") {
            ContentDataType::Package3dtiles
        } else {
            ContentDataType::Unknown
        }
    }
}
