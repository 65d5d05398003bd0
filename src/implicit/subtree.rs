//! Subtree documents and the binary `.subtree` container

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Tiles3dError, Tiles3dResult};
use crate::metadata::{MetadataEntity, PropertyTable};

/// Magic bytes of a binary subtree file
pub const SUBTREE_MAGIC: [u8; 4] = *b"subt";

/// Byte length of the binary subtree header
pub const SUBTREE_HEADER_LENGTH: usize = 24;

/// Binary subtree header (24 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SubtreeHeader {
    /// Magic bytes "subt"
    pub magic: [u8; 4],
    /// Version (should be 1)
    pub version: u32,
    /// JSON chunk byte length
    pub json_byte_length: u64,
    /// Binary chunk byte length
    pub binary_byte_length: u64,
}

/// A buffer of a subtree; without `uri` it refers to the binary chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Availability descriptor: either a constant or a bitstream buffer view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Buffer view index of the bitstream (`bufferView` in the legacy extension)
    #[serde(default, alias = "bufferView", skip_serializing_if = "Option::is_none")]
    pub bitstream: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_count: Option<u64>,
    /// 0 or 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<u8>,
}

impl Availability {
    pub fn constant(available: bool) -> Self {
        Self {
            constant: Some(u8::from(available)),
            ..Default::default()
        }
    }

    pub fn bitstream(buffer_view: usize) -> Self {
        Self {
            bitstream: Some(buffer_view),
            ..Default::default()
        }
    }
}

/// The legacy extension stored a single content availability object
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Availability>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Availability),
        Many(Vec<Availability>),
    }
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(availability)) => vec![availability],
        Some(OneOrMany::Many(availabilities)) => availabilities,
    })
}

/// JSON part of a subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtree {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_tables: Vec<PropertyTable>,
    pub tile_availability: Availability,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub content_availability: Vec<Availability>,
    pub child_subtree_availability: Availability,
    /// Property table index of the tile metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_metadata: Option<usize>,
    /// Property table index per content set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_metadata: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtree_metadata: Option<MetadataEntity>,
}

/// Parse subtree data, returning the subtree JSON and the binary chunk (if any).
///
/// Binary data is recognized by its magic; anything else must be a JSON object.
pub fn parse_subtree(data: &[u8]) -> Tiles3dResult<(Subtree, Option<&[u8]>)> {
    if data.len() >= 4 && data[0..4] == SUBTREE_MAGIC {
        return parse_binary_subtree(data);
    }
    let first = data.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        let subtree = serde_json::from_slice(data)
            .map_err(|e| Tiles3dError::invalid_subtree(format!("invalid subtree JSON: {e}")))?;
        return Ok((subtree, None));
    }
    Err(Tiles3dError::invalid_subtree(
        "data is neither a binary subtree nor subtree JSON",
    ))
}

fn parse_binary_subtree(data: &[u8]) -> Tiles3dResult<(Subtree, Option<&[u8]>)> {
    if data.len() < SUBTREE_HEADER_LENGTH {
        return Err(Tiles3dError::invalid_subtree(format!(
            "expected at least {SUBTREE_HEADER_LENGTH} bytes for the header, got {}",
            data.len()
        )));
    }
    let header: SubtreeHeader = bytemuck::pod_read_unaligned(&data[..SUBTREE_HEADER_LENGTH]);
    if header.version != 1 {
        log::debug!("Reading subtree with version {}", header.version);
    }

    let json_start = SUBTREE_HEADER_LENGTH;
    let json_end = usize::try_from(header.json_byte_length)
        .ok()
        .and_then(|length| json_start.checked_add(length));
    let binary_end = json_end.and_then(|end| {
        usize::try_from(header.binary_byte_length)
            .ok()
            .and_then(|length| end.checked_add(length))
    });
    let (Some(json_end), Some(binary_end)) = (json_end, binary_end) else {
        return Err(Tiles3dError::invalid_subtree("chunk lengths overflow"));
    };
    if binary_end > data.len() {
        return Err(Tiles3dError::invalid_subtree(format!(
            "header declares {binary_end} bytes, but only {} are present",
            data.len()
        )));
    }

    let subtree = serde_json::from_slice(&data[json_start..json_end])
        .map_err(|e| Tiles3dError::invalid_subtree(format!("invalid JSON chunk: {e}")))?;
    let binary = (binary_end > json_end).then(|| &data[json_end..binary_end]);
    Ok((subtree, binary))
}
