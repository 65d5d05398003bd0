//! Resolved subtrees: availability and metadata of one subtree

use super::availability::{AvailabilityIndexing, AvailabilityInfo};
use super::binary::{resolve_buffer_views, BufferViewData};
use super::coordinates::TreeCoordinates;
use super::subtree::parse_subtree;
use super::tiling::ImplicitTiling;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::io::{uri_directory, ResourceResolver};
use crate::metadata::{
    MetadataEntity, PropertyTable, PropertyTableModel, Schema, TableMetadataEntityModel,
};

/// A property table and the availability indexing that maps into its rows
#[derive(Debug, Clone)]
pub struct IndexedPropertyTable {
    table: PropertyTableModel,
    indexing: AvailabilityIndexing,
}

impl IndexedPropertyTable {
    fn new(
        tables: &[PropertyTable],
        index: usize,
        availability: &AvailabilityInfo,
        schema: &Schema,
        buffer_views: &[BufferViewData],
    ) -> Tiles3dResult<Self> {
        let table = tables.get(index).ok_or_else(|| {
            Tiles3dError::invalid_subtree(format!("metadata refers to missing property table {index}"))
        })?;
        Ok(Self {
            table: PropertyTableModel::new(table, schema, buffer_views)?,
            indexing: availability.indexing()?,
        })
    }

    pub fn table(&self) -> &PropertyTableModel {
        &self.table
    }

    /// Row of the entity at availability `index`, `None` if it is unavailable
    pub fn row(&self, index: u64) -> Option<u32> {
        self.indexing.row(index)
    }

    pub fn entity(&self, index: u64) -> Tiles3dResult<Option<TableMetadataEntityModel<'_>>> {
        match self.row(index) {
            Some(row) => self.table.entity(row as usize).map(Some),
            None => Ok(None),
        }
    }
}

/// Metadata of the tiles and contents of one subtree
#[derive(Debug, Clone, Default)]
pub struct SubtreeMetadataModel {
    tile_metadata: Option<IndexedPropertyTable>,
    /// Per content set, aligned with the content availabilities
    content_metadata: Vec<IndexedPropertyTable>,
    subtree_metadata: Option<MetadataEntity>,
}

impl SubtreeMetadataModel {
    pub fn tile_metadata(&self) -> Option<&IndexedPropertyTable> {
        self.tile_metadata.as_ref()
    }

    pub fn content_metadata(&self, content_set: usize) -> Option<&IndexedPropertyTable> {
        self.content_metadata.get(content_set)
    }

    pub fn subtree_metadata(&self) -> Option<&MetadataEntity> {
        self.subtree_metadata.as_ref()
    }
}

/// Availability (and optional metadata) of one resolved subtree.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct SubtreeInfo {
    tile_availability: AvailabilityInfo,
    content_availability: Vec<AvailabilityInfo>,
    child_subtree_availability: AvailabilityInfo,
    metadata: Option<SubtreeMetadataModel>,
}

impl SubtreeInfo {
    /// Resolve the subtree rooted at the global `coordinates`
    pub async fn resolve(
        tiling: &ImplicitTiling,
        schema: Option<&Schema>,
        resolver: &dyn ResourceResolver,
        coordinates: &TreeCoordinates,
    ) -> Tiles3dResult<Self> {
        let uri = tiling.subtree_uri(coordinates)?;
        log::debug!("Resolving subtree {uri} for {coordinates}");
        let wrap = |source: Tiles3dError| Tiles3dError::SubtreeResolution {
            uri: resolver.resolve_uri(&uri),
            coordinates: coordinates.to_string(),
            source: Box::new(source),
        };

        let data = resolver
            .resolve_data(&uri)
            .await
            .ok_or_else(|| wrap(Tiles3dError::not_found(resolver.resolve_uri(&uri))))?;
        let buffer_resolver = resolver.derive(uri_directory(&uri));
        Self::from_data(&data, tiling, schema, buffer_resolver.as_ref())
            .await
            .map_err(wrap)
    }

    /// Build from binary or JSON subtree data. External buffers resolve
    /// relative to `resolver`, which is scoped to the subtree's directory.
    pub async fn from_data(
        data: &[u8],
        tiling: &ImplicitTiling,
        schema: Option<&Schema>,
        resolver: &dyn ResourceResolver,
    ) -> Tiles3dResult<Self> {
        let (subtree, binary_chunk) = parse_subtree(data)?;
        let buffer_views = resolve_buffer_views(&subtree, binary_chunk, resolver).await?;

        let nodes = tiling.nodes_per_subtree()?;
        let child_subtrees = tiling.child_subtree_count()?;
        let tile_availability = AvailabilityInfo::create(&subtree.tile_availability, &buffer_views, nodes)?;
        let content_availability = subtree
            .content_availability
            .iter()
            .map(|availability| AvailabilityInfo::create(availability, &buffer_views, nodes))
            .collect::<Tiles3dResult<Vec<_>>>()?;
        let child_subtree_availability = AvailabilityInfo::create(
            &subtree.child_subtree_availability,
            &buffer_views,
            child_subtrees,
        )?;

        let metadata = match schema {
            Some(schema) => {
                let tile_metadata = subtree
                    .tile_metadata
                    .map(|index| {
                        IndexedPropertyTable::new(
                            &subtree.property_tables,
                            index,
                            &tile_availability,
                            schema,
                            &buffer_views,
                        )
                    })
                    .transpose()?;
                let mut content_metadata = Vec::with_capacity(subtree.content_metadata.len());
                for (content_set, index) in subtree.content_metadata.iter().enumerate() {
                    let availability = content_availability.get(content_set).ok_or_else(|| {
                        Tiles3dError::invalid_subtree(format!(
                            "content metadata {content_set} has no content availability"
                        ))
                    })?;
                    content_metadata.push(IndexedPropertyTable::new(
                        &subtree.property_tables,
                        *index,
                        availability,
                        schema,
                        &buffer_views,
                    )?);
                }
                Some(SubtreeMetadataModel {
                    tile_metadata,
                    content_metadata,
                    subtree_metadata: subtree.subtree_metadata.clone(),
                })
            }
            None => None,
        };

        Ok(Self {
            tile_availability,
            content_availability,
            child_subtree_availability,
            metadata,
        })
    }

    pub fn tile_availability(&self) -> &AvailabilityInfo {
        &self.tile_availability
    }

    pub fn content_availability(&self) -> &[AvailabilityInfo] {
        &self.content_availability
    }

    pub fn child_subtree_availability(&self) -> &AvailabilityInfo {
        &self.child_subtree_availability
    }

    pub fn metadata(&self) -> Option<&SubtreeMetadataModel> {
        self.metadata.as_ref()
    }
}
