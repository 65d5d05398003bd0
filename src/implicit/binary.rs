//! Resolution of subtree buffers and buffer views into byte ranges

use std::ops::Deref;
use std::sync::Arc;

use super::subtree::Subtree;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::io::ResourceResolver;

/// A contiguous byte range of a resolved buffer
#[derive(Debug, Clone)]
pub struct BufferViewData {
    buffer: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl BufferViewData {
    /// View `start..end` of `buffer`; the range must lie inside the buffer
    pub fn new(buffer: Arc<[u8]>, start: usize, end: usize) -> Tiles3dResult<Self> {
        if start > end || end > buffer.len() {
            return Err(Tiles3dError::invalid_subtree(format!(
                "buffer view {start}..{end} exceeds buffer of {} bytes",
                buffer.len()
            )));
        }
        Ok(Self { buffer, start, end })
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let buffer = bytes.into();
        let end = buffer.len();
        Self { buffer, start: 0, end }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.start..self.end]
    }
}

impl Deref for BufferViewData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Resolve all buffers of `subtree` and slice them into its buffer views.
///
/// Buffers without a URI refer to the binary chunk; the others are resolved
/// through `resolver`, which must be scoped to the subtree file's directory.
pub async fn resolve_buffer_views(
    subtree: &Subtree,
    binary_chunk: Option<&[u8]>,
    resolver: &dyn ResourceResolver,
) -> Tiles3dResult<Vec<BufferViewData>> {
    let mut buffers: Vec<Arc<[u8]>> = Vec::with_capacity(subtree.buffers.len());
    for (index, buffer) in subtree.buffers.iter().enumerate() {
        let data: Arc<[u8]> = match &buffer.uri {
            None => {
                let chunk = binary_chunk.ok_or_else(|| {
                    Tiles3dError::invalid_subtree(format!(
                        "buffer {index} has no URI, but the subtree has no binary chunk"
                    ))
                })?;
                Arc::from(chunk)
            }
            Some(uri) => {
                let data = resolver
                    .resolve_data(uri)
                    .await
                    .ok_or_else(|| Tiles3dError::not_found(resolver.resolve_uri(uri)))?;
                Arc::from(data)
            }
        };
        if data.len() < buffer.byte_length {
            return Err(Tiles3dError::invalid_subtree(format!(
                "buffer {index} should have {} bytes, but has {}",
                buffer.byte_length,
                data.len()
            )));
        }
        buffers.push(data);
    }

    subtree
        .buffer_views
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let buffer = buffers.get(view.buffer).ok_or_else(|| {
                Tiles3dError::invalid_subtree(format!(
                    "buffer view {index} refers to missing buffer {}",
                    view.buffer
                ))
            })?;
            let end = view
                .byte_offset
                .checked_add(view.byte_length)
                .ok_or_else(|| Tiles3dError::invalid_subtree("buffer view range overflows"))?;
            BufferViewData::new(Arc::clone(buffer), view.byte_offset, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implicit::subtree::{Buffer, BufferView};
    use crate::io::MemoryResourceResolver;

    fn subtree(buffers: Vec<Buffer>, buffer_views: Vec<BufferView>) -> Subtree {
        Subtree {
            buffers,
            buffer_views,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_internal_and_external_buffers() {
        let resolver = MemoryResourceResolver::new().with_entry("external.bin", vec![9u8, 8, 7, 6]);
        let subtree = subtree(
            vec![
                Buffer { uri: None, byte_length: 4, name: None },
                Buffer { uri: Some("external.bin".into()), byte_length: 4, name: None },
                Buffer { uri: Some("data:application/octet-stream;base64,AQID".into()), byte_length: 3, name: None },
            ],
            vec![
                BufferView { buffer: 0, byte_offset: 1, byte_length: 2, name: None },
                BufferView { buffer: 1, byte_offset: 2, byte_length: 2, name: None },
                BufferView { buffer: 2, byte_offset: 0, byte_length: 3, name: None },
            ],
        );

        let views = resolve_buffer_views(&subtree, Some(&[1, 2, 3, 4]), &resolver).await.unwrap();
        assert_eq!(views[0].as_slice(), &[2, 3]);
        assert_eq!(&*views[1], &[7, 6]);
        assert_eq!(&*views[2], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_buffers_and_bad_ranges() {
        let resolver = MemoryResourceResolver::new();

        let no_chunk = subtree(vec![Buffer { uri: None, byte_length: 4, name: None }], vec![]);
        let err = resolve_buffer_views(&no_chunk, None, &resolver).await.unwrap_err();
        assert!(matches!(err, Tiles3dError::InvalidSubtree(_)));

        let missing = subtree(vec![Buffer { uri: Some("nope.bin".into()), byte_length: 4, name: None }], vec![]);
        let err = resolve_buffer_views(&missing, None, &resolver).await.unwrap_err();
        assert!(err.is_resource_error());

        let overrun = subtree(
            vec![Buffer { uri: None, byte_length: 2, name: None }],
            vec![BufferView { buffer: 0, byte_offset: 1, byte_length: 4, name: None }],
        );
        let err = resolve_buffer_views(&overrun, Some(&[0, 0]), &resolver).await.unwrap_err();
        assert!(matches!(err, Tiles3dError::InvalidSubtree(_)));
    }
}
