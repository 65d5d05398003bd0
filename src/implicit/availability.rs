//! Availability bitstreams

use super::binary::BufferViewData;
use super::subtree::Availability;
use crate::error::{Tiles3dError, Tiles3dResult};

/// Resolved availability over the index range `[0, length)`
#[derive(Debug, Clone)]
pub enum AvailabilityInfo {
    /// Every index has the same availability
    Constant { available: bool, length: u64 },
    /// Bit `i` of the buffer view (least significant bit first) is index `i`
    Bitstream { data: BufferViewData, length: u64 },
}

impl AvailabilityInfo {
    pub fn constant(available: bool, length: u64) -> Self {
        Self::Constant { available, length }
    }

    /// Bitstream availability; `data` must hold at least `ceil(length / 8)` bytes
    pub fn bitstream(data: BufferViewData, length: u64) -> Tiles3dResult<Self> {
        let required = length.div_ceil(8);
        if (data.len() as u64) < required {
            return Err(Tiles3dError::invalid_subtree(format!(
                "availability bitstream needs {required} bytes for {length} entries, but has {}",
                data.len()
            )));
        }
        Ok(Self::Bitstream { data, length })
    }

    /// Build availability from its descriptor and the resolved buffer views
    pub fn create(
        availability: &Availability,
        buffer_views: &[BufferViewData],
        length: u64,
    ) -> Tiles3dResult<Self> {
        if let Some(constant) = availability.constant {
            return match constant {
                0 => Ok(Self::constant(false, length)),
                1 => Ok(Self::constant(true, length)),
                other => Err(Tiles3dError::invalid_subtree(format!(
                    "availability constant must be 0 or 1, but is {other}"
                ))),
            };
        }
        let Some(index) = availability.bitstream else {
            return Err(Tiles3dError::invalid_subtree(
                "availability has neither a constant nor a bitstream",
            ));
        };
        let data = buffer_views.get(index).ok_or_else(|| {
            Tiles3dError::invalid_subtree(format!(
                "availability bitstream refers to missing buffer view {index}"
            ))
        })?;
        Self::bitstream(data.clone(), length)
    }

    pub fn length(&self) -> u64 {
        match self {
            Self::Constant { length, .. } | Self::Bitstream { length, .. } => *length,
        }
    }

    pub fn is_available(&self, index: u64) -> Tiles3dResult<bool> {
        match self {
            Self::Constant { available, .. } => Ok(*available),
            Self::Bitstream { data, length } => {
                if index >= *length {
                    return Err(Tiles3dError::AvailabilityOutOfRange {
                        index,
                        length: *length,
                    });
                }
                // In range: the constructor checked the byte count
                let byte = data[(index / 8) as usize];
                Ok((byte >> (index % 8)) & 1 == 1)
            }
        }
    }

    /// Number of available indices
    pub fn available_count(&self) -> u64 {
        match self {
            Self::Constant { available: true, length } => *length,
            Self::Constant { available: false, .. } => 0,
            Self::Bitstream { data, length } => {
                let full_bytes = (*length / 8) as usize;
                let mut count: u64 = data[..full_bytes].iter().map(|b| u64::from(b.count_ones())).sum();
                let remainder = *length % 8;
                if remainder > 0 {
                    let mask = (1u8 << remainder) - 1;
                    count += u64::from((data[full_bytes] & mask).count_ones());
                }
                count
            }
        }
    }

    /// Mapping from availability index to property table row: the number of
    /// available entries before it, or `None` if it is unavailable.
    pub fn indexing(&self) -> Tiles3dResult<AvailabilityIndexing> {
        let length = self.length();
        match self {
            Self::Constant { available: true, .. } => Ok(AvailabilityIndexing::Identity { length }),
            Self::Constant { available: false, .. } => Ok(AvailabilityIndexing::Unavailable),
            Self::Bitstream { .. } => {
                let capacity = usize::try_from(length)
                    .map_err(|_| Tiles3dError::invalid_subtree("availability is too long to index"))?;
                let mut rows = Vec::with_capacity(capacity);
                let mut row: u32 = 0;
                for index in 0..length {
                    if self.is_available(index)? {
                        rows.push(Some(row));
                        row += 1;
                    } else {
                        rows.push(None);
                    }
                }
                Ok(AvailabilityIndexing::Rows(rows))
            }
        }
    }
}

/// Property table rows of availability indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityIndexing {
    /// Everything is available; the row is the index itself
    Identity { length: u64 },
    /// Nothing is available
    Unavailable,
    /// Per index, decoded from a bitstream
    Rows(Vec<Option<u32>>),
}

impl AvailabilityIndexing {
    pub fn row(&self, index: u64) -> Option<u32> {
        match self {
            Self::Identity { length } if index < *length => u32::try_from(index).ok(),
            Self::Identity { .. } | Self::Unavailable => None,
            Self::Rows(rows) => usize::try_from(index)
                .ok()
                .and_then(|i| rows.get(i).copied().flatten()),
        }
    }
}
