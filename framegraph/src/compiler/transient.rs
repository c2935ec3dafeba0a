//! Transient heap placement.
//!
//! Each device gets one transient heap per frame. With aliasing enabled,
//! an attachment is placed at the lowest aligned offset that does not
//! collide with any attachment still in flight: one whose users are not
//! all ordered before the new attachment's users. Without aliasing,
//! attachments are laid out back to back.

use std::collections::BTreeMap;

use super::lifetime::{ExecutionOrdering, TransientUsage};
use crate::attachment::HeapPlacement;
use crate::device::DeviceIndex;

/// Transient heap usage of one device for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransientHeapStatistics {
    /// Device the heap belongs to.
    pub device: DeviceIndex,
    /// Bytes the heap needs.
    pub heap_size: u64,
    /// Bytes the heap would need without aliasing.
    pub unaliased_size: u64,
    /// Transient attachments placed in the heap.
    pub attachment_count: u32,
}

impl TransientHeapStatistics {
    /// Bytes saved by aliasing.
    pub fn saved_bytes(&self) -> u64 {
        self.unaliased_size.saturating_sub(self.heap_size)
    }
}

/// A placement decided for one transient usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransientPlacement {
    pub(crate) attachment: usize,
    pub(crate) device: DeviceIndex,
    pub(crate) placement: HeapPlacement,
    /// Shares memory with an attachment placed before it.
    pub(crate) aliased: bool,
}

/// Places transient attachments in per-device heaps.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransientAllocator {
    aliasing: bool,
    alignment: u64,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl TransientAllocator {
    pub(crate) fn new(aliasing: bool, alignment: u64) -> Self {
        Self {
            aliasing,
            alignment: alignment.max(1),
        }
    }

    /// Place every usage. `usages` must be ordered by first use.
    pub(crate) fn allocate(
        &self,
        usages: &[TransientUsage],
        ordering: &ExecutionOrdering,
    ) -> (Vec<TransientPlacement>, Vec<TransientHeapStatistics>) {
        scopegraph_core::profile_scope!("transient_allocation");

        let mut per_device: BTreeMap<DeviceIndex, Vec<&TransientUsage>> = BTreeMap::new();
        for usage in usages {
            per_device.entry(usage.device).or_default().push(usage);
        }

        let mut placements = Vec::with_capacity(usages.len());
        let mut statistics = Vec::with_capacity(per_device.len());
        for (device, usages) in per_device {
            let mut placed: Vec<(&TransientUsage, HeapPlacement)> =
                Vec::with_capacity(usages.len());
            let mut stats = TransientHeapStatistics {
                device,
                ..Default::default()
            };
            for usage in usages {
                let bump = align_up(stats.unaliased_size, self.alignment);
                let offset = if self.aliasing {
                    self.first_fit(usage, &placed, ordering)
                } else {
                    bump
                };
                let placement = HeapPlacement {
                    offset,
                    size: usage.size,
                };
                let aliased = placed
                    .iter()
                    .any(|(_, earlier)| earlier.overlaps(&placement));
                stats.heap_size = stats.heap_size.max(placement.end());
                stats.unaliased_size = bump + usage.size;
                stats.attachment_count += 1;
                placed.push((usage, placement));
                placements.push(TransientPlacement {
                    attachment: usage.attachment,
                    device,
                    placement,
                    aliased,
                });
            }
            statistics.push(stats);
        }
        (placements, statistics)
    }

    /// Lowest aligned offset where `usage` fits between the placements of
    /// attachments that may still be in use when it starts.
    fn first_fit(
        &self,
        usage: &TransientUsage,
        placed: &[(&TransientUsage, HeapPlacement)],
        ordering: &ExecutionOrdering,
    ) -> u64 {
        let mut conflicts: Vec<HeapPlacement> = placed
            .iter()
            .filter(|(earlier, _)| !earlier.retires_before(usage, ordering))
            .map(|(_, placement)| *placement)
            .collect();
        conflicts.sort_by_key(|placement| (placement.offset, placement.size));

        let mut candidate = 0;
        for conflict in conflicts {
            if candidate + usage.size <= conflict.offset {
                break;
            }
            candidate = candidate.max(align_up(conflict.end(), self.alignment));
        }
        candidate
    }
}
