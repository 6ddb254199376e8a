//! Cluster chain traversal.
//!
//! A chain is just repeated FAT lookups starting from some cluster, but a corrupt or deliberately
//! cyclic FAT can turn a naive walk into an infinite loop; every reader here keeps a visited set
//! and a hard length cap so a damaged volume degrades to an error instead of a hang.

extern crate alloc;

use alloc::vec::Vec;

use fatkit_core::device::BlockDevice;

use crate::error::ChainError;
use crate::fat::FatTable;
use crate::layout::Layout;

/// Cluster chains longer than this are treated as corrupt rather than walked to completion.
/// Generous enough for any real volume (a 2TB FAT32 volume with 4KiB clusters has well under
/// 512M clusters total), small enough to bound worst-case memory use from a hostile FAT.
pub const MAX_CHAIN_CLUSTERS: usize = 16 * 1024 * 1024;

/// Returns the ordered list of data clusters making up the chain starting at `start_cluster`.
///
/// Detects revisits (a cycle) and out-of-range entries, surfacing each as a typed
/// [`ChainError`] rather than silently truncating, since both indicate the FAT itself is
/// unreliable at that point -- exactly the signal [`crate::recovery`] needs.
pub fn walk(fat: &FatTable, layout: &Layout, start_cluster: u32) -> Result<Vec<u32>, ChainError> {
    let mut chain = Vec::new();
    let mut visited = alloc::collections::BTreeSet::new();
    let mut cluster = start_cluster;
    let total_clusters = layout.total_clusters();

    loop {
        if cluster < 2 || cluster >= total_clusters + 2 {
            return Err(ChainError::OutOfRange(cluster));
        }
        if !visited.insert(cluster) {
            return Err(ChainError::Cycle(cluster));
        }
        if chain.len() >= MAX_CHAIN_CLUSTERS {
            return Err(ChainError::TooLong);
        }
        chain.push(cluster);

        let entry = fat.entry(cluster)?;
        if fat.is_end_of_chain(entry) {
            break;
        }
        if entry == 0 || entry == fat.variant().bad_cluster_marker() {
            return Err(ChainError::OutOfRange(cluster));
        }
        cluster = entry;
    }

    Ok(chain)
}

/// Reads every cluster in `chain` and concatenates their bytes, truncating to `size` if given
/// (a file's directory-entry size is authoritative over the chain's total byte capacity, since
/// the last cluster is usually only partially used).
pub fn read_chain<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    chain: &[u32],
    size: Option<u32>,
) -> Result<Vec<u8>, ChainError> {
    let cluster_bytes = layout.bytes_per_cluster() as usize;
    let mut out = Vec::with_capacity(chain.len() * cluster_bytes);
    let mut cluster_buf = alloc::vec![0u8; cluster_bytes];
    for &cluster in chain {
        let sector = layout.cluster_to_sector(cluster) as u64;
        device.read_sectors(sector, &mut cluster_buf)?;
        out.extend_from_slice(&cluster_buf);
    }
    if let Some(size) = size {
        out.truncate(size as usize);
    }
    Ok(out)
}
