//! File extraction: locating a path in the tree and pulling its bytes off the volume.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use fatkit_core::device::BlockDevice;
use fatkit_core::path::DosPath;

use crate::chain;
use crate::error::ExtractError;
use crate::fat::FatTable;
use crate::layout::Layout;
use crate::tree::TreeNode;

/// Finds the tree node at `path` (backslash- or forward-slash-separated, case-insensitive
/// per DOS convention).
pub fn find<'a>(roots: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
    let mut dos_path = DosPath::new(path);
    let mut current = roots;
    let mut found: Option<&TreeNode> = None;

    while let Some((component, rest)) = dos_path.split_first() {
        let component = component.as_str();
        found = current.iter().find(|n| n.entry.name.eq_ignore_ascii_case(component));
        match found {
            Some(node) => current = &node.children,
            None => return None,
        }
        dos_path = rest;
    }

    found
}

/// Extracts a live (non-deleted) file's bytes.
pub fn extract_live<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    fat: &FatTable,
    node: &TreeNode,
) -> Result<Vec<u8>, ExtractError> {
    if node.entry.is_directory() {
        return Err(ExtractError::IsDirectory);
    }
    if node.entry.start_cluster < 2 {
        // A zero-length file often has no allocated cluster at all.
        return Ok(Vec::new());
    }
    let chain = chain::walk(fat, layout, node.entry.start_cluster)?;
    Ok(chain::read_chain(device, layout, &chain, Some(node.entry.size))?)
}

/// Extracts a deleted file by its recorded starting cluster, without trusting the FAT chain
/// (which has typically already been overwritten with zeros or reused by the next allocation).
/// Instead this reads sequential clusters starting at `start_cluster` for
/// `ceil(size / cluster_size)` clusters, which is correct whenever the file was contiguous and
/// none of its clusters have been reallocated -- the common case for files deleted shortly
/// before recovery is attempted, and the best any FAT-only recovery tool can do without journal
/// or log data.
pub fn extract_deleted<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    node: &TreeNode,
) -> Result<Vec<u8>, ExtractError> {
    if node.entry.is_directory() {
        return Err(ExtractError::IsDirectory);
    }
    if node.entry.start_cluster < 2 {
        return Ok(Vec::new());
    }
    let total_clusters = layout.total_clusters();
    if node.entry.start_cluster >= total_clusters + 2 {
        return Err(ExtractError::Chain(crate::error::ChainError::OutOfRange(node.entry.start_cluster)));
    }
    let cluster_bytes = layout.bytes_per_cluster();
    let clusters_needed = node.entry.size.div_ceil(cluster_bytes).max(1);
    let chain: Vec<u32> = (node.entry.start_cluster..)
        .take(clusters_needed as usize)
        .take_while(|&c| c < total_clusters + 2)
        .collect();
    Ok(chain::read_chain(device, layout, &chain, Some(node.entry.size))?)
}

/// Extracts the file (or errors with [`ExtractError::NotFound`]) at `path` out of a tree that
/// was walked with deleted entries included, dispatching to [`extract_live`] or
/// [`extract_deleted`] based on the entry's own state.
pub fn extract_path<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    fat: &FatTable,
    roots: &[TreeNode],
    path: &str,
) -> Result<Vec<u8>, ExtractError> {
    let node = find(roots, path).ok_or_else(|| ExtractError::NotFound(String::from(path)))?;
    if node.entry.deleted {
        extract_deleted(device, layout, node)
    } else {
        extract_live(device, layout, fat, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::directory::{DecodedEntry, FileAttributes};

    fn file_node(name: &str, deleted: bool, size: u32, cluster: u32) -> TreeNode {
        TreeNode {
            entry: DecodedEntry {
                name: name.into(),
                attributes: FileAttributes::ARCHIVE,
                start_cluster: cluster,
                size,
                deleted,
                long_name: false,
            },
            path: name.into(),
            children: Vec::new(),
        }
    }

    #[test]
    fn finds_nested_path_case_insensitively() {
        let child = file_node("child.txt", false, 5, 3);
        let dir = TreeNode {
            entry: DecodedEntry {
                name: "DIR".into(),
                attributes: FileAttributes::DIRECTORY,
                start_cluster: 2,
                size: 0,
                deleted: false,
                long_name: false,
            },
            path: "DIR".into(),
            children: alloc::vec![child],
        };
        let found = find(&[dir], "dir\\CHILD.TXT").unwrap();
        assert_eq!(found.entry.name, "child.txt");
    }

    #[test]
    fn deleted_file_with_no_cluster_is_empty() {
        let mut dev = fatkit_core::device::MemoryDevice::zeroed(16);
        let layout = crate::layout::Layout {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            num_fats: 1,
            sectors_per_fat: 1,
            root_entries: 0,
            total_sectors: 16,
            media_type: 0xF8,
            root_cluster: 2,
            fs_info_sector: 0,
            backup_boot_sector: 0,
        };
        let node = file_node("gone.txt", true, 0, 0);
        let bytes = extract_deleted(&mut dev, &layout, &node).unwrap();
        assert!(bytes.is_empty());
    }
}
