//! Recursive directory tree walking, live and deleted.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use fatkit_core::device::BlockDevice;

use crate::chain::{self, MAX_CHAIN_CLUSTERS};
use crate::error::ChainError;
use crate::fat::FatTable;
use crate::layout::Layout;
use crate::structures::directory::{DecodedEntry, decode_entries};

/// One node of a walked directory tree: the decoded entry plus, for a directory, its children.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub entry: DecodedEntry,
    pub path: String,
    pub children: Vec<TreeNode>,
}

/// Reads the root directory region (FAT12/16) or the root directory's cluster chain (FAT32) and
/// decodes it. FAT32 has no fixed-size root region; its root is cluster `layout.root_cluster`
/// like any other directory.
fn read_root<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    fat: &FatTable,
) -> Result<Vec<u8>, ChainError> {
    use crate::layout::FatVariant;
    if layout.fat_variant() == FatVariant::Fat32 {
        let root_chain = chain::walk(fat, layout, layout.root_cluster)?;
        chain::read_chain(device, layout, &root_chain, None)
    } else {
        let mut buf = alloc::vec![0u8; layout.root_dir_sectors() as usize * layout.bytes_per_sector as usize];
        device.read_sectors(layout.root_dir_start() as u64, &mut buf)?;
        Ok(buf)
    }
}

/// Walks the volume from the root, recursing into subdirectories.
///
/// `include_deleted` is forwarded to the directory decoder at every level: a deleted directory
/// entry is included as a leaf (its own cluster chain is not followed, since a deleted
/// directory's former children are themselves separately discoverable as deleted entries in
/// whatever cluster their parent used to occupy, and walking into it risks the cluster having
/// been reused).
pub fn walk_tree<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    fat: &FatTable,
    include_deleted: bool,
) -> Result<Vec<TreeNode>, ChainError> {
    let root_bytes = read_root(device, layout, fat)?;
    let mut visited = alloc::collections::BTreeSet::new();
    visited.insert(layout.root_cluster);
    walk_entries(device, layout, fat, &root_bytes, "", include_deleted, &mut visited)
}

fn walk_entries<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
    fat: &FatTable,
    buffer: &[u8],
    parent_path: &str,
    include_deleted: bool,
    visited: &mut alloc::collections::BTreeSet<u32>,
) -> Result<Vec<TreeNode>, ChainError> {
    let entries = decode_entries(buffer, include_deleted);
    let mut nodes = Vec::new();

    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let path = if parent_path.is_empty() {
            entry.name.clone()
        } else {
            alloc::format!("{parent_path}\\{}", entry.name)
        };

        let children = if entry.is_directory() && !entry.deleted && entry.start_cluster >= 2 {
            if visited.len() >= MAX_CHAIN_CLUSTERS || visited.contains(&entry.start_cluster) {
                // Already visited: a cyclic directory graph, skip recursing to avoid looping.
                Vec::new()
            } else {
                visited.insert(entry.start_cluster);
                match chain::walk(fat, layout, entry.start_cluster) {
                    Ok(dir_chain) => {
                        let dir_bytes = chain::read_chain(device, layout, &dir_chain, None)?;
                        walk_entries(device, layout, fat, &dir_bytes, &path, include_deleted, visited)?
                    }
                    Err(_) => Vec::new(),
                }
            }
        } else {
            Vec::new()
        };

        nodes.push(TreeNode { entry, path, children });
    }

    Ok(nodes)
}

/// Flattens a tree into a depth-first list of nodes, for callers that want a plain listing
/// rather than the recursive shape (e.g. the CLI's `--tree` and `--scan-deleted` output).
pub fn flatten(nodes: &[TreeNode]) -> Vec<&TreeNode> {
    let mut out = Vec::new();
    fn visit<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
        out.push(node);
        for child in &node.children {
            visit(child, out);
        }
    }
    for node in nodes {
        visit(node, &mut out);
    }
    out
}
