//! Tunable knobs for long-running scans. These are the numeric defaults the CLI surface exposes
//! as flags; the library always takes them explicitly rather than reaching for a global.

/// Bounds and cadence for cluster-chain, recovery-search, and carving scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// How often (in sectors scanned) a long-running scan logs progress.
    pub progress_interval_sectors: u32,
    /// Hard cap on bytes read for an arbitrary cluster-chain read.
    pub max_chain_read_bytes: u64,
    /// Hard cap on bytes carved for a single signature match.
    pub max_carve_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            progress_interval_sectors: 1000,
            max_chain_read_bytes: 10 * 1024 * 1024,
            max_carve_bytes: 10 * 1024 * 1024,
        }
    }
}
