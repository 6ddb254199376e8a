use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fatkit_core::device::{BlockDevice, BlockDeviceMut, FileDevice};

#[derive(Debug, Parser)]
#[command(name = "fatkit", about = "FAT12/16/32 volume analysis and recovery")]
struct Args {
    /// Path to the raw disk image or block device.
    image: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse and print the boot sector, falling back to the backup copy or a brute-force search
    /// if the primary sector doesn't look right.
    Info,
    /// Print the FSINFO diagnostic sector (FAT32 only).
    FsInfo,
    /// Print the full directory tree.
    Tree {
        /// Include deleted entries in the listing.
        #[arg(long)]
        scan_deleted: bool,
    },
    /// Extract a single file by path.
    Extract {
        /// DOS-style path within the volume, e.g. `DOCS\REPORT.TXT`.
        #[arg(short, long)]
        path: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Treat `path` as a deleted entry and recover it without trusting the FAT chain.
        #[arg(long)]
        deleted: bool,
    },
    /// Scan for signature-carvable file fragments, independent of the FAT/directory metadata.
    Carve {
        #[arg(short, long)]
        output: PathBuf,
        /// Restrict to one signature kind (e.g. `jpeg`, `pdf`); default is all known kinds.
        #[arg(long = "carve-type")]
        carve_type: Option<String>,
    },
    /// Run the scored brute-force boot sector search and print the best candidate.
    RecoverBoot {
        /// Write the recovered boot sector to sector 0. Requires the exact confirmation token
        /// printed by a dry run, as a guard against an accidental, irreversible write.
        #[arg(long)]
        apply: Option<String>,
    },
    /// Compare the two on-disk FAT copies byte for byte and report where they diverge.
    RecoverFat,
    /// Run boot sector recovery, FAT comparison, and a deleted-file scan together, prompting
    /// once before any write.
    InteractiveRepair,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn })
        .init();

    match args.command {
        Command::Info => info(&args.image),
        Command::FsInfo => fs_info(&args.image),
        Command::Tree { scan_deleted } => tree(&args.image, scan_deleted),
        Command::Extract { path, output, deleted } => extract(&args.image, &path, &output, deleted),
        Command::Carve { output, carve_type } => carve(&args.image, &output, carve_type.as_deref()),
        Command::RecoverBoot { apply } => recover_boot(&args.image, apply.as_deref()),
        Command::RecoverFat => recover_fat(&args.image),
        Command::InteractiveRepair => interactive_repair(&args.image),
    }
}

fn open(image: &PathBuf) -> Result<FileDevice> {
    FileDevice::open(image).with_context(|| format!("opening {}", image.display()))
}

fn parse_or_recover(device: &mut FileDevice) -> Result<fatkit::boot_sector::BootSector> {
    match fatkit::boot_sector::read_primary(device) {
        Ok(bs) if bs.findings.is_empty() => Ok(bs),
        primary => {
            log::warn!("primary boot sector unusable: {primary:?}, trying backup/search");
            if let Some(backup) = fatkit::recovery::recover_from_backup(device) {
                return Ok(backup);
            }
            let candidate = fatkit::recovery::recover_by_search(device)
                .context("no usable boot sector found by backup or brute-force search")?;
            log::info!("recovered layout by search, score {}", candidate.score);
            Ok(fatkit::boot_sector::BootSector {
                layout: candidate.layout,
                findings: Vec::new(),
                oem_name: String::new(),
                volume_label: String::new(),
                volume_id: 0,
            })
        }
    }
}

fn info(image: &PathBuf) -> Result<()> {
    let mut device = open(image)?;
    let bs = parse_or_recover(&mut device)?;
    println!("{:#?}", bs.layout);
    println!("variant: {:?}", bs.layout.fat_variant());
    if !bs.findings.is_empty() {
        println!("findings: {:?}", bs.findings);
    }
    Ok(())
}

fn fs_info(image: &PathBuf) -> Result<()> {
    let mut device = open(image)?;
    let bs = parse_or_recover(&mut device)?;
    match fatkit::fs_info::read(&mut device, &bs.layout)? {
        Some(info) => println!("{info:#?}"),
        None => println!("no FSINFO sector (not a FAT32 volume)"),
    }
    Ok(())
}

fn tree(image: &PathBuf, scan_deleted: bool) -> Result<()> {
    let mut device = open(image)?;
    let bs = parse_or_recover(&mut device)?;
    let fat = fatkit::fat::FatTable::read(&mut device, &bs.layout, 0)?;
    let nodes = fatkit::tree::walk_tree(&mut device, &bs.layout, &fat, scan_deleted)?;
    for node in fatkit::tree::flatten(&nodes) {
        let marker = if node.entry.deleted { "*" } else { " " };
        println!("{marker} {}  ({} bytes)", node.path, node.entry.size);
    }
    Ok(())
}

fn extract(image: &PathBuf, path: &str, output: &PathBuf, deleted: bool) -> Result<()> {
    if output.exists() {
        bail!("{} already exists, refusing to overwrite", output.display());
    }
    let mut device = open(image)?;
    let bs = parse_or_recover(&mut device)?;
    let fat = fatkit::fat::FatTable::read(&mut device, &bs.layout, 0)?;
    let nodes = fatkit::tree::walk_tree(&mut device, &bs.layout, &fat, deleted)?;
    let bytes = fatkit::extract::extract_path(&mut device, &bs.layout, &fat, &nodes, path)
        .with_context(|| format!("extracting {path}"))?;
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

fn recover_fat(image: &PathBuf) -> Result<()> {
    let mut device = open(image)?;
    let bs = parse_or_recover(&mut device)?;
    if bs.layout.num_fats < 2 {
        println!("volume declares only one FAT copy, nothing to compare");
        return Ok(());
    }
    let a = fatkit::fat::FatTable::read(&mut device, &bs.layout, 0)?;
    let b = fatkit::fat::FatTable::read(&mut device, &bs.layout, 1)?;
    let divergences = fatkit::fat::compare_copies(&a, &b);
    if divergences.is_empty() {
        println!("FAT copies are identical");
    } else {
        println!("{} divergent byte(s) between FAT copies:", divergences.len());
        for d in divergences.iter().take(20) {
            println!("  offset {}: {:#04x} vs {:#04x}", d.byte_offset, d.copy_a, d.copy_b);
        }
        if divergences.len() > 20 {
            println!("  ... and {} more", divergences.len() - 20);
        }
    }
    Ok(())
}

/// Runs boot sector recovery, FAT comparison, and a deleted-file scan in sequence, then offers
/// the same `--apply` confirmation as `recover-boot` before writing anything.
fn interactive_repair(image: &PathBuf) -> Result<()> {
    info(image)?;
    recover_fat(image)?;
    tree(image, true)?;

    let mut device = open(image)?;
    let candidate = fatkit::recovery::recover_by_search(&mut device)
        .context("no usable boot sector found")?;
    let token = confirmation_token(&candidate);
    println!("run `recover-boot --apply {token}` to write the recovered boot sector, or `y`/`yes` below to do it now");

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        recover_boot(image, Some(&token))
    } else {
        println!("no changes written");
        Ok(())
    }
}

fn carve(image: &PathBuf, output: &PathBuf, carve_type: Option<&str>) -> Result<()> {
    let mut device = open(image)?;
    let table: Vec<_> = fatkit::carve::SIGNATURES
        .iter()
        .copied()
        .filter(|sig| carve_type.is_none_or(|k| sig.kind == k))
        .collect();
    let hits = fatkit::carve::carve(&mut device, &table, fatkit::carve::MAX_CARVE_BYTES)?;
    std::fs::create_dir_all(output)?;
    for (i, hit) in hits.iter().enumerate() {
        let name = output.join(format!("carve_{i:04}_{}.{}", hit.offset, hit.kind));
        if name.exists() {
            bail!("{} already exists, refusing to overwrite", name.display());
        }
        let mut buf = alloc_vec(hit.length as usize);
        device.read_bytes(hit.offset, &mut buf)?;
        std::fs::write(&name, &buf)?;
        println!(
            "{} {} bytes at offset {}{}",
            name.display(),
            hit.length,
            hit.offset,
            if hit.footer_found { "" } else { " (truncated, no footer found)" }
        );
    }
    println!("{} fragment(s) carved", hits.len());
    Ok(())
}

fn alloc_vec(len: usize) -> Vec<u8> {
    vec![0u8; len]
}

fn recover_boot(image: &PathBuf, apply: Option<&str>) -> Result<()> {
    let mut device = open(image)?;
    let candidate = fatkit::recovery::recover_by_search(&mut device)
        .context("no usable boot sector found")?;
    println!("{:#?}", candidate.layout);
    println!("score: {}", candidate.score);

    let token = confirmation_token(&candidate);
    match apply {
        None => {
            println!("to write this boot sector, re-run with --apply {token}");
        }
        Some(given) if given == token => {
            let backup_path = image.with_extension("fatkit-backup");
            let mut primary = [0u8; 512];
            device.read_sectors(0, &mut primary)?;
            std::fs::write(&backup_path, primary)
                .with_context(|| format!("writing backup to {}", backup_path.display()))?;
            println!("backed up existing sector 0 to {}", backup_path.display());

            let mut writer = FileDevice::open_read_write(image)?;
            let sector = fatkit::boot_sector::encode(&candidate.layout);
            writer.write_sectors(0, &sector)?;
            println!("wrote recovered boot sector to sector 0");
        }
        Some(_) => bail!("confirmation token does not match; re-run with --apply {token}"),
    }
    Ok(())
}

/// A short, deterministic token derived from the candidate layout, required verbatim via
/// `--apply` before sector 0 is overwritten -- this is not a security control, just a guard
/// against running the wrong `--apply` flag left over from a different invocation.
fn confirmation_token(candidate: &fatkit::recovery::ScoredCandidate) -> String {
    format!(
        "{}x{}-{}",
        candidate.layout.bytes_per_sector, candidate.layout.sectors_per_cluster, candidate.score
    )
}
