//! Main entry point for the apksigblock CLI application.
//!
//! This binary prints the layout and ID-value pairs of an APK Signing Block,
//! from either a local file or a remote HTTP URL.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};

use apksigblock::signing_block::block_id_name;
use apksigblock::{
    ApkLayout, Cli, FileRegion, HttpRangeReader, LocalFileReader, ReadAt, extract_sections,
    locate_signing_block, parse_pair_list,
};

/// Writes log records to stderr; the level is set from `-v`/`-q`.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Application entry point.
///
/// Parses command-line arguments and dispatches to the appropriate handler
/// based on whether the input is a local file or HTTP URL.
fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(msg) = cli.validate() {
        bail!(msg);
    }

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(cli.log_level());
    }

    if cli.is_http_url() {
        // Handle remote APK via HTTP Range requests
        let reader = HttpRangeReader::new(cli.file.clone())?;
        process_apk(&reader, &cli)?;

        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))
            .with_context(|| format!("cannot open {}", cli.file))?;
        process_apk(&reader, &cli)?;
    }

    Ok(())
}

/// Process an APK based on CLI options.
///
/// - Pipe mode (`-p`): write one pair's value to stdout
/// - Dump mode (`-d`): write the four regions to a directory
/// - Otherwise: print the layout and the pairs
fn process_apk<R: ReadAt>(reader: &R, cli: &Cli) -> Result<()> {
    if let Some(dir) = &cli.dump_dir {
        return dump_sections(reader, Path::new(dir), cli.is_quiet());
    }

    let (layout, block) = locate_signing_block(reader)?;

    if let Some(id) = cli.pipe {
        return pipe_value(&block, id);
    }

    if !cli.list {
        print_layout(&layout);
        println!();
    }
    list_pairs(&block, cli.list)
}

/// Print offset and size of each region.
fn print_layout(layout: &ApkLayout) {
    println!("{:>12}  {:>12}  Region", "Offset", "Size");
    let rows = [
        (0, layout.content_entries_len(), "Contents of ZIP entries"),
        (
            layout.signing_block_offset,
            layout.signing_block_len(),
            "APK Signing Block",
        ),
        (
            layout.central_dir_offset,
            layout.central_dir_len(),
            "ZIP Central Directory",
        ),
        (
            layout.eocd_offset,
            layout.eocd_len(),
            "ZIP End of Central Directory",
        ),
    ];
    for (offset, size, name) in rows {
        println!("{:>12}  {:>12}  {}", offset, size, name);
    }
    println!("{}", "-".repeat(50));
    println!("{:>12}  {:>12}  total", "", layout.file_size);
}

/// List the ID-value pairs of the block.
///
/// Duplicate IDs are shown as they appear in the block.
fn list_pairs(block: &FileRegion, short: bool) -> Result<()> {
    let pairs = parse_pair_list(&block.bytes)?;

    if short {
        for pair in &pairs {
            println!("{:#010x}", pair.id);
        }
        return Ok(());
    }

    println!("{:>10}  {:>10}  Name", "ID", "Size");
    for pair in &pairs {
        println!(
            "{:#010x}  {:>10}  {}",
            pair.id,
            pair.value.len(),
            block_id_name(pair.id).unwrap_or("-")
        );
    }
    println!("{}", "-".repeat(50));
    println!("{:>10}  {:>10}  {} pairs", "", block.len(), pairs.len());
    Ok(())
}

/// Write the value of pair `id` to stdout.
fn pipe_value(block: &FileRegion, id: u32) -> Result<()> {
    let pairs = parse_pair_list(&block.bytes)?;
    // Last occurrence wins, like the map form
    let Some(pair) = pairs.iter().rev().find(|p| p.id == id) else {
        bail!("No pair with ID {:#010x} in APK Signing Block", id);
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&pair.value)?;
    stdout.flush()?;
    Ok(())
}

/// Extract all regions and write each to its own file under `dir`.
fn dump_sections<R: ReadAt>(reader: &R, dir: &Path, quiet: bool) -> Result<()> {
    let sections = extract_sections(reader)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create {}", dir.display()))?;

    let files = [
        ("content_entries.bin", &sections.content_entries),
        ("signing_block.bin", &sections.signing_block),
        ("central_dir.bin", &sections.central_dir),
        ("eocd.bin", &sections.eocd),
    ];
    for (name, region) in files {
        let path: PathBuf = dir.join(name);
        std::fs::write(&path, &region.bytes)
            .with_context(|| format!("cannot write {}", path.display()))?;
        if !quiet {
            println!(
                "  wrote: {} ({} at offset {})",
                path.display(),
                format_size(region.len()),
                region.offset
            );
        }
    }
    Ok(())
}

/// Format a byte size as a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
