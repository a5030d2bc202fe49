use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vdisk_core::config::{DEFAULT_CHUNK_SIZE, DEFAULT_ROOT};
use vdisk_core::localize::FluentLoc;
use vdisk_core::{FileRecord, Method, ReadPolicy, Storage, StorageConfig, StoreError};

#[derive(Parser)]
#[command(name = "vdisk", version, about = "Stripe or mirror files across directory-backed disks")]
struct Cli {
    /// Directory holding the disks and their metadata
    #[arg(long, env = "VDISK_ROOT", default_value = DEFAULT_ROOT, global = true)]
    root: PathBuf,
    /// Chunk size in bytes for new files
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,
    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Register several disks at once (NAME:SIZE ...); existing names are skipped
    Init { disks: Vec<String> },
    /// Add one disk
    AddDisk {
        name: String,
        #[arg(allow_negative_numbers = true)]
        size: i64,
    },
    /// Delete a disk and drop it from every file record
    RemoveDisk { name: String },
    /// List registered disks
    Disks,
    /// Bytes held by each disk
    Usage,
    /// Store a file
    Store {
        path: PathBuf,
        /// stripe or mirror
        #[arg(long, default_value = "stripe")]
        method: String,
        /// Comma-separated target disks (default: all)
        #[arg(long, value_delimiter = ',')]
        disks: Vec<String>,
    },
    /// List stored files
    Files {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Reassemble a stored file (by id or name) into a directory
    Retrieve {
        /// File id or name; a number matching an id is taken as the id
        file: String,
        /// Look FILE up by name only, even when it is numeric
        #[arg(long, default_value_t = false)]
        name: bool,
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Skip unavailable chunks instead of failing
        #[arg(long, default_value_t = false)]
        lenient: bool,
    },
    /// Re-hash every copy of a stored file
    Verify {
        /// File id or name; a number matching an id is taken as the id
        file: String,
        /// Look FILE up by name only, even when it is numeric
        #[arg(long, default_value_t = false)]
        name: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let loc = FluentLoc::builtin("en-GB");
    match run(cli, &loc) {
        Ok(code) => code,
        Err(e) => {
            debug!(error = ?e, "command failed");
            match e.downcast_ref::<StoreError>() {
                Some(se) => eprintln!("{}", loc.error(se)),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: Cli, loc: &FluentLoc) -> Result<ExitCode> {
    info!(root = %cli.root.display(), chunk_size = cli.chunk_size, command = ?cli.cmd, "opening store");
    let config = StorageConfig::new(&cli.root).with_chunk_size(cli.chunk_size);
    let mut st = Storage::open(config)?;
    match cli.cmd {
        Cmd::Init { disks } => init(&mut st, &disks)?,
        Cmd::AddDisk { name, size } => {
            let disk = st.add_disk(&name, size)?;
            let size = disk.size.to_string();
            println!("{}", loc.msg("disk-added", &[("name", disk.name.as_str()), ("size", size.as_str())]));
        }
        Cmd::RemoveDisk { name } => {
            let report = st.remove_disk(&name)?;
            let files = report.files_updated.to_string();
            let lost = report.unrecoverable.len().to_string();
            println!(
                "{}",
                loc.msg(
                    "disk-removed",
                    &[("name", name.as_str()), ("files", files.as_str()), ("lost", lost.as_str())],
                )
            );
            for lost in &report.unrecoverable {
                println!("  lost: #{} {} chunk {} ({})", lost.file_id, lost.file, lost.index, lost.hash.short());
            }
        }
        Cmd::Disks => {
            let disks = st.list_disks()?;
            if disks.is_empty() {
                println!("No disks initialized yet.");
            }
            for d in disks {
                println!("- {} (Size: {} bytes)", d.name, d.size);
            }
        }
        Cmd::Usage => {
            println!("{:<15}{:<15}{:<15}{:<10}", "Disk Name", "Declared", "Used", "Chunks");
            println!("{}", "=".repeat(55));
            for u in st.usage()? {
                let mark = if u.present { "" } else { " (missing)" };
                println!("{:<15}{:<15}{:<15}{:<10}{}", u.name, u.declared_size, u.used_bytes, u.chunk_files, mark);
            }
        }
        Cmd::Store { path, method, disks } => {
            let method: Method = method.parse()?;
            let targets = if disks.is_empty() { None } else { Some(disks.as_slice()) };
            let rec = st.store_path(&path, targets, method)?;
            let (id, method, chunks) =
                (rec.id.to_string(), rec.method.to_string(), rec.chunk_count.to_string());
            println!(
                "{}",
                loc.msg(
                    "file-stored",
                    &[
                        ("name", rec.name.as_str()),
                        ("id", id.as_str()),
                        ("method", method.as_str()),
                        ("chunks", chunks.as_str()),
                    ],
                )
            );
        }
        Cmd::Files { json } => {
            let files = st.list_files()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                list_files(&files);
            }
        }
        Cmd::Retrieve { file, name, output, lenient } => {
            let rec = lookup(&st, &file, name)?;
            let policy = if lenient { ReadPolicy::Lenient } else { ReadPolicy::Strict };
            let (path, gaps) = st.retrieve_to(&rec, &output, policy)?;
            let shown = path.display().to_string();
            println!("{}", loc.msg("file-retrieved", &[("name", rec.name.as_str()), ("path", shown.as_str())]));
            if !gaps.is_empty() {
                let count = gaps.len().to_string();
                eprintln!(
                    "{}",
                    loc.msg("file-truncated", &[("gaps", count.as_str()), ("path", shown.as_str())])
                );
                return Ok(ExitCode::from(2));
            }
        }
        Cmd::Verify { file, name } => {
            let rec = lookup(&st, &file, name)?;
            let r = st.verify(&rec)?;
            let merkle = match r.merkle_ok {
                Some(true) => "OK",
                Some(false) => "MISMATCH",
                None => "n/a",
            };
            eprintln!(
                "Chunks ok={}, lost={}; copies ok={}, bad={}, missing={}; Merkle={}",
                r.chunks_ok, r.chunks_lost, r.copies_ok, r.copies_bad, r.copies_missing, merkle
            );
            if r.is_healthy() {
                println!("OK");
            } else {
                println!("BAD");
                return Ok(ExitCode::from(2));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn lookup(st: &Storage, file: &str, by_name: bool) -> Result<FileRecord> {
    let rec = if by_name { st.find_by_name(file)? } else { st.find(file)? };
    debug!(selector = file, id = rec.id, name = %rec.name, "file resolved");
    Ok(rec)
}

fn init(st: &mut Storage, specs: &[String]) -> Result<()> {
    let parsed = specs.iter().map(|s| parse_disk_spec(s)).collect::<Result<Vec<_>>>()?;
    let added = st.init_disks(&parsed)?;
    for d in &added {
        println!("Initialized new disk: {} with size {} bytes.", d.name, d.size);
    }
    if added.is_empty() {
        println!("No new disks.");
    }
    Ok(())
}

fn parse_disk_spec(spec: &str) -> Result<(String, i64)> {
    let (name, size) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("bad disk spec {spec:?} (expected NAME:SIZE)"))?;
    let size = parse_size(size).with_context(|| format!("bad size in {spec:?}"))?;
    Ok((name.trim().to_string(), size))
}

/// Bytes, with an optional K/M/G suffix.
fn parse_size(s: &str) -> Result<i64> {
    let s = s.trim().to_uppercase();
    let (num, mul) = if let Some(n) = s.strip_suffix('K') {
        (n, 1i64 << 10)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1 << 20)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1 << 30)
    } else {
        (s.as_str(), 1)
    };
    let v: i64 = num.trim().parse().map_err(|_| anyhow!("bad size {s}"))?;
    v.checked_mul(mul).ok_or_else(|| anyhow!("size {s} overflows"))
}

fn list_files(files: &[FileRecord]) {
    if files.is_empty() {
        println!("No files are stored yet.");
        return;
    }
    for f in files {
        println!("{}. {} - Method: {}", f.id, f.name, f.method);
        println!("   Disks: {}", f.disks.join(", "));
        println!("   Chunks: {} chunks ({} bytes)", f.chunks.len(), f.size);
    }
}
