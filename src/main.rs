//! CLI for jpegtrace: print the segment structure of JPEG files or whole directories.

#![cfg(feature = "cli")]

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use clap::Parser;
use indexmap::IndexMap;
use jpegtrace::report::{render, render_summary, ReportConfig};
use jpegtrace::{analyze, AnalysisResult, Classification};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Parser)]
#[command(name = "jpegtrace")]
#[command(about = "Walk JPEG marker segments, embedded thumbnails, MPF images and concatenated streams", long_about = None)]
struct Args {
    /// Path to a file or directory to scan (use -d/--directory to scan a whole directory)
    path: Option<String>,

    /// Scan a whole directory (optionally with -r to recurse into subdirectories)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    directory: Option<String>,

    /// When scanning a directory, recurse into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// File extensions to scan (comma-separated). Files without an extension are always scanned.
    #[arg(short, long, default_value = "jpg,jpeg,jpe,jfif,mpo,thm")]
    extensions: String,

    /// Scan all files regardless of extension
    #[arg(long)]
    all: bool,

    /// Output JSON per result (one line per file unless --pretty)
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON (use with --json)
    #[arg(long)]
    pretty: bool,

    /// Quiet: only print the summary line per file
    #[arg(short, long)]
    quiet: bool,

    /// Verbose: long marker descriptions and frame precision
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn report_config(&self) -> ReportConfig {
        ReportConfig {
            verbose: self.verbose,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let exts: HashSet<String> = args
        .extensions
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let path_str = args
        .directory
        .as_ref()
        .or(args.path.as_ref())
        .ok_or("Missing path: give a file/directory as argument or use -d/--directory <DIR>")?;
    let path = Path::new(path_str.as_str());

    if !path.exists() {
        eprintln!("Not found: {}", path.display());
        std::process::exit(1);
    }

    if path.is_file() {
        if args.directory.is_some() {
            eprintln!("--directory expects a directory, not a file: {}", path.display());
            std::process::exit(1);
        }
        let ok = scan_file(path, &args)?;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    if path.is_dir() {
        if !args.quiet {
            eprintln!(
                "Scanning directory: {} {}",
                path.display(),
                if args.recursive { "(recursive)" } else { "" }
            );
        }
        scan_dir(path, &args, &exts)?;
        return Ok(());
    }

    eprintln!("Not a file or directory: {}", path.display());
    std::process::exit(1);
}

/// Read and report one file. Returns `false` when the file could not be analyzed.
fn scan_file(path: &Path, args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("ERROR: can't read {}: {}", path.display(), e);
            return Ok(false);
        }
    };
    if bytes.is_empty() {
        eprintln!("ERROR: {}: filesize = 0", path.display());
        return Ok(false);
    }
    let result = analyze(&bytes);
    print_result(path.display().to_string(), &result, args, &bytes)?;
    Ok(true)
}

fn scan_dir(
    dir: &Path,
    args: &Args,
    exts: &HashSet<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let walker = if args.recursive {
        WalkDir::new(dir).into_iter()
    } else {
        WalkDir::new(dir).max_depth(1).into_iter()
    };

    let mut total = 0u64;
    let mut jpegs = 0u64;
    let mut damaged = 0u64;

    for entry in walker.filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.') || e.depth() == 0) {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !args.all && !ext.is_empty() && !exts.is_empty() && !exts.contains(&ext) {
            continue;
        }
        total += 1;
        let bytes = match fs::read(path) {
            Ok(b) if !b.is_empty() => b,
            _ => continue,
        };
        let result = analyze(&bytes);
        if result.is_jpeg() {
            jpegs += 1;
        }
        if result.summary.first_stop.is_some() {
            damaged += 1;
        }
        print_result(path.display().to_string(), &result, args, &bytes)?;
    }

    if !args.quiet {
        eprintln!(
            "Scanned {} files, {} JPEG, {} stopped early",
            total, jpegs, damaged
        );
    }
    Ok(())
}

fn print_result(
    path: String,
    result: &AnalysisResult,
    args: &Args,
    bytes: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let sha256 = sha256_hex(bytes);
    if args.json {
        let mut out = IndexMap::<String, serde_json::Value>::new();
        out.insert("sha256".to_string(), serde_json::Value::String(sha256));
        out.insert("path".to_string(), serde_json::Value::String(path));
        out.insert("size_bytes".to_string(), serde_json::to_value(result.size_bytes)?);
        out.insert("summary".to_string(), serde_json::to_value(&result.summary)?);
        if !args.quiet {
            out.insert("finding".to_string(), serde_json::to_value(&result.finding)?);
        }
        let json_str = if args.pretty {
            serde_json::to_string_pretty(&out)?
        } else {
            serde_json::to_string(&out)?
        };
        println!("{}", json_str);
        return Ok(());
    }

    println!();
    println!("{}", path);
    println!("{}", "-".repeat(path.chars().count()));
    println!("  sha256: {}", sha256);
    println!("  size: {} bytes", result.size_bytes);
    if !args.quiet && result.summary.classification == Classification::Jpeg {
        for line in render(&result.finding, &args.report_config()) {
            println!("{}", line);
        }
    }
    println!("{}", render_summary(&result.summary));
    Ok(())
}
