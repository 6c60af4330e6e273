use std::path::PathBuf;
use std::sync::Arc;

use pico_args::Arguments;
use serde::Serialize;
use spacescan::{layout, util, FileCrawler, ProgressReporter, Rect, ScanOptions, TreeIndex};

#[derive(Serialize)]
struct Snapshot {
    root: String,
    total_size: u64,
    node_count: u64,
    max_depth: u32,
    issues: usize,
    rects: usize,
    elapsed_ms: u128,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("bench_scan: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = Arguments::from_env();
    let snapshot_path: Option<PathBuf> = args
        .opt_value_from_str("--snapshot")
        .map_err(|e| e.to_string())?;
    let skip_hidden = args.contains("--skip-hidden");
    let root_arg: Option<String> = args.opt_free_from_str().map_err(|e| e.to_string())?;
    let leftover = args.finish();
    if !leftover.is_empty() {
        return Err("unexpected positional arguments".into());
    }

    let root = match root_arg {
        Some(raw) => PathBuf::from(raw),
        None => std::env::current_dir().map_err(|e| e.to_string())?,
    };

    let reporter: ProgressReporter = Arc::new(|progress| {
        log::info!(
            "scanned {} files ({}) at {}",
            progress.files_scanned,
            util::format_size(progress.bytes_scanned),
            progress.current_path.display()
        );
    });

    let crawler = FileCrawler::with_options(ScanOptions { skip_hidden });
    let result = crawler
        .scan_with_progress(&root, Some(reporter))
        .map_err(|err| err.to_string())?;

    println!(
        "Scan complete: {} nodes, {} ({} skipped) in {:?}",
        result.node_count,
        util::format_size(result.root.total_size),
        result.issues.len(),
        result.elapsed,
    );

    let index = TreeIndex::build(&result.root);
    let rects = layout(&result.root, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    println!(
        "Indexed {} nodes, laid out {} rectangles",
        index.len(),
        rects.len()
    );

    if let Some(path) = snapshot_path {
        let snapshot = Snapshot {
            root: root.display().to_string(),
            total_size: result.root.total_size,
            node_count: result.node_count,
            max_depth: result.root.max_depth,
            issues: result.issues.len(),
            rects: rects.len(),
            elapsed_ms: result.elapsed.as_millis(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|err| err.to_string())?;
        std::fs::write(&path, json).map_err(|err| err.to_string())?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}
