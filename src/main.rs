#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use dir_scout::app::{configure_egui_fonts, DirScoutApp};
use dir_scout::listing::{entries_or_empty, DirectorySource, FileEntry, LocalFs};
use dir_scout::picker::NativeDirectoryPicker;
use dir_scout::pipeline::{FileListPipeline, PipelineConfig};
use dir_scout::search::filter_entries;
use dir_scout::ui_model::{normalize_dir, row_text, size_label, status_text};
use dir_scout::watcher::DirWatcher;

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "dirscout")]
#[command(about = "Browse a directory's immediate contents with a live name filter")]
struct Args {
    #[arg(default_value = "")]
    query: String,
    /// Directory to open; defaults to the home directory.
    #[arg(long)]
    root: Option<PathBuf>,
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,
    #[arg(long, default_value_t = false)]
    cli: bool,
    /// With --cli, print the listing again whenever the directory changes.
    #[arg(long, default_value_t = false, requires = "cli")]
    watch: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }

    fn start_dir(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_listing<S: DirectorySource>(source: &S, dir: &Path, files: &[FileEntry]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in files {
        let label = size_label(source, dir, entry.file_name());
        writeln!(out, "{}", row_text(&entry.name, label.as_deref()))
            .context("failed to write listing")?;
    }
    out.flush().context("failed to write listing")?;
    eprintln!("{}", status_text(files.len()));
    Ok(())
}

fn run_cli(args: &Args) -> Result<()> {
    let requested = args.start_dir();
    let root = requested
        .canonicalize()
        .map(normalize_dir)
        .with_context(|| format!("failed to canonicalize root {}", requested.display()))?;
    if args.watch {
        return run_watch(args, root);
    }

    let files = filter_entries(entries_or_empty(&LocalFs, &root), &args.query);
    print_listing(&LocalFs, &root, &files)
}

fn run_watch(args: &Args, root: PathBuf) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let watcher = DirWatcher::new()?;
    let mut pipeline = FileListPipeline::new(
        LocalFs,
        watcher,
        root.clone(),
        &args.query,
        args.pipeline_config(),
    );
    print_listing(pipeline.source(), pipeline.directory(), pipeline.files())?;
    pipeline.subscribe(move |files| {
        println!();
        if let Err(err) = print_listing(&LocalFs, &root, files) {
            tracing::warn!(error = %format!("{err:#}"), "failed to print listing");
        }
    });

    while running.load(Ordering::SeqCst) {
        pipeline.poll(Instant::now());
        thread::sleep(WATCH_POLL_INTERVAL);
    }
    Ok(())
}

type DynError = Box<dyn std::error::Error + Send + Sync>;

fn run_gui(args: &Args) -> Result<()> {
    let requested = args.start_dir();
    let root = requested
        .canonicalize()
        .map(normalize_dir)
        .unwrap_or(requested);
    let config = args.pipeline_config();
    let query = args.query.clone();
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        eframe::egui::ViewportBuilder::default().with_inner_size(eframe::egui::vec2(900.0, 640.0));

    eframe::run_native(
        "dir-scout",
        native_options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> std::result::Result<Box<dyn eframe::App>, DynError> {
                configure_egui_fonts(&cc.egui_ctx);
                let ctx = cc.egui_ctx.clone();
                let watcher = DirWatcher::with_waker(move || ctx.request_repaint())?;
                let pipeline = FileListPipeline::new(LocalFs, watcher, root, &query, config);
                Ok(Box::new(DirScoutApp::new(
                    pipeline,
                    Box::new(NativeDirectoryPicker),
                )))
            },
        ),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    if args.cli {
        run_cli(&args)
    } else {
        run_gui(&args)
    }
}
