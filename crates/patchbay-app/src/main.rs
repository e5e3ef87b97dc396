use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use eframe::egui;
use eframe::NativeOptions;
use tracing_subscriber::EnvFilter;

mod app;
mod canvas;
mod commands;
mod config;
mod plugin_windows;

use app::PatchbayApp;

#[derive(Debug, Parser)]
#[command(author, version, about = "Patchbay - a modular plugin patching workstation")]
struct Cli {
    /// Patch file to open on startup
    document: Option<PathBuf>,

    /// Run without the native UI, saving and reloading a patch as a self check
    #[arg(long)]
    headless: bool,

    /// Skip writing a session log file
    #[arg(long)]
    no_session_log: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Cli::parse();

    if args.headless {
        run_headless(&args)
    } else {
        run_ui(args)
    }
}

/// Builds a patch (from the given file or the starter layout), writes it to a
/// scratch `.filtergraph`, and reloads it into a fresh document. A node count
/// mismatch fails the run.
fn run_headless(args: &Cli) -> anyhow::Result<()> {
    let mut document = app::blank_document(!args.no_session_log);
    match &args.document {
        Some(path) => {
            let report = document
                .load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            for name in &report.skipped_plugins {
                println!("Skipped unavailable plugin: {name}");
            }
        }
        None => app::seed_default_patch(&mut document),
    }

    let scratch = std::env::temp_dir().join("patchbay-roundtrip.filtergraph");
    document
        .save_to(&scratch)
        .context("failed to save the patch")?;

    let mut reloaded = app::blank_document(false);
    let report = reloaded
        .load_from(&scratch)
        .context("failed to reload the saved patch")?;

    println!(
        "Round-tripped {} nodes and {} connections via {}",
        reloaded.nodes().len(),
        reloaded.connections().len(),
        scratch.display()
    );

    let _ = std::fs::remove_file(&scratch);
    document.close_session_log();

    if reloaded.nodes().len() != document.nodes().len() {
        bail!(
            "round trip dropped nodes: saved {}, reloaded {} ({} skipped)",
            document.nodes().len(),
            reloaded.nodes().len(),
            report.skipped_plugins.len()
        );
    }
    Ok(())
}

fn run_ui(args: Cli) -> anyhow::Result<()> {
    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    let startup_document = args.document;
    let with_session_log = !args.no_session_log;

    eframe::run_native(
        "Patchbay",
        native_options,
        Box::new(move |cc| {
            Box::new(PatchbayApp::new(cc, startup_document, with_session_log))
        }),
    )
    .map_err(|err| anyhow!(err.to_string()))
}
