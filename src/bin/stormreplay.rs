//! Heroes of the Storm replay (.StormReplay) decoder CLI
//!
//! Operates on extracted-archive directories: a `replay.header` file plus
//! one file per container sub-stream, as produced by external MPQ
//! extraction tools.
//!
//! ## Commands
//!
//! - `info` - Display the replay header and protocol support status
//! - `parse` - Decode selected sub-streams with output format options
//! - `builds` - List the base builds with a registered decoder

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stormreplay::protocol::registry::SUPPORTED_BUILDS;
use stormreplay::{
    Attribute, DirArchive, EventMap, LoadSelection, ReplayError, ReplaySession, Value,
};

/// Heroes of the Storm replay decoder
#[derive(Parser)]
#[command(name = "stormreplay")]
#[command(about = "Heroes of the Storm replay (.StormReplay) decoder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display replay header information
    Info {
        /// Path to an extracted-archive directory
        dir: PathBuf,
    },
    /// Decode replay sub-streams
    Parse {
        /// Path to an extracted-archive directory
        dir: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Skip replay.details
        #[arg(long)]
        no_details: bool,
        /// Skip replay.initData
        #[arg(long)]
        no_initdata: bool,
        /// Skip replay.game.events
        #[arg(long)]
        no_game: bool,
        /// Skip replay.message.events
        #[arg(long)]
        no_messages: bool,
        /// Skip replay.tracker.events
        #[arg(long)]
        no_tracker: bool,
        /// Skip replay.attributes.events
        #[arg(long)]
        no_attributes: bool,
        /// Include full decoded records instead of per-kind counts
        #[arg(long)]
        full: bool,
    },
    /// List supported base builds
    Builds,
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct HeaderInfo {
    signature: String,
    version: String,
    build: u32,
    base_build: u32,
    elapsed_game_loops: u64,
    tracker_events: bool,
}

#[derive(Serialize)]
struct ParseOutput {
    header: HeaderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initdata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_events: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_events: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracker_events: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Vec<Attribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_game_events: Option<EventMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_message_events: Option<EventMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_tracker_events: Option<EventMap>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { dir } => cmd_info(&dir),
        Commands::Parse {
            dir,
            output,
            no_details,
            no_initdata,
            no_game,
            no_messages,
            no_tracker,
            no_attributes,
            full,
        } => {
            let selection = LoadSelection::default()
                .details(!no_details)
                .initdata(!no_initdata)
                .game_events(!no_game)
                .message_events(!no_messages)
                .tracker_events(!no_tracker)
                .attributes(!no_attributes);
            cmd_parse(&dir, &output, &selection, full)
        }
        Commands::Builds => {
            for build in SUPPORTED_BUILDS {
                println!("{build}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open_session(dir: &Path) -> Result<ReplaySession<DirArchive>, ReplayError> {
    let archive = DirArchive::open(dir)?;
    ReplaySession::open(archive)
}

fn cmd_info(dir: &Path) -> Result<(), ReplayError> {
    let session = open_session(dir)?;
    let info = header_info(&session);

    println!("Signature:          {}", info.signature);
    println!("Version:            {}", info.version);
    println!("Build:              {}", info.build);
    println!("Base build:         {}", info.base_build);
    println!("Elapsed game loops: {}", info.elapsed_game_loops);
    println!("Tracker events:     {}", info.tracker_events);

    Ok(())
}

fn cmd_parse(
    dir: &Path,
    output: &OutputFormat,
    selection: &LoadSelection,
    full: bool,
) -> Result<(), ReplayError> {
    let mut session = open_session(dir)?;
    session.load(selection)?;

    let parsed = ParseOutput {
        header: header_info(&session),
        details: session.details.clone(),
        initdata: session.initdata.clone(),
        game_events: selection
            .game_events
            .then(|| bucket_counts(&session.game_events)),
        message_events: selection
            .message_events
            .then(|| bucket_counts(&session.message_events)),
        tracker_events: selection
            .tracker_events
            .then(|| bucket_counts(&session.tracker_events)),
        attributes: selection.attributes.then(|| session.attributes.clone()),
        full_game_events: (full && selection.game_events).then(|| session.game_events.clone()),
        full_message_events: (full && selection.message_events)
            .then(|| session.message_events.clone()),
        full_tracker_events: (full && selection.tracker_events)
            .then(|| session.tracker_events.clone()),
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&parsed)
                .map_err(|e| ReplayError::decode(format!("JSON encoding failed: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Pretty => print_pretty(&parsed),
    }

    Ok(())
}

fn header_info(session: &ReplaySession<DirArchive>) -> HeaderInfo {
    let header = session.header();
    HeaderInfo {
        signature: header.signature.clone(),
        version: format!(
            "{}.{}.{}",
            header.version.major, header.version.minor, header.version.revision
        ),
        build: header.version.build,
        base_build: header.version.base_build,
        elapsed_game_loops: header.elapsed_game_loops,
        tracker_events: session.protocol().supports_tracker_events(),
    }
}

fn bucket_counts(events: &EventMap) -> BTreeMap<String, usize> {
    events
        .iter()
        .map(|(kind, records)| (kind.clone(), records.len()))
        .collect()
}

fn print_pretty(parsed: &ParseOutput) {
    println!("=== Header ===");
    println!("Version:    {} (build {})", parsed.header.version, parsed.header.build);
    println!("Base build: {}", parsed.header.base_build);
    println!("Game loops: {}", parsed.header.elapsed_game_loops);

    if parsed.details.is_some() {
        println!("\n=== Details ===");
        println!("loaded");
    }
    if parsed.initdata.is_some() {
        println!("\n=== Init Data ===");
        println!("lobby state loaded");
    }

    let sections = [
        ("Game Events", &parsed.game_events),
        ("Message Events", &parsed.message_events),
        ("Tracker Events", &parsed.tracker_events),
    ];
    for (title, buckets) in sections {
        if let Some(buckets) = buckets {
            println!("\n=== {title} ===");
            if buckets.is_empty() {
                println!("(none)");
            }
            for (kind, count) in buckets {
                println!("{kind}: {count}");
            }
        }
    }

    if let Some(attributes) = &parsed.attributes {
        println!("\n=== Attributes ===");
        println!("{} attributes", attributes.len());
        for attribute in attributes {
            println!(
                "  id {} scope {}: {}",
                attribute.id, attribute.scope, attribute.value
            );
        }
    }
}
