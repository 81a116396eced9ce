use clap::{Parser, ValueEnum};
use nagare::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

/// What to print once the script has been replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Counts and the derived connector list
    Summary,
    /// The full state as JSON
    State,
    /// The derived connectors as JSON
    Connectors,
}

/// Replays a script of flow actions and reports the resulting flow
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON array of actions ({"type": ..., "payload": ...})
    actions_path: String,

    /// Optional path to a store configuration JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Optional path to a state snapshot to start from
    #[arg(short, long)]
    state: Option<String>,

    /// What to print after the replay
    #[arg(short, long, value_enum, default_value_t = Output::Summary)]
    output: Output,

    /// Keep going after an action is rejected
    #[arg(long)]
    keep_going: bool,

    /// Use deterministic guids for synthesized elements
    #[arg(long)]
    sequential_guids: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // --- 1. Loading ---
    let load_start = Instant::now();
    let config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load configuration: {}", e))),
        None => StoreConfig::default(),
    };
    let actions_json = fs::read_to_string(&cli.actions_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read actions file '{}': {}", &cli.actions_path, e))
    });
    let actions: Vec<Action> = serde_json::from_str(&actions_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse actions JSON: {}", e)));

    let mut builder = FlowStore::builder().with_config(config);
    if let Some(path) = &cli.state {
        let state_json = fs::read_to_string(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to read state file '{}': {}", path, e)));
        let state: FlowState = serde_json::from_str(&state_json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse state JSON: {}", e)));
        builder = builder.with_state(state);
    }
    if cli.sequential_guids {
        builder = builder.with_guid_generator(Arc::new(SequentialGuidGenerator::default()));
    }
    let mut store = builder.build();
    let load_duration = load_start.elapsed();

    // --- 2. Replay ---
    let replay_start = Instant::now();
    let mut rejected = 0;
    for (index, action) in actions.into_iter().enumerate() {
        let type_name = action.type_name();
        if let Err(e) = store.dispatch(action) {
            if !cli.keep_going {
                exit_with_error(&format!("Action #{} ({}) was rejected: {}", index, type_name, e));
            }
            eprintln!("Action #{} ({}) was rejected: {}", index, type_name, e);
            rejected += 1;
        }
    }
    let replay_duration = replay_start.elapsed();

    // --- 3. Results ---
    let connectors = if store.state().properties.is_auto_layout_canvas {
        store
            .derived_connectors()
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to derive connectors: {}", e)))
    } else {
        store.state().connectors.iter().cloned().collect()
    };

    match cli.output {
        Output::State => print_json(store.state()),
        Output::Connectors => print_json(&connectors),
        Output::Summary => print_summary(&store, &connectors, rejected),
    }

    if cli.output == Output::Summary {
        println!("\n--- Performance Summary ---");
        println!("Loading:   {:?}", load_duration);
        println!("Replay:    {:?}", replay_duration);
    }
}

fn print_summary(store: &FlowStore, connectors: &[Connector], rejected: usize) {
    let state = store.state();
    let canvas_elements = state.elements.iter().filter(|(_, e)| e.is_canvas_element).count();

    println!("--- Flow Summary ---");
    println!("Elements:          {}", state.elements.len());
    println!("Canvas elements:   {}", canvas_elements);
    println!("Connectors:        {}", connectors.len());
    println!("Auto-layout:       {}", state.properties.is_auto_layout_canvas);
    println!("Unsaved changes:   {}", state.properties.has_unsaved_changes);
    println!("Rejected actions:  {}", rejected);
    println!("Undo available:    {}", store.can_undo());

    if !connectors.is_empty() {
        println!("\n--- Connectors ---");
        for connector in connectors {
            let goto = if connector.is_goto { " (goto)" } else { "" };
            println!(
                "  {} -> {} [{:?}]{}",
                connector.source, connector.target, connector.connector_type, goto
            );
        }
    }

    if state.properties.is_auto_layout_canvas && !state.elements.is_empty() {
        match store.check_invariants() {
            Ok(()) => println!("\nInvariants: OK"),
            Err(e) => println!("\nInvariants: VIOLATED - {}", e),
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize output: {}", e)));
    println!("{}", json);
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
