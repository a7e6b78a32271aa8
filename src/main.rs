use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use hot_potato_governor::{
    config::{SchedulerConfig, default_config_path},
    driver::{Driver, TraceFrame},
};
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!("Usage: {program} [config.toml] [trace.jsonl]");
    eprintln!("  config.toml: defaults to {}", default_config_path().display());
    eprintln!("  trace.jsonl: one interval per line, read from stdin when absent");
    eprintln!();
    eprintln!("Prints one JSON decision (frequencies + migrations) per interval.");
    eprintln!("Set RUST_LOG=debug for per-core control traces.");
}

fn program_name(args: &[String]) -> &str {
    args.first().map_or("hot-potato-governor", String::as_str)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage(program_name(&args));
        return Ok(());
    }

    let config_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = SchedulerConfig::load(&config_path)?;
    tracing::info!("configuration: {}", serde_json::to_string(&config)?);

    let input: Box<dyn BufRead> = match args.get(2) {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("stopping after the current interval");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut driver = Driver::new(&config);
    let mut stdout = std::io::stdout().lock();
    for (number, line) in input.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: TraceFrame = serde_json::from_str(&line)
            .map_err(|e| format!("trace line {}: {e}", number + 1))?;
        let decision = driver.step(&frame)?;
        writeln!(stdout, "{}", serde_json::to_string(&decision)?)?;
    }
    Ok(())
}
