mod parse;

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use core_sim::{
    addr::Addr,
    geometry::{Associativity, CacheGeometry},
    sim::{RunSummary, Simulator, TraceEntry},
};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// simulate one cache configuration against a trace
    Run(RunArgs),
    /// sweep configurations and write a results table
    Grid(GridArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// File path to memory address trace .trc file
    #[arg(short, long)]
    trace: PathBuf,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to simulation configuration .cfg file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Cache size in bytes (overrides the config file)
    #[arg(long)]
    cache_size: Option<u32>,
    /// Block size in bytes (overrides the config file)
    #[arg(long)]
    block_size: Option<u32>,
    /// Associativity: `direct`, `fully`, or a way count (overrides the config file)
    #[arg(long)]
    associativity: Option<Associativity>,
    /// Emit the run summary as JSON instead of the console report
    #[arg(long)]
    json: bool,
    /// Print every decoded access with its hit/miss outcome
    #[arg(long)]
    dump_accesses: bool,
}

#[derive(Args, Debug)]
struct GridArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to the output results table
    #[arg(short, long, default_value = "grid_search.csv")]
    output: PathBuf,
}

/// the original sweep: four cache sizes, fixed 32B blocks, five
/// associativity settings.
const GRID_CACHE_SIZES: [u32; 4] = [8 << 10, 64 << 10, 256 << 10, 1 << 20];
const GRID_BLOCK_SIZE: u32 = 32;
const GRID_ASSOCIATIVITIES: [Associativity; 5] = [
    Associativity::Direct,
    Associativity::Ways(2),
    Associativity::Ways(4),
    Associativity::Ways(8),
    Associativity::Fully,
];

fn main() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(args) => {
            init_logger(args.delegate.verbose);
            let trace = read_trace(&args.delegate.trace)?;
            let raw = match &args.config {
                Some(path) => {
                    let cfg = fs::read_to_string(path)
                        .with_context(|| format!("cannot read config {}", path.display()))?;
                    Some(parse::parse_config(&cfg)?)
                }
                None => None,
            };
            let cache_size = args
                .cache_size
                .or(raw.as_ref().map(|r| r.cache_size))
                .context("cache size given neither in a config file nor by --cache-size")?;
            let block_size = args
                .block_size
                .or(raw.as_ref().map(|r| r.block_size))
                .context("block size given neither in a config file nor by --block-size")?;
            let associativity = args
                .associativity
                .or(raw.as_ref().map(|r| r.associativity))
                .context("associativity given neither in a config file nor by --associativity")?;
            let geometry = CacheGeometry::new(cache_size, block_size, associativity)?;
            let mut sim = Simulator::new(geometry);
            let summary = if args.dump_accesses {
                let (entries, summary) = sim.record_run(&trace);
                for entry in &entries {
                    print_access(entry);
                }
                summary
            } else {
                sim.run(&trace)
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_report(&summary);
                output_stat(&sim);
            }
            Ok(())
        }
        Command::Grid(args) => {
            init_logger(args.delegate.verbose);
            let trace = read_trace(&args.delegate.trace)?;
            let mut out = File::create(&args.output)
                .with_context(|| format!("cannot create {}", args.output.display()))?;
            writeln!(out, "cache_size,block_size,associativity,hit_rate")?;
            for associativity in GRID_ASSOCIATIVITIES {
                for cache_size in GRID_CACHE_SIZES {
                    // each grid point replays against its own fresh cache
                    let geometry =
                        CacheGeometry::new(cache_size, GRID_BLOCK_SIZE, associativity)?;
                    let summary = Simulator::new(geometry).run(&trace);
                    log::info!(
                        "{} / {} B: hit rate {:.2} %",
                        associativity,
                        cache_size,
                        summary.hit_rate
                    );
                    writeln!(
                        out,
                        "{},{},{},{:.2}",
                        summary.cache_size,
                        summary.block_size,
                        summary.associativity,
                        summary.hit_rate
                    )?;
                }
            }
            log::info!("results written to {}", args.output.display());
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
}

fn read_trace(path: &Path) -> Result<Vec<Addr>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read trace {}", path.display()))?;
    parse::parse_trace(&text)
}

fn print_access(entry: &TraceEntry) {
    println!(
        "{}  tag {:#x}  index {}  offset {}  {}",
        entry.addr,
        entry.tag,
        entry.index,
        entry.offset,
        if entry.hit { "hit" } else { "miss" },
    );
}

fn print_report(s: &RunSummary) {
    println!(
        "Cache Size {} - Block Size {} - Associativity {}",
        s.cache_size, s.block_size, s.ways
    );
    println!("Num Blocks {} - Num Sets {}", s.n_blocks, s.n_sets);
    println!(
        "Tag Length {} - Index Length {} - Offset Length {}",
        s.tag_bits, s.index_bits, s.offset_bits
    );
    println!(
        "Num Accesses {} - Num Hits {} - Num Misses {}",
        s.n_accesses, s.n_hits, s.n_misses
    );
    println!("Hit Rate: {:.2}", s.hit_rate);
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Simulator) {}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}
