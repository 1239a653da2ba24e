mod session;

use anyhow::Context;
use chunkworld_common::{ChunkCoord, WorldConfig};
use chunkworld_persist::{FileStore, RecordStore, share};
use chunkworld_registry::EntityRegistry;
use chunkworld_render::{CellGrid, WorldView};
use chunkworld_stream::ChunkStore;
use clap::{Parser, Subcommand};
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chunkworld-cli", about = "CLI tool for chunkworld operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML world configuration (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// World store directory
    #[arg(short, long, default_value = "world")]
    store: PathBuf,

    /// Override the configured noise seed
    #[arg(long)]
    seed: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print configuration and store summary
    Info,
    /// Draw one chunk with its entities
    Show {
        #[arg(default_value = "0", allow_hyphen_values = true)]
        x: i32,
        #[arg(default_value = "0", allow_hyphen_values = true)]
        y: i32,
    },
    /// Interactive session reading one key name per line from stdin
    Play,
    /// Replace a stored chunk with a fresh generation
    Reset {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },
    /// Check store integrity and compare stored chunks with regeneration
    Verify,
}

fn load_config(cli: &Cli) -> anyhow::Result<Arc<WorldConfig>> {
    let mut config = match &cli.config {
        Some(path) => WorldConfig::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(Arc::new(config))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let store = FileStore::open(&cli.store).with_context(|| format!("opening store {}", cli.store.display()))?;

    match cli.command {
        Commands::Info => {
            println!("chunkworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "world: chunk_size={}, cell={}x{}, seed={}, sampling={:?}",
                config.chunk_size, config.cell_width, config.cell_height, config.seed, config.sampling
            );
            println!(
                "store: {} (schema v{})",
                store.root().display(),
                store.meta().schema_version
            );
            println!("chunks: {}", store.chunk_coords()?.len());
            println!("objects: {}", store.objects()?.len());
        }
        Commands::Show { x, y } => {
            let store = share(store);
            let coord = ChunkCoord::new(x, y);
            let mut chunks = ChunkStore::new(Arc::clone(&config), Arc::clone(&store));
            let mut registry = EntityRegistry::new(Arc::clone(&config), store);
            registry.load_all()?;
            let data = chunks.load(coord, true)?;

            let view = WorldView::new(&config);
            let (rows, cols) = view.surface_size();
            let mut grid = CellGrid::new(rows, cols);
            view.draw_chunk(&mut grid, coord, &data, registry.entities())?;
            println!("chunk {coord}");
            print!("{}", grid.to_text());
        }
        Commands::Play => {
            let mut session = Session::open(Arc::clone(&config), share(store))?;
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            session.run(stdin.lock(), &mut stdout)?;
        }
        Commands::Reset { x, y } => {
            let coord = ChunkCoord::new(x, y);
            let mut chunks = ChunkStore::new(Arc::clone(&config), share(store));
            chunks.regenerate(coord)?;
            println!("chunk {coord} regenerated");
        }
        Commands::Verify => {
            store.verify_integrity().context("integrity check")?;
            let coords = store.chunk_coords()?;
            let chunks = ChunkStore::new(Arc::clone(&config), share(store));
            let mut mismatched = Vec::new();
            for coord in &coords {
                if !chunks.verify(*coord)? {
                    mismatched.push(*coord);
                }
            }
            println!("chunks checked: {}", coords.len());
            if !mismatched.is_empty() {
                for coord in &mismatched {
                    println!("  differs from regeneration: {coord}");
                }
                anyhow::bail!("{} chunk(s) differ from regeneration", mismatched.len());
            }
            println!("all chunks match");
        }
    }

    Ok(())
}
