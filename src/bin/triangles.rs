//! Command-line triangle counter over an in-memory graph store.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use graphstore::loader::csv::{import_nodes, import_relationships, EdgeImportConfig, NodeImportConfig};
use graphstore::{
    count_triangles, stream_triangles, Graph, GraphStore, GraphStoreBuilder,
    RelationshipType, TerminationFlag, TopologyOptions, TriangleCountConfig,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const RELATIONSHIP_TYPE: &str = "REL";

#[derive(Parser, Debug)]
#[command(
    name = "triangles",
    version,
    about = "Count triangles of an undirected graph held in memory"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        default_value_t = 0,
        env = "GRAPHSTORE_CONCURRENCY",
        help = "Worker threads (0 uses every core)"
    )]
    concurrency: usize,

    #[arg(long, global = true, help = "Skip nodes with a higher degree")]
    max_degree: Option<u64>,

    #[arg(long, global = true, help = "Print every triangle instead of counts")]
    stream: bool,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Load nodes and relationships from CSV files.
    Csv(CsvArgs),
    /// Generate a uniform random graph.
    Random(RandomArgs),
}

#[derive(Args, Debug)]
struct CsvArgs {
    #[arg(long, value_name = "FILE", help = "CSV file containing nodes")]
    nodes: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "CSV file containing relationships")]
    edges: PathBuf,

    #[arg(long, default_value = "id", help = "Node id column name")]
    node_id_column: String,

    #[arg(long, help = "Column containing pipe-separated labels")]
    node_label_column: Option<String>,

    #[arg(long, default_value = "src", help = "Relationship source column name")]
    edge_src_column: String,

    #[arg(long, default_value = "dst", help = "Relationship target column name")]
    edge_dst_column: String,
}

#[derive(Args, Debug)]
struct RandomArgs {
    #[arg(long, default_value_t = 10_000, help = "Number of nodes")]
    nodes: u64,

    #[arg(long, default_value_t = 100_000, help = "Number of relationships")]
    relationships: u64,

    #[arg(long, default_value_t = 42, help = "Generator seed")]
    seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct CountReport {
    nodes: u64,
    relationships: u64,
    triangles: u64,
    max_local_triangles: u64,
    elapsed_ms: u128,
}

fn main() {
    if let Err(err) = install_tracing_subscriber() {
        eprintln!("warning: logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn install_tracing_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let store = match &cli.source {
        Source::Csv(args) => load_csv(args, cli.concurrency)?,
        Source::Random(args) => generate(args, cli.concurrency)?,
    };
    let graph = store.get_graph(
        &store.node_labels(),
        &[RelationshipType::new(RELATIONSHIP_TYPE)],
        None,
        cli.concurrency,
    )?;
    let config = TriangleCountConfig {
        concurrency: cli.concurrency,
        max_degree: cli.max_degree.unwrap_or(u64::MAX),
        ..TriangleCountConfig::default()
    };

    if cli.stream {
        for triangle in stream_triangles(Arc::clone(&graph), config, TerminationFlag::new())? {
            let triangle = triangle?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&triangle)?),
                OutputFormat::Text => println!("{}\t{}\t{}", triangle.a, triangle.b, triangle.c),
            }
        }
        return Ok(());
    }

    let started = Instant::now();
    let result = count_triangles(graph.as_ref(), &config, &TerminationFlag::new())?;
    let report = CountReport {
        nodes: graph.node_count(),
        relationships: graph.relationship_count() / 2,
        triangles: result.global_triangle_count,
        max_local_triangles: result.local_triangle_counts.iter().copied().max().unwrap_or(0),
        elapsed_ms: started.elapsed().as_millis(),
    };
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report_text(&report),
    }
    Ok(())
}

fn print_report_text(report: &CountReport) {
    println!("nodes:               {}", report.nodes);
    println!("relationships:       {}", report.relationships);
    println!("triangles:           {}", report.triangles);
    println!("max local triangles: {}", report.max_local_triangles);
    println!("elapsed:             {} ms", report.elapsed_ms);
}

fn undirected_builder() -> GraphStoreBuilder {
    GraphStoreBuilder::new()
        .implicit_nodes(true)
        .relationship_type(RELATIONSHIP_TYPE, TopologyOptions::undirected())
}

fn load_csv(args: &CsvArgs, concurrency: usize) -> Result<GraphStore, Box<dyn Error>> {
    let mut builder = undirected_builder();
    if let Some(path) = &args.nodes {
        let cfg = NodeImportConfig {
            id_column: args.node_id_column.clone(),
            label_column: args.node_label_column.clone(),
            ..NodeImportConfig::new(path)
        };
        import_nodes(&mut builder, &cfg)?;
    }
    let cfg = EdgeImportConfig {
        src_column: args.edge_src_column.clone(),
        dst_column: args.edge_dst_column.clone(),
        static_type: Some(RELATIONSHIP_TYPE.into()),
        prop_columns: Some(Vec::new()),
        ..EdgeImportConfig::new(&args.edges)
    };
    import_relationships(&mut builder, &cfg)?;
    Ok(builder.build(concurrency)?)
}

fn generate(args: &RandomArgs, concurrency: usize) -> Result<GraphStore, Box<dyn Error>> {
    if args.nodes == 0 {
        return Err("a random graph needs at least one node".into());
    }
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut builder = undirected_builder();
    for node in 0..args.nodes {
        builder.add_node(node, &[], &[])?;
    }
    for _ in 0..args.relationships {
        let source = rng.gen_range(0..args.nodes);
        let target = rng.gen_range(0..args.nodes);
        builder.add_relationship(RELATIONSHIP_TYPE, source, target, &[])?;
    }
    info!(
        nodes = args.nodes,
        relationships = args.relationships,
        seed = args.seed,
        "triangles.random.generated"
    );
    Ok(builder.build(concurrency)?)
}
