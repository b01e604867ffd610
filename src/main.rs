//! CLI binary for ugv-graph: set up, populate and query the UGV knowledge graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use ugv_graph::config::BackendKind;
use ugv_graph::{demo, BackendConfig, GraphConfig, PairClass, PowerBudgetReport, StorageBackend, UgvGraph};

#[derive(Parser)]
#[command(name = "ugv-graph", about = "UGV product-line knowledge graph")]
struct Cli {
    /// Storage backend: memory, bolt
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Bolt URI (e.g. bolt://localhost:7687)
    #[arg(long, global = true)]
    uri: Option<String>,

    #[arg(long, global = true)]
    user: Option<String>,

    /// Prefer NEO4J_PASSWORD over passing this on the command line
    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(long, global = true)]
    database: Option<String>,

    /// Config file (defaults to ./ugv-graph.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Create uniqueness constraints and indexes
    Setup,

    /// Write the reference fleet
    Populate,

    /// Check a mission's power draw against a budget
    Power {
        mission: String,

        #[arg(long, default_value_t = demo::CHASSIS_BUDGET_KW)]
        budget_kw: f64,
    },

    /// Pairwise compatibility of a mission's modules
    Compat { mission: String },

    /// Everything a module is linked to
    Deps { module: String },

    /// Modules, mass and power of a mission
    Manifest { mission: String },

    /// Fleet-wide power, utilization and interface coverage
    Fleet {
        #[arg(long, default_value_t = 300.0)]
        threshold_w: f64,
    },

    /// Validate a mission and record the verdict
    Validate {
        mission: String,

        #[arg(long, default_value_t = demo::CHASSIS_BUDGET_KW)]
        budget_kw: f64,
    },

    /// Setup, populate and print every report (default)
    Demo,
}

impl Cli {
    /// Command-line flags take precedence over file and environment.
    fn apply(&self, config: &mut GraphConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(uri) = &self.uri {
            config.uri = uri.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = GraphConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    tracing::debug!(?config, "resolved configuration");

    let command = cli.command.clone().unwrap_or(Commands::Demo);
    let backend = config.backend_config().context("invalid configuration")?;
    match backend {
        BackendConfig::Memory => {
            // A fresh in-memory graph has nothing to query yet.
            let seed = !matches!(command, Commands::Setup | Commands::Populate | Commands::Demo);
            run(UgvGraph::open_memory(), &command, cli.json, seed).await
        }
        #[cfg(feature = "bolt")]
        BackendConfig::Bolt { .. } => {
            let graph = UgvGraph::connect(&backend).await.context("failed to connect to graph engine")?;
            run(graph, &command, cli.json, false).await
        }
        #[cfg(not(feature = "bolt"))]
        BackendConfig::Bolt { .. } => {
            anyhow::bail!("this build has no bolt backend; rebuild with `--features bolt`")
        }
    }
}

/// Run one command and close the graph on every exit path.
async fn run<B: StorageBackend>(graph: UgvGraph<B>, command: &Commands, json: bool, seed: bool) -> Result<()> {
    let outcome: Result<()> = async {
        if seed {
            graph.setup_schema().await;
            demo::populate_reference_fleet(&graph).await.context("failed to seed reference fleet")?;
        }
        execute(&graph, command, json).await
    }
    .await;

    let closed = graph.close().await;
    outcome?;
    closed.context("failed to close graph")
}

async fn execute<B: StorageBackend>(graph: &UgvGraph<B>, command: &Commands, json: bool) -> Result<()> {
    match command {
        Commands::Setup => {
            let report = graph.setup_schema().await;
            emit(json, &report, |r| {
                println!("Schema: {} created, {} already present, {} failed",
                    r.created.len(), r.already_present.len(), r.failed.len());
                for (name, reason) in &r.failed {
                    println!("  ! {name}: {reason}");
                }
            })
        }
        Commands::Populate => {
            let population = demo::populate_reference_fleet(graph).await.context("population failed")?;
            emit(json, &population, |p| {
                println!("Populated {} nodes and {} relationships", p.nodes.len(), p.relationships);
            })
        }
        Commands::Power { mission, budget_kw } => power(graph, mission, *budget_kw, json).await,
        Commands::Compat { mission } => compat(graph, mission, json).await,
        Commands::Deps { module } => deps(graph, module, json).await,
        Commands::Manifest { mission } => manifest(graph, mission, json).await,
        Commands::Fleet { threshold_w } => fleet(graph, *threshold_w, json).await,
        Commands::Validate { mission, budget_kw } => {
            let validation = graph
                .validate_mission(mission, *budget_kw)
                .await?
                .with_context(|| format!("mission {mission} not found"))?;
            emit(json, &validation, |v| println!("{}: {}", v.mission_id, v.status))
        }
        Commands::Demo => demo_report(graph, json).await,
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn banner(title: &str) {
    println!("\n{}\n{title}\n{}", "=".repeat(60), "=".repeat(60));
}

// ============================================================================
// Reports
// ============================================================================

async fn power<B: StorageBackend>(graph: &UgvGraph<B>, mission: &str, budget_kw: f64, json: bool) -> Result<()> {
    let report = graph.validate_mission_power_budget(mission, budget_kw).await?;
    emit(json, &report, |r| match r {
        PowerBudgetReport::Evaluated(b) => {
            println!("\n{} ({}):", b.mission_name, b.mission_id);
            println!("  Total Power: {} W ({:.2} kW)", b.total_power_w, b.total_power_kw);
            println!("  Budget: {} kW", b.budget_kw);
            println!("  Margin: {:.2} kW", b.margin_kw);
            println!("  Status: {}", if b.within_budget { "PASS" } else { "FAIL" });
            println!("  Modules: {}", b.num_modules);
        }
        PowerBudgetReport::Invalid { mission_id, reason } => {
            println!("\n{mission_id}: INVALID ({reason})");
        }
    })
}

async fn compat<B: StorageBackend>(graph: &UgvGraph<B>, mission: &str, json: bool) -> Result<()> {
    let report = graph
        .get_mission_compatibility(mission)
        .await?
        .with_context(|| format!("mission {mission} not found"))?;
    emit(json, &report, |r| {
        println!("\n{} compatibility:", r.mission_id);
        println!("  Total Module Pairs: {}", r.total_pairs);
        println!("  Conflicts: {}", r.conflicts);
        println!("  Confirmed Compatible: {}", r.compatible_confirmed);
        println!("  Unknown: {}", r.unknown);
        println!("  Mission Viable: {}", if r.mission_viable { "YES" } else { "NO" });
        for pair in r.pairs.iter().filter(|p| p.classification == PairClass::Conflict) {
            println!("    x {} / {}: {}", pair.module_a, pair.module_b, pair.reason.as_deref().unwrap_or("-"));
        }
    })
}

async fn deps<B: StorageBackend>(graph: &UgvGraph<B>, module: &str, json: bool) -> Result<()> {
    let deps = graph
        .find_module_dependencies(module)
        .await?
        .with_context(|| format!("module {module} not found"))?;
    emit(json, &deps, |d| {
        let missions: Vec<&str> = d.missions.iter().map(|m| m.mission_id.as_str()).collect();
        println!("\n{}:", d.module_id);
        println!("  Type: {}", d.module_type);
        println!("  Power: {} W", d.power_w);
        println!("  Mounted On: {}", d.mounted_on.as_deref().unwrap_or("-"));
        println!("  Missions: {missions:?}");
        println!("  Interfaces: {:?}", d.interfaces);
        println!("  Compatible With: {:?}", d.compatible_with);
        println!("  Conflicts: {:?}", d.conflicts);
    })
}

async fn manifest<B: StorageBackend>(graph: &UgvGraph<B>, mission: &str, json: bool) -> Result<()> {
    let manifest = graph
        .get_mission_manifest(mission)
        .await?
        .with_context(|| format!("mission {mission} not found"))?;
    emit(json, &manifest, |m| {
        println!("\n{} ({}):", m.mission_name, m.mission_type);
        println!("  Duration: {} hours", m.duration_hours);
        println!("  Total Mass: {} kg", m.total_mass_kg);
        println!("  Total Power: {:.2} kW", m.total_power_kw);
        println!("  Modules: {}", m.num_modules);
        for entry in &m.modules {
            println!("    - {} ({}): {}W, {}kg", entry.module_id, entry.module_type, entry.power_w, entry.mass_kg);
        }
    })
}

async fn fleet<B: StorageBackend>(graph: &UgvGraph<B>, threshold_w: f64, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct Fleet {
        high_power: Vec<ugv_graph::ModulePower>,
        utilization: Vec<ugv_graph::ModuleUtilization>,
        interface_coverage: Vec<ugv_graph::InterfaceCoverage>,
        mount_chains: Vec<ugv_graph::MountChain>,
    }

    let report = Fleet {
        high_power: graph.modules_above_power(threshold_w).await?,
        utilization: graph.module_utilization().await?,
        interface_coverage: graph.interface_coverage().await?,
        mount_chains: graph.mount_chains(5).await?,
    };
    emit(json, &report, |f| {
        println!("\nModules exceeding {threshold_w}W power draw:");
        for m in &f.high_power {
            println!("  {}: {}W ({})", m.module_id, m.power_draw_w, m.module_type);
        }
        println!("\nModule utilization (missions per module):");
        for m in &f.utilization {
            println!("  {}: used in {} mission(s)", m.module_id, m.mission_count);
        }
        println!("\nInterface coverage per module:");
        for m in &f.interface_coverage {
            println!("  {}: {} interfaces - {:?}", m.module_id, m.interface_count, m.interfaces);
        }
        println!("\nMount chain depth:");
        for c in &f.mount_chains {
            println!("  {}: depth {} {:?}", c.module_id, c.chain_depth, c.path_nodes);
        }
    })
}

async fn demo_report<B: StorageBackend>(graph: &UgvGraph<B>, json: bool) -> Result<()> {
    let schema = graph.setup_schema().await;
    if !schema.is_complete() {
        tracing::warn!(failed = schema.failed.len(), "schema setup incomplete");
    }
    demo::populate_reference_fleet(graph).await.context("population failed")?;

    let missions = [demo::RECON_MISSION, demo::EOD_MISSION];
    if !json {
        banner("MISSION POWER BUDGET ANALYSIS");
    }
    for mission in missions {
        power(graph, mission, demo::CHASSIS_BUDGET_KW, json).await?;
    }
    if !json {
        banner("MISSION COMPATIBILITY ANALYSIS");
    }
    for mission in missions {
        compat(graph, mission, json).await?;
    }
    if !json {
        banner("MODULE DEPENDENCY GRAPH");
    }
    for module in [demo::OPTICAL_CAMERA, demo::EOD_ARM] {
        deps(graph, module, json).await?;
    }
    if !json {
        banner("MISSION MANIFESTS");
    }
    for mission in missions {
        manifest(graph, mission, json).await?;
    }
    if !json {
        banner("FLEET ANALYSIS");
    }
    fleet(graph, 300.0, json).await
}
