use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use skyview_assets::{GeometryLoader, MeshKind};
use skyview_render::{
    AssetPolicy, FlyCamera, GraphicsContext, RecordingBackend, Scene, ShaderLibrary, ViewerConfig,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skyview-cli", about = "Headless tooling for the skyview viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Viewer config (YAML). Defaults to ./skyview.yaml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Asset root holding objects/ and textures/
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved config, catalogs and shader programs
    Info,
    /// Load one mesh kind and summarize its vertex data
    Mesh {
        /// cube, skybox, advanced_skybox or a model name
        kind: MeshKind,
        /// Print the first N vertex records
        #[arg(short, long, default_value = "0")]
        records: usize,
    },
    /// Build the scene against a recording backend and render frames
    DryRun {
        /// Number of frames to render
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Print every recorded GPU command
        #[arg(long)]
        log: bool,
        /// Fail on the first missing asset instead of skipping the object
        #[arg(long)]
        strict: bool,
    },
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let cwd = std::env::current_dir().context("reading working directory")?;
    let mut config =
        ViewerConfig::resolve(cli.config.as_deref(), &cwd).context("loading viewer config")?;
    if let Some(assets) = &cli.assets {
        config.asset_root = assets.clone();
    }
    Ok(config)
}

fn info(config: &ViewerConfig) -> Result<()> {
    println!("skyview-cli v{}", env!("CARGO_PKG_VERSION"));
    println!("asset root: {}", config.asset_root.display());
    println!(
        "window: {}x{} \"{}\" at {} fps",
        config.window.width, config.window.height, config.window.title, config.target_fps
    );
    println!("asset policy: {:?}", config.asset_policy);

    println!("models:");
    for name in config.models.names() {
        if let Some(path) = config.models.resolve(name) {
            println!("  {name:<10} {}", path.display());
        }
    }
    println!("textures: {}", config.textures.len());

    let library = ShaderLibrary::builtin();
    println!("programs:");
    for name in library.names() {
        let Some(source) = library.get(name) else {
            continue;
        };
        let inputs: Vec<String> = source
            .attributes()?
            .iter()
            .map(|a| format!("{}@{}", a.name, a.location))
            .collect();
        println!(
            "  {name:<16} {:?} texture, {:?} depth, inputs {}",
            source.texture,
            source.depth,
            inputs.join(" ")
        );
    }

    let scene = config.scene_description();
    println!(
        "scene: {:?} skybox, {} objects",
        scene.skybox,
        scene.objects.len()
    );
    Ok(())
}

fn mesh(config: &ViewerConfig, kind: &MeshKind, records: usize) -> Result<()> {
    let loader = GeometryLoader::new(&config.asset_root, config.models.clone());
    let data = loader
        .load(kind)
        .with_context(|| format!("loading mesh {kind}"))?;
    let format = data.format();

    let (mut min, mut max) = (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
    let position_at = data.record_len() - 3;
    for record in data.records() {
        let p = Vec3::from_slice(&record[position_at..]);
        min = min.min(p);
        max = max.max(p);
    }

    println!("mesh {kind}");
    println!("  format     {} ({})", format.widths, format.attributes.join(" "));
    println!("  vertices   {}", data.vertex_count());
    println!("  triangles  {}", data.vertex_count() / 3);
    println!("  bounds     {min} .. {max}");
    for (i, record) in data.records().take(records).enumerate() {
        println!("  [{i}] {record:?}");
    }
    Ok(())
}

fn dry_run(config: &ViewerConfig, frames: u32, log: bool, strict: bool) -> Result<()> {
    let policy = if strict {
        AssetPolicy::Abort
    } else {
        config.asset_policy
    };
    let mut ctx = GraphicsContext::init(
        RecordingBackend::new(),
        GeometryLoader::new(&config.asset_root, config.models.clone()),
        config.textures.clone(),
        ShaderLibrary::builtin(),
    );
    let scene = Scene::build(&mut ctx, &config.scene_description(), policy)
        .context("building scene")?;

    let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
    let mut camera = FlyCamera::from_config(&config.camera, aspect);
    let dt = 1.0 / config.target_fps.max(1) as f32;
    for _ in 0..frames {
        let stats = scene
            .render(&mut ctx, &camera.frame_uniforms(&config.light), config.clear_color)
            .context("rendering frame")?;
        tracing::debug!("{} draws, {} vertices", stats.draws, stats.vertices);
        camera.apply_movement(Vec3::Z, 1.0, dt);
    }

    let (buffers, programs, layouts, textures) = ctx.cache_sizes();
    ctx.teardown();

    let backend = ctx.backend();
    if log {
        print!("{}", backend.describe());
    }
    println!(
        "objects: {} drawn, {} skipped {:?}",
        scene.objects().len(),
        scene.skipped().len(),
        scene.skipped()
    );
    println!("cached: {buffers} buffers, {programs} programs, {layouts} layouts, {textures} textures");
    println!(
        "gpu: {} uploads, {} compiles, {} layouts, {} textures, {} draws over {frames} frames",
        backend.upload_count(),
        backend.compile_count(),
        backend.layout_count(),
        backend.texture_upload_count(),
        backend.draw_count()
    );
    println!(
        "released: {} resources, {} still live",
        backend.release_count(),
        backend.live_resources()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Info => info(&config),
        Commands::Mesh { kind, records } => mesh(&config, kind, *records),
        Commands::DryRun {
            frames,
            log,
            strict,
        } => dry_run(&config, *frames, *log, *strict),
    }
}
