use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use kinema_core::{FrameRange, KinemaConfig};
use kinema_engine::{render_range, Compositor, FrameSink, JsonLinesSink};
use kinema_ir::SceneDescriptor;

const CONFIG_FILE: &str = "kinema.config.toml";

#[derive(Parser)]
#[command(
    name = "kinema",
    version,
    about = "Kinema: procedural animation scene engine",
    long_about = "Kinema turns a declarative scene of keyframed bodies, fragments and joins\ninto one render list per frame."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose every frame of a scene and write the render lists as JSON lines
    Render {
        /// Path to the scene .json file
        #[arg()]
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to <output_dir>/<scene>.jsonl from the config instead of stdout
        #[arg(long, conflicts_with = "output")]
        save: bool,

        /// First frame to compose
        #[arg(long)]
        start: Option<u64>,

        /// End frame (exclusive)
        #[arg(long)]
        end: Option<u64>,

        /// Directory body sources are resolved against (default: the scene's directory)
        #[arg(long)]
        bodies: Option<PathBuf>,
    },

    /// Validate a scene and print its dependency order
    Check {
        /// Path to the scene .json file
        #[arg()]
        file: PathBuf,
    },

    /// Replay a scene up to a frame and print the state of every entity
    Inspect {
        /// Path to the scene .json file
        #[arg()]
        file: PathBuf,

        /// Frame to stop at
        #[arg(short, long)]
        frame: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Directory body sources are resolved against (default: the scene's directory)
        #[arg(long)]
        bodies: Option<PathBuf>,
    },

    /// Display version and engine info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config();

    // Logs go to stderr so JSON lines on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !config.project.name.is_empty() {
        tracing::debug!("Using project config '{}'", config.project.name);
    }

    match cli.command {
        Commands::Render {
            file,
            output,
            save,
            start,
            end,
            bodies,
        } => cmd_render(&config, file, output, save, start, end, bodies),
        Commands::Check { file } => cmd_check(file),
        Commands::Inspect {
            file,
            frame,
            json,
            bodies,
        } => cmd_inspect(file, frame, json, bodies),
        Commands::Info => cmd_info(),
    }
}

/// Load `kinema.config.toml` from the working directory, falling back to defaults.
fn load_config() -> KinemaConfig {
    let path = Path::new(CONFIG_FILE);
    if !path.exists() {
        return KinemaConfig::default();
    }
    match KinemaConfig::load_from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: ignoring {}: {}", CONFIG_FILE, e);
            KinemaConfig::default()
        }
    }
}

fn load_scene(file: &Path) -> Result<SceneDescriptor> {
    SceneDescriptor::load_from_file(file)
        .with_context(|| format!("failed to load scene: {}", file.display()))
}

fn body_root(file: &Path, bodies: Option<PathBuf>) -> PathBuf {
    bodies.unwrap_or_else(|| {
        file.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn cmd_render(
    config: &KinemaConfig,
    file: PathBuf,
    output: Option<PathBuf>,
    save: bool,
    start: Option<u64>,
    end: Option<u64>,
    bodies: Option<PathBuf>,
) -> Result<()> {
    let started = Instant::now();
    let scene = load_scene(&file)?;

    let scene_range = scene.frame_range();
    let range = FrameRange::new(
        start.or(config.project.frame_start).unwrap_or(scene_range.start),
        end.or(config.project.frame_end).unwrap_or(scene_range.end),
    );

    eprintln!("Rendering {} (frames {})", file.display(), range);
    let mut compositor = Compositor::with_json_bodies(scene, body_root(&file, bodies))
        .with_context(|| format!("invalid scene: {}", file.display()))?;

    let output = if save {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "scene".to_string());
        Some(PathBuf::from(&config.render.output_dir).join(format!("{}.jsonl", stem)))
    } else {
        output
    };

    let summary = match &output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory: {}", parent.display())
                })?;
            }
            let out = std::fs::File::create(path)
                .with_context(|| format!("failed to create output file: {}", path.display()))?;
            let mut sink = JsonLinesSink::new(BufWriter::new(out));
            drive(&mut compositor, range, &mut sink)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut sink = JsonLinesSink::new(BufWriter::new(stdout.lock()));
            drive(&mut compositor, range, &mut sink)?
        }
    };

    let elapsed = started.elapsed();
    eprintln!();
    eprintln!("   Frames:  {}", summary.frames);
    eprintln!("   Time:    {:.2}s", elapsed.as_secs_f64());
    if config.render.hash {
        eprintln!("   Hash:    {}", summary.content_hash);
    }
    if let Some(path) = output {
        eprintln!("   Output:  {}", path.display());
    }
    Ok(())
}

fn drive(
    compositor: &mut Compositor,
    range: FrameRange,
    sink: &mut dyn FrameSink,
) -> Result<kinema_engine::RenderSummary> {
    render_range(compositor, range, sink).context("frame production aborted")
}

fn cmd_check(file: PathBuf) -> Result<()> {
    println!("Checking {}", file.display());

    let scene = load_scene(&file)?;
    println!("   ✓ Parse OK ({} entities)", scene.len());

    kinema_ir::validate_scene(&scene).map_err(|errors| {
        let msgs: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
        anyhow::anyhow!("Validation errors:\n  {}", msgs.join("\n  "))
    })?;
    println!("   ✓ Validate OK");

    let order = kinema_engine::resolve(&scene).context("dependency resolution failed")?;
    println!("   ✓ Dependency order OK");
    println!();
    for (i, name) in order.iter().enumerate() {
        let kind = scene
            .get(name)
            .map(|e| e.kind.to_string())
            .unwrap_or_default();
        println!("   {:>3}. {} ({})", i + 1, name, kind);
    }
    println!();
    println!("   Frames: {}", scene.frame_range());
    Ok(())
}

#[derive(Serialize)]
struct EntityReport {
    name: String,
    kind: String,
    existence: kinema_engine::Existence,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<kinema_ir::Placement>,
    elements: usize,
}

fn cmd_inspect(file: PathBuf, frame: u64, json: bool, bodies: Option<PathBuf>) -> Result<()> {
    let scene = load_scene(&file)?;
    let start = scene.min_frame();
    if frame < start {
        anyhow::bail!("frame {} is before the scene's first frame {}", frame, start);
    }

    let mut compositor = Compositor::with_json_bodies(scene, body_root(&file, bodies))
        .with_context(|| format!("invalid scene: {}", file.display()))?;
    for f in start..=frame {
        compositor
            .compose_frame(f)
            .with_context(|| format!("failed to compose frame {}", f))?;
    }

    let reports: Vec<EntityReport> = compositor
        .scene()
        .entities
        .iter()
        .map(|def| EntityReport {
            name: def.name.clone(),
            kind: def.kind.to_string(),
            existence: compositor
                .existence(&def.name)
                .unwrap_or(kinema_engine::Existence::NotMaterialized),
            position: compositor.position_of(&def.name),
            elements: compositor.element_count(&def.name).unwrap_or(0),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Frame {} of {}", frame, file.display());
    println!();
    for r in &reports {
        let position = r
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<20} {:<16} {:<16} {:>4}  {}",
            r.name,
            r.kind,
            r.existence.to_string(),
            r.elements,
            position
        );
    }
    Ok(())
}

fn cmd_info() -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "Kinema Scene Engine")?;
    writeln!(out, "   Version:   {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "   Engine:    single-threaded, stateful frame composition")?;
    writeln!(out, "   Scenes:    JSON scene descriptors")?;
    writeln!(out, "   Bodies:    JSON element lists")?;
    writeln!(out, "   Output:    JSON lines render lists")?;
    writeln!(out)?;
    writeln!(out, "   Repository: https://github.com/kinema-dev/kinema")?;
    Ok(())
}
