use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pushmock", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a template snapshot for structural problems.
    Validate(ValidateArgs),
    /// Compile one frame into a draw-plan JSON dump.
    Plan(PlanArgs),
    /// Summarize the stage, card and animation timeline.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input template snapshot JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input template snapshot JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline instant in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output path for the plan JSON (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input template snapshot JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn read_scene(path: &Path) -> anyhow::Result<pushmock::Scene> {
    let f = File::open(path).with_context(|| format!("open template '{}'", path.display()))?;
    let r = BufReader::new(f);
    let snap: pushmock::SceneSnapshot =
        serde_json::from_reader(r).with_context(|| "parse template JSON")?;
    let mut scene = pushmock::Scene::new();
    scene.restore(&snap);
    scene.clamp();
    Ok(scene)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    scene.validate()?;
    println!("{}: ok", args.in_path.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    scene.validate()?;

    let measure = pushmock::FixedAdvanceMeasure::default();
    let (at, phase) = pushmock::card_transform(&scene.anim, &scene.card, &scene.stage, args.time);
    let plan = pushmock::compile_frame(&scene, &measure, &at, None);

    let json = serde_json::to_string_pretty(&plan).context("serialize frame plan")?;
    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(&out, json)
                .with_context(|| format!("write plan '{}'", out.display()))?;
            println!(
                "t={:.3}s phase={:?} ops={} -> {}",
                args.time,
                phase,
                plan.ops.len(),
                out.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let a = &scene.anim;

    println!("stage   {}x{} bg {}", scene.stage.w, scene.stage.h, scene.stage.bg);
    println!(
        "card    {}x{} at ({}, {}) r={}",
        scene.card.w, scene.card.h, scene.card.x, scene.card.y, scene.card.r
    );
    println!("texts   {}", scene.texts.len());
    println!(
        "avatar  {}px {:?}{}",
        scene.avatar.size,
        scene.avatar.shape,
        if scene.avatar.payload.is_some() {
            " (image set)"
        } else {
            ""
        }
    );
    println!();
    println!("timeline ({:?} in, {:?} out):", a.in_direction, a.out_direction);
    let rows = [
        ("beforeStart", a.before_start),
        ("delay", a.delay),
        ("in", a.enter),
        ("hold", a.hold),
        ("out", a.exit),
        ("afterEnd", a.after_end),
    ];
    let mut start = 0.0;
    for (name, dur) in rows {
        println!("  {name:<12} {start:>6.2}s .. {:>6.2}s ({dur:.2}s)", start + dur);
        start += dur;
    }
    println!("  total        {:.2}s (export {:.2}s)", a.total(), a.total() + 0.1);
    if a.press_on {
        let ps = a.before_start + a.delay + a.press_at;
        println!(
            "  press        {ps:.2}s .. {:.2}s (depth {:.2})",
            ps + a.press_dur,
            a.press_depth
        );
    }
    Ok(())
}
