//! # Delve Entry Point
//!
//! Plays dungeon runs headlessly with the autopilot and keeps the results in a save file.

use clap::{Parser, ValueEnum};
use delve::{
    Autopilot, AutopilotConfig, Character, CharacterClass, ContentRegistry, DelveResult,
    DungeonProgression, DungeonRun, GenerationConfig, RoomGridGenerator, SaveFile, UpgradeType,
};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ClassArg {
    Warrior,
    Rogue,
    Mage,
}

impl From<ClassArg> for CharacterClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Warrior => CharacterClass::Warrior,
            ClassArg::Rogue => CharacterClass::Rogue,
            ClassArg::Mage => CharacterClass::Mage,
        }
    }
}

/// Command line arguments for Delve.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Headless dungeon runs with persistent meta progression")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation and combat rolls
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of runs to play
    #[arg(short, long, default_value_t = 1)]
    runs: u32,

    /// Class of a newly created character
    #[arg(short, long, value_enum, default_value_t = ClassArg::Warrior)]
    class: ClassArg,

    /// Depth to reach before escaping
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// Save file to load from and write back to
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);
    info!("Starting Delve v{}", delve::VERSION);

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

fn run(args: &Args) -> DelveResult<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let registry = ContentRegistry::builtin()?;
    let generator = RoomGridGenerator::new(GenerationConfig::new(seed));

    let (mut character, mut progression) = match &args.save {
        Some(path) if path.exists() => {
            let save = SaveFile::load_from_path(path)?;
            (save.character, save.progression)
        }
        _ => (
            Character::new("Delver", args.class.into()),
            DungeonProgression::new(),
        ),
    };

    let config = AutopilotConfig {
        target_depth: args.depth.max(1),
        ..AutopilotConfig::default()
    };
    for number in 1..=args.runs {
        let mut run = DungeonRun::begin(character, &progression, &generator, 1, &mut rng)?;
        let mut pilot = Autopilot::new(registry.clone(), config.clone());
        let summary = pilot.play(&mut run, &mut rng)?;
        character = run.into_character();
        let tokens = progression.record_run_completion(&summary);
        println!(
            "Run {number}: {:?} at depth {}, {} kills, {} tokens (level {}, {} gold)",
            summary.outcome,
            summary.depth_reached,
            summary.enemies_killed,
            tokens,
            character.level(),
            character.gold()
        );
        spend_tokens(&mut progression);
    }

    let stats = progression.stats();
    println!(
        "{} runs, {} escapes, {} deaths, deepest depth {}, {} tokens banked",
        stats.runs,
        stats.victories,
        stats.deaths,
        stats.deepest_depth,
        progression.tokens()
    );

    if let Some(path) = &args.save {
        SaveFile::new(character, progression).save_to_path(path)?;
    }
    Ok(())
}

/// Buys the cheapest affordable upgrades until nothing fits.
fn spend_tokens(progression: &mut DungeonProgression) {
    loop {
        let cheapest = UpgradeType::all()
            .into_iter()
            .filter_map(|kind| progression.upgrade_cost(kind).map(|cost| (cost, kind)))
            .filter(|(cost, _)| *cost <= progression.tokens())
            .min();
        let Some((_, kind)) = cheapest else {
            break;
        };
        match progression.purchase_upgrade(kind) {
            Ok(level) => info!("Upgraded {:?} to level {}", kind, level),
            Err(_) => break,
        }
    }
}
