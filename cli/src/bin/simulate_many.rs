use clap::Parser;
use encoding_rs::Encoding;
use engine::api::{simulate_battle_many, BattleConfig, CardInput};
use engine::{ArenaConfig, CombatRuleset, RawCard};
use std::{fs, path::Path, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simulate-many")]
#[command(about = "Monte Carlo sim: many seeded battles between two rosters")]
struct Args {
    /// Team one: bundled character names or card JSON files
    #[arg(long = "p1", required = true)]
    team_one: Vec<String>,

    /// Team two: bundled character names or card JSON files
    #[arg(long = "p2", required = true)]
    team_two: Vec<String>,

    /// Number of battles
    #[arg(long, default_value_t = 1000)]
    samples: u32,

    /// RNG base seed (battle i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Rule set: flat | speed | mitigation
    #[arg(long, default_value = "flat")]
    ruleset: String,

    /// Chance that a strike is blocked
    #[arg(long)]
    block_chance: Option<f64>,

    /// Safety cap on turns per battle
    #[arg(long, default_value_t = 200)]
    max_turns: u32,

    /// Optional arena config (JSON or YAML); flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

fn to_ruleset(s: &str) -> CombatRuleset {
    match s.to_lowercase().as_str() {
        "speed" => CombatRuleset::SpeedInitiative,
        "mitigation" => CombatRuleset::DefenceMitigation,
        _ => CombatRuleset::FlatMultiplier,
    }
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn card_input(arg: &str) -> anyhow::Result<CardInput> {
    let path = Path::new(arg);
    if path.is_file() {
        let raw: RawCard = serde_json::from_str(&read_text_auto(path)?)?;
        Ok(CardInput::Card(raw))
    } else {
        Ok(CardInput::Builtin(arg.to_string()))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut arena = match args.config.as_ref() {
        Some(path) => ArenaConfig::from_path(path)?,
        None => ArenaConfig::default(),
    };
    arena.seed = args.seed;
    arena.ruleset = to_ruleset(&args.ruleset);
    if let Some(p) = args.block_chance {
        arena.block_chance = p;
    }
    let arena = arena.validated()?;

    let cfg = BattleConfig {
        team_one: args.team_one.iter().map(|a| card_input(a)).collect::<anyhow::Result<_>>()?,
        team_two: args.team_two.iter().map(|a| card_input(a)).collect::<anyhow::Result<_>>()?,
        arena,
        max_turns: Some(args.max_turns),
    };
    let ruleset = cfg.arena.ruleset;
    let stats = simulate_battle_many(cfg, args.samples)?;

    let rate = |wins: u32| {
        if stats.samples == 0 {
            0.0
        } else {
            f64::from(wins) / f64::from(stats.samples) * 100.0
        }
    };

    println!("simulate-many results");
    println!("---------------------");
    println!("samples:            {}", stats.samples);
    println!("p1:                 {}", args.team_one.join(", "));
    println!("p2:                 {}", args.team_two.join(", "));
    println!("ruleset:            {:?}", ruleset);
    println!();
    println!("p1 win rate:        {:.1}%", rate(stats.team_one_wins));
    println!("p2 win rate:        {:.1}%", rate(stats.team_two_wins));
    println!("unfinished:         {}", stats.unfinished);
    println!("avg turns:          {:.2}", stats.avg_turns);
    println!("avg blocks:         {:.2}", stats.avg_blocks);

    Ok(())
}
