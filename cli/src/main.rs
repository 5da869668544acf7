use std::{fs, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use engine::api::{simulate_battle, BattleConfig, CardInput};
use engine::progression::{peek, required_exp, FileBackend, ProgressionStore};
use engine::record::DEFAULT_IDENTITY_MARKER;
use engine::{content, ArenaConfig, AwardRule, CharacterRecord, CombatRuleset, RawCard, StatKind};
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE: &str = "character_upgrades.json";

#[derive(Copy, Clone, ValueEnum)]
enum Rules {
    /// attack × roulette multiplier, defence ignored
    Flat,
    /// speed decides who strikes, blocks stop the hit
    Speed,
    /// defence reduces damage by percentage
    Mitigation,
}

#[derive(Copy, Clone, ValueEnum)]
enum Awards {
    Flat,
    Perfect,
}

#[derive(Subcommand)]
enum Cmd {
    /// List the bundled characters
    Roster,
    /// Run one battle with a seeded driver playing both sides
    Battle {
        /// Team one: bundled character names or card JSON files (up to two)
        #[arg(long = "p1", required = true)]
        team_one: Vec<String>,
        /// Team two: bundled character names or card JSON files (up to two)
        #[arg(long = "p2", required = true)]
        team_two: Vec<String>,
        /// Arena config (.yaml/.yml or .json); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum)]
        ruleset: Option<Rules>,
        #[arg(long, value_enum)]
        award: Option<Awards>,
        /// Progression file to read and update; in-memory if omitted
        #[arg(long)]
        store: Option<PathBuf>,
        /// Stop after this many turns even without a winner
        #[arg(long)]
        max_turns: Option<u32>,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show saved progression
    Progress {
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
    /// Spend one point on a permanent stat bonus
    Upgrade {
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        #[arg(long)]
        uuid: String,
        /// hp | attack | defence
        #[arg(long)]
        stat: String,
    },
    /// Rewrite a progression file in the current record shape
    Migrate {
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
}

#[derive(Parser)]
#[command(name = "beyonder")]
#[command(about = "Beyonder card battle CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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

/// A card file if the argument names one, a bundled character otherwise.
fn card_input(arg: &str) -> anyhow::Result<CardInput> {
    let path = Path::new(arg);
    if path.is_file() {
        let text = read_text_auto(path)?;
        let raw: RawCard = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a card JSON file", path.display()))?;
        return Ok(CardInput::Card(raw));
    }
    Ok(CardInput::Builtin(arg.to_string()))
}

fn to_ruleset(r: Rules) -> CombatRuleset {
    match r {
        Rules::Flat => CombatRuleset::FlatMultiplier,
        Rules::Speed => CombatRuleset::SpeedInitiative,
        Rules::Mitigation => CombatRuleset::DefenceMitigation,
    }
}

fn to_award_rule(a: Awards) -> AwardRule {
    match a {
        Awards::Flat => AwardRule::Flat,
        Awards::Perfect => AwardRule::PerfectWin,
    }
}

fn print_roster() -> anyhow::Result<()> {
    println!("{:<10} {:>4} {:>4} {:>4} {:>4}  uuid", "name", "hp", "atk", "def", "spd");
    for raw in content::builtin_characters() {
        let c = CharacterRecord::from_raw(&raw, DEFAULT_IDENTITY_MARKER)?;
        println!(
            "{:<10} {:>4} {:>4} {:>4} {:>4}  {} {}",
            c.name, c.base_hp, c.base_attack, c.base_defence, c.speed, c.uuid, c.sprite
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Roster => print_roster()?,
        Cmd::Battle {
            team_one,
            team_two,
            config,
            seed,
            ruleset,
            award,
            store,
            max_turns,
            json,
        } => {
            let mut arena = match config {
                Some(path) => ArenaConfig::from_path(&path)?,
                None => ArenaConfig::default(),
            };
            if let Some(seed) = seed {
                arena.seed = seed;
            }
            if let Some(r) = ruleset {
                arena.ruleset = to_ruleset(r);
            }
            if let Some(a) = award {
                arena.award_rule = to_award_rule(a);
            }
            if store.is_some() {
                arena.store_path = store;
            }
            let cfg = BattleConfig {
                team_one: team_one.iter().map(|a| card_input(a)).collect::<anyhow::Result<_>>()?,
                team_two: team_two.iter().map(|a| card_input(a)).collect::<anyhow::Result<_>>()?,
                arena,
                max_turns,
            };
            let report = simulate_battle(cfg)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for line in &report.log {
                println!("{}", line);
            }
            println!();
            match report.winner {
                Some(team) => println!("winner: {} after {} turns", team, report.turns),
                None => println!("no winner after {} turns", report.turns),
            }
            println!("ties: {}  blocks: {}", report.ties, report.blocks);
            for a in &report.awards {
                println!(
                    "{} {}: +{} exp +{} pts → Lv{} ({}/{} exp, {} pts){}",
                    a.fighter,
                    a.name,
                    a.exp,
                    a.points,
                    a.level,
                    a.exp_after,
                    required_exp(a.level),
                    a.points_after,
                    if a.levels_gained > 0 { " LEVEL UP" } else { "" }
                );
            }
        }
        Cmd::Progress { store } => {
            let records = peek(&FileBackend::new(&store))
                .with_context(|| format!("failed to read {}", store.display()))?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Cmd::Upgrade { store, uuid, stat } => {
            let stat: StatKind = stat.parse().map_err(anyhow::Error::msg)?;
            let mut store = ProgressionStore::load(FileBackend::new(&store));
            if !store.spend_point(&uuid, stat) {
                bail!("no point to spend for '{}'", uuid);
            }
            if let Some(rec) = store.get(&uuid) {
                println!(
                    "{}: hp +{} atk +{} def +{}, {} pts left",
                    uuid, rec.hp_bonus, rec.attack_bonus, rec.defence_bonus, rec.points
                );
            }
        }
        Cmd::Migrate { store } => {
            let loaded = ProgressionStore::load(FileBackend::new(&store));
            loaded
                .try_save()
                .with_context(|| format!("failed to write {}", store.display()))?;
            println!("{} records in {}", loaded.records().len(), store.display());
        }
    }
    Ok(())
}
