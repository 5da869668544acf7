use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::battle::{BattleEvent, FighterSummary, Phase};
use crate::config::ArenaConfig;
use crate::content;
use crate::fighter::{FighterId, TeamId, SLOTS_PER_TEAM};
use crate::progression::ProgressionStore;
use crate::record::RawCard;
use crate::settlement::Award;
use crate::Dice;

const MAX_TURNS: u32 = 200;
const MAX_SPIN_TICKS: u32 = 8;
const DRIVER_SEED_SALT: u64 = 0xD21_7E55;

/// A fighter given either as a bundled character name or as inline card data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardInput {
    Builtin(String),
    Card(RawCard),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleConfig {
    pub team_one: Vec<CardInput>,
    pub team_two: Vec<CardInput>,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleReport {
    /// `None` when the turn cap was hit first.
    pub winner: Option<TeamId>,
    pub turns: u32,
    pub ties: u32,
    pub blocks: u32,
    pub fighters: Vec<FighterSummary>,
    pub awards: Vec<Award>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleStats {
    pub samples: u32,
    pub team_one_wins: u32,
    pub team_two_wins: u32,
    pub unfinished: u32,
    pub avg_turns: f64,
    pub avg_blocks: f64,
}

pub fn resolve_card(input: &CardInput) -> Result<RawCard> {
    match input {
        CardInput::Builtin(name) => content::find_builtin(name)
            .with_context(|| format!("unknown builtin character '{}'", name)),
        CardInput::Card(raw) => Ok(raw.clone()),
    }
}

/// Run one battle to the end with a seeded driver standing in for both players.
/// Progression is read from and written to `cfg.arena.store_path` when set.
pub fn simulate_battle(cfg: BattleConfig) -> Result<BattleReport> {
    let store = match &cfg.arena.store_path {
        Some(path) => ProgressionStore::load(crate::progression::FileBackend::new(path)),
        None => ProgressionStore::in_memory(),
    };
    let mut arena = Arena::new(cfg.arena.clone(), store);
    run_battle(&mut arena, &cfg)
}

/// Like [`simulate_battle`] against an arena the caller owns, so progression
/// carries over between calls. A finished battle in the arena is cleared first.
pub fn run_battle(arena: &mut Arena, cfg: &BattleConfig) -> Result<BattleReport> {
    if arena.phase() != Phase::Setup {
        arena.reset();
    }
    for (team, inputs) in [(TeamId::One, &cfg.team_one), (TeamId::Two, &cfg.team_two)] {
        if inputs.is_empty() || inputs.len() > SLOTS_PER_TEAM {
            bail!(
                "{} needs 1 to {} fighters, got {}",
                team,
                SLOTS_PER_TEAM,
                inputs.len()
            );
        }
        for (slot, input) in inputs.iter().enumerate() {
            let raw = resolve_card(input)?;
            arena
                .start_slot(team, slot, &raw)
                .with_context(|| format!("failed to seat {} slot {}", team, slot + 1))?;
        }
        for slot in inputs.len()..SLOTS_PER_TEAM {
            arena.remove_slot(team, slot)?;
        }
    }

    let mut driver = Dice::from_seed(arena.config().seed ^ DRIVER_SEED_SALT);
    let max_turns = cfg.max_turns.unwrap_or(MAX_TURNS);
    let mut ties = 0u32;
    let mut blocks = 0u32;

    arena.begin_battle().context("battle did not start")?;
    loop {
        for event in arena.drain_events() {
            match event {
                BattleEvent::RouletteResolved { winner: None, .. } => ties += 1,
                BattleEvent::TurnResolved(result) if result.blocked => blocks += 1,
                _ => {}
            }
        }

        match arena.phase() {
            Phase::Terminal { .. } => break,
            Phase::Setup => bail!("battle did not start"),
            Phase::RouletteInFlight => drive_roulette(arena, &mut driver)?,
            Phase::ActionSelection {
                side,
                attacker: None,
                ..
            } => {
                let pick = pick_living(arena, side, &mut driver)?;
                arena.select_attacker(pick)?;
            }
            Phase::ActionSelection {
                side,
                attacker: Some(_),
                ..
            } => {
                let pick = pick_living(arena, side.opponent(), &mut driver)?;
                arena.select_target(pick)?;
            }
            Phase::Intermission => {
                if arena.session().turn() >= max_turns {
                    break;
                }
                arena.next_turn()?;
            }
        }
    }

    let session = arena.session();
    let fighters = session
        .teams()
        .iter()
        .flat_map(|t| t.fighters())
        .map(FighterSummary::from)
        .collect();
    Ok(BattleReport {
        winner: session.winner(),
        turns: session.turn(),
        ties,
        blocks,
        fighters,
        awards: if session.winner().is_some() {
            arena.last_awards().to_vec()
        } else {
            Vec::new()
        },
        log: session.log().to_vec(),
    })
}

/// Each side lets the wheel spin a random number of ticks before stopping.
fn drive_roulette(arena: &mut Arena, driver: &mut Dice) -> Result<()> {
    let Some(handle) = arena.spin_handle() else {
        bail!("roulette in flight without a spin handle");
    };
    let mut stops = [
        (TeamId::One, driver.between(0, MAX_SPIN_TICKS)),
        (TeamId::Two, driver.between(0, MAX_SPIN_TICKS)),
    ];
    stops.sort_by_key(|(_, ticks)| *ticks);

    let mut ticked = 0;
    for (side, ticks) in stops {
        while ticked < ticks {
            arena.tick_roulette(handle);
            ticked += 1;
        }
        arena.stop_roulette(side)?;
    }
    Ok(())
}

fn pick_living(arena: &Arena, team: TeamId, driver: &mut Dice) -> Result<FighterId> {
    let living: Vec<FighterId> = arena.session().team(team).living().map(|f| f.id).collect();
    if living.is_empty() {
        bail!("{} has no living fighter to choose", team);
    }
    Ok(living[driver.index(living.len())])
}

/// Many independent battles (seed, seed+1, …) with throwaway in-memory progression.
pub fn simulate_battle_many(cfg: BattleConfig, samples: u32) -> Result<BattleStats> {
    let mut stats = BattleStats {
        samples,
        team_one_wins: 0,
        team_two_wins: 0,
        unfinished: 0,
        avg_turns: 0.0,
        avg_blocks: 0.0,
    };
    let mut turns_total = 0u64;
    let mut blocks_total = 0u64;

    for i in 0..samples {
        let mut trial = cfg.clone();
        trial.arena.seed = cfg.arena.seed.wrapping_add(u64::from(i));
        trial.arena.store_path = None;
        let report = simulate_battle(trial)?;
        match report.winner {
            Some(TeamId::One) => stats.team_one_wins += 1,
            Some(TeamId::Two) => stats.team_two_wins += 1,
            None => stats.unfinished += 1,
        }
        turns_total += u64::from(report.turns);
        blocks_total += u64::from(report.blocks);
    }

    if samples > 0 {
        stats.avg_turns = turns_total as f64 / f64::from(samples);
        stats.avg_blocks = blocks_total as f64 / f64::from(samples);
    }
    Ok(stats)
}
