//! The single controller a UI talks to.
//!
//! An [`Arena`] owns the progression store, the roster of scanned cards, the
//! pending scans and the current [`BattleSession`]. Every input is a method
//! call; everything the UI needs to redraw comes back through
//! [`Arena::drain_events`].

use tracing::{debug, info, warn};

use crate::battle::{BattleEvent, BattleSession, CommandError, Phase};
use crate::config::ArenaConfig;
use crate::content;
use crate::fighter::{Fighter, FighterId, TeamId, SLOTS_PER_TEAM};
use crate::progression::{FileBackend, ProgressionStore, StatKind};
use crate::record::{CharacterRecord, RawCard};
use crate::roulette::{RouletteOutcome, SpinHandle};
use crate::scan::{ScanStatus, ScanTicket, ScanTracker};
use crate::settlement::{settle, Award};
use crate::Dice;

const FALLBACK_SEED_SALT: u64 = 0x5EED_CA4D;

type Roster = [[Option<CharacterRecord>; SLOTS_PER_TEAM]; 2];

pub struct Arena {
    config: ArenaConfig,
    store: ProgressionStore,
    dice: Dice,
    scans: ScanTracker,
    roster: Roster,
    session: BattleSession,
    battles: u64,
    events: Vec<BattleEvent>,
    last_awards: Vec<Award>,
}

impl Arena {
    pub fn new(config: ArenaConfig, store: ProgressionStore) -> Self {
        let session = BattleSession::new(config.rules(), config.seed);
        Self {
            dice: Dice::from_seed(config.seed ^ FALLBACK_SEED_SALT),
            store,
            scans: ScanTracker::new(),
            roster: Default::default(),
            session,
            battles: 0,
            events: Vec::new(),
            last_awards: Vec::new(),
            config,
        }
    }

    /// Arena whose progression lives at `config.store_path`, or in memory without one.
    pub fn from_config(config: ArenaConfig) -> Self {
        let store = match &config.store_path {
            Some(path) => ProgressionStore::load(FileBackend::new(path)),
            None => ProgressionStore::in_memory(),
        };
        Self::new(config, store)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn store(&self) -> &ProgressionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressionStore {
        &mut self.store
    }

    pub fn spend_point(&mut self, uuid: &str, stat: StatKind) -> bool {
        self.store.spend_point(uuid, stat)
    }

    pub fn session(&self) -> &BattleSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn record(&self, team: TeamId, slot: usize) -> Option<&CharacterRecord> {
        self.roster[team.index()].get(slot).and_then(Option::as_ref)
    }

    pub fn last_awards(&self) -> &[Award] {
        &self.last_awards
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.pump();
        std::mem::take(&mut self.events)
    }

    fn pump(&mut self) {
        self.events.extend(self.session.drain_events());
    }

    fn derive(&mut self, team: TeamId, slot: usize, record: CharacterRecord) -> Fighter {
        let progress = *self.store.get_or_create(&record.uuid);
        Fighter::derive(FighterId::new(team, slot), record, &progress)
    }

    /// Validate `raw` and seat it in `slot`. A rejected card leaves the roster untouched
    /// and is reported with a `SlotRejected` event.
    pub fn start_slot(&mut self, team: TeamId, slot: usize, raw: &RawCard) -> Result<(), CommandError> {
        if slot >= SLOTS_PER_TEAM {
            return Err(CommandError::SlotOutOfRange(slot));
        }
        if self.session.phase() != Phase::Setup {
            return Err(CommandError::WrongPhase {
                action: "assign a slot",
                phase: self.session.phase().name(),
            });
        }

        let record = match CharacterRecord::from_raw(raw, &self.config.identity_marker) {
            Ok(record) => record,
            Err(e) => {
                warn!(%team, slot, error = %e, "card rejected");
                self.events.push(BattleEvent::SlotRejected {
                    team,
                    slot,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        info!(%team, slot, name = %record.name, uuid = %record.uuid, "card assigned");
        let fighter = self.derive(team, slot, record.clone());
        self.session.admit(fighter)?;
        self.scans.cancel(team, slot);
        self.roster[team.index()][slot] = Some(record);
        self.pump();
        Ok(())
    }

    pub fn remove_slot(&mut self, team: TeamId, slot: usize) -> Result<(), CommandError> {
        self.session.remove(team, slot)?;
        self.scans.cancel(team, slot);
        self.roster[team.index()][slot] = None;
        self.pump();
        Ok(())
    }

    /// Start waiting for a scan on `slot`; any earlier scan for the slot is superseded.
    pub fn begin_scan(&mut self, team: TeamId, slot: usize) -> Result<ScanTicket, CommandError> {
        self.scans
            .begin(team, slot)
            .ok_or(CommandError::SlotOutOfRange(slot))
    }

    pub fn complete_scan(&mut self, ticket: ScanTicket, raw: &RawCard) -> ScanStatus {
        if !self.scans.settle(ticket) {
            debug!(team = %ticket.team, slot = ticket.slot, "dropping superseded scan");
            return ScanStatus::Superseded;
        }
        match self.start_slot(ticket.team, ticket.slot, raw) {
            Ok(()) => ScanStatus::Assigned,
            Err(e) => ScanStatus::Rejected {
                reason: e.to_string(),
            },
        }
    }

    /// A tag was read but held no character data: seat the bundled character its
    /// serial number maps to.
    pub fn complete_scan_from_serial(&mut self, ticket: ScanTicket, serial: &str) -> ScanStatus {
        match content::fallback_for_serial(serial) {
            Some(raw) => self.complete_scan(ticket, &raw),
            None => self.complete_scan(ticket, &RawCard::default()),
        }
    }

    /// Seat a random bundled character, for manual play without a card.
    pub fn assign_random(&mut self, team: TeamId, slot: usize) -> Result<(), CommandError> {
        let raw = content::random_fallback(&mut self.dice).unwrap_or_default();
        self.start_slot(team, slot, &raw)
    }

    /// The scan's wait ran out. Only the live ticket reports a timeout.
    pub fn expire_scan(&mut self, ticket: ScanTicket) -> ScanStatus {
        if !self.scans.settle(ticket) {
            return ScanStatus::Superseded;
        }
        debug!(team = %ticket.team, slot = ticket.slot, "scan timed out");
        self.events.push(BattleEvent::ScanTimedOut {
            team: ticket.team,
            slot: ticket.slot,
        });
        ScanStatus::TimedOut
    }

    /// Refresh every seated fighter from its card and current progression, then start.
    pub fn begin_battle(&mut self) -> Result<(), CommandError> {
        if self.session.phase() != Phase::Setup {
            return Err(CommandError::WrongPhase {
                action: "begin the battle",
                phase: self.session.phase().name(),
            });
        }
        for team in TeamId::BOTH {
            for slot in 0..SLOTS_PER_TEAM {
                let Some(record) = self.roster[team.index()][slot].clone() else {
                    continue;
                };
                let fresh = self.derive(team, slot, record);
                let seated = self.session.fighter(fresh.id);
                if seated != Some(&fresh) {
                    self.session.admit(fresh)?;
                }
            }
        }
        self.session.begin()?;
        self.scans.cancel_all();
        self.pump();
        Ok(())
    }

    pub fn spin_handle(&self) -> Option<SpinHandle> {
        self.session.spin_handle()
    }

    pub fn tick_roulette(&mut self, handle: SpinHandle) -> Vec<(TeamId, u32)> {
        let rolled = self.session.tick(handle);
        self.pump();
        rolled
    }

    pub fn stop_roulette(&mut self, side: TeamId) -> Result<Option<RouletteOutcome>, CommandError> {
        let outcome = self.session.stop_roulette(side)?;
        self.after_action();
        Ok(outcome)
    }

    pub fn select_attacker(&mut self, id: FighterId) -> Result<(), CommandError> {
        self.session.select_attacker(id)?;
        self.after_action();
        Ok(())
    }

    pub fn select_target(&mut self, id: FighterId) -> Result<(), CommandError> {
        self.session.select_target(id)?;
        self.after_action();
        Ok(())
    }

    pub fn next_turn(&mut self) -> Result<(), CommandError> {
        self.session.next_turn()?;
        self.after_action();
        Ok(())
    }

    /// Settle the battle the moment it ends. `take_outcome` yields once, so this runs once.
    fn after_action(&mut self) {
        self.pump();
        let Some(outcome) = self.session.take_outcome() else {
            return;
        };
        let awards = settle(&mut self.store, &outcome, self.config.award_rule);
        self.events.push(BattleEvent::BattleEnded {
            winning_team: outcome.winner,
            awards: awards.clone(),
        });
        self.last_awards = awards;
    }

    fn fresh_session(&mut self) {
        self.battles += 1;
        let seed = self.config.seed.wrapping_add(self.battles);
        self.session = BattleSession::new(self.config.rules(), seed);
    }

    /// New battle with the same cards, re-derived from their updated progression.
    pub fn rematch(&mut self) -> Result<(), CommandError> {
        self.fresh_session();
        for team in TeamId::BOTH {
            for slot in 0..SLOTS_PER_TEAM {
                if let Some(record) = self.roster[team.index()][slot].clone() {
                    let fighter = self.derive(team, slot, record);
                    self.session.admit(fighter)?;
                }
            }
        }
        self.pump();
        Ok(())
    }

    /// Back to an empty roster.
    pub fn reset(&mut self) {
        self.fresh_session();
        self.scans.cancel_all();
        self.roster = Default::default();
        self.last_awards.clear();
        for team in TeamId::BOTH {
            self.events.push(BattleEvent::RosterUpdated {
                team,
                fighters: Vec::new(),
            });
        }
    }
}
