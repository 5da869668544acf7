use serde::{Deserialize, Serialize};

use crate::fighter::{TeamId, SLOTS_PER_TEAM};

/// One pending scan for one slot. A newer ticket for the same slot, or a manual
/// assignment, makes it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTicket {
    pub team: TeamId,
    pub slot: usize,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ScanStatus {
    Assigned,
    Rejected { reason: String },
    TimedOut,
    /// The ticket was replaced or cancelled; the result is dropped without an event.
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct ScanTracker {
    live: [[Option<u64>; SLOTS_PER_TEAM]; 2],
    next: u64,
}

impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `slot`, superseding any earlier one. `None` for a bad slot.
    pub fn begin(&mut self, team: TeamId, slot: usize) -> Option<ScanTicket> {
        let cell = self.live[team.index()].get_mut(slot)?;
        self.next += 1;
        *cell = Some(self.next);
        Some(ScanTicket {
            team,
            slot,
            generation: self.next,
        })
    }

    pub fn is_live(&self, ticket: ScanTicket) -> bool {
        self.live[ticket.team.index()]
            .get(ticket.slot)
            .is_some_and(|g| *g == Some(ticket.generation))
    }

    /// Retire `ticket` if it is still the live one. Returns false for stale tickets.
    pub fn settle(&mut self, ticket: ScanTicket) -> bool {
        if !self.is_live(ticket) {
            return false;
        }
        self.live[ticket.team.index()][ticket.slot] = None;
        true
    }

    pub fn cancel(&mut self, team: TeamId, slot: usize) {
        if let Some(cell) = self.live[team.index()].get_mut(slot) {
            *cell = None;
        }
    }

    pub fn cancel_all(&mut self) {
        self.live = Default::default();
    }
}
