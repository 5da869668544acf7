use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fighter::TeamId;
use crate::Dice;

/// Token for one spin. Invalidated when the spin resolves or is cancelled, so a
/// late timer tick carrying an old handle does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpinHandle {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RouletteOutcome {
    Winner {
        side: TeamId,
        multiplier: u32,
        values: [u32; 2],
    },
    Tie {
        value: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouletteError {
    #[error("roulette is not spinning")]
    NotSpinning,
    #[error("{0} already stopped the roulette")]
    AlreadyStopped(TeamId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    value: u32,
    stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpinState {
    Idle,
    Spinning,
    Resolved(RouletteOutcome),
}

/// Higher frozen value takes the turn and becomes its multiplier; equal values tie.
pub fn decide(values: [u32; 2]) -> RouletteOutcome {
    match values[0].cmp(&values[1]) {
        Ordering::Greater => RouletteOutcome::Winner {
            side: TeamId::One,
            multiplier: values[0],
            values,
        },
        Ordering::Less => RouletteOutcome::Winner {
            side: TeamId::Two,
            multiplier: values[1],
            values,
        },
        Ordering::Equal => RouletteOutcome::Tie { value: values[0] },
    }
}

/// Simultaneous-stop contest: both sides spin a private 1..=5 value, each freezes its
/// own with `stop`, and the higher frozen value takes the turn.
#[derive(Debug, Clone)]
pub struct Roulette {
    slots: [Slot; 2],
    generation: u64,
    state: SpinState,
}

impl Default for Roulette {
    fn default() -> Self {
        Self::new()
    }
}

impl Roulette {
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); 2],
            generation: 0,
            state: SpinState::Idle,
        }
    }

    /// Start a fresh spin, rolling an initial value for each side.
    pub fn spin(&mut self, dice: &mut Dice) -> SpinHandle {
        self.generation += 1;
        for slot in &mut self.slots {
            *slot = Slot {
                value: dice.multiplier(),
                stopped: false,
            };
        }
        self.state = SpinState::Spinning;
        SpinHandle {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, handle: SpinHandle) -> bool {
        self.state == SpinState::Spinning && handle.generation == self.generation
    }

    /// Re-roll every side that has not stopped. Stale handles are ignored.
    pub fn tick(&mut self, handle: SpinHandle, dice: &mut Dice) -> Vec<(TeamId, u32)> {
        if !self.is_current(handle) {
            return Vec::new();
        }
        let mut rolled = Vec::with_capacity(2);
        for side in TeamId::BOTH {
            let slot = &mut self.slots[side.index()];
            if !slot.stopped {
                slot.value = dice.multiplier();
                rolled.push((side, slot.value));
            }
        }
        rolled
    }

    /// Freeze `side`'s current value. Returns the outcome on the call that stops the
    /// second side, and only then.
    pub fn stop(&mut self, side: TeamId) -> Result<Option<RouletteOutcome>, RouletteError> {
        if self.state != SpinState::Spinning {
            return Err(RouletteError::NotSpinning);
        }
        let slot = &mut self.slots[side.index()];
        if slot.stopped {
            return Err(RouletteError::AlreadyStopped(side));
        }
        slot.stopped = true;

        if !self.slots.iter().all(|s| s.stopped) {
            return Ok(None);
        }

        let outcome = decide([self.slots[0].value, self.slots[1].value]);
        self.generation += 1;
        self.state = SpinState::Resolved(outcome);
        Ok(Some(outcome))
    }

    /// Abandon the current spin without resolving it.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = SpinState::Idle;
    }

    pub fn value(&self, side: TeamId) -> u32 {
        self.slots[side.index()].value
    }

    pub fn is_stopped(&self, side: TeamId) -> bool {
        self.slots[side.index()].stopped
    }

    pub fn is_spinning(&self) -> bool {
        self.state == SpinState::Spinning
    }

    pub fn outcome(&self) -> Option<RouletteOutcome> {
        match self.state {
            SpinState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }
}
