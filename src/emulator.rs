use std::fmt;

use log::{debug, trace};
use thiserror::Error;

use crate::core::{Core, CoreConfig};
use crate::cpu::{self, ExecutionResult};
use crate::instruction::{Instruction, Opcode};
use crate::stats::MatchStats;
use crate::warrior::{Warrior, WarriorId};

/// How a call to [`Emulator::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cycle ceiling was reached with both warriors alive
    Tie,
    /// Warrior 2 ran out of processes
    WonByW1,
    /// Warrior 1 ran out of processes
    WonByW2,
    /// The step budget ran out before anything was decided
    Paused,
    /// A queue was already empty when `run` was called
    NoExecution,
}

impl RunOutcome {
    /// Stable integer signal values for embedding callers
    pub fn code(self) -> i32 {
        match self {
            RunOutcome::Tie => 0,
            RunOutcome::WonByW1 => 1,
            RunOutcome::WonByW2 => 2,
            RunOutcome::Paused => -1,
            RunOutcome::NoExecution => -2,
        }
    }

    pub fn won_by(id: WarriorId) -> Self {
        match id {
            WarriorId::W1 => RunOutcome::WonByW1,
            WarriorId::W2 => RunOutcome::WonByW2,
        }
    }

    pub fn winner(self) -> Option<WarriorId> {
        match self {
            RunOutcome::WonByW1 => Some(WarriorId::W1),
            RunOutcome::WonByW2 => Some(WarriorId::W2),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Tie => f.write_str("tie"),
            RunOutcome::WonByW1 => f.write_str("won by warrior 1"),
            RunOutcome::WonByW2 => f.write_str("won by warrior 2"),
            RunOutcome::Paused => f.write_str("paused"),
            RunOutcome::NoExecution => f.write_str("no execution"),
        }
    }
}

/// Contract violations at the engine interface.  In-game events such as a
/// death or a saturated queue are never errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmulatorError {
    #[error("{0} is already loaded")]
    SlotOccupied(WarriorId),
    #[error("warrior has no instructions")]
    EmptyWarrior,
    #[error("warrior length {len} exceeds the maximum of {max}")]
    WarriorTooLong { len: usize, max: usize },
    #[error("start position {start} is outside the warrior body of length {len}")]
    StartOutOfRange { start: usize, len: usize },
    #[error("warrior bases are {dist} cells apart, need at least {required}")]
    InsufficientSeparation { dist: usize, required: usize },
    #[error("opcode {op} at address {addr} is not implemented")]
    UnimplementedOpcode { op: Opcode, addr: usize },
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    base: usize,
}

/// The engine façade: owns the core, loads warriors, and drives the match
/// one cycle at a time with strictly alternating turns.
pub struct Emulator {
    core: Core,
    loaded: [Option<Placement>; 2],
    stats: MatchStats,
}

impl Emulator {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            core: Core::new(config),
            loaded: [None, None],
            stats: MatchStats::default(),
        }
    }

    pub fn config(&self) -> CoreConfig {
        self.core.config()
    }

    /// Reset everything: sentinel-filled core, empty queues, counter zero,
    /// warrior 1 to act first, both load slots vacant
    pub fn clear(&mut self) {
        self.core.reset();
        self.loaded = [None, None];
        self.stats = MatchStats::default();
    }

    /// Copy a warrior into the core at `base` and queue its entry point.
    ///
    /// The base is folded onto the circle.  When the opponent is already
    /// loaded, the gap between the two bases must be at least
    /// `max_warrior + min_separation` in both directions around the circle.
    pub fn load_warrior(
        &mut self,
        warrior: &Warrior,
        base: usize,
        id: WarriorId,
    ) -> Result<(), EmulatorError> {
        let config = self.config();
        if self.loaded[id.index()].is_some() {
            return Err(EmulatorError::SlotOccupied(id));
        }
        if warrior.is_empty() {
            return Err(EmulatorError::EmptyWarrior);
        }
        if warrior.len() > config.max_warrior {
            return Err(EmulatorError::WarriorTooLong {
                len: warrior.len(),
                max: config.max_warrior,
            });
        }
        if warrior.start_pos >= warrior.len() {
            return Err(EmulatorError::StartOutOfRange {
                start: warrior.start_pos,
                len: warrior.len(),
            });
        }
        let base = base % config.core_size;
        if let Some(other) = self.loaded[id.opponent().index()] {
            let required = config.max_warrior + config.min_separation;
            let forward = (other.base + config.core_size - base) % config.core_size;
            let backward = (base + config.core_size - other.base) % config.core_size;
            if forward < required || backward < required {
                return Err(EmulatorError::InsufficientSeparation {
                    dist: forward.min(backward),
                    required,
                });
            }
        }
        for (i, &instr) in warrior.code.iter().enumerate() {
            // hand-built warriors may carry unfolded fields
            let mut cell = instr;
            cell.a_num %= config.core_size;
            cell.b_num %= config.core_size;
            self.core.write(base + i, cell);
        }
        let entry = self.core.fold(base + warrior.start_pos);
        self.core.queue_mut(id).push(entry);
        self.loaded[id.index()] = Some(Placement { base });
        debug!(
            "loaded {id}: {} instructions at base {base}, entry {entry}",
            warrior.len()
        );
        Ok(())
    }

    /// Write one instruction, given in textual form, at `addr`.  Text that
    /// does not parse falls back to the `DAT.F #0, #0` sentinel.  Meant for
    /// test setup.
    pub fn place(&mut self, text: &str, addr: usize) {
        let instr = Instruction::parse(text, self.core.size()).unwrap_or_default();
        self.core.write(addr, instr);
    }

    /// The canonical textual form of the cell at `addr`
    pub fn value_at(&self, addr: usize) -> String {
        self.core.read(addr).to_string()
    }

    /// The raw cell at `addr`
    pub fn instruction_at(&self, addr: usize) -> Instruction {
        self.core.read(addr)
    }

    /// Cycles executed since the last clear
    pub fn cycles(&self) -> usize {
        self.core.counter()
    }

    /// Live processes for one warrior, front of the queue first
    pub fn tasks(&self, id: WarriorId) -> Vec<usize> {
        self.core.queue(id).iter().collect()
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Drive the match.
    ///
    /// `steps == 0` runs until a warrior dies or the cycle ceiling makes
    /// the match a tie.  A positive budget executes at most that many
    /// cycles and reports [`RunOutcome::Paused`] when it runs out; a later
    /// call resumes where this one stopped.  When either queue is already
    /// empty on entry nothing executes at all.
    pub fn run(&mut self, steps: usize) -> Result<RunOutcome, EmulatorError> {
        if self.core.queue(WarriorId::W1).is_empty()
            || self.core.queue(WarriorId::W2).is_empty()
        {
            return Ok(RunOutcome::NoExecution);
        }
        let config = self.config();
        let remaining = config.max_cycles - self.core.counter();
        let budget = if steps == 0 {
            remaining
        } else {
            steps.min(remaining)
        };
        for _ in 0..budget {
            if let Some(outcome) = self.step()? {
                debug!("match over after {} cycles: {outcome}", self.core.counter());
                return Ok(outcome);
            }
        }
        if self.core.counter() >= config.max_cycles {
            debug!("cycle ceiling {} reached", config.max_cycles);
            Ok(RunOutcome::Tie)
        } else {
            Ok(RunOutcome::Paused)
        }
    }

    /// One cycle: pop the acting warrior's front process, execute it,
    /// flush deferred increments, advance the counter and the turn, then
    /// check whether the acting warrior just died out.
    fn step(&mut self) -> Result<Option<RunOutcome>, EmulatorError> {
        let who = self.core.turn();
        let Some(pc) = self.core.queue_mut(who).pop() else {
            return Ok(Some(RunOutcome::won_by(who.opponent())));
        };
        let queue_before = self.core.queue(who).len();
        trace!(
            "cycle {}: {who} runs {} at {pc}",
            self.core.counter(),
            self.core.read(pc)
        );
        let result = cpu::execute(&mut self.core, who, pc)?;
        self.core.flush_increments();
        self.core.advance_cycle();
        self.core.advance_turn();
        let queue_after = self.core.queue(who).len();
        self.stats.record_step(
            who,
            result == ExecutionResult::Killed,
            queue_before,
            queue_after,
        );
        if self.core.queue(who).is_empty() {
            return Ok(Some(RunOutcome::won_by(who.opponent())));
        }
        Ok(None)
    }
}
