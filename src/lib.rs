pub mod instruction;
pub mod core;
pub mod scheduler;
pub mod warrior;
pub mod cpu;
pub mod stats;
pub mod emulator;

pub use crate::core::{Core, CoreConfig};
pub use crate::emulator::{Emulator, EmulatorError, RunOutcome};
pub use crate::instruction::{AddrMode, Instruction, Modifier, Opcode, ParseInstructionError};
pub use crate::stats::MatchStats;
pub use crate::warrior::{Warrior, WarriorId, WarriorSourceError};
