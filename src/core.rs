use crate::instruction::Instruction;
use crate::scheduler::ProcessQueue;
use crate::warrior::WarriorId;

/// Sizing parameters of the virtual machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// Number of cells in the circular core
    pub core_size: usize,
    /// Cycle ceiling after which a running match is a tie
    pub max_cycles: usize,
    /// Longest admissible warrior
    pub max_warrior: usize,
    /// Capacity of each warrior's process queue
    pub max_tasks: usize,
    /// Minimum gap, beyond the warrior slot itself, between load bases
    pub min_separation: usize,
}

impl CoreConfig {
    /// ICWS '94 tournament parameters, same defaults as pmars
    pub const ICWS94: Self = Self {
        core_size: 8000,
        max_cycles: 80_000,
        max_warrior: 100,
        max_tasks: 8000,
        min_separation: 100,
    };

    /// ICWS '86 compatibility parameters
    pub const ICWS86: Self = Self {
        core_size: 8192,
        max_cycles: 100_000,
        max_warrior: 300,
        max_tasks: 64,
        min_separation: 300,
    };

    /// Tiny arena for debugging machine behavior by hand
    pub const DEBUG: Self = Self {
        core_size: 40,
        max_cycles: 1000,
        max_warrior: 10,
        max_tasks: 32,
        min_separation: 10,
    };
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::ICWS94
    }
}

/// The entire state of the virtual machine: circular memory, one process
/// queue per warrior, the deferred post-increment lists, the cycle counter,
/// and whose turn comes next.
pub struct Core {
    config: CoreConfig,
    memory: Vec<Instruction>,
    queues: [ProcessQueue; 2],
    to_increment_a: Vec<usize>,
    to_increment_b: Vec<usize>,
    counter: usize,
    turn: WarriorId,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            memory: vec![Instruction::default(); config.core_size],
            queues: [
                ProcessQueue::new(config.max_tasks),
                ProcessQueue::new(config.max_tasks),
            ],
            to_increment_a: Vec::new(),
            to_increment_b: Vec::new(),
            counter: 0,
            turn: WarriorId::W1,
        }
    }

    /// Back to the freshly-constructed state: sentinel-filled memory, empty
    /// queues and increment lists, counter zero, warrior 1 to act first
    pub fn reset(&mut self) {
        self.memory.fill(Instruction::default());
        for queue in &mut self.queues {
            queue.clear();
        }
        self.to_increment_a.clear();
        self.to_increment_b.clear();
        self.counter = 0;
        self.turn = WarriorId::W1;
    }

    pub fn config(&self) -> CoreConfig {
        self.config
    }

    pub fn size(&self) -> usize {
        self.config.core_size
    }

    /// Fold any address onto the circle
    pub fn fold(&self, addr: usize) -> usize {
        addr % self.config.core_size
    }

    /// `(base + off) mod core_size` for in-range inputs
    pub fn offset(&self, base: usize, off: usize) -> usize {
        (base + off) % self.config.core_size
    }

    /// `(value - 1) mod core_size` without leaving the unsigned domain
    pub fn step_back(&self, value: usize) -> usize {
        (value + self.config.core_size - 1) % self.config.core_size
    }

    pub fn read(&self, addr: usize) -> Instruction {
        self.memory[self.fold(addr)]
    }

    pub fn write(&mut self, addr: usize, instr: Instruction) {
        let addr = self.fold(addr);
        self.memory[addr] = instr;
    }

    pub fn cell_mut(&mut self, addr: usize) -> &mut Instruction {
        let addr = self.fold(addr);
        &mut self.memory[addr]
    }

    pub fn queue(&self, id: WarriorId) -> &ProcessQueue {
        &self.queues[id.index()]
    }

    pub fn queue_mut(&mut self, id: WarriorId) -> &mut ProcessQueue {
        &mut self.queues[id.index()]
    }

    /// Record that the A field at `addr` must be incremented at cycle end
    pub fn defer_increment_a(&mut self, addr: usize) {
        self.to_increment_a.push(addr);
    }

    /// Record that the B field at `addr` must be incremented at cycle end
    pub fn defer_increment_b(&mut self, addr: usize) {
        self.to_increment_b.push(addr);
    }

    /// Apply and drain the deferred post-increments.  Duplicate entries for
    /// one address each fire separately.
    pub fn flush_increments(&mut self) {
        let size = self.config.core_size;
        for addr in self.to_increment_a.drain(..) {
            let cell = &mut self.memory[addr];
            cell.a_num = (cell.a_num + 1) % size;
        }
        for addr in self.to_increment_b.drain(..) {
            let cell = &mut self.memory[addr];
            cell.b_num = (cell.b_num + 1) % size;
        }
    }

    /// Number of post-increments waiting for the end of the current cycle
    pub fn pending_increments(&self) -> usize {
        self.to_increment_a.len() + self.to_increment_b.len()
    }

    /// Cycles executed so far
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn advance_cycle(&mut self) {
        self.counter += 1;
    }

    /// Whose queue the scheduler services next
    pub fn turn(&self) -> WarriorId {
        self.turn
    }

    pub fn advance_turn(&mut self) {
        self.turn = self.turn.opponent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{AddrMode, Modifier, Opcode};

    fn mov_cell() -> Instruction {
        Instruction {
            op: Opcode::Mov,
            modifier: Modifier::I,
            a_mode: AddrMode::Direct,
            a_num: 0,
            b_mode: AddrMode::Direct,
            b_num: 1,
        }
    }

    #[test]
    fn addresses_wrap_around() {
        let mut core = Core::new(CoreConfig::DEBUG);
        core.write(41, mov_cell());
        assert_eq!(core.read(1), mov_cell());
        assert_eq!(core.offset(39, 2), 1);
        assert_eq!(core.step_back(0), 39);
    }

    #[test]
    fn fresh_core_is_all_sentinels() {
        let core = Core::new(CoreConfig::DEBUG);
        for addr in 0..core.size() {
            assert_eq!(core.read(addr), Instruction::default());
        }
        assert!(core.queue(WarriorId::W1).is_empty());
        assert!(core.queue(WarriorId::W2).is_empty());
        assert_eq!(core.counter(), 0);
        assert_eq!(core.turn(), WarriorId::W1);
    }

    #[test]
    fn duplicate_deferred_increments_each_fire() {
        let mut core = Core::new(CoreConfig::DEBUG);
        core.defer_increment_a(3);
        core.defer_increment_a(3);
        core.defer_increment_b(3);
        assert_eq!(core.pending_increments(), 3);
        core.flush_increments();
        assert_eq!(core.read(3).a_num, 2);
        assert_eq!(core.read(3).b_num, 1);
        assert_eq!(core.pending_increments(), 0);
    }

    #[test]
    fn increment_wraps_at_core_size() {
        let mut core = Core::new(CoreConfig::DEBUG);
        core.cell_mut(7).b_num = 39;
        core.defer_increment_b(7);
        core.flush_increments();
        assert_eq!(core.read(7).b_num, 0);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut core = Core::new(CoreConfig::DEBUG);
        core.write(5, mov_cell());
        core.queue_mut(WarriorId::W1).push(5);
        core.defer_increment_a(1);
        core.advance_cycle();
        core.advance_turn();

        core.reset();
        assert_eq!(core.read(5), Instruction::default());
        assert!(core.queue(WarriorId::W1).is_empty());
        assert_eq!(core.pending_increments(), 0);
        assert_eq!(core.counter(), 0);
        assert_eq!(core.turn(), WarriorId::W1);
    }
}
