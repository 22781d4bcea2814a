use std::fmt;

use thiserror::Error;

/// Redcode operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Remove the executing process from its queue
    Dat,
    /// Copy field(s) or a whole instruction to the B target
    Mov,
    /// Add A field(s) into the B target
    Add,
    /// Subtract A field(s) from the B target
    Sub,
    /// Multiply the B target by A field(s)
    Mul,
    /// Divide the B target by A field(s); zero divisor kills
    Div,
    /// Remainder of the B target by A field(s); zero divisor kills
    Mod,
    /// Unconditional jump to the A pointer
    Jmp,
    /// Jump when the selected B field(s) are zero
    Jmz,
    /// Jump when the selected B field(s) are non-zero
    Jmn,
    /// Decrement the selected B field(s), then jump when non-zero
    Djn,
    /// Queue both the next instruction and the A pointer
    Spl,
    /// Skip the next instruction when A < B
    Slt,
    /// Skip when equal, alias of SEQ
    Cmp,
    /// Skip the next instruction when A equals B
    Seq,
    /// Skip the next instruction when A differs from B
    Sne,
    /// Do nothing, queue the next instruction
    Nop,
    /// Load from p-space, not implemented
    Ldp,
    /// Store to p-space, not implemented
    Stp,
}

impl Opcode {
    /// Every opcode, in mnemonic-table order
    pub const ALL: [Opcode; 19] = [
        Opcode::Dat,
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Jmp,
        Opcode::Jmz,
        Opcode::Jmn,
        Opcode::Djn,
        Opcode::Spl,
        Opcode::Slt,
        Opcode::Cmp,
        Opcode::Seq,
        Opcode::Sne,
        Opcode::Nop,
        Opcode::Ldp,
        Opcode::Stp,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Dat => "DAT",
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Jmp => "JMP",
            Opcode::Jmz => "JMZ",
            Opcode::Jmn => "JMN",
            Opcode::Djn => "DJN",
            Opcode::Spl => "SPL",
            Opcode::Slt => "SLT",
            Opcode::Cmp => "CMP",
            Opcode::Seq => "SEQ",
            Opcode::Sne => "SNE",
            Opcode::Nop => "NOP",
            Opcode::Ldp => "LDP",
            Opcode::Stp => "STP",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Opcode::ALL.iter().copied().find(|op| op.mnemonic() == text)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Modifier selecting which operand field(s) an opcode works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// A field to A field
    A,
    /// B field to B field
    B,
    /// A field to B field
    AB,
    /// B field to A field
    BA,
    /// Both fields, pairwise
    F,
    /// Both fields, crossed
    X,
    /// The whole instruction where meaningful, otherwise as F
    I,
}

impl Modifier {
    pub const ALL: [Modifier; 7] = [
        Modifier::A,
        Modifier::B,
        Modifier::AB,
        Modifier::BA,
        Modifier::F,
        Modifier::X,
        Modifier::I,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Modifier::A => "A",
            Modifier::B => "B",
            Modifier::AB => "AB",
            Modifier::BA => "BA",
            Modifier::F => "F",
            Modifier::X => "X",
            Modifier::I => "I",
        }
    }

    pub fn from_name(text: &str) -> Option<Self> {
        Modifier::ALL.iter().copied().find(|m| m.name() == text)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addressing mode of one operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// `#` the operand is its own value, target is the current instruction
    Immediate,
    /// `$` target is PC plus the field
    Direct,
    /// `*` indirect through the A field of the intermediate cell
    IndirectA,
    /// `@` indirect through the B field of the intermediate cell
    IndirectB,
    /// `{` decrement the intermediate A field, then indirect through it
    PredecA,
    /// `<` decrement the intermediate B field, then indirect through it
    PredecB,
    /// `}` indirect through the intermediate A field, increment it at cycle end
    PostincA,
    /// `>` indirect through the intermediate B field, increment it at cycle end
    PostincB,
}

impl AddrMode {
    pub const ALL: [AddrMode; 8] = [
        AddrMode::Immediate,
        AddrMode::Direct,
        AddrMode::IndirectA,
        AddrMode::IndirectB,
        AddrMode::PredecA,
        AddrMode::PredecB,
        AddrMode::PostincA,
        AddrMode::PostincB,
    ];

    pub fn symbol(self) -> char {
        match self {
            AddrMode::Immediate => '#',
            AddrMode::Direct => '$',
            AddrMode::IndirectA => '*',
            AddrMode::IndirectB => '@',
            AddrMode::PredecA => '{',
            AddrMode::PredecB => '<',
            AddrMode::PostincA => '}',
            AddrMode::PostincB => '>',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        AddrMode::ALL.iter().copied().find(|m| m.symbol() == symbol)
    }
}

/// Why a line of text failed to parse as an instruction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseInstructionError {
    #[error("missing `.` between opcode and modifier")]
    MissingDot,
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("expected two comma-separated operands")]
    OperandCount,
    #[error("operand is missing its addressing mode")]
    MissingMode,
    #[error("unknown addressing mode `{0}`")]
    UnknownMode(char),
    #[error("unreadable number `{0}`")]
    BadNumber(String),
}

/// One core cell: opcode, modifier, and two operands.
///
/// The number fields are kept normalized into `[0, core_size)`; negative
/// values exist only in source text and are folded at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub modifier: Modifier,
    pub a_mode: AddrMode,
    pub a_num: usize,
    pub b_mode: AddrMode,
    pub b_num: usize,
}

impl Instruction {
    /// Parse the canonical form `OP.MOD #a, #b`, folding signed numbers
    /// into `[0, core_size)`
    pub fn parse(text: &str, core_size: usize) -> Result<Self, ParseInstructionError> {
        let text = text.trim();
        let (head, operands) = text
            .split_once(char::is_whitespace)
            .ok_or(ParseInstructionError::OperandCount)?;
        let (mnemonic, modifier) = head
            .split_once('.')
            .ok_or(ParseInstructionError::MissingDot)?;
        let op = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| ParseInstructionError::UnknownOpcode(mnemonic.to_string()))?;
        let modifier = Modifier::from_name(modifier)
            .ok_or_else(|| ParseInstructionError::UnknownModifier(modifier.to_string()))?;
        let (a_text, b_text) = operands
            .split_once(',')
            .ok_or(ParseInstructionError::OperandCount)?;
        let (a_mode, a_num) = parse_operand(a_text, core_size)?;
        let (b_mode, b_num) = parse_operand(b_text, core_size)?;
        Ok(Self {
            op,
            modifier,
            a_mode,
            a_num,
            b_mode,
            b_num,
        })
    }
}

fn parse_operand(
    text: &str,
    core_size: usize,
) -> Result<(AddrMode, usize), ParseInstructionError> {
    let text = text.trim();
    let mut chars = text.chars();
    let symbol = chars.next().ok_or(ParseInstructionError::MissingMode)?;
    let mode =
        AddrMode::from_symbol(symbol).ok_or(ParseInstructionError::UnknownMode(symbol))?;
    let digits = chars.as_str().trim();
    let value: i64 = digits
        .parse()
        .map_err(|_| ParseInstructionError::BadNumber(digits.to_string()))?;
    Ok((mode, fold_signed(value, core_size)))
}

/// Euclidean remainder of a signed value into `[0, core_size)`
pub fn fold_signed(value: i64, core_size: usize) -> usize {
    value.rem_euclid(core_size as i64) as usize
}

impl Default for Instruction {
    /// The empty-core sentinel `DAT.F #0, #0`
    fn default() -> Self {
        Self {
            op: Opcode::Dat,
            modifier: Modifier::F,
            a_mode: AddrMode::Immediate,
            a_num: 0,
            b_mode: AddrMode::Immediate,
            b_num: 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {}{}, {}{}",
            self.op,
            self.modifier,
            self.a_mode.symbol(),
            self.a_num,
            self.b_mode.symbol(),
            self.b_num
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const CORE_SIZE: usize = 8000;

    #[test]
    fn round_trip_every_operation() {
        // 19 * 7 * 8 * 8 distinct (op, modifier, a_mode, b_mode) tuples,
        // each encoding to a distinct string and decoding back unchanged
        let mut seen = HashSet::new();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for op in Opcode::ALL {
            for modifier in Modifier::ALL {
                for a_mode in AddrMode::ALL {
                    for b_mode in AddrMode::ALL {
                        let instr = Instruction {
                            op,
                            modifier,
                            a_mode,
                            a_num: rng.gen_range(0..CORE_SIZE),
                            b_mode,
                            b_num: rng.gen_range(0..CORE_SIZE),
                        };
                        let text = instr.to_string();
                        let reparsed = Instruction::parse(&text, CORE_SIZE)
                            .unwrap_or_else(|e| panic!("failed to reparse `{text}`: {e}"));
                        assert_eq!(instr, reparsed);
                        // strip the numbers so the set counts operations only
                        let operation = (op.mnemonic(), modifier.name(), a_mode.symbol(), b_mode.symbol());
                        seen.insert(operation);
                    }
                }
            }
        }
        assert_eq!(seen.len(), 19 * 7 * 8 * 8);
    }

    #[test]
    fn negative_numbers_fold_into_core_range() {
        let instr = Instruction::parse("ADD.AB #-1, $-8001", CORE_SIZE).unwrap();
        assert_eq!(instr.a_num, CORE_SIZE - 1);
        assert_eq!(instr.b_num, CORE_SIZE - 1);

        let instr = Instruction::parse("MOV.I $8000, $16001", CORE_SIZE).unwrap();
        assert_eq!(instr.a_num, 0);
        assert_eq!(instr.b_num, 1);
    }

    #[test]
    fn parse_tolerates_operand_whitespace() {
        let canonical = Instruction::parse("MOV.I $0, $1", CORE_SIZE).unwrap();
        let padded = Instruction::parse("  MOV.I  $0 ,   $1  ", CORE_SIZE).unwrap();
        assert_eq!(canonical, padded);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert_eq!(
            Instruction::parse("MOV $0, $1", CORE_SIZE),
            Err(ParseInstructionError::MissingDot)
        );
        assert_eq!(
            Instruction::parse("MOx.I $0, $1", CORE_SIZE),
            Err(ParseInstructionError::UnknownOpcode("MOx".to_string()))
        );
        assert_eq!(
            Instruction::parse("MOV.Q $0, $1", CORE_SIZE),
            Err(ParseInstructionError::UnknownModifier("Q".to_string()))
        );
        assert_eq!(
            Instruction::parse("MOV.I $0 $1", CORE_SIZE),
            Err(ParseInstructionError::OperandCount)
        );
        assert_eq!(
            Instruction::parse("MOV.I !0, $1", CORE_SIZE),
            Err(ParseInstructionError::UnknownMode('!'))
        );
        assert_eq!(
            Instruction::parse("MOV.I $zero, $1", CORE_SIZE),
            Err(ParseInstructionError::BadNumber("zero".to_string()))
        );
    }

    #[test]
    fn sentinel_is_dat_f_zero_zero() {
        assert_eq!(Instruction::default().to_string(), "DAT.F #0, #0");
        assert_eq!(
            Instruction::parse("DAT.F #0, #0", CORE_SIZE).unwrap(),
            Instruction::default()
        );
    }

    #[test]
    fn cmp_and_seq_encode_distinctly() {
        let cmp = Instruction::parse("CMP.I $0, $1", CORE_SIZE).unwrap();
        let seq = Instruction::parse("SEQ.I $0, $1", CORE_SIZE).unwrap();
        assert_eq!(cmp.op, Opcode::Cmp);
        assert_eq!(seq.op, Opcode::Seq);
        assert_ne!(cmp.to_string(), seq.to_string());
    }
}
