use std::fmt;

use thiserror::Error;

use crate::instruction::{Instruction, ParseInstructionError};

/// One of the two players in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarriorId {
    W1,
    W2,
}

impl WarriorId {
    /// Index into per-warrior arrays
    pub fn index(self) -> usize {
        match self {
            WarriorId::W1 => 0,
            WarriorId::W2 => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            WarriorId::W1 => WarriorId::W2,
            WarriorId::W2 => WarriorId::W1,
        }
    }
}

impl fmt::Display for WarriorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarriorId::W1 => f.write_str("warrior 1"),
            WarriorId::W2 => f.write_str("warrior 2"),
        }
    }
}

/// Why a warrior load file was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WarriorSourceError {
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        source: ParseInstructionError,
    },
    #[error("source contains no instructions")]
    Empty,
}

/// An ordered program listing plus the offset of its first executed
/// instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warrior {
    pub code: Vec<Instruction>,
    pub start_pos: usize,
}

impl Warrior {
    pub fn new(code: Vec<Instruction>) -> Self {
        Self { code, start_pos: 0 }
    }

    pub fn with_start(code: Vec<Instruction>, start_pos: usize) -> Self {
        Self { code, start_pos }
    }

    /// Parse a load file: one instruction per line, blank lines and `;`
    /// comment lines skipped
    pub fn from_source(source: &str, core_size: usize) -> Result<Self, WarriorSourceError> {
        let mut code = Vec::new();
        for (idx, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let instr = Instruction::parse(line, core_size)
                .map_err(|source| WarriorSourceError::Line {
                    line: idx + 1,
                    source,
                })?;
            code.push(instr);
        }
        if code.is_empty() {
            return Err(WarriorSourceError::Empty);
        }
        Ok(Self::new(code))
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn parses_one_instruction_per_line() {
        let source = "\
; a pointer bomber
DAT.F #0, #0

ADD.AB #4, $-1
MOV.AB #0, @-2
JMP.A $-2, #0
";
        let warrior = Warrior::from_source(source, 8000).unwrap();
        assert_eq!(warrior.len(), 4);
        assert_eq!(warrior.start_pos, 0);
        assert_eq!(warrior.code[0].op, Opcode::Dat);
        assert_eq!(warrior.code[1].b_num, 7999);
    }

    #[test]
    fn reports_the_failing_line() {
        let source = "MOV.I $0, $1\nbogus line\n";
        let err = Warrior::from_source(source, 8000).unwrap_err();
        match err {
            WarriorSourceError::Line { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_source() {
        assert_eq!(
            Warrior::from_source("; nothing here\n\n", 8000),
            Err(WarriorSourceError::Empty)
        );
    }

    #[test]
    fn opponent_is_involutive() {
        assert_eq!(WarriorId::W1.opponent(), WarriorId::W2);
        assert_eq!(WarriorId::W2.opponent().opponent(), WarriorId::W2);
    }
}
