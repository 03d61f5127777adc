//! Compiled operations and the program that holds them.

use std::fmt;
use std::ops::Index;

/// The eight operation kinds, one per Brainfuck symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `<`
    ShiftLeft,
    /// `>`
    ShiftRight,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[`
    JumpIfZero,
    /// `]`
    JumpIfNonzero,
}

impl OpKind {
    /// Map a source character to its operation kind. Anything outside
    /// `+-<>.,[]` is a comment and yields `None`.
    pub fn from_symbol(ch: char) -> Option<Self> {
        Some(match ch {
            '+' => OpKind::Increment,
            '-' => OpKind::Decrement,
            '<' => OpKind::ShiftLeft,
            '>' => OpKind::ShiftRight,
            '.' => OpKind::Output,
            ',' => OpKind::Input,
            '[' => OpKind::JumpIfZero,
            ']' => OpKind::JumpIfNonzero,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            OpKind::Increment => '+',
            OpKind::Decrement => '-',
            OpKind::ShiftLeft => '<',
            OpKind::ShiftRight => '>',
            OpKind::Output => '.',
            OpKind::Input => ',',
            OpKind::JumpIfZero => '[',
            OpKind::JumpIfNonzero => ']',
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, OpKind::JumpIfZero | OpKind::JumpIfNonzero)
    }

    /// Operand emitted before bracket resolution: a magnitude of 1 for the
    /// cell and pointer arithmetic, 0 for everything else.
    pub(crate) fn initial_operand(self) -> usize {
        match self {
            OpKind::Increment | OpKind::Decrement | OpKind::ShiftLeft | OpKind::ShiftRight => 1,
            OpKind::Output | OpKind::Input | OpKind::JumpIfZero | OpKind::JumpIfNonzero => 0,
        }
    }
}

/// One compiled instruction.
///
/// For jumps, `operand` is the index of the partner bracket. For the
/// arithmetic and shift kinds it is the magnitude. Output and input ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    pub kind: OpKind,
    pub operand: usize,
}

impl Op {
    pub fn new(kind: OpKind, operand: usize) -> Self {
        Self { kind, operand }
    }
}

/// An ordered operation sequence plus the source offset each operation came
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    ops: Vec<Op>,
    offsets: Vec<usize>,
}

impl Program {
    pub(crate) fn from_parts(ops: Vec<Op>, offsets: Vec<usize>) -> Self {
        debug_assert_eq!(ops.len(), offsets.len());
        Self { ops, offsets }
    }

    /// Build a program from raw operations without resolving or checking
    /// jump targets. Source offsets are the operation indices.
    pub fn from_ops(ops: Vec<Op>) -> Self {
        let offsets = (0..ops.len()).collect();
        Self { ops, offsets }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Op> {
        self.ops.get(index)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Op> {
        self.ops.iter()
    }

    /// Character offset in the source text of the operation at `index`.
    pub fn source_offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }
}

impl Index<usize> for Program {
    type Output = Op;

    fn index(&self, index: usize) -> &Op {
        &self.ops[index]
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Disassembly listing: `<index> <symbol>(<operand>)`, one line per operation.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            writeln!(f, "{} {}({})", i, op.kind.symbol(), op.operand)?;
        }
        Ok(())
    }
}
