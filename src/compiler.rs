//! Source text to [`Program`]: emit one operation per recognized symbol, then
//! resolve every bracket pair's jump target.

use std::fmt;

use tracing::{debug, instrument};

use crate::op::{Op, OpKind, Program};

/// Errors produced while compiling source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A `[` without a matching `]`, or a `]` without a preceding `[`.
    #[error("Unmatched bracket {kind} at instruction {position} (source offset {offset})")]
    UnmatchedBracket {
        /// Index of the bracket in the operation sequence.
        position: usize,
        /// Character offset of the bracket in the source text.
        offset: usize,
        kind: UnmatchedBracketKind,
    },
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    Open,
    Close,
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "'['"),
            UnmatchedBracketKind::Close => write!(f, "']'"),
        }
    }
}

/// Compile `source` into a resolved operation sequence.
///
/// Characters outside `+-<>.,[]` are skipped. On success every jump operand
/// is the index of its partner bracket.
#[instrument(level = "debug", skip_all, fields(source_len = source.len()))]
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let mut ops = Vec::new();
    let mut offsets = Vec::new();

    for (offset, ch) in source.chars().enumerate() {
        let Some(kind) = OpKind::from_symbol(ch) else {
            continue;
        };
        ops.push(Op::new(kind, kind.initial_operand()));
        offsets.push(offset);
    }

    resolve_jumps(&mut ops, &offsets)?;

    debug!(ops = ops.len(), "compiled program");
    Ok(Program::from_parts(ops, offsets))
}

/// Pair up brackets and back-patch their operands in place.
fn resolve_jumps(ops: &mut [Op], offsets: &[usize]) -> Result<(), CompileError> {
    let mut pending: Vec<usize> = Vec::new();

    for i in 0..ops.len() {
        match ops[i].kind {
            OpKind::JumpIfZero => pending.push(i),
            OpKind::JumpIfNonzero => {
                let Some(open) = pending.pop() else {
                    return Err(CompileError::UnmatchedBracket {
                        position: i,
                        offset: offsets[i],
                        kind: UnmatchedBracketKind::Close,
                    });
                };
                ops[open].operand = i;
                ops[i].operand = open;
            }
            _ => {}
        }
    }

    // An unmatched '[' can never precede an unmatched ']', so the bottom of
    // the stack is the earliest fault.
    if let Some(&open) = pending.first() {
        return Err(CompileError::UnmatchedBracket {
            position: open,
            offset: offsets[open],
            kind: UnmatchedBracketKind::Open,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(program: &Program) -> Vec<OpKind> {
        program.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn emits_one_op_per_symbol_and_skips_comments() {
        let program = compile("+ a-\n<>.,x[]").unwrap();
        assert_eq!(
            kinds(&program),
            vec![
                OpKind::Increment,
                OpKind::Decrement,
                OpKind::ShiftLeft,
                OpKind::ShiftRight,
                OpKind::Output,
                OpKind::Input,
                OpKind::JumpIfZero,
                OpKind::JumpIfNonzero,
            ]
        );
    }

    #[test]
    fn arithmetic_ops_carry_magnitude_one() {
        let program = compile("+-<>.,").unwrap();
        let operands: Vec<usize> = program.iter().map(|op| op.operand).collect();
        assert_eq!(operands, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn empty_source_compiles_to_empty_program() {
        assert!(compile("").unwrap().is_empty());
        assert!(compile("no code here").unwrap().is_empty());
    }

    #[test]
    fn brackets_point_at_each_other() {
        let program = compile("+[-]").unwrap();
        assert_eq!(program[1], Op::new(OpKind::JumpIfZero, 3));
        assert_eq!(program[3], Op::new(OpKind::JumpIfNonzero, 1));
    }

    #[test]
    fn nested_brackets_resolve_innermost_first() {
        // 0 [  1 [  2 -  3 ]  4 >  5 ]
        let program = compile("[[-]>]").unwrap();
        assert_eq!(program[0].operand, 5);
        assert_eq!(program[5].operand, 0);
        assert_eq!(program[1].operand, 3);
        assert_eq!(program[3].operand, 1);
    }

    #[test]
    fn jump_targets_are_always_in_range() {
        let program = compile("++[>[>+<-]<[->+<]]>.").unwrap();
        for op in program.iter().filter(|op| op.kind.is_jump()) {
            assert!(op.operand < program.len());
        }
    }

    #[test]
    fn source_offsets_skip_comments() {
        let err = compile("ab+ c[").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnmatchedBracket {
                position: 1,
                offset: 5,
                kind: UnmatchedBracketKind::Open,
            }
        );
    }

    #[test]
    fn unmatched_open_bracket_returns_error() {
        let err = compile("[+").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnmatchedBracket { position: 0, kind: UnmatchedBracketKind::Open, .. }
        ));
    }

    #[test]
    fn unmatched_close_bracket_returns_error() {
        let err = compile("+]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnmatchedBracket { position: 1, kind: UnmatchedBracketKind::Close, .. }
        ));
    }

    #[test]
    fn earliest_unmatched_open_is_reported() {
        let err = compile("[[[]").unwrap_err();
        assert!(matches!(err, CompileError::UnmatchedBracket { position: 0, .. }));
    }

    #[test]
    fn compilation_is_deterministic() {
        let source = "++++++++[>++++++++<-]>.";
        assert_eq!(compile(source).unwrap(), compile(source).unwrap());
    }

    #[test]
    fn error_message_names_bracket_and_position() {
        let err = compile("]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unmatched bracket ']' at instruction 0 (source offset 0)"
        );
    }
}
