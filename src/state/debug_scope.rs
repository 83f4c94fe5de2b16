//! Per-function OpLine/lexical-scope state machine (spec.md §4.1.11, §9).

use crate::backend::debug::ScopeId;
use crate::ir::function::InstrId;

/// The three states a function's debug-scope tracking can be in at any
/// point during translation (spec.md §9's three named states).
#[derive(Clone, Debug, Default)]
pub enum LineRangeState {
    #[default]
    NoRange,
    /// A range is open but nothing has been emitted under it yet.
    OpenEmpty { line: u32, column: u32, file: Option<crate::backend::debug::FileId> },
    /// A range is open and has covered at least one instruction.
    OpenWithInstructions {
        line: u32,
        column: u32,
        file: Option<crate::backend::debug::FileId>,
        instructions: Vec<InstrId>,
    },
}

/// Tracks the active OpLine range and lexical scope for one function
/// (spec.md §3's "current OpLine range" / "current lexical scope").
#[derive(Default)]
pub struct DebugScopeState {
    pub range: LineRangeState,
    pub current_scope: Option<ScopeId>,
    pub subprogram: Option<crate::backend::debug::SubprogramId>,
}

impl DebugScopeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_line(&mut self, line: u32, column: u32, file: Option<crate::backend::debug::FileId>) -> LineRangeState {
        std::mem::replace(
            &mut self.range,
            LineRangeState::OpenEmpty { line, column, file },
        )
    }

    pub fn record_instruction(&mut self, instr: InstrId) {
        self.range = match std::mem::take(&mut self.range) {
            LineRangeState::NoRange => LineRangeState::NoRange,
            LineRangeState::OpenEmpty { line, column, file } => {
                LineRangeState::OpenWithInstructions {
                    line,
                    column,
                    file,
                    instructions: vec![instr],
                }
            }
            LineRangeState::OpenWithInstructions {
                line,
                column,
                file,
                mut instructions,
            } => {
                instructions.push(instr);
                LineRangeState::OpenWithInstructions {
                    line,
                    column,
                    file,
                    instructions,
                }
            }
        };
    }

    /// Closes the current range (OpNoLine, block termination, or a new
    /// OpLine superseding it), returning it so the caller can attach
    /// locations to its collected instructions.
    pub fn close(&mut self) -> LineRangeState {
        std::mem::take(&mut self.range)
    }

    pub fn has_active_range(&self) -> bool {
        !matches!(self.range, LineRangeState::NoRange)
    }
}
