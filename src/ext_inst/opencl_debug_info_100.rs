//! `OpenCL.DebugInfo.100`: the OpenCL-flavored sibling of the Khronos
//! `DebugInfo` set, same scope-ownership contract (spec.md §4.4).

use super::{ExtInstContext, ExtInstHandler};
use crate::error::Result;
use crate::ir::values::ValueRef;

#[derive(Default)]
pub struct OpenClDebugInfo100Handler {
    inner: super::debug_info::DebugInfoHandler,
}

impl ExtInstHandler for OpenClDebugInfo100Handler {
    fn create(&mut self, instruction: u32, ctx: &mut ExtInstContext<'_>) -> Result<Option<ValueRef>> {
        // The OpenCL-flavored set reuses the Khronos set's opcode numbering
        // for the instructions this core handles.
        self.inner.create(instruction, ctx)
    }
}
