//! `Codeplay.GroupAsyncCopies` / `NonSemantic.Codeplay.GroupAsyncCopies`:
//! strided async copies and group-event waits (spec.md §4.1.8, §4.4).

use super::{ExtInstContext, ExtInstHandler};
use crate::error::{ErrorKind, Result};
use crate::ir::instr::{CallAttrFlags, Op};
use crate::ir::values::ValueRef;

const OP_GROUP_ASYNC_COPY: u32 = 1;
const OP_GROUP_WAIT_EVENTS: u32 = 2;

#[derive(Default)]
pub struct GroupAsyncCopiesHandler;

impl ExtInstHandler for GroupAsyncCopiesHandler {
    fn create(&mut self, instruction: u32, ctx: &mut ExtInstContext<'_>) -> Result<Option<ValueRef>> {
        let callee = match instruction {
            OP_GROUP_ASYNC_COPY => "async_work_group_strided_copy",
            OP_GROUP_WAIT_EVENTS => "wait_group_events",
            _ => return Err(ErrorKind::UnsupportedOpcode(spirv::Op::ExtInst).into()),
        };
        let instr = ctx.builder.insert(
            ctx.function,
            ctx.block,
            ctx.result_type,
            Op::Call {
                callee: callee.to_string(),
                args: ctx.operands.clone(),
                attrs: CallAttrFlags::CONVERGENT,
            },
        );
        if instruction == OP_GROUP_WAIT_EVENTS {
            Ok(None)
        } else {
            Ok(Some(ValueRef::Instr(instr)))
        }
    }
}
