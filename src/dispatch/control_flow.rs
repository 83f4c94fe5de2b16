//! spec.md §4.1.7 / §4.1.11: block terminators, `OpPhi`, lifetime hints,
//! and the `OpLine`/`OpNoLine` debug-scope bracketing.

use super::{PendingPhi, Translator};
use crate::backend::{DebugBuilder, IrBuilder};
use crate::error::Result;
use crate::id::SpvId;
use crate::ir::function::BlockId;
use crate::ir::FunctionId;
use crate::ir::instr::{LoopMetadata, Op};
use crate::ir::types::TypeInner;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

/// Returns the block already bound to `id` (created on an earlier
/// forward reference from a branch/switch/phi), or creates and binds a
/// fresh one. `OpLabel` and every branch-family instruction share this
/// so the first mention of a label — whichever comes first in the
/// stream — wins the `BlockId` that every later mention reuses.
fn get_or_create_block(t: &mut Translator<'_>, func: FunctionId, id: SpvId) -> BlockId {
    if let Some(Binding::Block { block, .. }) = t.state.binding_of(id) {
        block
    } else {
        let block = t.builder.append_block(func);
        t.state.bind(id, spirv::Op::Label, Binding::Block { func, block });
        block
    }
}

fn resolve_file(t: &mut Translator<'_>, file_id: SpvId) -> Option<crate::backend::debug::FileId> {
    if let Some(id) = t.state.file_ids.get(&file_id) {
        return Some(*id);
    }
    let name = t.state.debug_strings.get(&file_id)?.clone();
    let id = t.debug.create_file(name, String::new());
    t.state.file_ids.insert(file_id, id);
    Some(id)
}

pub fn translate_label(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result = cursor.next_id()?;
    let func = t.current_function()?;
    let block = get_or_create_block(t, func, result);
    t.builder.move_block_to_end(func, block);
    t.cursor.block = Some(block);
    super::types_consts::drain_deferred_spec_const_ops(t)?;
    Ok(())
}

pub fn translate_branch(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let target_id = cursor.next_id()?;
    let func = t.current_function()?;
    let target = get_or_create_block(t, func, target_id);
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Branch { target })?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_branch_conditional(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let cond_id = cursor.next_id()?;
    let true_id = cursor.next_id()?;
    let false_id = cursor.next_id()?;
    let weights = if cursor.remaining() >= 2 {
        let a = cursor.next_u32()?;
        let b = cursor.next_u32()?;
        Some((a, b))
    } else {
        None
    };

    let cond = t.state.require_value(cond_id)?;
    let func = t.current_function()?;
    let if_true = get_or_create_block(t, func, true_id);
    let if_false = get_or_create_block(t, func, false_id);
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::CondBranch { cond, if_true, if_false, weights })?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_switch(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let selector_id = cursor.next_id()?;
    let default_id = cursor.next_id()?;
    let selector = t.state.require_value(selector_id)?;
    let func = t.current_function()?;
    let default = get_or_create_block(t, func, default_id);

    // Each case literal is as wide as the selector's bound integer type:
    // one 32-bit word, or two (low word first) for a 64-bit selector
    // (spec.md §4.1.7).
    let selector_ty = t.value_type(selector);
    let wide_selector = matches!(
        t.builder.module().types[selector_ty].inner,
        TypeInner::Int { width, .. } if width > 32
    );

    let mut cases = Vec::new();
    while !cursor.is_empty() {
        let literal = if wide_selector {
            let lo = cursor.next_u32()? as u64;
            let hi = cursor.next_u32()? as u64;
            lo | (hi << 32)
        } else {
            cursor.next_u32()? as u64
        };
        let label_id = cursor.next_id()?;
        let label = get_or_create_block(t, func, label_id);
        cases.push((literal, label));
    }

    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Switch { selector, default, cases })?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_loop_merge(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let merge_id = cursor.next_id()?;
    let continue_id = cursor.next_id()?;
    let control = cursor.next_u32()?;
    cursor.rest_as_words(); // dependency-length/min/max iteration literals, unused here

    let func = t.current_function()?;
    let merge_block = get_or_create_block(t, func, merge_id);
    let _continue_block = get_or_create_block(t, func, continue_id);

    let mut metadata = LoopMetadata::new();
    metadata.insert("llvm.loop.unroll.enable", control & 0x1 != 0);
    metadata.insert("llvm.loop.unroll.disable", control & 0x2 != 0);
    t.state.loop_metadata.insert((func, merge_block), metadata);
    Ok(())
}

pub fn translate_return(t: &mut Translator<'_>, _record: &OpcodeRecord) -> Result<()> {
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Ret { value: None })?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_return_value(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let value_id = cursor.next_id()?;
    let value = t.state.require_value(value_id)?;
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Ret { value: Some(value) })?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_unreachable(t: &mut Translator<'_>, _record: &OpcodeRecord) -> Result<()> {
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Unreachable)?;
    t.close_debug_scope();
    Ok(())
}

pub fn translate_phi(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;

    let mut raw_incoming = Vec::new();
    while !cursor.is_empty() {
        let value_id = cursor.next_id()?;
        let label_id = cursor.next_id()?;
        raw_incoming.push((value_id, label_id));
    }

    let func = t.current_function()?;
    let instr = t.insert(ty, Op::Phi { incoming: Vec::new() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    t.cursor.pending_phis.push(PendingPhi {
        function: func,
        instr,
        result_type: ty,
        raw_incoming,
    });
    Ok(())
}

pub fn translate_lifetime_start(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let pointer_id = cursor.next_id()?;
    let _size = cursor.next_u32().ok();
    let pointer = t.state.require_value(pointer_id)?;
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::LifetimeStart { pointer })?;
    Ok(())
}

pub fn translate_lifetime_stop(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let pointer_id = cursor.next_id()?;
    let _size = cursor.next_u32().ok();
    let pointer = t.state.require_value(pointer_id)?;
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::LifetimeStop { pointer })?;
    Ok(())
}

pub fn translate_line(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let file_id = cursor.next_id()?;
    let line = cursor.next_u32()?;
    let column = cursor.next_u32()?;
    t.close_debug_scope();
    let file = resolve_file(t, file_id);
    t.cursor.debug_scope.open_line(line, column, file);
    Ok(())
}

pub fn translate_no_line(t: &mut Translator<'_>, _record: &OpcodeRecord) -> Result<()> {
    t.close_debug_scope();
    Ok(())
}
