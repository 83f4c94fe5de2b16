//! spec.md §4.1.8 / §4.6: control/memory barriers, atomics, and
//! work-group/sub-group collective operations, lowered to the `__mux_*`
//! and OpenCL-C atomic/group builtin names
//! (`original_source/modules/compiler/spirv-ll/source/builder_core.cpp`).

use super::Translator;
use crate::backend::mangle::{ItaniumMangler, MangleArg, Mangler};
use crate::backend::IrBuilder;
use crate::error::Result;
use crate::id::SpvId;
use crate::ir::function::{CallingConv, FunctionAttrs, Linkage};
use crate::ir::instr::{CallAttrFlags, Op};
use crate::ir::types::TypeInner;
use crate::ir::values::{ConstantValue, ValueRef};
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

fn pointer_addr_space(t: &Translator<'_>, pointer: ValueRef) -> u32 {
    match &t.builder.module().types[t.value_type(pointer)].inner {
        TypeInner::Pointer { addr_space, .. } => *addr_space,
        _ => 0,
    }
}

fn scope_const(t: &Translator<'_>, value: ValueRef) -> Option<u64> {
    match value {
        ValueRef::Const(c) => match t.builder.module().constants[c].value {
            ConstantValue::Int(v) => Some(v),
            _ => None,
        },
        _ => None,
    }
}

const SCOPE_SUBGROUP: u64 = 4;

fn call(
    t: &mut Translator<'_>,
    result: SpvId,
    op: spirv::Op,
    result_type: crate::ir::types::TypeId,
    callee: String,
    args: Vec<ValueRef>,
) -> Result<()> {
    let instr = t.insert(result_type, Op::Call { callee, args, attrs: CallAttrFlags::CONVERGENT })?;
    t.state.bind(result, op, Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn void_call(t: &mut Translator<'_>, callee: String, args: Vec<ValueRef>) -> Result<()> {
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Call { callee, args, attrs: CallAttrFlags::NO_MERGE | CallAttrFlags::NO_DUPLICATE })?;
    Ok(())
}

/// Builds the dynamic sub-group/work-group barrier dispatcher once per
/// module: a tiny always-inlined function that branches on the runtime
/// `Execution` scope operand (spec.md §4.1.8, grounded in the original's
/// `barrier_wrapper`).
fn barrier_wrapper(t: &mut Translator<'_>) -> crate::ir::FunctionId {
    if let Some(f) = t.state.barrier_wrapper {
        return f;
    }
    let i32_ty = t.builder.int_type(32, true);
    let void_ty = t.builder.void_type();
    let fn_ty = t.builder.function_type(vec![i32_ty, i32_ty, i32_ty], void_ty);
    let f = t.builder.declare_function("barrier_wrapper".to_string(), fn_ty, CallingConv::SpirFunc);
    t.builder.set_linkage(f, Linkage::Internal);
    t.builder.add_function_attr(f, FunctionAttrs::ALWAYS_INLINE);

    let entry = t.builder.append_block(f);
    let subgroup_bb = t.builder.append_block(f);
    let workgroup_bb = t.builder.append_block(f);
    let exit_bb = t.builder.append_block(f);

    let execution = ValueRef::Param(0);
    let memory = ValueRef::Param(1);
    let semantics = ValueRef::Param(2);

    let scope_const_id = ValueRef::Const(t.builder.const_int(i32_ty, SCOPE_SUBGROUP));
    let cmp = t.builder.insert(
        f,
        entry,
        t.builder.int_type(1, false),
        Op::ICmp { pred: crate::ir::instr::IntPredicate::Eq, lhs: execution, rhs: scope_const_id },
    );
    t.builder.insert(
        f,
        entry,
        void_ty,
        Op::CondBranch {
            cond: ValueRef::Instr(cmp),
            if_true: subgroup_bb,
            if_false: workgroup_bb,
            weights: None,
        },
    );

    let default_id = ValueRef::Const(t.builder.const_int(i32_ty, 0));
    for (bb, name) in [(subgroup_bb, "__mux_sub_group_barrier"), (workgroup_bb, "__mux_work_group_barrier")] {
        t.builder.insert(
            f,
            bb,
            void_ty,
            Op::Call {
                callee: name.to_string(),
                args: vec![default_id, memory, semantics],
                attrs: CallAttrFlags::NO_MERGE | CallAttrFlags::NO_DUPLICATE,
            },
        );
        t.builder.insert(f, bb, void_ty, Op::Branch { target: exit_bb });
    }
    t.builder.insert(f, exit_bb, void_ty, Op::Ret { value: None });
    t.builder.mark_defined(f);
    t.state.barrier_wrapper = Some(f);
    f
}

pub fn translate_control_barrier(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let execution_id = cursor.next_id()?;
    let memory_id = cursor.next_id()?;
    let semantics_id = cursor.next_id()?;
    let execution = t.state.require_value(execution_id)?;
    let memory = t.state.require_value(memory_id)?;
    let semantics = t.state.require_value(semantics_id)?;

    let i32_ty = t.builder.int_type(32, true);
    let default_id = ValueRef::Const(t.builder.const_int(i32_ty, 0));

    if let Some(scope) = scope_const(t, execution) {
        let name = if scope == SCOPE_SUBGROUP { "__mux_sub_group_barrier" } else { "__mux_work_group_barrier" };
        return void_call(t, name.to_string(), vec![default_id, memory, semantics]);
    }

    let _wrapper = barrier_wrapper(t);
    let void_ty = t.builder.void_type();
    t.insert(
        void_ty,
        Op::Call {
            callee: "barrier_wrapper".to_string(),
            args: vec![execution, memory, semantics],
            attrs: CallAttrFlags::NO_MERGE | CallAttrFlags::NO_DUPLICATE,
        },
    )?;
    Ok(())
}

pub fn translate_memory_barrier(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let memory_id = cursor.next_id()?;
    let semantics_id = cursor.next_id()?;
    let memory = t.state.require_value(memory_id)?;
    let semantics = t.state.require_value(semantics_id)?;
    void_call(t, "__mux_mem_barrier".to_string(), vec![memory, semantics])
}

/// spec.md §4.1.8's `generateBinaryAtomic`: storage class `Function`
/// (address space 0) has no atomic semantics under this target, so the
/// original value is read back with a plain load instead.
fn binary_atomic(t: &mut Translator<'_>, record: &OpcodeRecord, name: &str) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let pointer_id = cursor.next_id()?;
    let _scope_id = cursor.next_id()?;
    let _semantics_id = cursor.next_id()?;
    let value_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let pointer = t.state.require_value(pointer_id)?;
    let value = t.state.require_value(value_id)?;

    if pointer_addr_space(t, pointer) == 0 {
        let instr = t.insert(ty, Op::Load { pointer, flags: crate::ir::instr::MemoryAccessFlags::empty(), align: None })?;
        t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
        return Ok(());
    }

    let mangler = ItaniumMangler;
    let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
    let value_ty = t.builder.module().types[ty].clone();
    let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
    let mangled_value = mangler.mangled_type_resolved(t.builder.module(), &value_ty, MangleArg::default());
    let mut mangled = mangler.mangled_length_prefix(name);
    mangled.push_str(&mangled_pointer);
    mangled.push_str(&mangled_value);
    mangled.push_str(&mangled_value);
    call(t, result, record.op(), ty, mangled, vec![pointer, value])
}

pub fn translate_binary_atomic(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    let name = match record.op() {
        AtomicIAdd | AtomicISub => {
            if record.op() == AtomicIAdd { "atomic_add" } else { "atomic_sub" }
        }
        AtomicSMin | AtomicUMin => "atomic_min",
        AtomicSMax | AtomicUMax => "atomic_max",
        AtomicAnd => "atomic_and",
        AtomicOr => "atomic_or",
        AtomicXor => "atomic_xor",
        AtomicExchange => "atomic_xchg",
        _ => unreachable!("translate_binary_atomic dispatched for a non-binary-atomic opcode"),
    };
    binary_atomic(t, record, name)
}

pub fn translate_atomic_inc_dec(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let pointer_id = cursor.next_id()?;
    let _scope_id = cursor.next_id()?;
    let _semantics_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let pointer = t.state.require_value(pointer_id)?;
    let name = if record.op() == spirv::Op::AtomicIIncrement { "atomic_inc" } else { "atomic_dec" };

    let mangler = ItaniumMangler;
    let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
    let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
    let mut mangled = mangler.mangled_length_prefix(name);
    mangled.push_str(&mangled_pointer);
    call(t, result, record.op(), ty, mangled, vec![pointer])
}

pub fn translate_atomic_misc(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    match record.op() {
        AtomicLoad => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let pointer_id = cursor.next_id()?;
            let scope_id = cursor.next_id()?;
            let semantics_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let pointer = t.state.require_value(pointer_id)?;
            let scope = t.state.require_value(scope_id)?;
            let semantics = t.state.require_value(semantics_id)?;
            let mangler = ItaniumMangler;
            let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
            let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
            let mut mangled = mangler.mangled_length_prefix("atomic_load_explicit");
            mangled.push_str(&mangled_pointer);
            mangled.push_str("i");
            mangled.push_str("i");
            call(t, result, record.op(), ty, mangled, vec![pointer, semantics, scope])
        }
        AtomicStore => {
            let mut cursor = record.cursor();
            let pointer_id = cursor.next_id()?;
            let scope_id = cursor.next_id()?;
            let semantics_id = cursor.next_id()?;
            let value_id = cursor.next_id()?;
            let pointer = t.state.require_value(pointer_id)?;
            let scope = t.state.require_value(scope_id)?;
            let semantics = t.state.require_value(semantics_id)?;
            let value = t.state.require_value(value_id)?;
            let mangler = ItaniumMangler;
            let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
            let value_ty = t.builder.module().types[t.value_type(value)].clone();
            let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
            let mangled_value = mangler.mangled_type_resolved(t.builder.module(), &value_ty, MangleArg::default());
            let mut mangled = mangler.mangled_length_prefix("atomic_store_explicit");
            mangled.push_str(&mangled_pointer);
            mangled.push_str(&mangled_value);
            mangled.push_str("i");
            mangled.push_str("i");
            void_call(t, mangled, vec![pointer, value, semantics, scope])
        }
        AtomicCompareExchange | AtomicCompareExchangeWeak => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let pointer_id = cursor.next_id()?;
            let _scope_id = cursor.next_id()?;
            let _equal_id = cursor.next_id()?;
            let _unequal_id = cursor.next_id()?;
            let value_id = cursor.next_id()?;
            let comparator_id = cursor.next_id()?;

            let ty = t.state.require_type(result_type_id)?;
            let pointer = t.state.require_value(pointer_id)?;
            let value = t.state.require_value(value_id)?;
            let comparator = t.state.require_value(comparator_id)?;

            if pointer_addr_space(t, pointer) == 0 {
                let instr = t.insert(ty, Op::Load { pointer, flags: crate::ir::instr::MemoryAccessFlags::empty(), align: None })?;
                t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
                return Ok(());
            }

            let mangler = ItaniumMangler;
            let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
            let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
            let mut mangled = mangler.mangled_length_prefix("atomic_cmpxchg");
            mangled.push_str(&mangled_pointer);
            call(t, result, record.op(), ty, mangled, vec![pointer, comparator, value])
        }
        AtomicFlagTestAndSet => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let pointer_id = cursor.next_id()?;
            let _scope_id = cursor.next_id()?;
            let _semantics_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let pointer = t.state.require_value(pointer_id)?;
            let mangler = ItaniumMangler;
            let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
            let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
            let mut mangled = mangler.mangled_length_prefix("atomic_flag_test_and_set_explicit");
            mangled.push_str(&mangled_pointer);
            call(t, result, record.op(), ty, mangled, vec![pointer])
        }
        AtomicFlagClear => {
            let mut cursor = record.cursor();
            let pointer_id = cursor.next_id()?;
            let _scope_id = cursor.next_id()?;
            let _semantics_id = cursor.next_id()?;
            let pointer = t.state.require_value(pointer_id)?;
            let mangler = ItaniumMangler;
            let pointer_ty = t.builder.module().types[t.value_type(pointer)].clone();
            let mangled_pointer = mangler.mangled_type_resolved(t.builder.module(), &pointer_ty, MangleArg::default());
            let mut mangled = mangler.mangled_length_prefix("atomic_flag_clear_explicit");
            mangled.push_str(&mangled_pointer);
            void_call(t, mangled, vec![pointer])
        }
        other => Err(crate::error::ErrorKind::UnsupportedOpcode(other).into()),
    }
}

/// `OpGroupAsyncCopy`/`OpGroupWaitEvents` lower to the OpenCL async-copy
/// builtins; the core does not model event-queue state beyond the opaque
/// `event_t` value the builtin returns (spec.md §4.1.8 Non-goal).
pub fn translate_group_async(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    match record.op() {
        spirv::Op::GroupAsyncCopy => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let _scope_id = cursor.next_id()?;
            let dst_id = cursor.next_id()?;
            let src_id = cursor.next_id()?;
            let num_elements_id = cursor.next_id()?;
            let stride_id = cursor.next_id()?;
            let event_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let args = [dst_id, src_id, num_elements_id, stride_id, event_id]
                .iter()
                .map(|id| t.state.require_value(*id))
                .collect::<Result<Vec<_>>>()?;
            call(t, result, record.op(), ty, "async_work_group_strided_copy".to_string(), args)
        }
        spirv::Op::GroupWaitEvents => {
            let mut cursor = record.cursor();
            let _scope_id = cursor.next_id()?;
            let num_events_id = cursor.next_id()?;
            let events_ptr_id = cursor.next_id()?;
            let num_events = t.state.require_value(num_events_id)?;
            let events_ptr = t.state.require_value(events_ptr_id)?;
            void_call(t, "wait_group_events".to_string(), vec![num_events, events_ptr])
        }
        other => Err(crate::error::ErrorKind::UnsupportedOpcode(other).into()),
    }
}

fn group_reduce_builtin(op: spirv::Op) -> &'static str {
    use spirv::Op::*;
    match op {
        GroupIAdd | GroupFAdd => "add",
        GroupUMin | GroupSMin | GroupFMin => "min",
        GroupUMax | GroupSMax | GroupFMax => "max",
        _ => "add",
    }
}

/// `OpGroupSMin/SMax/UMin/UMax` need a forced-sign builtin name since the
/// same `min`/`max` op name is shared by both signedness and the cache
/// key would otherwise collide across them (builder_core.cpp's
/// `generateReduction`, ~L6044).
fn group_reduce_sign_prefix(op: spirv::Op) -> &'static str {
    use spirv::Op::*;
    match op {
        GroupSMin | GroupSMax => "s",
        GroupUMin | GroupUMax => "u",
        _ => "",
    }
}

/// Builds (or returns the cached) dynamic-scope wrapper for one
/// `(operationName, signPrefix + opName, resultType)` combination, mirroring
/// `barrier_wrapper`: `entry` branches on the runtime execution scope,
/// `subgroup`/`workgroup` each call the scope-specific mangled builtin, and
/// `exit` phi-merges the two results (spec.md §4.6, `generateReduction`).
fn reduction_wrapper(
    t: &mut Translator<'_>,
    operation_name: &'static str,
    op_name: &'static str,
    sign_prefix: &'static str,
    result_type_id: SpvId,
    ty: crate::ir::types::TypeId,
) -> String {
    let cache_name = format!("{}{}", sign_prefix, op_name);
    let fn_name = format!("__reduction_wrapper_{}_{}_{}", operation_name, cache_name, result_type_id.get());
    let key = (operation_name, cache_name.clone(), result_type_id);
    if t.state.reduction_wrapper_cache.contains_key(&key) {
        return fn_name;
    }

    let i32_ty = t.builder.int_type(32, true);
    let void_ty = t.builder.void_type();
    let fn_ty = t.builder.function_type(vec![i32_ty, ty], ty);
    let f = t.builder.declare_function(fn_name.clone(), fn_ty, CallingConv::SpirFunc);
    t.builder.set_linkage(f, Linkage::Internal);
    t.builder.add_function_attr(f, FunctionAttrs::ALWAYS_INLINE);
    t.builder.add_function_attr(f, FunctionAttrs::CONVERGENT);

    let entry = t.builder.append_block(f);
    let subgroup_bb = t.builder.append_block(f);
    let workgroup_bb = t.builder.append_block(f);
    let exit_bb = t.builder.append_block(f);

    let execution = ValueRef::Param(0);
    let x = ValueRef::Param(1);
    let scope_const_id = ValueRef::Const(t.builder.const_int(i32_ty, SCOPE_SUBGROUP));
    let cmp = t.builder.insert(
        f,
        entry,
        t.builder.int_type(1, false),
        Op::ICmp { pred: crate::ir::instr::IntPredicate::Eq, lhs: execution, rhs: scope_const_id },
    );
    t.builder.insert(
        f,
        entry,
        void_ty,
        Op::CondBranch { cond: ValueRef::Instr(cmp), if_true: subgroup_bb, if_false: workgroup_bb, weights: None },
    );

    let mut incoming = Vec::new();
    for (bb, scope_word) in [(subgroup_bb, "sub_group"), (workgroup_bb, "work_group")] {
        let callee = format!("{}_{}_{}", scope_word, operation_name, cache_name);
        let instr = t.builder.insert(
            f,
            bb,
            ty,
            Op::Call { callee, args: vec![x], attrs: CallAttrFlags::CONVERGENT },
        );
        t.builder.insert(f, bb, void_ty, Op::Branch { target: exit_bb });
        incoming.push((bb, ValueRef::Instr(instr)));
    }
    let phi = t.builder.insert(f, exit_bb, ty, Op::Phi { incoming });
    t.builder.insert(f, exit_bb, void_ty, Op::Ret { value: Some(ValueRef::Instr(phi)) });
    t.builder.mark_defined(f);
    t.state.reduction_wrapper_cache.insert(key, f);
    fn_name
}

/// `OpGroup*` reductions/scans: (Result Type, Result, Execution Scope,
/// GroupOperation, X).
pub fn translate_group_reduce(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let scope_id = cursor.next_id()?;
    let group_op: u32 = cursor.next_u32()?;
    let x_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let x = t.state.require_value(x_id)?;
    let scope = t.state.require_value(scope_id)?;
    // GroupOperation: 0=Reduce, 1=InclusiveScan, 2=ExclusiveScan.
    let operation_name = match group_op {
        1 => "scan_inclusive",
        2 => "scan_exclusive",
        _ => "reduce",
    };
    let op_name = group_reduce_builtin(record.op());
    let sign_prefix = group_reduce_sign_prefix(record.op());

    if let Some(scope_val) = scope_const(t, scope) {
        let scope_word = if scope_val == SCOPE_SUBGROUP { "sub_group" } else { "work_group" };
        let name = format!("{}_{}_{}{}", scope_word, operation_name, sign_prefix, op_name);
        return call(t, result, record.op(), ty, name, vec![x]);
    }

    let wrapper_name = reduction_wrapper(t, operation_name, op_name, sign_prefix, result_type_id, ty);
    call(t, result, record.op(), ty, wrapper_name, vec![scope, x])
}

/// Builds (or returns the cached) dynamic-scope wrapper for `opName`
/// ("all"/"any"), grounded in `generatePredicate` (builder_core.cpp
/// ~L6130): the predicate is widened to `i32` for the call since the
/// custom-mangled builtins take an int, not a bool, then narrowed back.
fn predicate_wrapper(t: &mut Translator<'_>, op_name: &'static str) -> String {
    let fn_name = format!("__predicate_wrapper_{}", op_name);
    if t.state.predicate_wrapper_cache.contains_key(op_name) {
        return fn_name;
    }

    let i32_ty = t.builder.int_type(32, true);
    let i1_ty = t.builder.int_type(1, false);
    let void_ty = t.builder.void_type();
    let fn_ty = t.builder.function_type(vec![i32_ty, i1_ty], i1_ty);
    let f = t.builder.declare_function(fn_name.clone(), fn_ty, CallingConv::SpirFunc);
    t.builder.set_linkage(f, Linkage::Internal);
    t.builder.add_function_attr(f, FunctionAttrs::ALWAYS_INLINE);
    t.builder.add_function_attr(f, FunctionAttrs::CONVERGENT);

    let entry = t.builder.append_block(f);
    let subgroup_bb = t.builder.append_block(f);
    let workgroup_bb = t.builder.append_block(f);
    let exit_bb = t.builder.append_block(f);

    let execution = ValueRef::Param(0);
    let predicate = ValueRef::Param(1);
    let scope_const_id = ValueRef::Const(t.builder.const_int(i32_ty, SCOPE_SUBGROUP));
    let cmp = t.builder.insert(
        f,
        entry,
        i1_ty,
        Op::ICmp { pred: crate::ir::instr::IntPredicate::Eq, lhs: execution, rhs: scope_const_id },
    );
    t.builder.insert(
        f,
        entry,
        void_ty,
        Op::CondBranch { cond: ValueRef::Instr(cmp), if_true: subgroup_bb, if_false: workgroup_bb, weights: None },
    );

    let widened = t.builder.insert(f, entry, i32_ty, Op::IntCast { value: predicate, signed: false, truncating: false });

    let mut incoming = Vec::new();
    for (bb, scope_word) in [(subgroup_bb, "sub_group"), (workgroup_bb, "work_group")] {
        let callee = format!("{}_{}i", scope_word, op_name);
        let instr = t.builder.insert(
            f,
            bb,
            i32_ty,
            Op::Call { callee, args: vec![ValueRef::Instr(widened)], attrs: CallAttrFlags::CONVERGENT },
        );
        t.builder.insert(f, bb, void_ty, Op::Branch { target: exit_bb });
        incoming.push((bb, ValueRef::Instr(instr)));
    }
    let phi = t.builder.insert(f, exit_bb, i32_ty, Op::Phi { incoming });
    let narrowed = t.builder.insert(f, exit_bb, i1_ty, Op::IntCast { value: ValueRef::Instr(phi), signed: false, truncating: true });
    t.builder.insert(f, exit_bb, void_ty, Op::Ret { value: Some(ValueRef::Instr(narrowed)) });
    t.builder.mark_defined(f);
    t.state.predicate_wrapper_cache.insert(op_name, f);
    fn_name
}

/// `OpGroupAll`/`OpGroupAny`: (Result Type, Result, Scope, Predicate).
pub fn translate_group_predicate(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let scope_id = cursor.next_id()?;
    let predicate_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let predicate = t.state.require_value(predicate_id)?;
    let scope = t.state.require_value(scope_id)?;
    let which = if record.op() == spirv::Op::GroupAll { "all" } else { "any" };

    if let Some(scope_val) = scope_const(t, scope) {
        let scope_word = if scope_val == SCOPE_SUBGROUP { "sub_group" } else { "work_group" };
        let name = format!("{}_{}i", scope_word, which);
        return call(t, result, record.op(), ty, name, vec![predicate]);
    }

    let wrapper_name = predicate_wrapper(t, which);
    call(t, result, record.op(), ty, wrapper_name, vec![scope, predicate])
}

/// Builds (or returns the cached) dynamic-scope wrapper for one
/// `(resultType, dimensions)` combination, grounded in
/// `Builder::create<OpGroupBroadcast>` (builder_core.cpp ~L6252): the
/// work-group branch casts every `LocalId` component to `size_t` before
/// calling, the sub-group branch passes it through unchanged.
fn broadcast_wrapper(
    t: &mut Translator<'_>,
    result_type_id: SpvId,
    ty: crate::ir::types::TypeId,
    local_ty: crate::ir::types::TypeId,
    dimensions: u8,
) -> String {
    let fn_name = format!("__broadcast_wrapper_{}_{}", result_type_id.get(), dimensions);
    let key = (result_type_id, dimensions);
    if t.state.broadcast_wrapper_cache.contains_key(&key) {
        return fn_name;
    }

    let i32_ty = t.builder.int_type(32, true);
    let void_ty = t.builder.void_type();
    let fn_ty = t.builder.function_type(vec![i32_ty, ty, local_ty], ty);
    let f = t.builder.declare_function(fn_name.clone(), fn_ty, CallingConv::SpirFunc);
    t.builder.set_linkage(f, Linkage::Internal);
    t.builder.add_function_attr(f, FunctionAttrs::ALWAYS_INLINE);
    t.builder.add_function_attr(f, FunctionAttrs::CONVERGENT);

    let entry = t.builder.append_block(f);
    let subgroup_bb = t.builder.append_block(f);
    let workgroup_bb = t.builder.append_block(f);
    let exit_bb = t.builder.append_block(f);

    let execution = ValueRef::Param(0);
    let value = ValueRef::Param(1);
    let local = ValueRef::Param(2);
    let scope_const_id = ValueRef::Const(t.builder.const_int(i32_ty, SCOPE_SUBGROUP));
    let cmp = t.builder.insert(
        f,
        entry,
        t.builder.int_type(1, false),
        Op::ICmp { pred: crate::ir::instr::IntPredicate::Eq, lhs: execution, rhs: scope_const_id },
    );
    t.builder.insert(
        f,
        entry,
        void_ty,
        Op::CondBranch { cond: ValueRef::Instr(cmp), if_true: subgroup_bb, if_false: workgroup_bb, weights: None },
    );

    let mangler = ItaniumMangler;
    let value_ty_resolved = t.builder.module().types[ty].clone();

    let sub_callee = mangler.mangle(t.builder.module(), "sub_group_broadcast", &[(&value_ty_resolved, MangleArg::default())]);
    let sub_instr = t.builder.insert(
        f,
        subgroup_bb,
        ty,
        Op::Call { callee: sub_callee, args: vec![value, local], attrs: CallAttrFlags::CONVERGENT },
    );
    t.builder.insert(f, subgroup_bb, void_ty, Op::Branch { target: exit_bb });

    // The work-group builtin addresses by `size_t`, widened from whatever
    // integer width `LocalId` arrived in.
    let size_t_ty = t.builder.int_type(if t.state.addressing_bits == 64 { 64 } else { 32 }, false);
    let local_cast = t.builder.insert(f, workgroup_bb, size_t_ty, Op::IntCast { value: local, signed: false, truncating: false });
    let work_callee = mangler.mangle_broadcast(t.builder.module(), "work_group", &value_ty_resolved, dimensions as u32);
    let work_instr = t.builder.insert(
        f,
        workgroup_bb,
        ty,
        Op::Call { callee: work_callee, args: vec![value, ValueRef::Instr(local_cast)], attrs: CallAttrFlags::CONVERGENT },
    );
    t.builder.insert(f, workgroup_bb, void_ty, Op::Branch { target: exit_bb });

    let phi = t.builder.insert(
        f,
        exit_bb,
        ty,
        Op::Phi { incoming: vec![(subgroup_bb, ValueRef::Instr(sub_instr)), (workgroup_bb, ValueRef::Instr(work_instr))] },
    );
    t.builder.insert(f, exit_bb, void_ty, Op::Ret { value: Some(ValueRef::Instr(phi)) });
    t.builder.mark_defined(f);
    t.state.broadcast_wrapper_cache.insert(key, f);
    fn_name
}

/// `OpGroupBroadcast`: (Result Type, Result, Scope, Value, LocalId). The
/// work-group branch casts `LocalId` to `size_t` (spec.md §4.3's second
/// mangling escape hatch).
pub fn translate_group_broadcast(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let scope_id = cursor.next_id()?;
    let value_id = cursor.next_id()?;
    let local_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(value_id)?;
    let local = t.state.require_value(local_id)?;
    let scope = t.state.require_value(scope_id)?;
    let local_ty = t.value_type(local);
    let dimensions = match &t.builder.module().types[local_ty].inner {
        TypeInner::Vector { len, .. } => *len as u8,
        _ => 1,
    };

    if let Some(scope_val) = scope_const(t, scope) {
        let is_subgroup = scope_val == SCOPE_SUBGROUP;
        let mangler = ItaniumMangler;
        let value_ty = t.builder.module().types[ty].clone();
        let mangled = if is_subgroup {
            mangler.mangle(t.builder.module(), "sub_group_broadcast", &[(&value_ty, MangleArg::default())])
        } else {
            mangler.mangle_broadcast(t.builder.module(), "work_group", &value_ty, dimensions as u32)
        };
        return call(t, result, record.op(), ty, mangled, vec![value, local]);
    }

    let wrapper_name = broadcast_wrapper(t, result_type_id, ty, local_ty, dimensions);
    call(t, result, record.op(), ty, wrapper_name, vec![scope, value, local])
}

fn subgroup_shuffle_builtin(op: spirv::Op) -> &'static str {
    use spirv::Op::*;
    match op {
        SubgroupShuffleINTEL => "__mux_sub_group_shuffle_",
        SubgroupShuffleUpINTEL => "__mux_sub_group_shuffle_up_",
        SubgroupShuffleDownINTEL => "__mux_sub_group_shuffle_down_",
        SubgroupShuffleXorINTEL => "__mux_sub_group_shuffle_xor_",
        _ => "__mux_sub_group_shuffle_",
    }
}

pub fn translate_subgroup_shuffle(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let data_id = cursor.next_id()?;
    let rest = cursor.rest_as_ids()?;

    let ty = t.state.require_type(result_type_id)?;
    let data = t.state.require_value(data_id)?;
    let mut args = vec![data];
    for id in rest {
        args.push(t.state.require_value(id)?);
    }

    let mangler = ItaniumMangler;
    let data_ty = t.builder.module().types[ty].clone();
    let mangled_data = mangler.mangled_type_resolved(t.builder.module(), &data_ty, MangleArg::default());
    let base = subgroup_shuffle_builtin(record.op());
    let mut name = base.to_string();
    name.push_str(&mangled_data);
    call(t, result, record.op(), ty, name, args)
}
