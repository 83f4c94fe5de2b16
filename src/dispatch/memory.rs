//! spec.md §4.1.5: variables and memory access.

use super::Translator;
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::function::Linkage;
use crate::ir::instr::{MemoryAccessFlags, Op};
use crate::ir::types::TypeInner;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::decorations::DecorationOperand;
use crate::state::Binding;

fn alignment_of(t: &Translator<'_>, id: SpvId) -> Option<u32> {
    match t.state.decorations.first_of(id, spirv::Decoration::Alignment)?.operand {
        DecorationOperand::Literal(n) => Some(n),
        _ => None,
    }
}

fn read_memory_access(cursor: &mut crate::opcode::OperandCursor<'_>) -> (MemoryAccessFlags, Option<u32>) {
    if cursor.is_empty() {
        return (MemoryAccessFlags::empty(), None);
    }
    let raw = cursor.next_u32().unwrap_or(0);
    let mut flags = MemoryAccessFlags::empty();
    if raw & 0x1 != 0 {
        flags |= MemoryAccessFlags::VOLATILE;
    }
    let mut align = None;
    if raw & 0x2 != 0 {
        flags |= MemoryAccessFlags::ALIGNED;
        align = cursor.next_u32().ok();
    }
    (flags, align)
}

pub fn translate_variable(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let storage: spirv::StorageClass = cursor.next_enum()?;
    let initializer_id = cursor.next_id().ok();

    let pointer_ty = t.state.require_type(result_type_id)?;
    let pointee = match &t.builder.module().types[pointer_ty].inner {
        TypeInner::Pointer { pointee, .. } => *pointee,
        _ => {
            return Err(ErrorKind::MalformedInstruction {
                op: record.op(),
                reason: "OpVariable result type is not a pointer",
            }
            .into())
        }
    };

    use spirv::StorageClass::*;
    match storage {
        Function => {
            let align = alignment_of(t, result);
            let instr = t.insert(pointer_ty, Op::Alloca { pointee, align })?;
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
        }
        UniformConstant | Workgroup | CrossWorkgroup => {
            let addr_space = match storage {
                UniformConstant => 2,
                Workgroup => 3,
                CrossWorkgroup => 1,
                _ => unreachable!(),
            };
            let name = t
                .state
                .names
                .get(&result)
                .cloned()
                .unwrap_or_else(|| format!("_global_{}", result.get()));
            let is_constant = storage == UniformConstant;
            let linkage = if t
                .state
                .decorations
                .first_of(result, spirv::Decoration::LinkageAttributes)
                .is_some()
            {
                Linkage::External
            } else {
                Linkage::Internal
            };
            let global = t
                .builder
                .declare_global(name, pointee, addr_space, linkage, is_constant, true);
            if let Some(init_id) = initializer_id {
                if let Binding::Constant(c) = t.state.require_bound(init_id)? {
                    t.builder.set_global_initializer(global, c);
                }
            }
            if let Some(align) = alignment_of(t, result) {
                t.builder.set_global_alignment(global, align);
            }
            t.state.bind(result, record.op(), Binding::Global(global));
        }
        Input => {
            // BuiltIn inputs resolve through their decoration at use time;
            // a plain `Input` variable with no `BuiltIn` decoration has no
            // OpenCL-kernel equivalent and is left declared-but-unbound.
            t.state.declare(result, record.op());
        }
        Generic | Image => {
            return Err(ErrorKind::InvalidStorageClass(
                storage,
                "unsupported OpVariable storage class for an OpenCL kernel target",
            )
            .into())
        }
        _ => {
            return Err(ErrorKind::InvalidStorageClass(storage, "unrecognized OpVariable storage class").into())
        }
    }
    Ok(())
}

pub fn translate_load(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let pointer_id = cursor.next_id()?;
    let (flags, align) = read_memory_access(&mut cursor);

    let ty = t.state.require_type(result_type_id)?;
    let pointer = t.state.require_value(pointer_id)?;
    let instr = t.insert(ty, Op::Load { pointer, flags, align })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

pub fn translate_store(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let pointer_id = cursor.next_id()?;
    let value_id = cursor.next_id()?;
    let (flags, align) = read_memory_access(&mut cursor);

    let pointer = t.state.require_value(pointer_id)?;
    let value = t.state.require_value(value_id)?;
    let void_ty = t.builder.void_type();
    t.insert(void_ty, Op::Store { pointer, value, flags, align })?;
    Ok(())
}

fn composite_byte_len(t: &Translator<'_>, ty: crate::ir::types::TypeId) -> u64 {
    match &t.builder.module().types[ty].inner {
        TypeInner::Int { width, .. } => (*width as u64 + 7) / 8,
        TypeInner::Float { width } => (*width as u64 + 7) / 8,
        TypeInner::Vector { elem, len } => composite_byte_len(t, *elem) * *len as u64,
        TypeInner::Array { elem, len } => composite_byte_len(t, *elem) * len.unwrap_or(0) as u64,
        TypeInner::Pointer { .. } => (t.state.addressing_bits as u64).max(32) / 8,
        TypeInner::Struct { members, .. } => members.iter().map(|m| composite_byte_len(t, *m)).sum(),
        _ => 0,
    }
}

pub fn translate_copy_memory(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let dst_id = cursor.next_id()?;
    let src_id = cursor.next_id()?;
    let (flags, _align) = read_memory_access(&mut cursor);

    let dst = t.state.require_value(dst_id)?;
    let src = t.state.require_value(src_id)?;
    let dst_ptr_ty = t.value_type(dst);
    let pointee = match &t.builder.module().types[dst_ptr_ty].inner {
        TypeInner::Pointer { pointee, .. } => *pointee,
        _ => dst_ptr_ty,
    };
    let len_bytes = composite_byte_len(t, pointee);
    let void_ty = t.builder.void_type();
    t.insert(
        void_ty,
        Op::Memcpy {
            dst,
            src,
            len_bytes,
            volatile: flags.contains(MemoryAccessFlags::VOLATILE),
        },
    )?;
    Ok(())
}

pub fn translate_copy_memory_sized(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let dst_id = cursor.next_id()?;
    let src_id = cursor.next_id()?;
    let size_id = cursor.next_id()?;
    let (flags, _align) = read_memory_access(&mut cursor);

    let dst = t.state.require_value(dst_id)?;
    let src = t.state.require_value(src_id)?;
    let len_bytes = match t.state.require_bound(size_id)? {
        Binding::Constant(c) => match t.builder.module().constants[c].value {
            crate::ir::values::ConstantValue::Int(v) => v,
            _ => 0,
        },
        _ => 0,
    };
    let void_ty = t.builder.void_type();
    t.insert(
        void_ty,
        Op::Memcpy {
            dst,
            src,
            len_bytes,
            volatile: flags.contains(MemoryAccessFlags::VOLATILE),
        },
    )?;
    Ok(())
}

fn access_chain(
    t: &mut Translator<'_>,
    record: &OpcodeRecord,
    in_bounds: bool,
    element_indexed: bool,
) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let base_id = cursor.next_id()?;
    let mut index_ids = Vec::new();
    while !cursor.is_empty() {
        index_ids.push(cursor.next_id()?);
    }
    if element_indexed && index_ids.is_empty() {
        return Err(ErrorKind::MalformedInstruction {
            op: record.op(),
            reason: "OpPtrAccessChain requires an element index",
        }
        .into());
    }

    let ty = t.state.require_type(result_type_id)?;
    let base = t.state.require_value(base_id)?;
    let mut indices = Vec::with_capacity(index_ids.len() + 1);
    if !element_indexed {
        // `OpAccessChain` indexes straight into the pointee; `OpGep`
        // models pointer arithmetic first, so an implicit leading zero
        // steps over the base pointer itself (spec.md §4.1.5).
        let i32_ty = t.builder.int_type(32, true);
        let zero = t.builder.const_int(i32_ty, 0);
        indices.push(ValueRef::Const(zero));
    }
    for id in &index_ids {
        indices.push(t.state.require_value(*id)?);
    }
    let instr = t.insert(ty, Op::Gep { base, indices, in_bounds })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

pub fn translate_access_chain(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    access_chain(t, record, record.op() == spirv::Op::InBoundsAccessChain, false)
}

pub fn translate_ptr_access_chain(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    access_chain(t, record, record.op() == spirv::Op::InBoundsPtrAccessChain, true)
}

pub fn translate_copy_object(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let is_pointer = matches!(t.builder.module().types[ty].inner, TypeInner::Pointer { .. });
    if is_pointer {
        // A duplicated pointer is the same SSA value under a new id; no
        // new instruction is needed (spec.md §4.1.5).
        t.state.bind(result, record.op(), Binding::Value(value));
    } else {
        let instr = t.insert(ty, Op::Bitcast { value })?;
        t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    }
    Ok(())
}
