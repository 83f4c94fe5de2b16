//! spec.md §4.1.2 (type construction), §4.1.3 (constants/spec-constants),
//! §4.5 (deferred spec-constant-ops).

use super::{DeferredSpecConstantOp, Translator};
use crate::backend::mangle::Mangler;
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::function::{Linkage, Param, ParamAttr};
use crate::ir::instr::Op;
use crate::ir::types::{ImageKind, TypeId, TypeInner};
use crate::ir::values::{ConstantId, ConstantValue, ValueRef};
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

fn dim_arrayed_to_image_kind(dim: spirv::Dim, arrayed: bool) -> Option<ImageKind> {
    use spirv::Dim::*;
    Some(match (dim, arrayed) {
        (Dim1D, false) => ImageKind::Image1D,
        (Dim1D, true) => ImageKind::Image1DArray,
        (Dim2D, false) => ImageKind::Image2D,
        (Dim2D, true) => ImageKind::Image2DArray,
        (Dim3D, false) => ImageKind::Image3D,
        (DimBuffer, false) => ImageKind::Image1DBuffer,
        _ => return None,
    })
}

pub fn translate_type(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    use spirv::Op::*;
    match record.op() {
        TypeVoid => {
            let result = cursor.next_id()?;
            let ty = t.builder.void_type();
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeBool => {
            let result = cursor.next_id()?;
            let ty = t.builder.int_type(1, false);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeInt => {
            let result = cursor.next_id()?;
            let width = cursor.next_u32()?;
            let signed = cursor.next_u32()? != 0;
            let ty = t.builder.int_type(width, signed);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeFloat => {
            let result = cursor.next_id()?;
            let width = cursor.next_u32()?;
            let ty = t.builder.float_type(width);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeVector => {
            let result = cursor.next_id()?;
            let elem_id = cursor.next_id()?;
            let len = cursor.next_u32()?;
            let elem = t.state.require_type(elem_id)?;
            let ty = t.builder.vector_type(elem, len);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeMatrix => {
            // Modeled as an array of column vectors (spec.md §4.1.2).
            let result = cursor.next_id()?;
            let column_id = cursor.next_id()?;
            let count = cursor.next_u32()?;
            let column = t.state.require_type(column_id)?;
            let ty = t.builder.array_type(column, Some(count));
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeArray => {
            let result = cursor.next_id()?;
            let elem_id = cursor.next_id()?;
            let length_id = cursor.next_id()?;
            let elem = t.state.require_type(elem_id)?;
            let length = match t.state.require_bound(length_id)? {
                Binding::Constant(c) => match &t.builder.module().constants[c].value {
                    ConstantValue::Int(v) => *v as u32,
                    _ => 0,
                },
                _ => 0,
            };
            let ty = t.builder.array_type(elem, Some(length));
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeRuntimeArray => {
            let result = cursor.next_id()?;
            let elem_id = cursor.next_id()?;
            let elem = t.state.require_type(elem_id)?;
            let ty = t.builder.array_type(elem, None);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeFunction => {
            let result = cursor.next_id()?;
            let ret_id = cursor.next_id()?;
            let ret = t.state.require_type(ret_id)?;
            let mut params = Vec::new();
            let mut param_ids = Vec::new();
            while !cursor.is_empty() {
                let id = cursor.next_id()?;
                params.push(t.state.require_type(id)?);
                param_ids.push(id);
            }
            t.state.param_type_ids.insert(result, param_ids);
            let ty = t.builder.function_type(params, ret);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypePointer => {
            let result = cursor.next_id()?;
            let storage: spirv::StorageClass = cursor.next_enum()?;
            let pointee_id = cursor.next_id()?;
            let addr_space = storage_class_addr_space(storage);
            if t.state.forward_pointer_ids.contains(&pointee_id)
                && !t.state.is_bound(pointee_id)
            {
                // pointee not yet defined; leave this pointer incomplete
                // until it resolves (spec.md §4.2).
                t.state.forward_pointer_ids.insert(result);
            }
            let pointee = t
                .state
                .binding_of(pointee_id)
                .and_then(|b| b.as_type())
                .unwrap_or_else(|| t.builder.opaque_struct(None, false));
            let ty = t.builder.pointer_type(pointee, addr_space);
            t.state.bind(result, record.op(), Binding::Type(ty));
            t.state.forward_pointer_ids.remove(&result);
        }
        TypeForwardPointer => {
            let pointee = cursor.next_id()?;
            let _storage: spirv::StorageClass = cursor.next_enum()?;
            t.state.forward_pointer_ids.insert(pointee);
            t.state.declare(pointee, record.op());
        }
        TypeEvent => {
            let result = cursor.next_id()?;
            let ty = t.builder.event_type();
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeSampler => {
            let result = cursor.next_id()?;
            let ty = t.builder.sampler_type();
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeImage => {
            let result = cursor.next_id()?;
            let _sampled_type = cursor.next_id()?;
            let dim: spirv::Dim = cursor.next_enum()?;
            let _depth = cursor.next_u32()?;
            let arrayed = cursor.next_u32()? != 0;
            let kind = dim_arrayed_to_image_kind(dim, arrayed)
                .ok_or(ErrorKind::UnsupportedOpcode(record.op()))?;
            let ty = t.builder.image_type(kind);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeSampledImage => {
            // Produces no IR type of its own; components are tracked
            // via `sampled_images` when an OpSampledImage constructs one.
            let result = cursor.next_id()?;
            t.state.declare(result, record.op());
        }
        TypeOpaque => {
            let result = cursor.next_id()?;
            let name = cursor.next_string()?;
            let ty = t.builder.opaque_type(name);
            t.state.bind(result, record.op(), Binding::Type(ty));
        }
        TypeStruct => {
            let result = cursor.next_id()?;
            let member_ids = cursor.rest_as_ids()?;
            let unresolved: Vec<SpvId> = member_ids
                .iter()
                .copied()
                .filter(|id| !t.state.is_bound(*id))
                .collect();
            let packed = t
                .state
                .decorations
                .has(result, spirv::Decoration::CPacked)
                && t.state.capabilities.contains(&spirv::Capability::Kernel);
            if !unresolved.is_empty() {
                let ty = t.builder.opaque_struct(None, packed);
                t.state.bind(result, record.op(), Binding::Type(ty));
                t.state.incomplete_structs.push((result, unresolved));
            } else {
                let members: Result<Vec<TypeId>> =
                    member_ids.iter().map(|id| t.state.require_type(*id)).collect();
                let ty = t.builder.opaque_struct(None, packed);
                t.builder.complete_struct(ty, members?);
                t.state.bind(result, record.op(), Binding::Type(ty));
            }
        }
        _ => return Err(ErrorKind::UnsupportedOpcode(record.op()).into()),
    }
    Ok(())
}

fn storage_class_addr_space(storage: spirv::StorageClass) -> u32 {
    use spirv::StorageClass::*;
    match storage {
        UniformConstant => 2,
        Workgroup => 3,
        CrossWorkgroup => 1,
        Function => 0,
        Generic => 4,
        Input => 1,
        _ => 0,
    }
}

fn int_const(t: &mut Translator<'_>, ty: TypeId, bits: u64) -> ConstantId {
    t.builder.const_int(ty, bits)
}

pub fn translate_constant(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    let mut cursor = record.cursor();
    match record.op() {
        ConstantTrue | ConstantFalse | SpecConstantTrue | SpecConstantFalse => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let is_true = matches!(record.op(), ConstantTrue | SpecConstantTrue);
            let value = if matches!(record.op(), SpecConstantTrue | SpecConstantFalse) {
                spec_bool_value(t, result, is_true)
            } else {
                is_true
            };
            let c = int_const(t, ty, value as u64);
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        Constant => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let c = materialize_literal_constant(t, ty, &mut cursor)?;
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        ConstantComposite | SpecConstantComposite => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let mut parts = Vec::new();
            let mut int_parts = Vec::new();
            while !cursor.is_empty() {
                let id = cursor.next_id()?;
                let binding = t.state.require_bound(id)?;
                if let Binding::Constant(c) = binding {
                    parts.push(c);
                    if let ConstantValue::Int(v) = t.builder.module().constants[c].value {
                        int_parts.push(v as u32);
                    }
                }
            }
            let c = t.builder.const_composite(ty, parts);
            t.state.bind(result, record.op(), Binding::Constant(c));
            if record.op() == SpecConstantComposite
                && int_parts.len() == 3
                && t.state
                    .decorations
                    .has(result, spirv::Decoration::BuiltIn)
            {
                t.state.workgroup_size_hint = Some((int_parts[0], int_parts[1], int_parts[2]));
            }
        }
        ConstantSampler => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let addressing = cursor.next_u32()?;
            let normalized = cursor.next_u32()?;
            let filter = cursor.next_u32()?;
            let packed = addressing | normalized | filter;
            let c = int_const(t, ty, packed as u64);
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        ConstantNull => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let c = match &t.builder.module().types[ty].inner {
                TypeInner::Event => t.builder.const_none_event(ty),
                TypeInner::Image { .. } | TypeInner::Sampler | TypeInner::Opaque { .. } => {
                    return Err(ErrorKind::MalformedInstruction {
                        op: record.op(),
                        reason: "OpConstantNull is unsupported for this extension type",
                    }
                    .into())
                }
                _ => t.builder.const_zero(ty),
            };
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        SpecConstant => {
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let literal = materialize_literal_constant(t, ty, &mut cursor)?;
            let c = spec_scalar_value(t, result, ty, literal);
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        SpecConstantOp => {
            translate_spec_constant_op(t, record, &mut cursor)?;
        }
        _ => return Err(ErrorKind::UnsupportedOpcode(record.op()).into()),
    }
    Ok(())
}

fn spec_bool_value(t: &Translator<'_>, id: SpvId, default_true: bool) -> bool {
    let spec_id = decoration_spec_id(t, id);
    if let (Some(spec_id), Some(info)) = (spec_id, t.state.spec_info.as_ref()) {
        if let Some(v) = info.value_for(spec_id) {
            return v.as_u64() != 0;
        }
    }
    default_true
}

fn decoration_spec_id(t: &Translator<'_>, id: SpvId) -> Option<u32> {
    match t.state.decorations.first_of(id, spirv::Decoration::SpecId)?.operand {
        crate::state::decorations::DecorationOperand::Literal(v) => Some(v),
        _ => None,
    }
}

/// Uses the specialization provider's raw bytes when present, else keeps
/// the module's literal default (spec.md §4.1.3, §6).
fn spec_scalar_value(t: &mut Translator<'_>, id: SpvId, ty: TypeId, default: ConstantId) -> ConstantId {
    let spec_id = match decoration_spec_id(t, id) {
        Some(v) => v,
        None => return default,
    };
    let raw = match t.state.spec_info.as_ref().and_then(|p| p.value_for(spec_id)) {
        Some(v) => v.as_u64(),
        None => return default,
    };
    match &t.builder.module().types[ty].inner {
        TypeInner::Float { width: 64 } => t.builder.const_float(ty, f64::from_bits(raw)),
        TypeInner::Float { .. } => t.builder.const_float(ty, f32::from_bits(raw as u32) as f64),
        _ => t.builder.const_int(ty, raw),
    }
}

fn materialize_literal_constant(
    t: &mut Translator<'_>,
    ty: TypeId,
    cursor: &mut crate::opcode::OperandCursor<'_>,
) -> Result<ConstantId> {
    let inner = t.builder.module().types[ty].inner.clone();
    Ok(match inner {
        TypeInner::Int { width, .. } => {
            let bits = if width > 32 {
                let lo = cursor.next_u32()? as u64;
                let hi = cursor.next_u32()? as u64;
                lo | (hi << 32)
            } else {
                cursor.next_u32()? as u64
            };
            t.builder.const_int(ty, bits)
        }
        TypeInner::Float { width: 64 } => {
            let lo = cursor.next_u32()? as u64;
            let hi = cursor.next_u32()? as u64;
            t.builder.const_float(ty, f64::from_bits(lo | (hi << 32)))
        }
        TypeInner::Float { width: 16 } => {
            let raw = cursor.next_u32()?;
            t.builder.const_float(ty, (raw & 0xffff) as f64)
        }
        TypeInner::Float { .. } => {
            let raw = cursor.next_u32()?;
            t.builder.const_float(ty, f32::from_bits(raw) as f64)
        }
        _ => {
            let raw = cursor.next_u32()?;
            t.builder.const_int(ty, raw as u64)
        }
    })
}

/// spec.md §4.1.3 `OpSpecConstantOp`: executes the inner opcode against
/// already-resolved constant operands, except `OpFRem`/`OpFMod` which are
/// deferred to function scope (spec.md §4.5).
fn translate_spec_constant_op(
    t: &mut Translator<'_>,
    record: &OpcodeRecord,
    cursor: &mut crate::opcode::OperandCursor<'_>,
) -> Result<()> {
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let inner_op: spirv::Op = cursor.next_enum()?;
    let mut operand_ids = Vec::new();
    while !cursor.is_empty() {
        operand_ids.push(cursor.next_id()?);
    }

    match inner_op {
        spirv::Op::FRem | spirv::Op::FMod => {
            let lhs = t.state.require_value(operand_ids[0])?;
            let rhs = t.state.require_value(operand_ids[1])?;
            // Both OpFRem and OpFMod call `fmod`; OpFMod additionally
            // needs a `copysign` correction, applied when the deferred
            // op is drained (`drain_deferred_spec_const_ops` below).
            t.deferred_spec_const_ops.push(DeferredSpecConstantOp {
                result_id: result,
                result_type: ty,
                builtin: "fmod",
                needs_copysign: inner_op == spirv::Op::FMod,
                lhs,
                rhs,
            });
            // The binding is completed once the deferred op is drained
            // at the first function's entry block; record a declaration
            // now so later lookups see it as "known but pending".
            t.state.declare(result, record.op());
        }
        spirv::Op::IAdd | spirv::Op::ISub | spirv::Op::IMul | spirv::Op::BitwiseAnd
        | spirv::Op::BitwiseOr | spirv::Op::BitwiseXor => {
            let lhs = constant_bits(t, operand_ids[0])?;
            let rhs = constant_bits(t, operand_ids[1])?;
            let folded = match inner_op {
                spirv::Op::IAdd => lhs.wrapping_add(rhs),
                spirv::Op::ISub => lhs.wrapping_sub(rhs),
                spirv::Op::IMul => lhs.wrapping_mul(rhs),
                spirv::Op::BitwiseAnd => lhs & rhs,
                spirv::Op::BitwiseOr => lhs | rhs,
                spirv::Op::BitwiseXor => lhs ^ rhs,
                _ => unreachable!(),
            };
            let c = t.builder.const_int(ty, folded);
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        spirv::Op::Select => {
            let cond = constant_bits(t, operand_ids[0])? != 0;
            let chosen = if cond { operand_ids[1] } else { operand_ids[2] };
            let c = match t.state.require_bound(chosen)? {
                Binding::Constant(c) => c,
                _ => {
                    return Err(ErrorKind::MalformedInstruction {
                        op: record.op(),
                        reason: "OpSpecConstantOp Select operand is not a constant",
                    }
                    .into())
                }
            };
            t.state.bind(result, record.op(), Binding::Constant(c));
        }
        _ => return Err(ErrorKind::UnsupportedOpcode(inner_op).into()),
    }
    Ok(())
}

fn constant_bits(t: &Translator<'_>, id: SpvId) -> Result<u64> {
    match t.state.require_bound(id)? {
        Binding::Constant(c) => match t.builder.module().constants[c].value {
            ConstantValue::Int(v) => Ok(v),
            ConstantValue::Float(v) => Ok(v.to_bits()),
            _ => Ok(0),
        },
        _ => Ok(0),
    }
}

/// spec.md §4.5: drains any `OpFRem`/`OpFMod` spec-constant-ops deferred
/// from module scope, materializing them as instructions at the top of
/// the first basic block of a function.
pub fn drain_deferred_spec_const_ops(t: &mut Translator<'_>) -> Result<()> {
    if t.cursor.drained_deferred_ops {
        return Ok(());
    }
    t.cursor.drained_deferred_ops = true;
    let deferred = std::mem::take(&mut t.deferred_spec_const_ops);
    for op in deferred {
        let mangled_call = |t: &mut Translator<'_>, name: &str, args: Vec<ValueRef>| -> Result<ValueRef> {
            let mangled = {
                let m = crate::backend::mangle::ItaniumMangler;
                let ty = t.builder.module().types[op.result_type].clone();
                let arg_ty = m.mangled_type_resolved(t.builder.module(), &ty, crate::backend::MangleArg::default());
                let mut mangled = m.mangled_length_prefix(name);
                for _ in &args {
                    mangled.push_str(&arg_ty);
                }
                mangled
            };
            let instr = t.insert(
                op.result_type,
                Op::Call { callee: mangled, args, attrs: crate::ir::instr::CallAttrFlags::empty() },
            )?;
            Ok(ValueRef::Instr(instr))
        };
        let rem = mangled_call(t, op.builtin, vec![op.lhs, op.rhs])?;
        let value = if op.needs_copysign {
            mangled_call(t, "copysign", vec![rem, op.rhs])?
        } else {
            rem
        };
        t.state.bind(op.result_id, spirv::Op::SpecConstantOp, Binding::Value(value));
    }
    Ok(())
}

// Re-exported for functions.rs which needs to build wrapper parameters
// from a function type's recorded parameter ids.
pub fn param_from_type(ty: TypeId, name: Option<String>, attrs: Vec<ParamAttr>) -> Param {
    Param { name, ty, attrs }
}

pub fn dummy_linkage_from_control(control: spirv::FunctionControl) -> Linkage {
    if control.contains(spirv::FunctionControl::INLINE) {
        Linkage::LinkOnceOdr
    } else {
        Linkage::External
    }
}

