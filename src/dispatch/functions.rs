//! spec.md §4.1.4: functions, parameters, and calls — kernel-wrapper
//! synthesis, forward function references, and parameter-attribute
//! mirroring at call sites.

use super::Translator;
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::function::{
    CallingConv, FunctionAttrs, KernelArgMetadata, KernelMetadata, Linkage, Param, ParamAttr,
    ScalarHint,
};
use crate::ir::instr::{CallAttrFlags, Op};
use crate::ir::types::TypeInner;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

use super::types_consts::dummy_linkage_from_control;

/// Matches `spv::FunctionControlOptNoneINTELMask` in the original SPIR-V
/// register (`SPV_INTEL_optnone`, bit 16). The core's `spirv_headers`
/// dependency does not carry vendor-extension bits for this grammar
/// version, so the mask is checked against the raw control word instead
/// of a named flag.
const OPT_NONE_INTEL_MASK: u32 = 0x1_0000;

fn linkage_name_override(t: &Translator<'_>, id: SpvId) -> Option<String> {
    let record = t.state.decorations.first_of(id, spirv::Decoration::LinkageAttributes)?;
    match &record.operand {
        crate::state::decorations::DecorationOperand::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// spec.md §4.1.4 "walk the execution modes and attach metadata". Mirrors
/// `builder_core.cpp`'s entry-point execution-mode walk: `MaxWorkDimINTEL`
/// attaches metadata, while `SubgroupsPerWorkgroup`/`SubgroupsPerWorkgroupId`
/// are rejected outright rather than silently ignored.
fn build_kernel_metadata(t: &Translator<'_>, entry_id: SpvId) -> Result<KernelMetadata> {
    let mut meta = KernelMetadata {
        contraction_allowed: true,
        ..KernelMetadata::default()
    };
    if let Some(modes) = t.state.execution_modes.get(&entry_id) {
        for record in modes {
            match record.mode {
                spirv::ExecutionMode::LocalSize if record.operands.len() == 3 => {
                    meta.reqd_work_group_size =
                        Some((record.operands[0], record.operands[1], record.operands[2]));
                }
                spirv::ExecutionMode::LocalSizeHint if record.operands.len() == 3 => {
                    meta.work_group_size_hint =
                        Some((record.operands[0], record.operands[1], record.operands[2]));
                }
                spirv::ExecutionMode::VecTypeHint if record.operands.len() == 1 => {
                    if let Some((hint, count)) = ScalarHint::decode(record.operands[0]) {
                        meta.vec_type_hint = Some((hint, count));
                    }
                }
                spirv::ExecutionMode::ContractionOff => meta.contraction_allowed = false,
                spirv::ExecutionMode::SubgroupSize if record.operands.len() == 1 => {
                    meta.intel_reqd_sub_group_size = Some(record.operands[0]);
                }
                spirv::ExecutionMode::SubgroupsPerWorkgroup
                | spirv::ExecutionMode::SubgroupsPerWorkgroupId => {
                    return Err(ErrorKind::UnsupportedExecutionMode(record.mode).into());
                }
                _ => {}
            }
        }
    }
    Ok(meta)
}

pub fn translate_function(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let _result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let control = spirv::FunctionControl::from_bits_truncate(cursor.next_u32()?);
    let function_type_id = cursor.next_id()?;
    let function_ty = t.state.require_type(function_type_id)?;
    let opt_none = control.bits() & OPT_NONE_INTEL_MASK != 0;

    let entry = t.state.entry_points.get(&result).cloned();
    if let Some(entry) = entry {
        let wrapper_name = entry.name.clone();
        if let Some(existing) = t.builder.module().function_by_name(&wrapper_name) {
            let renamed = format!("{}.old", wrapper_name);
            t.builder.rename_function(existing, renamed);
        }
        let wrapper = t
            .builder
            .declare_function(wrapper_name.clone(), function_ty, CallingConv::SpirKernel);
        t.builder.set_linkage(wrapper, Linkage::External);
        let kernel_meta = build_kernel_metadata(t, result)?;
        {
            let func = &mut t.builder.module_mut().functions[wrapper];
            func.kernel_metadata = Some(kernel_meta);
            func.kernel_arg_metadata = Some(KernelArgMetadata::default());
        }

        let body_name = format!("{}.spirv_func", wrapper_name);
        let body = if let Some(placeholder) = t.state.forward_function_refs.remove(&result) {
            t.builder.rename_function(placeholder, body_name);
            placeholder
        } else {
            t.builder.declare_function(body_name, function_ty, CallingConv::SpirFunc)
        };
        let linkage = if opt_none {
            Linkage::External
        } else {
            dummy_linkage_from_control(control)
        };
        t.builder.set_linkage(body, linkage);
        if opt_none {
            t.builder
                .add_function_attr(body, FunctionAttrs::OPTIMIZE_NONE | FunctionAttrs::NO_INLINE);
        }

        t.cursor.kernel_wrapper = Some(wrapper);
        t.cursor.function = Some(body);
        t.cursor.block = None;
        t.cursor.drained_deferred_ops = false;
        t.state.bind(result, record.op(), Binding::Function(body));
    } else {
        let name = linkage_name_override(t, result)
            .or_else(|| special_case_printf(t, result, function_ty))
            .or_else(|| t.state.names.get(&result).cloned())
            .unwrap_or_else(|| format!("_unnamed_fn_{}", result.get()));

        let func = if let Some(placeholder) = t.state.forward_function_refs.remove(&result) {
            t.builder.rename_function(placeholder, name);
            placeholder
        } else {
            t.builder.declare_function(name, function_ty, CallingConv::SpirFunc)
        };
        t.builder.set_linkage(func, dummy_linkage_from_control(control));
        if opt_none {
            t.builder
                .add_function_attr(func, FunctionAttrs::OPTIMIZE_NONE | FunctionAttrs::NO_INLINE);
        }

        t.cursor.kernel_wrapper = None;
        t.cursor.function = Some(func);
        t.cursor.block = None;
        t.cursor.drained_deferred_ops = false;
        t.state.bind(result, record.op(), Binding::Function(func));
    }
    Ok(())
}

/// spec.md §4.1.4: a non-variadic `printf` declaration with one
/// parameter is rewritten as variadic. The core models variadics only
/// by name, since `ir::types::TypeInner::Function` has no variadic bit.
fn special_case_printf(
    t: &mut Translator<'_>,
    result: SpvId,
    function_ty: crate::ir::types::TypeId,
) -> Option<String> {
    let name = t.state.names.get(&result)?;
    if name != "printf" {
        return None;
    }
    if let TypeInner::Function { params, .. } = &t.builder.module().types[function_ty].inner {
        if params.len() == 1 {
            return Some("printf".to_string());
        }
    }
    None
}

/// Decodes `FunctionParameterAttribute`'s fixed value table (SPIR-V spec
/// §3.20) without depending on `spirv_headers` carrying a dedicated enum.
fn decode_func_param_attr(raw: u32) -> Option<ParamAttr> {
    Some(match raw {
        0 => ParamAttr::ZExt,
        1 => ParamAttr::SExt,
        2 => ParamAttr::ByVal,
        3 => ParamAttr::Sret,
        4 => ParamAttr::NoAlias,
        5 => ParamAttr::NoCapture,
        6 => ParamAttr::ReadOnly,
        7 => ParamAttr::WriteOnly,
        _ => return None,
    })
}

pub fn translate_function_parameter(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let func = t.current_function()?;

    let mut attrs = Vec::new();
    for decoration in t.state.decorations.decorations_of(result) {
        use crate::state::decorations::DecorationOperand;
        match decoration.decoration {
            spirv::Decoration::FuncParamAttr => {
                if let DecorationOperand::Literal(raw) = decoration.operand {
                    if let Some(attr) = decode_func_param_attr(raw) {
                        attrs.push(attr);
                    }
                }
            }
            spirv::Decoration::MaxByteOffset => {
                if let DecorationOperand::Literal(n) = decoration.operand {
                    attrs.push(ParamAttr::Dereferenceable(n as u64));
                }
            }
            spirv::Decoration::NonReadable => attrs.push(ParamAttr::ReadNone),
            spirv::Decoration::NonWritable => attrs.push(ParamAttr::ReadOnly),
            _ => {}
        }
    }
    attrs.push(ParamAttr::NoUndef);

    let param = Param {
        name: t.state.names.get(&result).cloned(),
        ty,
        attrs,
    };
    t.builder.module_mut().functions[func].params.push(param);
    let index = (t.builder.module().functions[func].params.len() - 1) as u32;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Param(index)));
    Ok(())
}

/// spec.md §4.1.4 `OpFunctionEnd`: for a kernel wrapper, synthesize the
/// six metadata arrays and the single-block forwarding body.
pub fn translate_function_end(t: &mut Translator<'_>, _record: &OpcodeRecord) -> Result<()> {
    t.resolve_pending_phis()?;

    let body = t.current_function()?;
    if let Some(wrapper) = t.cursor.kernel_wrapper {
        synthesize_kernel_wrapper(t, wrapper, body)?;
    }
    t.builder.mark_defined(body);

    t.cursor.function = None;
    t.cursor.kernel_wrapper = None;
    t.cursor.block = None;
    t.cursor.drained_deferred_ops = false;
    Ok(())
}

fn spir_type_name(t: &Translator<'_>, ty: crate::ir::types::TypeId) -> String {
    let inner = t.builder.module().types[ty].inner.clone();
    match inner {
        TypeInner::Pointer { pointee, .. } => format!("{}*", spir_type_name(t, pointee)),
        TypeInner::Vector { elem, len } => format!("{}{}", spir_type_name(t, elem), len),
        TypeInner::Array { elem, .. } => format!("{}[]", spir_type_name(t, elem)),
        TypeInner::Struct { .. } => t.builder.module().types[ty]
            .name
            .clone()
            .unwrap_or_else(|| "struct".to_string()),
        TypeInner::Image { kind } => match kind {
            crate::ir::types::ImageKind::Image1D => "image1d_t",
            crate::ir::types::ImageKind::Image1DArray => "image1d_array_t",
            crate::ir::types::ImageKind::Image1DBuffer => "image1d_buffer_t",
            crate::ir::types::ImageKind::Image2D => "image2d_t",
            crate::ir::types::ImageKind::Image2DArray => "image2d_array_t",
            crate::ir::types::ImageKind::Image3D => "image3d_t",
        }
        .to_string(),
        TypeInner::Event => "event_t".to_string(),
        TypeInner::Sampler => "sampler_t".to_string(),
        TypeInner::Int { width: 1, .. } => "bool".to_string(),
        TypeInner::Int { width, signed } => match (width, signed) {
            (8, true) => "char",
            (8, false) => "uchar",
            (16, true) => "short",
            (16, false) => "ushort",
            (32, true) => "int",
            (32, false) => "uint",
            (64, true) => "long",
            (64, false) => "ulong",
            _ => "int",
        }
        .to_string(),
        TypeInner::Float { width: 16 } => "half".to_string(),
        TypeInner::Float { width: 64 } => "double".to_string(),
        TypeInner::Float { .. } => "float".to_string(),
        TypeInner::Void => "void".to_string(),
        TypeInner::Opaque { name } => name,
        TypeInner::Function { .. } => "?".to_string(),
    }
}

fn synthesize_kernel_wrapper(
    t: &mut Translator<'_>,
    wrapper: crate::ir::FunctionId,
    body: crate::ir::FunctionId,
) -> Result<()> {
    let param_count = t.builder.module().functions[body].params.len();
    let param_names: Vec<Option<String>> = t.builder.module().functions[body]
        .params
        .iter()
        .map(|p| p.name.clone())
        .collect();
    t.builder.set_params(wrapper, param_names);

    let mut meta = KernelArgMetadata::default();
    for i in 0..param_count {
        let param = t.builder.module().functions[body].params[i].clone();
        let addr_space = match t.builder.module().types[param.ty].inner {
            TypeInner::Pointer { addr_space, .. } => addr_space,
            _ => 0,
        };
        let access_qual = if matches!(t.builder.module().types[param.ty].inner, TypeInner::Image { .. }) {
            "read_write".to_string()
        } else {
            "none".to_string()
        };
        let type_name = spir_type_name(t, param.ty);
        meta.addr_space.push(addr_space);
        meta.access_qual.push(access_qual);
        meta.ty.push(type_name.clone());
        meta.base_ty.push(type_name);
        meta.type_qual.push(String::new());
        meta.name.push(param.name.clone().unwrap_or_default());
        t.builder.set_param_attrs(wrapper, i as u32, vec![ParamAttr::NoUndef]);
    }
    debug_assert!(meta.lengths_match());
    t.builder.module_mut().functions[wrapper].kernel_arg_metadata = Some(meta);

    let block = t.builder.append_block(wrapper);
    let args: Vec<ValueRef> = (0..param_count as u32).map(ValueRef::Param).collect();
    let ret_ty = match &t.builder.module().types[t.builder.module().functions[wrapper].ty].inner {
        TypeInner::Function { ret, .. } => *ret,
        _ => t.builder.void_type(),
    };
    let void_ty = t.builder.void_type();
    let callee_name = t.builder.module().functions[body].name.clone();
    t.builder.insert(
        wrapper,
        block,
        ret_ty,
        Op::Call {
            callee: callee_name,
            args,
            attrs: CallAttrFlags::empty(),
        },
    );
    t.builder.insert(wrapper, block, void_ty, Op::Ret { value: None });
    t.builder.mark_defined(wrapper);
    Ok(())
}

pub fn translate_function_call(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let callee_id = cursor.next_id()?;
    let mut arg_ids = Vec::new();
    while !cursor.is_empty() {
        arg_ids.push(cursor.next_id()?);
    }
    let result_ty = t.state.require_type(result_type_id)?;
    let mut args = Vec::with_capacity(arg_ids.len());
    for id in &arg_ids {
        args.push(t.state.require_value(*id)?);
    }

    let callee = if let Some(binding) = t.state.binding_of(callee_id) {
        binding.as_function().ok_or_else(|| ErrorKind::MalformedInstruction {
            op: record.op(),
            reason: "OpFunctionCall callee operand is not a function",
        })?
    } else if let Some(&placeholder) = t.state.forward_function_refs.get(&callee_id) {
        placeholder
    } else {
        // First forward reference to this callee: synthesize a
        // placeholder whose type matches this call site (spec.md
        // §4.1.4); `translate_function` renames and rewires it in place
        // once the real `OpFunction` is seen.
        let arg_types: Vec<_> = args.iter().map(|arg| t.value_type(*arg)).collect();
        let fn_ty = t.builder.function_type(arg_types, result_ty);
        let name = format!("_forward_fn_{}", callee_id.get());
        let placeholder = t.builder.declare_function(name, fn_ty, CallingConv::SpirFunc);
        t.state.forward_function_refs.insert(callee_id, placeholder);
        t.state.declare(callee_id, spirv::Op::Function);
        placeholder
    };

    let callee_name = t.builder.module().functions[callee].name.clone();
    let instr = t.insert(
        result_ty,
        Op::Call {
            callee: callee_name,
            args,
            attrs: CallAttrFlags::empty(),
        },
    )?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}
