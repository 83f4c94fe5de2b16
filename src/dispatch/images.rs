//! spec.md §4.1.10: `OpTypeImage`/`OpTypeSampler` value plumbing, lowered
//! to the OpenCL `read_image`/`write_image`/`get_image_*` builtin family
//! (`original_source/modules/compiler/spirv-ll/source/builder_core.cpp`,
//! `Builder::create<OpSampledImage/OpImageRead/OpImageWrite/...>`).

use super::Translator;
use crate::backend::mangle::{ItaniumMangler, MangleArg, Mangler};
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::instr::{CallAttrFlags, Op};
use crate::ir::types::{ImageKind, TypeId, TypeInner};
use crate::ir::values::{ConstantValue, ValueRef};
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

/// `OpConstantSampler`s are stored as a plain `i32` bit pattern; a real
/// sampler value has to be synthesized through clang's
/// `__translate_sampler_initializer` before it can feed an image builtin.
const SAMPLER_INIT_FN: &str = "__translate_sampler_initializer";

pub fn translate_sampled_image(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let _result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let image_id = cursor.next_id()?;
    let sampler_id = cursor.next_id()?;

    let image = t.state.require_value(image_id)?;
    let mut sampler = t.state.require_value(sampler_id)?;

    if let ValueRef::Const(c) = sampler {
        if matches!(t.builder.module().constants[c].value, ConstantValue::Int(_)) {
            let sampler_ty = t.builder.sampler_type();
            let instr = t.insert(
                sampler_ty,
                Op::Call {
                    callee: SAMPLER_INIT_FN.to_string(),
                    args: vec![sampler],
                    attrs: CallAttrFlags::empty(),
                },
            )?;
            sampler = ValueRef::Instr(instr);
        }
    }

    t.state.sampled_images.insert(result, (image, sampler));
    // `OpSampledImage`'s result id is never itself loaded/stored as a
    // value; it is only ever looked back up through `sampled_images` by
    // `OpImageSample*`/`OpImage`, so no id_table binding is required here
    // beyond the side table above. Declare it so `require_bound` still
    // reports a coherent error if something unexpected references it.
    t.state.declare(result, record.op());
    Ok(())
}

pub fn translate_image_unpack(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let _result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let sampled_image_id = cursor.next_id()?;
    let (image, _sampler) = *t
        .state
        .sampled_images
        .get(&sampled_image_id)
        .ok_or(ErrorKind::ForwardReferenceUnresolved(sampled_image_id))?;
    t.state.bind(result, record.op(), Binding::Value(image));
    Ok(())
}

fn pixel_suffix(t: &Translator<'_>, pixel_ty: TypeId) -> &'static str {
    let elem_ty = match &t.builder.module().types[pixel_ty].inner {
        TypeInner::Vector { elem, .. } => *elem,
        _ => pixel_ty,
    };
    match &t.builder.module().types[elem_ty].inner {
        TypeInner::Float { .. } => "f",
        TypeInner::Int { signed: true, .. } => "i",
        TypeInner::Int { signed: false, .. } => "ui",
        _ => "f",
    }
}

fn image_access_call(
    t: &mut Translator<'_>,
    result: Option<SpvId>,
    op: spirv::Op,
    result_ty: TypeId,
    base_name: &str,
    args: Vec<ValueRef>,
) -> Result<()> {
    let mangler = ItaniumMangler;
    let mut mangled = mangler.mangled_length_prefix(base_name);
    for arg in &args {
        let ty = t.value_type(*arg);
        let resolved = t.builder.module().types[ty].clone();
        mangled.push_str(&mangler.mangled_type_resolved(t.builder.module(), &resolved, MangleArg::default()));
    }
    let instr = t.insert(result_ty, Op::Call { callee: mangled, args, attrs: CallAttrFlags::empty() })?;
    if let Some(result) = result {
        t.state.bind(result, op, Binding::Value(ValueRef::Instr(instr)));
    }
    Ok(())
}

/// A mangled `get_image_*` call taking just the image and returning a
/// scalar, used as a building block for [`translate_image_query_size`];
/// unlike [`image_access_call`] it does not bind a SPIR-V result, since
/// several of these calls may be combined into one vector result first.
fn image_query_scalar_call(t: &mut Translator<'_>, scalar_ty: TypeId, image: ValueRef, name: &str) -> Result<ValueRef> {
    let mangler = ItaniumMangler;
    let mut mangled = mangler.mangled_length_prefix(name);
    let image_ty = t.value_type(image);
    let resolved = t.builder.module().types[image_ty].clone();
    mangled.push_str(&mangler.mangled_type_resolved(t.builder.module(), &resolved, MangleArg::default()));
    let instr = t.insert(scalar_ty, Op::Call { callee: mangled, args: vec![image], attrs: CallAttrFlags::empty() })?;
    Ok(ValueRef::Instr(instr))
}

/// `OpImageQuerySize`/`OpImageQuerySizeLod`: dispatches to the
/// per-dimension `get_image_{width,height,depth}` builtins (plus
/// `get_image_array_size` for an arrayed image type), then assembles the
/// scalar or vector result the same way `builder_core.cpp`'s
/// `Builder::create<OpImageQuerySizeLod>` does (width first, then height,
/// then depth, with the array size always landing in the last component).
fn translate_image_query_size(t: &mut Translator<'_>, result: SpvId, op: spirv::Op, ty: TypeId, image: ValueRef) -> Result<()> {
    let kind = match &t.builder.module().types[t.value_type(image)].inner {
        TypeInner::Image { kind } => *kind,
        _ => {
            return Err(ErrorKind::MalformedInstruction {
                op,
                reason: "OpImageQuerySize(Lod) operand is not an image value",
            }
            .into())
        }
    };
    let (has_height, has_depth, has_array) = match kind {
        ImageKind::Image1D | ImageKind::Image1DBuffer => (false, false, false),
        ImageKind::Image1DArray => (false, false, true),
        ImageKind::Image2D => (true, false, false),
        ImageKind::Image2DArray => (true, false, true),
        ImageKind::Image3D => (true, true, false),
    };
    let scalar_ty = match &t.builder.module().types[ty].inner {
        TypeInner::Vector { elem, .. } => *elem,
        _ => ty,
    };
    let is_vector = matches!(t.builder.module().types[ty].inner, TypeInner::Vector { .. });

    let mut components = vec![image_query_scalar_call(t, scalar_ty, image, "get_image_width")?];
    if has_height {
        components.push(image_query_scalar_call(t, scalar_ty, image, "get_image_height")?);
    }
    if has_depth {
        components.push(image_query_scalar_call(t, scalar_ty, image, "get_image_depth")?);
    }
    if has_array {
        components.push(image_query_scalar_call(t, scalar_ty, image, "get_image_array_size")?);
    }

    let value = if is_vector {
        let mut agg = ValueRef::Poison(ty);
        for (i, component) in components.into_iter().enumerate() {
            let index = ValueRef::Const(t.builder.const_int(t.builder.int_type(32, false), i as u64));
            let instr = t.insert(ty, Op::InsertElement { vector: agg, elem: component, index })?;
            agg = ValueRef::Instr(instr);
        }
        agg
    } else {
        components.into_iter().next().expect("image size query always has a width component")
    };
    t.state.bind(result, op, Binding::Value(value));
    Ok(())
}

pub fn translate_image_op(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    match record.op() {
        ImageSampleExplicitLod => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let sampled_image_id = cursor.next_id()?;
            let coord_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let (image, sampler) = *t
                .state
                .sampled_images
                .get(&sampled_image_id)
                .ok_or(ErrorKind::ForwardReferenceUnresolved(sampled_image_id))?;
            let coord = t.state.require_value(coord_id)?;
            let suffix = pixel_suffix(t, ty);
            image_access_call(t, Some(result), record.op(), ty, &format!("read_image{}", suffix), vec![image, sampler, coord])
        }
        ImageRead => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let coord_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            let coord = t.state.require_value(coord_id)?;
            let suffix = pixel_suffix(t, ty);
            image_access_call(t, Some(result), record.op(), ty, &format!("read_image{}", suffix), vec![image, coord])
        }
        ImageWrite => {
            let mut cursor = record.cursor();
            let image_id = cursor.next_id()?;
            let coord_id = cursor.next_id()?;
            let texel_id = cursor.next_id()?;
            let image = t.state.require_value(image_id)?;
            let coord = t.state.require_value(coord_id)?;
            let texel = t.state.require_value(texel_id)?;
            let texel_ty = t.value_type(texel);
            let suffix = pixel_suffix(t, texel_ty);
            let void_ty = t.builder.void_type();
            image_access_call(t, None, record.op(), void_ty, &format!("write_image{}", suffix), vec![image, coord, texel])
        }
        ImageQuerySize | ImageQuerySizeLod => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let _lod_id = cursor.next_id().ok();
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            translate_image_query_size(t, result, record.op(), ty, image)
        }
        ImageQueryFormat => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            image_access_call(t, Some(result), record.op(), ty, "get_image_channel_data_type", vec![image])
        }
        ImageQueryOrder => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            image_access_call(t, Some(result), record.op(), ty, "get_image_channel_order", vec![image])
        }
        ImageQueryLevels => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            image_access_call(t, Some(result), record.op(), ty, "get_image_num_mip_levels", vec![image])
        }
        ImageQuerySamples => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let image_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let image = t.state.require_value(image_id)?;
            image_access_call(t, Some(result), record.op(), ty, "get_image_num_samples", vec![image])
        }
        other => Err(ErrorKind::UnsupportedOpcode(other).into()),
    }
}
