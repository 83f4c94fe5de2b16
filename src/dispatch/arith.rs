//! spec.md §4.1.6: arithmetic, bitwise, logical, comparison, and cast
//! opcodes. One dispatch function handles the whole family; most cases
//! are a direct `Op::BinOp`/`Op::ICmp`/`Op::FCmp`, with a handful of
//! math-library and bit-manipulation opcodes lowered to mangled calls or
//! short instruction sequences (spec.md §4.1.6, grounded in
//! `original_source/modules/compiler/spirv-ll/source/builder_core.cpp`).

use super::Translator;
use crate::backend::mangle::{ItaniumMangler, MangleArg, Mangler};
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::instr::{CallAttrFlags, FloatPredicate, IntPredicate, Op, WrapFlags};
use crate::ir::types::TypeInner;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

fn wrap_flags(t: &Translator<'_>, result: SpvId) -> WrapFlags {
    let mut flags = WrapFlags::empty();
    if t.state.decorations.has(result, spirv::Decoration::NoSignedWrap) {
        flags |= WrapFlags::NO_SIGNED_WRAP;
    }
    if t.state.decorations.has(result, spirv::Decoration::NoUnsignedWrap) {
        flags |= WrapFlags::NO_UNSIGNED_WRAP;
    }
    flags
}

struct Binary {
    result_type: SpvId,
    result: SpvId,
    lhs: SpvId,
    rhs: SpvId,
    op: spirv::Op,
}

fn read_binary(record: &OpcodeRecord) -> Result<Binary> {
    let mut cursor = record.cursor();
    Ok(Binary {
        result_type: cursor.next_id()?,
        result: cursor.next_id()?,
        lhs: cursor.next_id()?,
        rhs: cursor.next_id()?,
        op: record.op(),
    })
}

fn emit_binop(
    t: &mut Translator<'_>,
    bin: &Binary,
    op_name: &'static str,
    wrap: WrapFlags,
) -> Result<()> {
    let ty = t.state.require_type(bin.result_type)?;
    let lhs = t.state.require_value(bin.lhs)?;
    let rhs = t.state.require_value(bin.rhs)?;
    let instr = t.insert(ty, Op::BinOp { op: op_name, lhs, rhs, wrap })?;
    t.state.bind(bin.result, bin.op, Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn emit_icmp(t: &mut Translator<'_>, bin: &Binary, pred: IntPredicate) -> Result<()> {
    let ty = t.state.require_type(bin.result_type)?;
    let lhs = t.state.require_value(bin.lhs)?;
    let rhs = t.state.require_value(bin.rhs)?;
    let instr = t.insert(ty, Op::ICmp { pred, lhs, rhs })?;
    t.state.bind(bin.result, bin.op, Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn emit_fcmp(t: &mut Translator<'_>, bin: &Binary, pred: FloatPredicate) -> Result<()> {
    let ty = t.state.require_type(bin.result_type)?;
    let lhs = t.state.require_value(bin.lhs)?;
    let rhs = t.state.require_value(bin.rhs)?;
    let instr = t.insert(ty, Op::FCmp { pred, lhs, rhs })?;
    t.state.bind(bin.result, bin.op, Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

/// Mangled call to an OpenCL math-library builtin taking `operand`
/// repeated `arity` times, all of `result_type`'s mangled spelling
/// (spec.md §4.3). Does not bind the call's result to any SPIR-V id;
/// used both directly and by [`emit_math_call`] when a second builtin
/// call needs to consume the first one's result (e.g. `OpFMod`'s
/// `copysign` correction).
fn math_call(
    t: &mut Translator<'_>,
    result_type: crate::ir::types::TypeId,
    name: &str,
    args: Vec<ValueRef>,
) -> Result<ValueRef> {
    let mangler = ItaniumMangler;
    let ty = t.builder.module().types[result_type].clone();
    let mangled_ty = mangler.mangled_type_resolved(t.builder.module(), &ty, MangleArg::default());
    let mut mangled = mangler.mangled_length_prefix(name);
    for _ in &args {
        mangled.push_str(&mangled_ty);
    }
    let instr = t.insert(result_type, Op::Call { callee: mangled, args, attrs: CallAttrFlags::empty() })?;
    Ok(ValueRef::Instr(instr))
}

fn emit_math_call(
    t: &mut Translator<'_>,
    op: spirv::Op,
    result: SpvId,
    result_type: crate::ir::types::TypeId,
    name: &str,
    args: Vec<ValueRef>,
) -> Result<ValueRef> {
    let value = math_call(t, result_type, name, args)?;
    t.state.bind(result, op, Binding::Value(value));
    Ok(value)
}

pub fn translate_arith(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    match record.op() {
        IAdd => {
            let bin = read_binary(record)?;
            let wrap = wrap_flags(t, bin.result);
            emit_binop(t, &bin, "add", wrap)
        }
        ISub => {
            let bin = read_binary(record)?;
            let wrap = wrap_flags(t, bin.result);
            emit_binop(t, &bin, "sub", wrap)
        }
        IMul => {
            let bin = read_binary(record)?;
            let wrap = wrap_flags(t, bin.result);
            emit_binop(t, &bin, "mul", wrap)
        }
        UDiv => emit_binop(t, &read_binary(record)?, "udiv", WrapFlags::empty()),
        SDiv => emit_binop(t, &read_binary(record)?, "sdiv", WrapFlags::empty()),
        UMod => emit_binop(t, &read_binary(record)?, "urem", WrapFlags::empty()),
        SRem => emit_binop(t, &read_binary(record)?, "srem", WrapFlags::empty()),
        SMod => translate_smod(t, record),
        FAdd => emit_binop(t, &read_binary(record)?, "fadd", WrapFlags::empty()),
        FSub => emit_binop(t, &read_binary(record)?, "fsub", WrapFlags::empty()),
        FMul => emit_binop(t, &read_binary(record)?, "fmul", WrapFlags::empty()),
        FDiv => emit_binop(t, &read_binary(record)?, "fdiv", WrapFlags::empty()),
        FRem => {
            let bin = read_binary(record)?;
            let ty = t.state.require_type(bin.result_type)?;
            let lhs = t.state.require_value(bin.lhs)?;
            let rhs = t.state.require_value(bin.rhs)?;
            emit_math_call(t, FRem, bin.result, ty, "fmod", vec![lhs, rhs]).map(|_| ())
        }
        FMod => {
            let bin = read_binary(record)?;
            let ty = t.state.require_type(bin.result_type)?;
            let lhs = t.state.require_value(bin.lhs)?;
            let rhs = t.state.require_value(bin.rhs)?;
            // `fmod` alone takes its result's sign from `lhs`; OpFMod's
            // result must take it from `rhs` instead, so the fmod call is
            // followed by a copysign correction (builder_core.cpp's
            // `Builder::create<OpFMod>`).
            let rem = math_call(t, ty, "fmod", vec![lhs, rhs])?;
            emit_math_call(t, FMod, bin.result, ty, "copysign", vec![rem, rhs]).map(|_| ())
        }
        ShiftLeftLogical => emit_binop(t, &read_binary(record)?, "shl", WrapFlags::empty()),
        ShiftRightLogical => emit_binop(t, &read_binary(record)?, "lshr", WrapFlags::empty()),
        ShiftRightArithmetic => emit_binop(t, &read_binary(record)?, "ashr", WrapFlags::empty()),
        BitwiseAnd | LogicalAnd => emit_binop(t, &read_binary(record)?, "and", WrapFlags::empty()),
        BitwiseOr | LogicalOr => emit_binop(t, &read_binary(record)?, "or", WrapFlags::empty()),
        BitwiseXor => emit_binop(t, &read_binary(record)?, "xor", WrapFlags::empty()),
        LogicalEqual | IEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Eq),
        LogicalNotEqual | INotEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Ne),
        UGreaterThan => emit_icmp(t, &read_binary(record)?, IntPredicate::Ugt),
        UGreaterThanEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Uge),
        ULessThan => emit_icmp(t, &read_binary(record)?, IntPredicate::Ult),
        ULessThanEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Ule),
        SGreaterThan => emit_icmp(t, &read_binary(record)?, IntPredicate::Sgt),
        SGreaterThanEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Sge),
        SLessThan => emit_icmp(t, &read_binary(record)?, IntPredicate::Slt),
        SLessThanEqual => emit_icmp(t, &read_binary(record)?, IntPredicate::Sle),
        FOrdEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::OEq),
        FOrdNotEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::ONe),
        FOrdLessThan => emit_fcmp(t, &read_binary(record)?, FloatPredicate::OLt),
        FOrdGreaterThan => emit_fcmp(t, &read_binary(record)?, FloatPredicate::OGt),
        FOrdLessThanEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::OLe),
        FOrdGreaterThanEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::OGe),
        FUnordEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::UEq),
        FUnordNotEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::UNe),
        FUnordLessThan => emit_fcmp(t, &read_binary(record)?, FloatPredicate::ULt),
        FUnordGreaterThan => emit_fcmp(t, &read_binary(record)?, FloatPredicate::UGt),
        FUnordLessThanEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::ULe),
        FUnordGreaterThanEqual => emit_fcmp(t, &read_binary(record)?, FloatPredicate::UGe),
        LogicalNot | Not => translate_complement(t, record),
        SConvert | UConvert => translate_int_cast(t, record, record.op() == SConvert),
        SatConvertSToU | SatConvertUToS => translate_int_cast(t, record, record.op() == SatConvertSToU),
        FConvert => translate_simple_cast(t, record, |value| Op::FloatCast { value }),
        ConvertFToS => translate_simple_cast(t, record, |value| Op::FpToInt { value, signed: true, saturating: false }),
        ConvertFToU => translate_simple_cast(t, record, |value| Op::FpToInt { value, signed: false, saturating: false }),
        ConvertSToF => translate_simple_cast(t, record, |value| Op::IntToFp { value, signed: true }),
        ConvertUToF => translate_simple_cast(t, record, |value| Op::IntToFp { value, signed: false }),
        ConvertPtrToU => translate_simple_cast(t, record, |value| Op::PtrToInt { value }),
        ConvertUToPtr => translate_simple_cast(t, record, |value| Op::IntToPtr { value }),
        Bitcast => translate_simple_cast(t, record, |value| Op::Bitcast { value }),
        QuantizeToF16 => translate_simple_cast(t, record, |value| Op::FloatCast { value }),
        VectorTimesScalar => translate_vector_times_scalar(t, record),
        Dot => translate_dot(t, record),
        IAddCarry => translate_extended_op(t, record, "llvm_uadd_with_overflow"),
        ISubBorrow => translate_extended_op(t, record, "llvm_usub_with_overflow"),
        UMulExtended => translate_extended_op(t, record, "llvm_umul_extended"),
        SMulExtended => translate_extended_op(t, record, "llvm_smul_extended"),
        Any => translate_any_all(t, record, "any"),
        All => translate_any_all(t, record, "all"),
        IsNan => translate_unary_math_call(t, record, "isnan"),
        IsInf => translate_unary_math_call(t, record, "isinf"),
        IsFinite => translate_unary_math_call(t, record, "isfinite"),
        IsNormal => translate_unary_math_call(t, record, "isnormal"),
        SignBitSet => translate_unary_math_call(t, record, "signbit"),
        LessOrGreater => translate_binary_math_call(t, record, "islessgreater"),
        Ordered => translate_binary_math_call(t, record, "isordered"),
        Unordered => translate_binary_math_call(t, record, "isunordered"),
        BitFieldInsert => translate_bitfield_insert(t, record),
        BitFieldSExtract => translate_bitfield_extract(t, record, true),
        BitFieldUExtract => translate_bitfield_extract(t, record, false),
        BitCount => translate_unary_math_call(t, record, "popcount"),
        BitReverse => translate_unary_math_call(t, record, "bitreverse"),
        Select => translate_select(t, record),
        SNegate => translate_negate(t, record, false),
        FNegate => translate_negate(t, record, true),
        other => Err(ErrorKind::UnsupportedOpcode(other).into()),
    }
}

/// `OpSMod`: a sign-following (floor) integer modulo, which has no direct
/// `srem`-alone encoding. Lowered as `builder_core.cpp`'s
/// `Builder::create<OpSMod>` does: `cmp = denom < 0`,
/// `absDenom = select(cmp, -denom, denom)`, `sRem = srem(num, denom)`,
/// `result = select(cmp, sRem + absDenom, sRem)`.
fn translate_smod(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let bin = read_binary(record)?;
    let ty = t.state.require_type(bin.result_type)?;
    let num = t.state.require_value(bin.lhs)?;
    let denom = t.state.require_value(bin.rhs)?;
    let bool_ty = t.builder.int_type(1, false);
    let zero = ValueRef::Const(t.builder.const_zero(ty));

    let cmp = t.insert(bool_ty, Op::ICmp { pred: IntPredicate::Slt, lhs: denom, rhs: zero })?;
    let cmp = ValueRef::Instr(cmp);
    let neg_denom = t.insert(ty, Op::BinOp { op: "sub", lhs: zero, rhs: denom, wrap: WrapFlags::empty() })?;
    let abs_denom = t.insert(ty, Op::Select { cond: cmp, if_true: ValueRef::Instr(neg_denom), if_false: denom })?;
    let abs_denom = ValueRef::Instr(abs_denom);
    let srem = t.insert(ty, Op::BinOp { op: "srem", lhs: num, rhs: denom, wrap: WrapFlags::empty() })?;
    let srem = ValueRef::Instr(srem);
    let srem_plus_abs = t.insert(ty, Op::BinOp { op: "add", lhs: srem, rhs: abs_denom, wrap: WrapFlags::empty() })?;
    let instr = t.insert(ty, Op::Select { cond: cmp, if_true: ValueRef::Instr(srem_plus_abs), if_false: srem })?;
    t.state.bind(bin.result, bin.op, Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_complement(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let all_ones = match &t.builder.module().types[ty].inner {
        TypeInner::Int { width, .. } => {
            let mask = if *width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
            ValueRef::Const(t.builder.const_int(ty, mask))
        }
        _ => ValueRef::Const(t.builder.const_int(ty, u64::MAX)),
    };
    let instr = t.insert(ty, Op::BinOp { op: "xor", lhs: value, rhs: all_ones, wrap: WrapFlags::empty() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn int_width(t: &Translator<'_>, ty: crate::ir::types::TypeId) -> u32 {
    match &t.builder.module().types[ty].inner {
        TypeInner::Int { width, .. } => *width,
        TypeInner::Vector { elem, .. } => int_width(t, *elem),
        _ => 32,
    }
}

fn translate_int_cast(t: &mut Translator<'_>, record: &OpcodeRecord, signed: bool) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let src_ty = t.value_type(value);
    let truncating = int_width(t, src_ty) > int_width(t, ty);
    let instr = t.insert(ty, Op::IntCast { value, signed, truncating })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_simple_cast(
    t: &mut Translator<'_>,
    record: &OpcodeRecord,
    make: impl FnOnce(ValueRef) -> Op,
) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let instr = t.insert(ty, make(value))?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_vector_times_scalar(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let vector_id = cursor.next_id()?;
    let scalar_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let vector = t.state.require_value(vector_id)?;
    let scalar = t.state.require_value(scalar_id)?;
    let len = match &t.builder.module().types[ty].inner {
        TypeInner::Vector { len, .. } => *len,
        _ => 1,
    };
    let splat_ty = ty;
    // `b` is unused by a splat mask (every lane reads from `a`); passed
    // through so the backend's shuffle lowering sees a well-formed pair.
    let splat = t.insert(
        splat_ty,
        Op::ShuffleVector { a: scalar, b: scalar, mask: vec![Some(0); len as usize] },
    )?;
    let instr = t.insert(
        ty,
        Op::BinOp {
            op: "fmul",
            lhs: vector,
            rhs: ValueRef::Instr(splat),
            wrap: WrapFlags::empty(),
        },
    )?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_dot(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let lhs_id = cursor.next_id()?;
    let rhs_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let lhs = t.state.require_value(lhs_id)?;
    let rhs = t.state.require_value(rhs_id)?;
    let lhs_ty = t.value_type(lhs);
    let mangler = ItaniumMangler;
    let lhs_ty_val = t.builder.module().types[lhs_ty].clone();
    let mangled_arg = mangler.mangled_type_resolved(t.builder.module(), &lhs_ty_val, MangleArg::default());
    let mut mangled = mangler.mangled_length_prefix("dot");
    mangled.push_str(&mangled_arg);
    mangled.push_str(&mangled_arg);
    let instr = t.insert(ty, Op::Call { callee: mangled, args: vec![lhs, rhs], attrs: CallAttrFlags::empty() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

/// `OpIAddCarry`/`OpISubBorrow`/`OpUMulExtended`/`OpSMulExtended` all
/// produce a two-member struct result; the real backend lowers the
/// named helper to the matching LLVM overflow intrinsic
/// (`builder_core.cpp`'s arithmetic-with-overflow handling).
fn translate_extended_op(t: &mut Translator<'_>, record: &OpcodeRecord, name: &str) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let lhs_id = cursor.next_id()?;
    let rhs_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let lhs = t.state.require_value(lhs_id)?;
    let rhs = t.state.require_value(rhs_id)?;
    let instr = t.insert(ty, Op::Call { callee: name.to_string(), args: vec![lhs, rhs], attrs: CallAttrFlags::empty() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_any_all(t: &mut Translator<'_>, record: &OpcodeRecord, name: &str) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let operand_ty = t.value_type(value);
    let len = match &t.builder.module().types[operand_ty].inner {
        TypeInner::Vector { len, .. } => *len,
        _ => 1,
    };
    let mangler = ItaniumMangler;
    let mangled = mangler.mangle_any_all(name, len);
    let instr = t.insert(ty, Op::Call { callee: mangled, args: vec![value], attrs: CallAttrFlags::empty() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_unary_math_call(t: &mut Translator<'_>, record: &OpcodeRecord, name: &str) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    emit_math_call(t, record.op(), result, ty, name, vec![value]).map(|_| ())
}

fn translate_binary_math_call(t: &mut Translator<'_>, record: &OpcodeRecord, name: &str) -> Result<()> {
    let bin = read_binary(record)?;
    let ty = t.state.require_type(bin.result_type)?;
    let lhs = t.state.require_value(bin.lhs)?;
    let rhs = t.state.require_value(bin.rhs)?;
    emit_math_call(t, bin.op, bin.result, ty, name, vec![lhs, rhs]).map(|_| ())
}

fn const_u32(t: &mut Translator<'_>, ty: crate::ir::types::TypeId, value: u32) -> ValueRef {
    ValueRef::Const(t.builder.const_int(ty, value as u64))
}

fn translate_bitfield_insert(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let base_id = cursor.next_id()?;
    let insert_id = cursor.next_id()?;
    let offset_id = cursor.next_id()?;
    let count_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let base = t.state.require_value(base_id)?;
    let insert = t.state.require_value(insert_id)?;
    let offset = t.state.require_value(offset_id)?;
    let count = t.state.require_value(count_id)?;
    let width = int_width(t, ty);

    let one = const_u32(t, ty, 1);
    let mask_unshifted = t.insert(ty, Op::BinOp { op: "shl", lhs: one, rhs: count, wrap: WrapFlags::empty() })?;
    let full_mask = const_u32(t, ty, u32::MAX >> (32 - width.min(32)));
    let low_mask = t.insert(
        ty,
        Op::BinOp {
            op: "sub",
            lhs: ValueRef::Instr(mask_unshifted),
            rhs: const_u32(t, ty, 1),
            wrap: WrapFlags::empty(),
        },
    )?;
    let shifted_mask = t.insert(
        ty,
        Op::BinOp { op: "shl", lhs: ValueRef::Instr(low_mask), rhs: offset, wrap: WrapFlags::empty() },
    )?;
    let not_mask = t.insert(
        ty,
        Op::BinOp { op: "xor", lhs: ValueRef::Instr(shifted_mask), rhs: full_mask, wrap: WrapFlags::empty() },
    )?;
    let cleared = t.insert(
        ty,
        Op::BinOp { op: "and", lhs: base, rhs: ValueRef::Instr(not_mask), wrap: WrapFlags::empty() },
    )?;
    let shifted_insert = t.insert(
        ty,
        Op::BinOp { op: "shl", lhs: insert, rhs: offset, wrap: WrapFlags::empty() },
    )?;
    let masked_insert = t.insert(
        ty,
        Op::BinOp {
            op: "and",
            lhs: ValueRef::Instr(shifted_insert),
            rhs: ValueRef::Instr(shifted_mask),
            wrap: WrapFlags::empty(),
        },
    )?;
    let instr = t.insert(
        ty,
        Op::BinOp {
            op: "or",
            lhs: ValueRef::Instr(cleared),
            rhs: ValueRef::Instr(masked_insert),
            wrap: WrapFlags::empty(),
        },
    )?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_bitfield_extract(t: &mut Translator<'_>, record: &OpcodeRecord, signed: bool) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let base_id = cursor.next_id()?;
    let offset_id = cursor.next_id()?;
    let count_id = cursor.next_id()?;

    let ty = t.state.require_type(result_type_id)?;
    let base = t.state.require_value(base_id)?;
    let offset = t.state.require_value(offset_id)?;
    let count = t.state.require_value(count_id)?;
    let width = int_width(t, ty);

    let width_const = const_u32(t, ty, width);
    let left_shift_amount = t.insert(
        ty,
        Op::BinOp { op: "sub", lhs: width_const, rhs: offset, wrap: WrapFlags::empty() },
    )?;
    let left_shift_amount = t.insert(
        ty,
        Op::BinOp { op: "sub", lhs: ValueRef::Instr(left_shift_amount), rhs: count, wrap: WrapFlags::empty() },
    )?;
    let shifted_left = t.insert(
        ty,
        Op::BinOp { op: "shl", lhs: base, rhs: ValueRef::Instr(left_shift_amount), wrap: WrapFlags::empty() },
    )?;
    let shifted_right = t.insert(
        ty,
        Op::BinOp {
            op: if signed { "ashr" } else { "lshr" },
            lhs: ValueRef::Instr(shifted_left),
            rhs: width_const,
            wrap: WrapFlags::empty(),
        },
    )?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(shifted_right)));
    Ok(())
}

fn translate_select(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let cond_id = cursor.next_id()?;
    let true_id = cursor.next_id()?;
    let false_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let cond = t.state.require_value(cond_id)?;
    let if_true = t.state.require_value(true_id)?;
    let if_false = t.state.require_value(false_id)?;
    let instr = t.insert(ty, Op::Select { cond, if_true, if_false })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}

fn translate_negate(t: &mut Translator<'_>, record: &OpcodeRecord, float: bool) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result = cursor.next_id()?;
    let operand_id = cursor.next_id()?;
    let ty = t.state.require_type(result_type_id)?;
    let value = t.state.require_value(operand_id)?;
    let zero = ValueRef::Const(t.builder.const_zero(ty));
    let op_name = if float { "fsub" } else { "sub" };
    let instr = t.insert(ty, Op::BinOp { op: op_name, lhs: zero, rhs: value, wrap: WrapFlags::empty() })?;
    t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
    Ok(())
}
