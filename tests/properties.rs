//! Quantified invariants, round-trip properties, and boundary behaviors
//! from spec.md §8.

mod common;

use common::{device, rec, run, string_words};
use spirvll_core::device::AddressingModel;
use spirvll_core::error::ErrorKind;
use spirvll_core::id::SpvId;
use spirvll_core::ir::function::ScalarHint;
use spirvll_core::ir::instr::Op;
use spirvll_core::ir::values::ConstantValue;
use spirvll_core::state::Binding;

fn id(raw: u32) -> SpvId {
    SpvId::new(raw).unwrap()
}

fn int_kernel(width: u32) -> (spirvll_core::device::DeviceDescriptor, Vec<spirvll_core::opcode::OpcodeRecord>) {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeInt, vec![1, width, 0]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 4]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::IAdd, vec![1, 7, 4, 5]),
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    (dev, records)
}

/// Boundary: every integer width the SPIR-V core type system allows
/// round-trips through a binary arithmetic op.
#[test]
fn int_widths_round_trip_through_arithmetic() {
    for width in [1u32, 8, 16, 32, 64] {
        let (dev, records) = int_kernel(width);
        let module = run(&dev, records).unwrap_or_else(|e| panic!("width {} failed: {:?}", width, e));
        let func_id = module.function_by_name("_unnamed_fn_3").unwrap();
        let func = &module.functions[func_id];
        let block = func.block_order[0];
        let has_add = func.blocks[block]
            .instructions
            .iter()
            .any(|h| matches!(&func.instructions[*h].op, Op::BinOp { op, .. } if *op == "add"));
        assert!(has_add, "width {} should lower IAdd to a BinOp", width);
    }
}

/// Quantified invariant: a recognized-but-unsupported opcode always
/// fails rather than leaving a partial translation, and never binds a
/// result id.
#[test]
fn unsupported_opcode_never_partially_binds() {
    let dev = device(&[], AddressingModel::Logical, 64);
    let records = vec![rec(spirv::Op::TypeQueue, vec![1])];
    let err = run(&dev, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedOpcode(spirv::Op::TypeQueue));
}

/// Quantified invariant: an operand id that was never bound surfaces
/// `ForwardReferenceUnresolved` rather than panicking.
#[test]
fn unbound_operand_is_a_forward_reference_error() {
    let dev = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        // %99 was never declared.
        rec(spirv::Op::ReturnValue, vec![99]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let err = run(&dev, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ForwardReferenceUnresolved(id(99)));
}

/// Quantified invariant: a forward function reference that is never
/// resolved by module end is reported, not silently dropped.
#[test]
fn unresolved_forward_function_reference_errors_at_module_end() {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeInt, vec![1, 32, 0]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![5]),
        // Calls %4, a function that is never defined.
        rec(spirv::Op::FunctionCall, vec![1, 6, 4]),
        rec(spirv::Op::ReturnValue, vec![6]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let err = run(&dev, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ForwardReferenceUnresolved(id(4)));
}

/// Quantified invariant: a kernel entry point's six kernel_arg_*
/// metadata arrays all have the same length as its parameter count.
#[test]
fn kernel_arg_metadata_arrays_match_param_count() {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeInt, vec![2, 32, 0]),
        rec(spirv::Op::TypePointer, vec![3, spirv::StorageClass::CrossWorkgroup as u32, 2]),
        rec(spirv::Op::TypeFunction, vec![4, 1, 3, 3]),
        {
            let mut words = vec![spirv::ExecutionModel::Kernel as u32, 5];
            words.extend(string_words("k"));
            rec(spirv::Op::EntryPoint, words)
        },
        rec(spirv::Op::Function, vec![1, 5, 0, 4]),
        rec(spirv::Op::FunctionParameter, vec![3, 6]),
        rec(spirv::Op::FunctionParameter, vec![3, 7]),
        rec(spirv::Op::Label, vec![8]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let module = run(&dev, records).expect("translation should succeed");
    let wrapper_id = module.function_by_name("k").unwrap();
    let arg_meta = module.functions[wrapper_id].kernel_arg_metadata.as_ref().unwrap();
    assert!(arg_meta.lengths_match());
    assert_eq!(arg_meta.addr_space.len(), 2);
}

/// Boundary: `LocalSize(1,1,1)` yields `reqd_work_group_size = [1,1,1]`.
#[test]
fn local_size_one_one_one_round_trips() {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        {
            let mut words = vec![spirv::ExecutionModel::Kernel as u32, 3];
            words.extend(string_words("k"));
            rec(spirv::Op::EntryPoint, words)
        },
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::LocalSize as u32, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let module = run(&dev, records).expect("translation should succeed");
    let wrapper_id = module.function_by_name("k").unwrap();
    let meta = module.functions[wrapper_id].kernel_metadata.as_ref().unwrap();
    assert_eq!(meta.reqd_work_group_size, Some((1, 1, 1)));
}

/// Boundary: `VecTypeHint` with data-type code 5 (float) and component
/// count 4 decodes to a float4 hint.
#[test]
fn vec_type_hint_decodes_float4() {
    let packed = (5u32) | (4u32 << 16);
    assert_eq!(ScalarHint::decode(packed), Some((ScalarHint::F32, 4)));

    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        {
            let mut words = vec![spirv::ExecutionModel::Kernel as u32, 3];
            words.extend(string_words("k"));
            rec(spirv::Op::EntryPoint, words)
        },
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::VecTypeHint as u32, packed]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let module = run(&dev, records).expect("translation should succeed");
    let wrapper_id = module.function_by_name("k").unwrap();
    let meta = module.functions[wrapper_id].kernel_metadata.as_ref().unwrap();
    assert_eq!(meta.vec_type_hint, Some((ScalarHint::F32, 4)));
}

/// Boundary: Logical addressing at 32 vs 64 bits selects the matching
/// data layout string.
#[test]
fn logical_addressing_selects_data_layout_by_bit_width() {
    for bits in [32u8, 64] {
        let dev = device(&[], AddressingModel::Logical, bits);
        let records = vec![rec(
            spirv::Op::MemoryModel,
            vec![spirv::AddressingModel::Logical as u32, spirv::MemoryModel::OpenCL as u32],
        )];
        let module = run(&dev, records).expect("translation should succeed");
        assert!(module.data_layout.contains(&format!("p:{}:{}", bits, bits)), "bits {}: {}", bits, module.data_layout);
    }
}

/// Boundary: `OpSpecConstant` with no specialization provider keeps the
/// literal default (the no-provider half of spec.md §8 Scenario D,
/// generalized across widths).
#[test]
fn spec_constant_without_provider_keeps_literal_default() {
    let dev = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::Decorate, vec![2, spirv::Decoration::SpecId as u32, 7]),
        rec(spirv::Op::TypeInt, vec![1, 16, 0]),
        rec(spirv::Op::SpecConstant, vec![1, 2, 1234]),
    ];
    let (module, state) = common::run_with_spec_info(&dev, records, None).expect("translation should succeed");
    match state.binding_of(id(2)) {
        Some(Binding::Constant(c)) => assert_eq!(module.constants[c].value, ConstantValue::Int(1234)),
        other => panic!("expected a bound constant, got {:?}", other),
    }
}

/// Round-trip: `OpConstantNull` produces the same `ConstantValue::Zero`
/// shape a directly-synthesized zero constant would, and survives a
/// store/load round trip as the same pointee type.
#[test]
fn constant_null_round_trips_through_store_and_load() {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeInt, vec![2, 32, 0]),
        rec(spirv::Op::TypePointer, vec![3, spirv::StorageClass::Function as u32, 2]),
        rec(spirv::Op::TypeFunction, vec![4, 1]),
        rec(spirv::Op::ConstantNull, vec![2, 5]),
        rec(spirv::Op::Function, vec![1, 6, 0, 4]),
        rec(spirv::Op::Label, vec![7]),
        rec(spirv::Op::Variable, vec![3, 8, spirv::StorageClass::Function as u32]),
        rec(spirv::Op::Store, vec![8, 5]),
        rec(spirv::Op::Load, vec![2, 9, 8]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let (module, state) = common::run_with_spec_info(&dev, records, None).expect("translation should succeed");
    let null_const = match state.binding_of(id(5)) {
        Some(Binding::Constant(c)) => c,
        other => panic!("expected a bound constant, got {:?}", other),
    };
    assert_eq!(module.constants[null_const].value, ConstantValue::Zero);

    let func_id = module.function_by_name("_unnamed_fn_6").unwrap();
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let has_store = func.blocks[block]
        .instructions
        .iter()
        .any(|h| matches!(&func.instructions[*h].op, Op::Store { .. }));
    let has_load = func.blocks[block]
        .instructions
        .iter()
        .any(|h| matches!(&func.instructions[*h].op, Op::Load { .. }));
    assert!(has_store && has_load);
}

/// Round-trip: `OpSource` with no code-producing opcodes before the
/// next real instruction leaves the function body unaffected.
#[test]
fn source_with_no_intervening_code_is_a_no_op() {
    let dev = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let with_source = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        // SourceLanguage::OpenCL_C == 3 per the SPIR-V spec's fixed table.
        rec(spirv::Op::Source, vec![3, 200]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let without_source = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];
    let a = run(&dev, with_source).expect("translation should succeed");
    let b = run(&dev, without_source).expect("translation should succeed");

    let fa = &a.functions[a.function_by_name("_unnamed_fn_3").unwrap()];
    let fb = &b.functions[b.function_by_name("_unnamed_fn_3").unwrap()];
    assert_eq!(fa.block_order.len(), fb.block_order.len());
    let ba = fa.block_order[0];
    let bb = fb.block_order[0];
    assert_eq!(fa.blocks[ba].instructions.len(), fb.blocks[bb].instructions.len());
    assert!(matches!(fa.instructions[fa.blocks[ba].instructions[0]].op, Op::Ret { value: None }));
    assert!(matches!(fb.instructions[fb.blocks[bb].instructions[0]].op, Op::Ret { value: None }));
}
