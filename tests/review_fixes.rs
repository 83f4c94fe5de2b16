//! Coverage added for the maintainer review of arith.rs's sign-following
//! remainder/modulo lowering, OpSwitch's wide-selector literal width,
//! OpGroupBroadcast's vector mangling, MaxWorkDimINTEL/SubgroupsPerWorkgroup(Id)
//! execution modes, and the OpenCL.std ext-inst path.

mod common;

use common::{device, rec, run, string_words};
use spirvll_core::device::AddressingModel;
use spirvll_core::error::ErrorKind;
use spirvll_core::ir::instr::{IntPredicate, Op};

#[test]
fn frem_lowers_to_a_bare_fmod_call() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeFloat, vec![1, 32]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 4]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::FRem, vec![1, 7, 4, 5]),
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_3").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let calls: Vec<String> = func.blocks[block]
        .instructions
        .iter()
        .filter_map(|h| match &func.instructions[*h].op {
            Op::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec!["4fmodff".to_string()], "OpFRem has no sign correction, just a bare fmod call");
}

#[test]
fn fmod_follows_its_fmod_call_with_a_copysign_correction() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeFloat, vec![1, 32]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 4]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::FMod, vec![1, 7, 4, 5]),
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_3").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let calls: Vec<_> = func.blocks[block]
        .instructions
        .iter()
        .filter_map(|h| match &func.instructions[*h].op {
            Op::Call { callee, args, .. } => Some((callee.clone(), args.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(calls.len(), 2, "fmod call, then a copysign correction");
    assert_eq!(calls[0].0, "4fmodff");
    assert_eq!(calls[1].0, "8copysignff");
    // The correction takes its magnitude from the fmod result and its
    // sign from the original rhs, not the reverse.
    assert_eq!(calls[1].1[1], spirvll_core::ir::values::ValueRef::Param(1));
}

#[test]
fn smod_lowers_to_the_sign_following_select_sequence() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeInt, vec![1, 32, 1]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 4]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::SMod, vec![1, 7, 4, 5]),
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_3").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let ops: Vec<_> = func.blocks[block].instructions.iter().map(|h| &func.instructions[*h].op).collect();
    assert_eq!(ops.len(), 6, "cmp, neg, select(abs), srem, add, select(result), then the ret is separate");

    match ops[0] {
        Op::ICmp { pred, .. } => assert_eq!(*pred, IntPredicate::Slt),
        other => panic!("expected ICmp slt, got {:?}", other),
    }
    match ops[1] {
        Op::BinOp { op, .. } => assert_eq!(*op, "sub"),
        other => panic!("expected BinOp sub (negated denominator), got {:?}", other),
    }
    match ops[2] {
        Op::Select { .. } => {}
        other => panic!("expected Select (abs of denominator), got {:?}", other),
    }
    match ops[3] {
        Op::BinOp { op, .. } => assert_eq!(*op, "srem"),
        other => panic!("expected BinOp srem, got {:?}", other),
    }
    match ops[4] {
        Op::BinOp { op, .. } => assert_eq!(*op, "add"),
        other => panic!("expected BinOp add (srem + abs denominator), got {:?}", other),
    }
    match ops[5] {
        Op::Select { .. } => {}
        other => panic!("expected the final result Select, got {:?}", other),
    }
}

/// A 64-bit selector's case literals are two words each; if the switch
/// lowering mis-sizes them the second case's label id desyncs and ends
/// up read as a literal word instead.
#[test]
fn switch_with_a_wide_selector_reads_two_word_case_literals() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeInt, vec![2, 64, 1]),
        rec(spirv::Op::TypeFunction, vec![3, 1]),
        rec(spirv::Op::Constant, vec![2, 4, 9, 0]),
        rec(spirv::Op::Function, vec![1, 5, 0, 3]),
        rec(spirv::Op::Label, vec![6]),
        rec(
            spirv::Op::Switch,
            vec![
                4,  // selector
                20, // default label (forward reference, never defined)
                2, 1, 21, // case (lo=2, hi=1) -> label 21
                9, 0, 22, // case (lo=9, hi=0) -> label 22
            ],
        ),
        rec(spirv::Op::Label, vec![21]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::Label, vec![22]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_5").expect("body function");
    let func = &module.functions[func_id];
    let entry = func.block_order[0];
    let switch = func.blocks[entry]
        .instructions
        .iter()
        .find_map(|h| match &func.instructions[*h].op {
            Op::Switch { cases, .. } => Some(cases.clone()),
            _ => None,
        })
        .expect("entry block ends in a switch");

    assert_eq!(switch.len(), 2);
    assert_eq!(switch[0].0, 0x1_0000_0002, "the low/high words combine into one 64-bit literal");
    assert_eq!(switch[1].0, 9);
}

#[test]
fn group_broadcast_mangles_a_vector_value_type_without_a_placeholder() {
    let device = device(&[], AddressingModel::Logical, 64);
    const SCOPE_WORKGROUP: u32 = 2;
    let records = vec![
        rec(spirv::Op::TypeFloat, vec![1, 32]),
        rec(spirv::Op::TypeVector, vec![2, 1, 2]), // vec2<float>
        rec(spirv::Op::TypeInt, vec![3, 32, 0]),
        rec(spirv::Op::TypeVector, vec![4, 3, 2]), // vec2<uint>
        rec(spirv::Op::TypeFunction, vec![5, 2, 2]),
        rec(spirv::Op::Constant, vec![3, 6, SCOPE_WORKGROUP]),
        rec(spirv::Op::Constant, vec![3, 7, 0]),
        rec(spirv::Op::ConstantComposite, vec![4, 8, 7, 7]),
        rec(spirv::Op::Function, vec![2, 9, 0, 5]),
        rec(spirv::Op::FunctionParameter, vec![2, 10]),
        rec(spirv::Op::Label, vec![11]),
        rec(spirv::Op::GroupBroadcast, vec![2, 12, 6, 10, 8]),
        rec(spirv::Op::ReturnValue, vec![12]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_9").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let callee = func.blocks[block]
        .instructions
        .iter()
        .find_map(|h| match &func.instructions[*h].op {
            Op::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        })
        .expect("broadcast lowers to a mangled call");

    assert_eq!(callee, "20work_group_broadcastDv2_fmm", "the value type's vector shape must resolve, not degrade to '?'");
}

#[test]
fn max_work_dim_intel_sets_kernel_metadata() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
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
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::MaxWorkDimINTEL as u32, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let wrapper_id = module.function_by_name("k").expect("kernel wrapper named \"k\"");
    let meta = module.functions[wrapper_id].kernel_metadata.as_ref().expect("kernel metadata");
    assert_eq!(meta.max_work_dim, Some(1));
}

#[test]
fn subgroups_per_workgroup_execution_mode_is_rejected() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
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
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::SubgroupsPerWorkgroup as u32, 4]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let err = run(&device, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedExecutionMode(spirv::ExecutionMode::SubgroupsPerWorkgroup));
}

#[test]
fn subgroups_per_workgroup_id_execution_mode_is_rejected() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
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
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::SubgroupsPerWorkgroupId as u32, 5]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let err = run(&device, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedExecutionMode(spirv::ExecutionMode::SubgroupsPerWorkgroupId));
}

#[test]
fn ext_inst_sqrt_dispatches_through_the_opencl_std_handler() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::TypeFloat, vec![1, 32]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1]),
        {
            let mut words = vec![3];
            words.extend(string_words("OpenCL.std"));
            rec(spirv::Op::ExtInstImport, words)
        },
        rec(spirv::Op::Function, vec![1, 4, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::ExtInst, vec![1, 7, 3, 61, 5]), // 61 == Sqrt
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");
    let func_id = module.function_by_name("_unnamed_fn_4").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let callee = func.blocks[block]
        .instructions
        .iter()
        .find_map(|h| match &func.instructions[*h].op {
            Op::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        })
        .expect("OpExtInst lowers to a mangled call");
    assert_eq!(callee, "4sqrtf");
}
