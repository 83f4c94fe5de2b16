//! End-to-end scenarios (spec.md §8 "Concrete end-to-end scenarios").
//! Each test hand-builds the salient opcodes of one minimal module and
//! checks the resulting IR shape.

mod common;

use common::{device, rec, run, run_with_spec_info, string_words};
use spirvll_core::device::{AddressingModel, MapSpecializationInfo, SpecializationValue};
use spirvll_core::error::ErrorKind;
use spirvll_core::id::SpvId;
use spirvll_core::ir::function::{CallingConv, Linkage};
use spirvll_core::ir::instr::Op;
use spirvll_core::ir::values::{ConstantValue, ValueRef};
use spirvll_core::state::Binding;

fn id(raw: u32) -> SpvId {
    SpvId::new(raw).unwrap()
}

/// Scenario A — minimal empty kernel.
#[test]
fn scenario_a_minimal_empty_kernel() {
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
        rec(spirv::Op::ExecutionMode, vec![3, spirv::ExecutionMode::LocalSize as u32, 4, 2, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![4]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");

    let wrapper_id = module.function_by_name("k").expect("kernel wrapper named \"k\"");
    let wrapper = &module.functions[wrapper_id];
    assert_eq!(wrapper.linkage, Linkage::External);
    assert_eq!(wrapper.calling_conv, CallingConv::SpirKernel);
    let kernel_meta = wrapper.kernel_metadata.as_ref().expect("kernel metadata");
    assert_eq!(kernel_meta.reqd_work_group_size, Some((4, 2, 1)));
    let arg_meta = wrapper.kernel_arg_metadata.as_ref().expect("kernel arg metadata");
    assert_eq!(arg_meta.addr_space.len(), 0);
    assert_eq!(arg_meta.access_qual.len(), 0);
    assert_eq!(arg_meta.ty.len(), 0);
    assert_eq!(arg_meta.base_ty.len(), 0);
    assert_eq!(arg_meta.type_qual.len(), 0);
    assert_eq!(arg_meta.name.len(), 0);
    assert!(arg_meta.lengths_match());

    let body_id = module.function_by_name("k.spirv_func").expect("body function");
    let body = &module.functions[body_id];
    assert_eq!(body.calling_conv, CallingConv::SpirFunc);

    // The wrapper forwards to the body with a single call.
    let block = wrapper.block_order[0];
    let calls: Vec<_> = wrapper.blocks[block]
        .instructions
        .iter()
        .filter_map(|h| match &wrapper.instructions[*h].op {
            Op::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec!["k.spirv_func".to_string()]);
}

/// Scenario B — integer add returning the result.
#[test]
fn scenario_b_integer_add() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical32, 32);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical32 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeInt, vec![1, 32, 0]),
        rec(spirv::Op::TypeFunction, vec![2, 1, 1, 1]),
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::FunctionParameter, vec![1, 4]),
        rec(spirv::Op::FunctionParameter, vec![1, 5]),
        rec(spirv::Op::Label, vec![6]),
        rec(spirv::Op::IAdd, vec![1, 7, 4, 5]),
        rec(spirv::Op::ReturnValue, vec![7]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");

    let func_id = module.function_by_name("_unnamed_fn_3").expect("body function");
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let instrs: Vec<_> = func.blocks[block].instructions.iter().map(|h| &func.instructions[*h].op).collect();
    assert_eq!(instrs.len(), 2);
    match instrs[0] {
        Op::BinOp { op, lhs, rhs, .. } => {
            assert_eq!(*op, "add");
            assert_eq!(*lhs, ValueRef::Param(0));
            assert_eq!(*rhs, ValueRef::Param(1));
        }
        other => panic!("expected BinOp add, got {:?}", other),
    }
    match instrs[1] {
        Op::Ret { value: Some(_) } => {}
        other => panic!("expected ret with a value, got {:?}", other),
    }
}

/// Scenario C — forward function reference.
#[test]
fn scenario_c_forward_function_reference() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeInt, vec![1, 32, 0]),
        rec(spirv::Op::TypeFunction, vec![2, 1]),
        rec(spirv::Op::Constant, vec![1, 8, 42]),
        // g: calls h (%4) before h is defined.
        rec(spirv::Op::Function, vec![1, 3, 0, 2]),
        rec(spirv::Op::Label, vec![5]),
        rec(spirv::Op::FunctionCall, vec![1, 6, 4]),
        rec(spirv::Op::ReturnValue, vec![6]),
        rec(spirv::Op::FunctionEnd, vec![]),
        // h: defined after g references it.
        rec(spirv::Op::Function, vec![1, 4, 0, 2]),
        rec(spirv::Op::Label, vec![7]),
        rec(spirv::Op::ReturnValue, vec![8]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");

    // Exactly one real function object per g/h — the placeholder was
    // renamed in place, never duplicated.
    assert_eq!(module.functions.len(), 2);

    let h_id = module.function_by_name("_unnamed_fn_4").expect("h keeps its resolved name");
    let h_name = module.functions[h_id].name.clone();

    let calls: Vec<String> = module
        .functions
        .iter()
        .flat_map(|(_, f)| f.instructions.iter())
        .filter_map(|(_, instr)| match &instr.op {
            Op::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec![h_name], "the call site must track h's final name, not its placeholder");
}

/// Scenario D — specialization constant.
#[test]
fn scenario_d_spec_constant_with_provider() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::Decorate, vec![2, spirv::Decoration::SpecId as u32, 42]),
        rec(spirv::Op::TypeInt, vec![1, 32, 0]),
        rec(spirv::Op::SpecConstant, vec![1, 2, 7]),
    ];

    let provider = MapSpecializationInfo::new().with(42, SpecializationValue::Bytes4(42u32.to_le_bytes()));
    let (module, state) = run_with_spec_info(&device, records.clone(), Some(Box::new(provider)))
        .expect("translation should succeed");
    let c = match state.binding_of(id(2)) {
        Some(Binding::Constant(c)) => c,
        other => panic!("expected a bound constant, got {:?}", other),
    };
    match module.constants[c].value {
        ConstantValue::Int(v) => assert_eq!(v, 42),
        ref other => panic!("expected an int constant, got {:?}", other),
    }
}

/// Scenario D, second half — no provider falls back to the literal.
#[test]
fn scenario_d_spec_constant_without_provider() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![
        rec(spirv::Op::Decorate, vec![2, spirv::Decoration::SpecId as u32, 42]),
        rec(spirv::Op::TypeInt, vec![1, 32, 0]),
        rec(spirv::Op::SpecConstant, vec![1, 2, 7]),
    ];

    let (module, state) = run_with_spec_info(&device, records, None).expect("translation should succeed");
    let c = match state.binding_of(id(2)) {
        Some(Binding::Constant(c)) => c,
        other => panic!("expected a bound constant, got {:?}", other),
    };
    match module.constants[c].value {
        ConstantValue::Int(v) => assert_eq!(v, 7),
        ref other => panic!("expected an int constant, got {:?}", other),
    }
}

/// Scenario E — control barrier with a constant scope: no wrapper is
/// synthesized, the call site hits the mux builtin directly.
#[test]
fn scenario_e_control_barrier_constant_scope() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    const SCOPE_SUBGROUP: u32 = 4;
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeInt, vec![2, 32, 1]),
        rec(spirv::Op::TypeFunction, vec![3, 1]),
        rec(spirv::Op::Constant, vec![2, 4, SCOPE_SUBGROUP as u32]),
        rec(spirv::Op::Constant, vec![2, 5, 0]),
        rec(spirv::Op::Function, vec![1, 6, 0, 3]),
        rec(spirv::Op::Label, vec![7]),
        rec(spirv::Op::ControlBarrier, vec![4, 4, 5]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");

    assert!(module.function_by_name("barrier_wrapper").is_none(), "no wrapper should be created");

    let func_id = module.function_by_name("_unnamed_fn_6").unwrap();
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let calls: Vec<_> = func.blocks[block]
        .instructions
        .iter()
        .filter_map(|h| match &func.instructions[*h].op {
            Op::Call { callee, attrs, .. } => Some((callee.clone(), *attrs)),
            _ => None,
        })
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "__mux_sub_group_barrier");
    assert!(calls[0].1.contains(spirvll_core::ir::instr::CallAttrFlags::NO_MERGE));
    assert!(calls[0].1.contains(spirvll_core::ir::instr::CallAttrFlags::NO_DUPLICATE));
}

/// Scenario F — control barrier with a non-constant scope (loaded from
/// memory): a single shared wrapper function is synthesized.
#[test]
fn scenario_f_control_barrier_dynamic_scope() {
    let device = device(&[spirv::Capability::Kernel], AddressingModel::Physical64, 64);
    let records = vec![
        rec(spirv::Op::Capability, vec![spirv::Capability::Kernel as u32]),
        rec(spirv::Op::MemoryModel, vec![spirv::AddressingModel::Physical64 as u32, spirv::MemoryModel::OpenCL as u32]),
        rec(spirv::Op::TypeVoid, vec![1]),
        rec(spirv::Op::TypeInt, vec![2, 32, 1]),
        rec(spirv::Op::TypePointer, vec![3, spirv::StorageClass::Function as u32, 2]),
        rec(spirv::Op::TypeFunction, vec![4, 1]),
        rec(spirv::Op::Constant, vec![2, 5, 0]),
        rec(spirv::Op::Function, vec![1, 6, 0, 4]),
        rec(spirv::Op::Label, vec![7]),
        rec(spirv::Op::Variable, vec![3, 8, spirv::StorageClass::Function as u32]),
        rec(spirv::Op::Load, vec![2, 9, 8]),
        rec(spirv::Op::ControlBarrier, vec![9, 5, 5]),
        rec(spirv::Op::Return, vec![]),
        rec(spirv::Op::FunctionEnd, vec![]),
    ];

    let module = run(&device, records).expect("translation should succeed");

    let wrapper_id = module.function_by_name("barrier_wrapper").expect("wrapper is synthesized once");
    let wrapper = &module.functions[wrapper_id];
    assert_eq!(wrapper.linkage, Linkage::Internal);
    assert!(wrapper.attrs.contains(spirvll_core::ir::function::FunctionAttrs::ALWAYS_INLINE));
    assert_eq!(wrapper.block_order.len(), 4, "entry/subgroup/workgroup/exit");

    let barrier_calls: Vec<_> = wrapper
        .instructions
        .iter()
        .filter_map(|(_, instr)| match &instr.op {
            Op::Call { callee, .. } if callee.contains("barrier") => Some(callee.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(barrier_calls.len(), 2);
    assert!(barrier_calls.contains(&"__mux_sub_group_barrier".to_string()));
    assert!(barrier_calls.contains(&"__mux_work_group_barrier".to_string()));

    let has_compare = wrapper.instructions.iter().any(|(_, i)| matches!(i.op, Op::ICmp { .. }));
    assert!(has_compare, "wrapper compares the runtime scope against Subgroup");

    let func_id = module.function_by_name("_unnamed_fn_6").unwrap();
    let func = &module.functions[func_id];
    let block = func.block_order[0];
    let calls_wrapper = func.blocks[block].instructions.iter().any(|h| {
        matches!(&func.instructions[*h].op, Op::Call { callee, .. } if callee == "barrier_wrapper")
    });
    assert!(calls_wrapper, "the call site invokes the wrapper");
}

#[test]
fn unsupported_opcode_is_rejected_without_panicking() {
    let device = device(&[], AddressingModel::Logical, 64);
    let records = vec![rec(spirv::Op::TypeDeviceEvent, vec![1])];
    let err = run(&device, records).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedOpcode(spirv::Op::TypeDeviceEvent));
}
