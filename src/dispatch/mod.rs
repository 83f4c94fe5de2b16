//! The opcode-keyed translator (spec.md §2 item 7, §4.1): the heart of
//! the crate. [`Translator::translate`] is called once per instruction,
//! in stream order, and never re-entered for the same instruction.

pub mod arith;
pub mod atomics_groups;
pub mod composite;
pub mod control_flow;
pub mod functions;
pub mod images;
pub mod memory;
pub mod metadata;
pub mod types_consts;

use crate::backend::debug::ScopeId;
use crate::backend::{DebugBuilder, IrBuilder, Mangler};
use crate::device::DeviceDescriptor;
use crate::error::{ErrorKind, Result};
use crate::ext_inst::ExtInstRegistry;
use crate::id::SpvId;
use crate::ir::function::BlockId;
use crate::ir::FunctionId;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::debug_scope::DebugScopeState;
use crate::state::ModuleState;

/// A `Phi` instruction whose incoming edges reference blocks that may not
/// exist yet; populated in a second pass once the owning function is
/// fully walked (spec.md §4.1.7 "populatePhi").
pub struct PendingPhi {
    pub function: FunctionId,
    pub instr: crate::ir::function::InstrId,
    pub result_type: crate::ir::types::TypeId,
    /// (value id, predecessor-label id) pairs, as written in the stream.
    pub raw_incoming: Vec<(SpvId, SpvId)>,
}

/// `OpFRem`/`OpFMod` seen inside `OpSpecConstantOp`: cannot be lowered in
/// place (spec.md §4.5) because they need a function-scope builtin call.
pub struct DeferredSpecConstantOp {
    pub result_id: SpvId,
    pub result_type: crate::ir::types::TypeId,
    pub builtin: &'static str,
    /// `OpFMod` needs a trailing `copysign(result, rhs)` correction that
    /// `OpFRem` does not (both call `fmod`, but differ in whose sign the
    /// final result takes).
    pub needs_copysign: bool,
    pub lhs: ValueRef,
    pub rhs: ValueRef,
}

/// Transient, per-function state the dispatch core holds while walking
/// one `OpFunction ... OpFunctionEnd` range (spec.md §2 item 7).
#[derive(Default)]
pub struct FunctionCursor {
    pub function: Option<FunctionId>,
    pub kernel_wrapper: Option<FunctionId>,
    pub block: Option<BlockId>,
    pub debug_scope: DebugScopeState,
    pub pending_phis: Vec<PendingPhi>,
    pub drained_deferred_ops: bool,
}

/// Owns [`ModuleState`] and the transient per-function cursor for the
/// duration of one translation (spec.md §5: "Module State is owned
/// exclusively by the dispatch core for the duration of translation").
pub struct Translator<'a> {
    pub state: ModuleState,
    pub builder: &'a mut dyn IrBuilder,
    pub debug: &'a mut dyn DebugBuilder,
    pub mangler: &'a dyn Mangler,
    pub device: &'a DeviceDescriptor,
    pub ext_inst: ExtInstRegistry,
    pub cursor: FunctionCursor,
    pub deferred_spec_const_ops: Vec<DeferredSpecConstantOp>,
}

impl<'a> Translator<'a> {
    pub fn new(
        builder: &'a mut dyn IrBuilder,
        debug: &'a mut dyn DebugBuilder,
        mangler: &'a dyn Mangler,
        device: &'a DeviceDescriptor,
    ) -> Self {
        Translator {
            state: ModuleState::new(),
            builder,
            debug,
            mangler,
            device,
            ext_inst: ExtInstRegistry::default(),
            cursor: FunctionCursor::default(),
            deferred_spec_const_ops: Vec::new(),
        }
    }

    /// Translates a whole instruction stream, then checks the
    /// end-of-module invariants (spec.md §5, §8).
    pub fn translate_module(&mut self, records: impl IntoIterator<Item = Result<OpcodeRecord>>) -> Result<()> {
        for record in records {
            self.translate(&record?)?;
        }
        self.state.check_all_resolved()
    }

    /// spec.md §4.1: "translate(opcode_record) -> Ok | Err(ErrorKind)".
    /// All actions are total: a recognized-but-unsupported opcode
    /// produces `UnsupportedOpcode`; nothing here panics on input-module
    /// conditions.
    pub fn translate(&mut self, record: &OpcodeRecord) -> Result<()> {
        log::trace!("translate {:?}", record.op());
        use spirv::Op::*;
        match record.op() {
            // 4.1.1 metadata
            Nop | SourceExtension | ModuleProcessed | MemberName | DecorationGroup
            | SelectionMerge => metadata::translate_noop(self, record),
            Source => metadata::translate_source(self, record),
            SourceContinued => metadata::translate_source_continued(self, record),
            Name => metadata::translate_name(self, record),
            String => metadata::translate_string(self, record),
            Extension => metadata::translate_extension(self, record),
            Capability => metadata::translate_capability(self, record),
            ExtInstImport => metadata::translate_ext_inst_import(self, record),
            ExtInst => metadata::translate_ext_inst(self, record),
            Decorate => metadata::translate_decorate(self, record),
            MemberDecorate => metadata::translate_member_decorate(self, record),
            GroupDecorate => metadata::translate_group_decorate(self, record),
            GroupMemberDecorate => metadata::translate_group_member_decorate(self, record),
            MemoryModel => metadata::translate_memory_model(self, record),
            EntryPoint => metadata::translate_entry_point(self, record),
            ExecutionMode => metadata::translate_execution_mode(self, record),

            // 4.1.2 types
            TypeVoid | TypeBool | TypeInt | TypeFloat | TypeVector | TypeMatrix | TypeArray
            | TypeRuntimeArray | TypeFunction | TypePointer | TypeForwardPointer | TypeEvent
            | TypeImage | TypeSampler | TypeOpaque | TypeStruct | TypeSampledImage => {
                types_consts::translate_type(self, record)
            }
            TypeDeviceEvent | TypeQueue => {
                Err(ErrorKind::UnsupportedOpcode(record.op()).into())
            }
            TypeReserveId | TypePipe => metadata::translate_noop(self, record),

            // 4.1.3 constants
            ConstantTrue | ConstantFalse | Constant | ConstantComposite | ConstantSampler
            | ConstantNull | SpecConstantTrue | SpecConstantFalse | SpecConstant
            | SpecConstantComposite | SpecConstantOp => types_consts::translate_constant(self, record),

            // 4.1.4 functions and calls
            Function => functions::translate_function(self, record),
            FunctionParameter => functions::translate_function_parameter(self, record),
            FunctionEnd => functions::translate_function_end(self, record),
            FunctionCall => functions::translate_function_call(self, record),

            // 4.1.5 variables and memory
            Variable => memory::translate_variable(self, record),
            Load => memory::translate_load(self, record),
            Store => memory::translate_store(self, record),
            CopyMemory => memory::translate_copy_memory(self, record),
            CopyMemorySized => memory::translate_copy_memory_sized(self, record),
            AccessChain | InBoundsAccessChain => memory::translate_access_chain(self, record),
            PtrAccessChain | InBoundsPtrAccessChain => memory::translate_ptr_access_chain(self, record),
            CopyObject => memory::translate_copy_object(self, record),
            GenericPtrMemSemantics | ImageTexelPointer => metadata::translate_noop(self, record),

            // 4.1.6 arithmetic / casts
            IAdd | ISub | IMul | UDiv | SDiv | UMod | SMod | SRem | FAdd | FSub | FMul | FDiv
            | FRem | FMod | ShiftLeftLogical | ShiftRightLogical | ShiftRightArithmetic
            | BitwiseAnd | BitwiseOr | BitwiseXor | Not | LogicalAnd | LogicalOr | LogicalNot
            | LogicalEqual | LogicalNotEqual | IEqual | INotEqual | UGreaterThan | UGreaterThanEqual
            | ULessThan | ULessThanEqual | SGreaterThan | SGreaterThanEqual | SLessThan
            | SLessThanEqual | FOrdEqual | FOrdNotEqual | FOrdLessThan | FOrdGreaterThan
            | FOrdLessThanEqual | FOrdGreaterThanEqual | FUnordEqual | FUnordNotEqual
            | FUnordLessThan | FUnordGreaterThan | FUnordLessThanEqual | FUnordGreaterThanEqual
            | SConvert | UConvert | FConvert | SatConvertSToU | SatConvertUToS
            | ConvertFToS | ConvertFToU | ConvertSToF | ConvertUToF | ConvertPtrToU
            | ConvertUToPtr | Bitcast | QuantizeToF16 | VectorTimesScalar | Dot | IAddCarry
            | ISubBorrow | UMulExtended | SMulExtended | Any | All | IsNan | IsInf | IsFinite
            | IsNormal | SignBitSet | LessOrGreater | Ordered | Unordered | BitFieldInsert
            | BitFieldSExtract | BitFieldUExtract | BitCount | BitReverse | Select | SNegate
            | FNegate => arith::translate_arith(self, record),
            DPdx | DPdy | Fwidth | DPdxCoarse | DPdyCoarse | FwidthCoarse | DPdxFine | DPdyFine
            | FwidthFine => metadata::translate_noop(self, record),

            // 4.1.7 control flow
            Label => control_flow::translate_label(self, record),
            Branch => control_flow::translate_branch(self, record),
            BranchConditional => control_flow::translate_branch_conditional(self, record),
            Switch => control_flow::translate_switch(self, record),
            LoopMerge => control_flow::translate_loop_merge(self, record),
            Return => control_flow::translate_return(self, record),
            ReturnValue => control_flow::translate_return_value(self, record),
            Unreachable | Kill => control_flow::translate_unreachable(self, record),
            Phi => control_flow::translate_phi(self, record),
            LifetimeStart => control_flow::translate_lifetime_start(self, record),
            LifetimeStop => control_flow::translate_lifetime_stop(self, record),
            Line => control_flow::translate_line(self, record),
            NoLine => control_flow::translate_no_line(self, record),

            // 4.1.8 atomics / barriers / groups
            ControlBarrier => atomics_groups::translate_control_barrier(self, record),
            MemoryBarrier => atomics_groups::translate_memory_barrier(self, record),
            AtomicIAdd | AtomicISub | AtomicSMin | AtomicUMin | AtomicSMax | AtomicUMax
            | AtomicAnd | AtomicOr | AtomicXor | AtomicExchange => atomics_groups::translate_binary_atomic(self, record),
            AtomicIIncrement | AtomicIDecrement => atomics_groups::translate_atomic_inc_dec(self, record),
            AtomicLoad | AtomicStore | AtomicCompareExchange | AtomicFlagTestAndSet
            | AtomicFlagClear => atomics_groups::translate_atomic_misc(self, record),
            GroupAsyncCopy | GroupWaitEvents => atomics_groups::translate_group_async(self, record),
            GroupIAdd | GroupFAdd | GroupUMin | GroupSMin | GroupFMin | GroupUMax | GroupSMax
            | GroupFMax => {
                atomics_groups::translate_group_reduce(self, record)
            }
            GroupAll | GroupAny => atomics_groups::translate_group_predicate(self, record),
            GroupBroadcast => atomics_groups::translate_group_broadcast(self, record),
            SubgroupShuffleINTEL | SubgroupShuffleUpINTEL | SubgroupShuffleDownINTEL
            | SubgroupShuffleXorINTEL => atomics_groups::translate_subgroup_shuffle(self, record),

            // 4.1.9 composite
            VectorExtractDynamic | VectorInsertDynamic | VectorShuffle | CompositeConstruct
            | CompositeExtract | CompositeInsert => composite::translate_composite(self, record),

            // 4.1.10 images
            SampledImage => images::translate_sampled_image(self, record),
            ImageSampleExplicitLod | ImageRead | ImageWrite | ImageQuerySize
            | ImageQuerySizeLod | ImageQueryFormat | ImageQueryOrder | ImageQueryLevels
            | ImageQuerySamples => images::translate_image_op(self, record),
            Image => images::translate_image_unpack(self, record),
            ImageSampleImplicitLod | ImageSampleDrefImplicitLod | ImageSampleDrefExplicitLod
            | ImageSampleProjImplicitLod | ImageSampleProjExplicitLod
            | ImageSampleProjDrefImplicitLod | ImageSampleProjDrefExplicitLod | ImageFetch
            | ImageGather | ImageDrefGather | ImageSparseSampleImplicitLod
            | ImageSparseSampleExplicitLod | ImageSparseSampleDrefImplicitLod
            | ImageSparseSampleDrefExplicitLod | ImageSparseFetch | ImageSparseGather
            | ImageSparseDrefGather | ImageSparseTexelsResident | ImageSparseRead => {
                metadata::translate_noop(self, record)
            }

            other => Err(ErrorKind::UnsupportedOpcode(other).into()),
        }
    }

    pub fn current_function(&self) -> Result<FunctionId> {
        self.cursor.function.ok_or_else(|| {
            ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "instruction requires an open function scope",
            }
            .into()
        })
    }

    pub fn current_block(&self) -> Result<BlockId> {
        self.cursor.block.ok_or_else(|| {
            ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "instruction requires an open basic-block scope",
            }
            .into()
        })
    }

    /// Inserts `op` into the open function/block and records it against
    /// the active `OpLine` range (spec.md §9's `OpenWithInstructions`
    /// transition), so a later `close_debug_scope` attaches a location to
    /// it. Every dispatch module should emit instructions through this
    /// rather than calling `self.builder.insert` directly.
    pub fn insert(
        &mut self,
        ty: crate::ir::types::TypeId,
        op: crate::ir::instr::Op,
    ) -> Result<crate::ir::function::InstrId> {
        let func = self.current_function()?;
        let block = self.current_block()?;
        let instr = self.builder.insert(func, block, ty, op);
        self.cursor.debug_scope.record_instruction(instr);
        Ok(instr)
    }

    /// Recovers a `ValueRef`'s static type by looking through the
    /// current function's own instruction/parameter arenas, since
    /// `ModuleState` tracks id bindings but not per-value types.
    pub fn value_type(&self, value: ValueRef) -> crate::ir::types::TypeId {
        match value {
            ValueRef::Param(index) => {
                let func = self.cursor.function.expect("value_type requires an open function scope");
                self.builder.module().functions[func].params[index as usize].ty
            }
            ValueRef::Instr(h) => {
                let func = self.cursor.function.expect("value_type requires an open function scope");
                self.builder.module().functions[func].instructions[h].ty
            }
            ValueRef::Const(c) => self.builder.module().constants[c].ty,
            ValueRef::Global(g) => self.builder.module().globals[g].ty,
            ValueRef::Poison(ty) => ty,
        }
    }

    /// spec.md §4.1.11: closes the active line range (if any), attaching
    /// its location to every instruction collected since the range
    /// opened; otherwise, if implicit debug scopes are enabled, lazily
    /// creates a lexical block for the current basic block.
    pub fn close_debug_scope(&mut self) {
        use crate::state::debug_scope::LineRangeState;
        let func = match self.cursor.function {
            Some(f) => f,
            None => return,
        };
        match self.cursor.debug_scope.close() {
            LineRangeState::NoRange => {
                if self.state.implicit_debug_scopes_enabled {
                    if let Some(block) = self.cursor.block {
                        let scope = self.cursor.debug_scope.current_scope.unwrap_or_else(|| {
                            ScopeId::LexicalBlock(0)
                        });
                        self.state
                            .per_block_lexical_scope
                            .insert((func, block), scope);
                    }
                }
            }
            LineRangeState::OpenEmpty { .. } => {}
            LineRangeState::OpenWithInstructions {
                line,
                column,
                instructions,
                ..
            } => {
                let scope = self
                    .cursor
                    .debug_scope
                    .current_scope
                    .unwrap_or(ScopeId::LexicalBlock(0));
                let loc = self.debug.create_location(line, column, scope, None);
                for instr in instructions {
                    self.builder.attach_location(func, instr, loc);
                }
            }
        }
    }

    /// Phi edges reference predecessor labels that must all exist by the
    /// time the owning function closes (spec.md §4.1.7 "populatePhi").
    /// Called from `functions::translate_function_end` before the
    /// function cursor is reset.
    pub fn resolve_pending_phis(&mut self) -> Result<()> {
        let pendings = std::mem::take(&mut self.cursor.pending_phis);
        for pending in pendings {
            let mut incoming = Vec::with_capacity(pending.raw_incoming.len());
            for (value_id, label_id) in &pending.raw_incoming {
                let value = self.state.require_value(*value_id)?;
                let block = match self.state.require_bound(*label_id)? {
                    crate::state::Binding::Block { block, .. } => block,
                    _ => {
                        return Err(ErrorKind::MalformedInstruction {
                            op: spirv::Op::Phi,
                            reason: "OpPhi predecessor operand did not resolve to a label",
                        }
                        .into())
                    }
                };
                incoming.push((block, value));
            }
            let func = pending.function;
            let instr = pending.instr;
            if let crate::ir::instr::Op::Phi { incoming: slot } =
                &mut self.builder.module_mut().functions[func].instructions[instr].op
            {
                *slot = incoming;
            }
            let _ = pending.result_type;
        }
        Ok(())
    }
}
