//! The mutable symbol table the dispatch core reads and writes while
//! walking a SPIR-V module (spec.md §3 "ModuleState").

pub mod debug_scope;
pub mod decorations;

use crate::backend::debug::ScopeId;
use crate::device::SpecializationInfoProvider;
use crate::error::{ErrorKind, Result};
use crate::id::SpvId;
use crate::ir::function::BlockId;
use crate::ir::FunctionId;
use crate::ir::types::TypeId;
use crate::ir::values::{ConstantId, ValueRef};
use crate::{FastHashMap, FastHashSet};
use decorations::DecorationTable;

/// What a SpvId is ultimately bound to. Distinct from `ValueRef` because
/// an id can name a type, a whole function, a basic block, or an
/// ext-inst-set import rather than a usable SSA value.
#[derive(Clone, Copy, Debug)]
pub enum Binding {
    Type(TypeId),
    Constant(ConstantId),
    Value(ValueRef),
    Function(FunctionId),
    Global(crate::ir::GlobalId),
    Block { func: FunctionId, block: BlockId },
    ExtInstImport(crate::ext_inst::ExtInstSet),
    /// `OpDecorationGroup`: a pure declaration, never materialized.
    DecorationGroup,
    /// `OpTypeForwardPointer`: reserved, awaiting its defining
    /// `OpTypePointer`.
    ForwardPointer,
}

impl Binding {
    pub fn as_value(&self) -> Option<ValueRef> {
        match self {
            Binding::Value(v) => Some(*v),
            Binding::Constant(c) => Some(ValueRef::Const(*c)),
            Binding::Global(g) => Some(ValueRef::Global(*g)),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            Binding::Type(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<FunctionId> {
        match self {
            Binding::Function(f) => Some(*f),
            _ => None,
        }
    }
}

/// An id table entry: the opcode that created it, plus its binding once
/// one exists (spec.md §3 "id_table").
#[derive(Clone, Debug)]
pub struct IdEntry {
    pub created_by: spirv::Op,
    pub binding: Option<Binding>,
}

#[derive(Clone, Debug)]
pub struct ExecutionModeRecord {
    pub mode: spirv::ExecutionMode,
    pub operands: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct EntryPointRecord {
    pub execution_model: spirv::ExecutionModel,
    pub name: String,
    pub function: SpvId,
}

/// spec.md §3. Owned exclusively by the dispatch core during translation;
/// read-only for downstream consumers afterward (spec.md §5).
pub struct ModuleState {
    id_table: FastHashMap<SpvId, IdEntry>,
    pub decorations: DecorationTable,
    pub execution_modes: FastHashMap<SpvId, Vec<ExecutionModeRecord>>,
    pub capabilities: FastHashSet<spirv::Capability>,
    pub extensions: FastHashSet<String>,
    pub forward_pointer_ids: FastHashSet<SpvId>,
    pub incomplete_structs: Vec<(SpvId, Vec<SpvId>)>,
    pub forward_function_refs: FastHashMap<SpvId, FunctionId>,
    pub debug_strings: FastHashMap<SpvId, String>,
    pub file_ids: FastHashMap<SpvId, crate::backend::debug::FileId>,
    pub names: FastHashMap<SpvId, String>,
    pub entry_points: indexmap::IndexMap<SpvId, EntryPointRecord>,
    pub addressing_bits: u8,
    pub workgroup_size_hint: Option<(u32, u32, u32)>,
    pub spec_info: Option<Box<dyn SpecializationInfoProvider>>,
    pub sampled_images: FastHashMap<SpvId, (ValueRef, ValueRef)>,
    pub extended_instr_sets: FastHashMap<SpvId, crate::ext_inst::ExtInstSet>,
    pub param_type_ids: FastHashMap<SpvId, Vec<SpvId>>,
    pub per_block_lexical_scope: FastHashMap<(FunctionId, BlockId), ScopeId>,
    pub loop_metadata: FastHashMap<(FunctionId, BlockId), crate::ir::instr::LoopMetadata>,
    pub implicit_debug_scopes_enabled: bool,
    pub barrier_wrapper: Option<FunctionId>,
    /// Keyed by `(operationName, signPrefix + opName, resultType)`, mirroring
    /// `reductionWrapperMap` (builder_core.cpp ~L6044): the sign prefix is
    /// folded into the cache key's string component rather than tracked as
    /// a separate discriminant.
    pub reduction_wrapper_cache: FastHashMap<(&'static str, String, SpvId), FunctionId>,
    /// Keyed by `(resultType, dimensions)`, mirroring `broadcastWrapperMap`.
    pub broadcast_wrapper_cache: FastHashMap<(SpvId, u8), FunctionId>,
    /// Keyed by opName alone ("all"/"any"), mirroring `predicateWrapperMap`.
    pub predicate_wrapper_cache: FastHashMap<&'static str, FunctionId>,
    pub source_metadata: String,
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            id_table: FastHashMap::default(),
            decorations: DecorationTable::new(),
            execution_modes: FastHashMap::default(),
            capabilities: FastHashSet::default(),
            extensions: FastHashSet::default(),
            forward_pointer_ids: FastHashSet::default(),
            incomplete_structs: Vec::new(),
            forward_function_refs: FastHashMap::default(),
            debug_strings: FastHashMap::default(),
            file_ids: FastHashMap::default(),
            names: FastHashMap::default(),
            entry_points: indexmap::IndexMap::new(),
            addressing_bits: 0,
            workgroup_size_hint: None,
            spec_info: None,
            sampled_images: FastHashMap::default(),
            extended_instr_sets: FastHashMap::default(),
            param_type_ids: FastHashMap::default(),
            per_block_lexical_scope: FastHashMap::default(),
            loop_metadata: FastHashMap::default(),
            implicit_debug_scopes_enabled: true,
            barrier_wrapper: None,
            reduction_wrapper_cache: FastHashMap::default(),
            broadcast_wrapper_cache: FastHashMap::default(),
            predicate_wrapper_cache: FastHashMap::default(),
            source_metadata: String::new(),
        }
    }

    /// Declares `id` as originating from `op`, without binding it to
    /// anything yet (used for forward-referenced ids before their
    /// definition is seen).
    pub fn declare(&mut self, id: SpvId, op: spirv::Op) {
        self.id_table.entry(id).or_insert(IdEntry {
            created_by: op,
            binding: None,
        });
    }

    /// Binds `id` to `binding`. spec.md §3: "a given id is bound at most
    /// once" — rebinding (other than completing a prior `declare`) is an
    /// internal invariant violation, not a user-facing error.
    pub fn bind(&mut self, id: SpvId, op: spirv::Op, binding: Binding) {
        let entry = self.id_table.entry(id).or_insert_with(|| IdEntry {
            created_by: op,
            binding: None,
        });
        debug_assert!(
            entry.binding.is_none() || matches!(entry.binding, Some(Binding::ForwardPointer)),
            "SpvId {:?} rebound",
            id
        );
        entry.created_by = op;
        entry.binding = Some(binding);
    }

    pub fn lookup(&self, id: SpvId) -> Option<&IdEntry> {
        self.id_table.get(&id)
    }

    pub fn is_bound(&self, id: SpvId) -> bool {
        matches!(self.id_table.get(&id), Some(IdEntry { binding: Some(_), .. }))
    }

    pub fn binding_of(&self, id: SpvId) -> Option<Binding> {
        self.id_table.get(&id).and_then(|e| e.binding)
    }

    /// spec.md §8: "For every SpvId X that appears as an operand of any
    /// translated instruction, id_table.contains(X) holds when
    /// translation completes." Returns the specific error the dispatch
    /// loop should raise when that invariant is violated for `id`.
    pub fn require_bound(&self, id: SpvId) -> Result<Binding> {
        self.binding_of(id)
            .ok_or_else(|| ErrorKind::ForwardReferenceUnresolved(id).into())
    }

    pub fn require_type(&self, id: SpvId) -> Result<TypeId> {
        self.require_bound(id)?
            .as_type()
            .ok_or_else(|| ErrorKind::ForwardReferenceUnresolved(id).into())
    }

    pub fn require_value(&self, id: SpvId) -> Result<ValueRef> {
        self.require_bound(id)?
            .as_value()
            .ok_or_else(|| ErrorKind::ForwardReferenceUnresolved(id).into())
    }

    /// Every forward reference must be closed before translation
    /// completes (spec.md §5, §8). Callers remove ids from
    /// `forward_pointer_ids` / `forward_function_refs` as they resolve
    /// them, so a non-empty set here means the module is ill-formed.
    pub fn check_all_resolved(&self) -> Result<()> {
        if let Some(id) = self.forward_pointer_ids.iter().next() {
            return Err(ErrorKind::ForwardReferenceUnresolved(*id).into());
        }
        if let Some(id) = self.forward_function_refs.keys().next() {
            return Err(ErrorKind::ForwardReferenceUnresolved(*id).into());
        }
        Ok(())
    }
}
