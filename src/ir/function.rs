use crate::arena::Handle;
use crate::ir::instr::Instruction;
use crate::ir::types::TypeId;
use indexmap::IndexMap;

pub type BlockId = Handle<BasicBlock>;
pub type InstrId = Handle<Instruction>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum Linkage {
    Internal,
    External,
    LinkOnceOdr,
    AvailableExternally,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum CallingConv {
    /// Plain function-call ABI used for non-kernel functions and the
    /// "real body" behind a kernel wrapper (spec.md §4.1.4).
    SpirFunc,
    /// Entry-point ABI used for the synthesized kernel wrapper.
    SpirKernel,
}

bitflags::bitflags! {
    pub struct FunctionAttrs: u32 {
        const NO_INLINE = 0x1;
        const ALWAYS_INLINE = 0x2;
        const OPTIMIZE_NONE = 0x4;
        const CONVERGENT = 0x8;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ParamAttr {
    ZExt,
    SExt,
    ByVal,
    Sret,
    NoAlias,
    NoCapture,
    ReadOnly,
    WriteOnly,
    ReadNone,
    NoUndef,
    Dereferenceable(u64),
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeId,
    pub attrs: Vec<ParamAttr>,
}

/// Six parallel kernel-argument metadata lists, one entry per wrapper
/// parameter (spec.md §4.1.4 `OpFunctionEnd`, §6).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct KernelArgMetadata {
    pub addr_space: Vec<u32>,
    pub access_qual: Vec<String>,
    pub ty: Vec<String>,
    pub base_ty: Vec<String>,
    pub type_qual: Vec<String>,
    pub name: Vec<String>,
}

impl KernelArgMetadata {
    pub fn lengths_match(&self) -> bool {
        let n = self.addr_space.len();
        self.access_qual.len() == n
            && self.ty.len() == n
            && self.base_ty.len() == n
            && self.type_qual.len() == n
            && self.name.len() == n
    }
}

/// Execution-mode-derived metadata attached to a kernel wrapper
/// (spec.md §4.1.4).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct KernelMetadata {
    pub reqd_work_group_size: Option<(u32, u32, u32)>,
    pub work_group_size_hint: Option<(u32, u32, u32)>,
    pub vec_type_hint: Option<(ScalarHint, u32)>,
    pub intel_reqd_sub_group_size: Option<u32>,
    pub max_work_dim: Option<u32>,
    pub contraction_allowed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ScalarHint {
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl ScalarHint {
    /// Decodes `VecTypeHint`'s packed operand: low 16 bits are the data
    /// type code (0..6), high 16 bits are the component count
    /// (spec.md §4.1.4).
    pub fn decode(packed: u32) -> Option<(Self, u32)> {
        let code = packed & 0xffff;
        let count = packed >> 16;
        let hint = match code {
            0 => ScalarHint::I8,
            1 => ScalarHint::I16,
            2 => ScalarHint::I32,
            3 => ScalarHint::I64,
            4 => ScalarHint::F16,
            5 => ScalarHint::F32,
            6 => ScalarHint::F64,
            _ => return None,
        };
        Some((hint, count))
    }
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct BasicBlock {
    pub instructions: Vec<InstrId>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct Function {
    pub name: String,
    pub ty: TypeId,
    pub params: Vec<Param>,
    pub linkage: Linkage,
    pub calling_conv: CallingConv,
    pub attrs: FunctionAttrs,
    pub is_declaration_only: bool,
    pub instructions: crate::arena::Arena<Instruction>,
    pub blocks: crate::arena::Arena<BasicBlock>,
    pub block_order: Vec<BlockId>,
    pub kernel_arg_metadata: Option<KernelArgMetadata>,
    pub kernel_metadata: Option<KernelMetadata>,
    pub subprogram: Option<crate::backend::debug::SubprogramId>,
}

impl Function {
    pub fn new(name: String, ty: TypeId, calling_conv: CallingConv) -> Self {
        Function {
            name,
            ty,
            params: Vec::new(),
            linkage: Linkage::External,
            calling_conv,
            attrs: FunctionAttrs::empty(),
            is_declaration_only: true,
            instructions: crate::arena::Arena::new(),
            blocks: crate::arena::Arena::new(),
            block_order: Vec::new(),
            kernel_arg_metadata: None,
            kernel_metadata: None,
            subprogram: None,
        }
    }
}

pub type NamedMetadata = IndexMap<String, Vec<String>>;
