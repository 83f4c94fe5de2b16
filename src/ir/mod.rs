//! The concrete low-level IR module the dispatch core targets through
//! [`crate::backend::IrBuilder`].
//!
//! In a production deployment this whole module is the "external backend
//! IR library" spec.md §1 calls out of scope; it is implemented here, in
//! the style of the teacher crate's own arena-indexed `Module` (see
//! `crate::arena`), so the translator is independently testable and
//! runnable end to end.

pub mod function;
pub mod instr;
pub mod types;
pub mod values;

use crate::arena::{Arena, Handle};
use function::{CallingConv, Function, Linkage};
use types::{Type, TypeId};
use values::{Constant, ConstantId};

pub type FunctionId = Handle<Function>;
pub type GlobalId = Handle<GlobalVariable>;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct GlobalVariable {
    pub name: String,
    pub ty: TypeId,
    pub addr_space: u32,
    pub linkage: Linkage,
    pub is_constant: bool,
    pub unnamed_addr: bool,
    pub initializer: Option<ConstantId>,
    pub alignment: Option<u32>,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct Module {
    pub target_triple: String,
    pub data_layout: String,
    pub types: Arena<Type>,
    pub constants: Arena<Constant>,
    pub globals: Arena<GlobalVariable>,
    pub functions: Arena<Function>,
    pub source_metadata: String,
    pub named_metadata: function::NamedMetadata,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    /// Data layout strings are fixed by addressing bitness (spec.md §6,
    /// §8 "Logical + addressing_bits = 32/64 selects...").
    pub fn set_addressing_bits(&mut self, bits: u8) {
        self.data_layout = match bits {
            32 => "e-p:32:32-i64:64-v16:16-v24:32-v32:32-v48:64-v96:128-v192:256-v256:256-v512:512-v1024:1024-n8:16:32:64".to_string(),
            64 => "e-p:64:64-i64:64-v16:16-v24:32-v32:32-v48:64-v96:128-v192:256-v256:256-v512:512-v1024:1024-n8:16:32:64".to_string(),
            _ => String::new(),
        };
        self.target_triple = "unknown-unknown-unknown".to_string();
    }

    pub fn declare_function(&mut self, name: String, ty: TypeId, conv: CallingConv) -> FunctionId {
        self.functions.append(Function::new(name, ty, conv))
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(h, _)| h)
    }
}
