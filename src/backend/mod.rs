//! The narrow facades the dispatch core emits through (spec.md §2 items
//! 3-5): an IR builder, a debug-info builder, and a name mangler. The core
//! only ever calls through these traits — it never touches `crate::ir`
//! directly — so a host embedding this crate can swap in a real LLVM (or
//! other) backend without touching the dispatch logic.

pub mod debug;
pub mod llir;
pub mod mangle;

use crate::ir::function::{BlockId, CallingConv, FunctionAttrs, InstrId, Linkage, ParamAttr};
use crate::ir::instr::Op;
use crate::ir::types::{ImageKind, TypeId};
use crate::ir::values::{ConstantId, ValueRef};
use crate::ir::{FunctionId, GlobalId, Module};

pub use debug::{DebugBuilder, SourceLocation, SubprogramId};
pub use mangle::{Mangler, MangleArg};

/// spec.md §2 item 3.
pub trait IrBuilder {
    fn void_type(&mut self) -> TypeId;
    fn int_type(&mut self, width: u32, signed: bool) -> TypeId;
    fn float_type(&mut self, width: u32) -> TypeId;
    fn vector_type(&mut self, elem: TypeId, len: u32) -> TypeId;
    fn array_type(&mut self, elem: TypeId, len: Option<u32>) -> TypeId;
    fn pointer_type(&mut self, pointee: TypeId, addr_space: u32) -> TypeId;
    fn function_type(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId;
    fn opaque_struct(&mut self, name: Option<String>, packed: bool) -> TypeId;
    fn complete_struct(&mut self, ty: TypeId, members: Vec<TypeId>);
    fn event_type(&mut self) -> TypeId;
    fn sampler_type(&mut self) -> TypeId;
    fn image_type(&mut self, kind: ImageKind) -> TypeId;
    fn opaque_type(&mut self, name: String) -> TypeId;

    fn const_int(&mut self, ty: TypeId, bits: u64) -> ConstantId;
    fn const_float(&mut self, ty: TypeId, value: f64) -> ConstantId;
    fn const_composite(&mut self, ty: TypeId, parts: Vec<ConstantId>) -> ConstantId;
    fn const_zero(&mut self, ty: TypeId) -> ConstantId;
    fn const_undef(&mut self, ty: TypeId) -> ConstantId;
    fn const_none_event(&mut self, ty: TypeId) -> ConstantId;

    fn declare_global(
        &mut self,
        name: String,
        ty: TypeId,
        addr_space: u32,
        linkage: Linkage,
        is_constant: bool,
        unnamed_addr: bool,
    ) -> GlobalId;
    fn set_global_initializer(&mut self, global: GlobalId, init: ConstantId);
    fn set_global_alignment(&mut self, global: GlobalId, align: u32);

    fn declare_function(&mut self, name: String, ty: TypeId, conv: CallingConv) -> FunctionId;
    fn rename_function(&mut self, f: FunctionId, new_name: String);
    fn set_linkage(&mut self, f: FunctionId, linkage: Linkage);
    fn add_function_attr(&mut self, f: FunctionId, attr: FunctionAttrs);
    fn set_param_attrs(&mut self, f: FunctionId, index: u32, attrs: Vec<ParamAttr>);
    fn set_params(&mut self, f: FunctionId, names: Vec<Option<String>>);
    fn mark_defined(&mut self, f: FunctionId);

    fn append_block(&mut self, f: FunctionId) -> BlockId;
    fn move_block_to_end(&mut self, f: FunctionId, block: BlockId);

    fn insert(&mut self, f: FunctionId, block: BlockId, ty: TypeId, op: Op) -> InstrId;
    fn replace_all_uses(&mut self, f: FunctionId, old: ValueRef, new: ValueRef);
    fn attach_location(&mut self, f: FunctionId, instr: InstrId, loc: SourceLocation);

    fn module(&self) -> &Module;
    fn module_mut(&mut self) -> &mut Module;
}
