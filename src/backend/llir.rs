//! The default [`IrBuilder`] implementation: builds directly into a
//! [`Module`] owned by this struct.

use super::debug::SourceLocation;
use super::IrBuilder;
use crate::ir::function::{
    BasicBlock, BlockId, CallingConv, FunctionAttrs, InstrId, Linkage, Param, ParamAttr,
};
use crate::ir::instr::{Instruction, Op};
use crate::ir::types::{ImageKind, Type, TypeId, TypeInner};
use crate::ir::values::{Constant, ConstantId, ConstantValue, ValueRef};
use crate::ir::{FunctionId, GlobalId, GlobalVariable, Module};

#[derive(Default)]
pub struct LlirBuilder {
    module: Module,
}

impl LlirBuilder {
    pub fn new() -> Self {
        LlirBuilder {
            module: Module::new(),
        }
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    fn push_type(&mut self, inner: TypeInner) -> TypeId {
        self.module.types.append(Type { name: None, inner })
    }
}

impl IrBuilder for LlirBuilder {
    fn void_type(&mut self) -> TypeId {
        self.push_type(TypeInner::Void)
    }

    fn int_type(&mut self, width: u32, signed: bool) -> TypeId {
        self.push_type(TypeInner::Int { width, signed })
    }

    fn float_type(&mut self, width: u32) -> TypeId {
        self.push_type(TypeInner::Float { width })
    }

    fn vector_type(&mut self, elem: TypeId, len: u32) -> TypeId {
        self.push_type(TypeInner::Vector { elem, len })
    }

    fn array_type(&mut self, elem: TypeId, len: Option<u32>) -> TypeId {
        self.push_type(TypeInner::Array { elem, len })
    }

    fn pointer_type(&mut self, pointee: TypeId, addr_space: u32) -> TypeId {
        self.push_type(TypeInner::Pointer {
            pointee,
            addr_space,
        })
    }

    fn function_type(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.push_type(TypeInner::Function { params, ret })
    }

    fn opaque_struct(&mut self, name: Option<String>, packed: bool) -> TypeId {
        let handle = self.push_type(TypeInner::Struct {
            members: Vec::new(),
            packed,
            incomplete: true,
        });
        self.module.types[handle].name = name;
        handle
    }

    fn complete_struct(&mut self, ty: TypeId, members: Vec<TypeId>) {
        if let TypeInner::Struct {
            members: slot,
            incomplete,
            ..
        } = &mut self.module.types[ty].inner
        {
            *slot = members;
            *incomplete = false;
        }
    }

    fn event_type(&mut self) -> TypeId {
        self.push_type(TypeInner::Event)
    }

    fn sampler_type(&mut self) -> TypeId {
        self.push_type(TypeInner::Sampler)
    }

    fn image_type(&mut self, kind: ImageKind) -> TypeId {
        self.push_type(TypeInner::Image { kind })
    }

    fn opaque_type(&mut self, name: String) -> TypeId {
        self.push_type(TypeInner::Opaque { name })
    }

    fn const_int(&mut self, ty: TypeId, bits: u64) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::Int(bits),
        })
    }

    fn const_float(&mut self, ty: TypeId, value: f64) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::Float(value),
        })
    }

    fn const_composite(&mut self, ty: TypeId, parts: Vec<ConstantId>) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::Composite(parts),
        })
    }

    fn const_zero(&mut self, ty: TypeId) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::Zero,
        })
    }

    fn const_undef(&mut self, ty: TypeId) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::Undef,
        })
    }

    fn const_none_event(&mut self, ty: TypeId) -> ConstantId {
        self.module.constants.append(Constant {
            ty,
            value: ConstantValue::NoneEvent,
        })
    }

    fn declare_global(
        &mut self,
        name: String,
        ty: TypeId,
        addr_space: u32,
        linkage: Linkage,
        is_constant: bool,
        unnamed_addr: bool,
    ) -> GlobalId {
        self.module.globals.append(GlobalVariable {
            name,
            ty,
            addr_space,
            linkage,
            is_constant,
            unnamed_addr,
            initializer: None,
            alignment: None,
        })
    }

    fn set_global_initializer(&mut self, global: GlobalId, init: ConstantId) {
        self.module.globals[global].initializer = Some(init);
    }

    fn set_global_alignment(&mut self, global: GlobalId, align: u32) {
        self.module.globals[global].alignment = Some(align);
    }

    fn declare_function(&mut self, name: String, ty: TypeId, conv: CallingConv) -> FunctionId {
        self.module.declare_function(name, ty, conv)
    }

    /// Calls address a callee by name (`Op::Call::callee`), not by
    /// `FunctionId`, so a rename must patch every already-emitted call site
    /// that still holds the old name — otherwise a forward-referenced
    /// callee's calls keep pointing at its placeholder name after the real
    /// definition replaces it (spec.md §8 Scenario C).
    fn rename_function(&mut self, f: FunctionId, new_name: String) {
        let old_name = std::mem::replace(&mut self.module.functions[f].name, new_name.clone());
        if old_name == new_name {
            return;
        }
        for (_, func) in self.module.functions.iter_mut() {
            for (_, instr) in func.instructions.iter_mut() {
                if let Op::Call { callee, .. } = &mut instr.op {
                    if *callee == old_name {
                        *callee = new_name.clone();
                    }
                }
            }
        }
    }

    fn set_linkage(&mut self, f: FunctionId, linkage: Linkage) {
        self.module.functions[f].linkage = linkage;
    }

    fn add_function_attr(&mut self, f: FunctionId, attr: FunctionAttrs) {
        self.module.functions[f].attrs |= attr;
    }

    fn set_param_attrs(&mut self, f: FunctionId, index: u32, attrs: Vec<ParamAttr>) {
        if let Some(p) = self.module.functions[f].params.get_mut(index as usize) {
            p.attrs = attrs;
        }
    }

    fn set_params(&mut self, f: FunctionId, names: Vec<Option<String>>) {
        let func = &mut self.module.functions[f];
        let param_types = match &self.module.types[func.ty].inner {
            TypeInner::Function { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        func.params = param_types
            .into_iter()
            .zip(names.into_iter().chain(std::iter::repeat(None)))
            .map(|(ty, name)| Param {
                name,
                ty,
                attrs: Vec::new(),
            })
            .collect();
    }

    fn mark_defined(&mut self, f: FunctionId) {
        self.module.functions[f].is_declaration_only = false;
    }

    fn append_block(&mut self, f: FunctionId) -> BlockId {
        let func = &mut self.module.functions[f];
        let block = func.blocks.append(BasicBlock::default());
        func.block_order.push(block);
        block
    }

    fn move_block_to_end(&mut self, f: FunctionId, block: BlockId) {
        let func = &mut self.module.functions[f];
        func.block_order.retain(|&b| b != block);
        func.block_order.push(block);
    }

    fn insert(&mut self, f: FunctionId, block: BlockId, ty: TypeId, op: Op) -> InstrId {
        let func = &mut self.module.functions[f];
        let instr = func.instructions.append(Instruction {
            op,
            ty,
            location: None,
        });
        func.blocks[block].instructions.push(instr);
        instr
    }

    fn replace_all_uses(&mut self, f: FunctionId, old: ValueRef, new: ValueRef) {
        let func = &mut self.module.functions[f];
        for (_, instr) in func.instructions.iter_mut() {
            replace_in_op(&mut instr.op, old, new);
        }
    }

    fn attach_location(&mut self, f: FunctionId, instr: InstrId, loc: SourceLocation) {
        self.module.functions[f].instructions[instr].location = Some(loc);
    }

    fn module(&self) -> &Module {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }
}

fn replace_value(v: &mut ValueRef, old: ValueRef, new: ValueRef) {
    if *v == old {
        *v = new;
    }
}

fn replace_in_op(op: &mut Op, old: ValueRef, new: ValueRef) {
    match op {
        Op::Load { pointer, .. } => replace_value(pointer, old, new),
        Op::Store { pointer, value, .. } => {
            replace_value(pointer, old, new);
            replace_value(value, old, new);
        }
        Op::Gep { base, indices, .. } => {
            replace_value(base, old, new);
            for i in indices {
                replace_value(i, old, new);
            }
        }
        Op::Bitcast { value }
        | Op::PtrCast { value }
        | Op::IntCast { value, .. }
        | Op::FloatCast { value }
        | Op::FpToInt { value, .. }
        | Op::IntToFp { value, .. }
        | Op::PtrToInt { value }
        | Op::IntToPtr { value } => replace_value(value, old, new),
        Op::BinOp { lhs, rhs, .. } => {
            replace_value(lhs, old, new);
            replace_value(rhs, old, new);
        }
        Op::ICmp { lhs, rhs, .. } => {
            replace_value(lhs, old, new);
            replace_value(rhs, old, new);
        }
        Op::FCmp { lhs, rhs, .. } => {
            replace_value(lhs, old, new);
            replace_value(rhs, old, new);
        }
        Op::Select {
            cond,
            if_true,
            if_false,
        } => {
            replace_value(cond, old, new);
            replace_value(if_true, old, new);
            replace_value(if_false, old, new);
        }
        Op::Call { args, .. } => {
            for a in args {
                replace_value(a, old, new);
            }
        }
        Op::ExtractValue { agg, .. } => replace_value(agg, old, new),
        Op::InsertValue { agg, elem, .. } => {
            replace_value(agg, old, new);
            replace_value(elem, old, new);
        }
        Op::ExtractElement { vector, index } => {
            replace_value(vector, old, new);
            replace_value(index, old, new);
        }
        Op::InsertElement {
            vector,
            elem,
            index,
        } => {
            replace_value(vector, old, new);
            replace_value(elem, old, new);
            replace_value(index, old, new);
        }
        Op::ShuffleVector { a, b, .. } => {
            replace_value(a, old, new);
            replace_value(b, old, new);
        }
        Op::Memcpy { dst, src, .. } => {
            replace_value(dst, old, new);
            replace_value(src, old, new);
        }
        Op::Memset { dst, .. } => replace_value(dst, old, new),
        Op::LifetimeStart { pointer } | Op::LifetimeStop { pointer } => {
            replace_value(pointer, old, new)
        }
        Op::Phi { incoming } => {
            for (_, v) in incoming {
                replace_value(v, old, new);
            }
        }
        Op::CondBranch { cond, .. } => replace_value(cond, old, new),
        Op::Switch { selector, .. } => replace_value(selector, old, new),
        Op::Ret { value: Some(v) } => replace_value(v, old, new),
        Op::Ret { value: None }
        | Op::Alloca { .. }
        | Op::Branch { .. }
        | Op::Unreachable => {}
    }
}
