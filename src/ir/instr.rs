use crate::ir::types::TypeId;
use crate::ir::values::ValueRef;
use indexmap::IndexMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum FloatPredicate {
    OEq,
    ONe,
    OGt,
    OGe,
    OLt,
    OLe,
    Ord,
    Uno,
    UEq,
    UNe,
    UGt,
    UGe,
    ULt,
    ULe,
}

bitflags::bitflags! {
    /// Overflow-wrap decorations honored on add/sub/mul/shl (spec.md §4.1.6).
    pub struct WrapFlags: u8 {
        const NO_SIGNED_WRAP = 0x1;
        const NO_UNSIGNED_WRAP = 0x2;
    }
}

bitflags::bitflags! {
    /// `MemoryAccess` mask bits the core cares about (spec.md §4.1.5).
    pub struct MemoryAccessFlags: u8 {
        const VOLATILE = 0x1;
        const ALIGNED = 0x2;
    }
}

bitflags::bitflags! {
    pub struct CallAttrFlags: u16 {
        const NO_MERGE = 0x1;
        const NO_DUPLICATE = 0x2;
        const CONVERGENT = 0x4;
        const ALWAYS_INLINE = 0x8;
    }
}

/// One instruction inside a function body. Every variant corresponds to
/// one of the families in spec.md §4.1.5-§4.1.10.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum Op {
    Alloca {
        pointee: TypeId,
        align: Option<u32>,
    },
    Load {
        pointer: ValueRef,
        flags: MemoryAccessFlags,
        align: Option<u32>,
    },
    Store {
        pointer: ValueRef,
        value: ValueRef,
        flags: MemoryAccessFlags,
        align: Option<u32>,
    },
    Gep {
        base: ValueRef,
        indices: Vec<ValueRef>,
        in_bounds: bool,
    },
    Bitcast {
        value: ValueRef,
    },
    PtrCast {
        value: ValueRef,
    },
    IntCast {
        value: ValueRef,
        signed: bool,
        truncating: bool,
    },
    FloatCast {
        value: ValueRef,
    },
    FpToInt {
        value: ValueRef,
        signed: bool,
        saturating: bool,
    },
    IntToFp {
        value: ValueRef,
        signed: bool,
    },
    PtrToInt {
        value: ValueRef,
    },
    IntToPtr {
        value: ValueRef,
    },
    BinOp {
        op: &'static str,
        lhs: ValueRef,
        rhs: ValueRef,
        wrap: WrapFlags,
    },
    ICmp {
        pred: IntPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    FCmp {
        pred: FloatPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    Select {
        cond: ValueRef,
        if_true: ValueRef,
        if_false: ValueRef,
    },
    Call {
        callee: String,
        args: Vec<ValueRef>,
        attrs: CallAttrFlags,
    },
    ExtractValue {
        agg: ValueRef,
        indices: Vec<u32>,
    },
    InsertValue {
        agg: ValueRef,
        elem: ValueRef,
        indices: Vec<u32>,
    },
    ExtractElement {
        vector: ValueRef,
        index: ValueRef,
    },
    InsertElement {
        vector: ValueRef,
        elem: ValueRef,
        index: ValueRef,
    },
    ShuffleVector {
        a: ValueRef,
        b: ValueRef,
        mask: Vec<Option<u32>>,
    },
    Memcpy {
        dst: ValueRef,
        src: ValueRef,
        len_bytes: u64,
        volatile: bool,
    },
    Memset {
        dst: ValueRef,
        byte: u8,
        len_bytes: u64,
    },
    LifetimeStart {
        pointer: ValueRef,
    },
    LifetimeStop {
        pointer: ValueRef,
    },
    Phi {
        incoming: Vec<(crate::ir::function::BlockId, ValueRef)>,
    },
    Branch {
        target: crate::ir::function::BlockId,
    },
    CondBranch {
        cond: ValueRef,
        if_true: crate::ir::function::BlockId,
        if_false: crate::ir::function::BlockId,
        weights: Option<(u32, u32)>,
    },
    Switch {
        selector: ValueRef,
        default: crate::ir::function::BlockId,
        cases: Vec<(u64, crate::ir::function::BlockId)>,
    },
    Ret {
        value: Option<ValueRef>,
    },
    Unreachable,
}

/// A single instruction plus its static result type and any attached
/// debug location (spec.md §4.1.11).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct Instruction {
    pub op: Op,
    pub ty: TypeId,
    pub location: Option<crate::backend::debug::SourceLocation>,
}

pub type LoopMetadata = IndexMap<&'static str, bool>;
