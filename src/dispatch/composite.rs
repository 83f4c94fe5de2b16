//! spec.md §4.1.9: vector/aggregate extract, insert, shuffle, and
//! construction.

use super::Translator;
use crate::backend::IrBuilder;
use crate::error::{ErrorKind, Result};
use crate::ir::instr::Op;
use crate::ir::types::TypeInner;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::Binding;

/// SPIR-V's `0xFFFFFFFF` shuffle-component literal marks an undefined
/// lane; `ShuffleVector`'s mask models that as `None` (spec.md §4.1.9).
const UNDEF_COMPONENT: u32 = 0xFFFF_FFFF;

pub fn translate_composite(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    use spirv::Op::*;
    match record.op() {
        VectorExtractDynamic => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let vector_id = cursor.next_id()?;
            let index_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let vector = t.state.require_value(vector_id)?;
            let index = t.state.require_value(index_id)?;
            let instr = t.insert(ty, Op::ExtractElement { vector, index })?;
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
            Ok(())
        }
        VectorInsertDynamic => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let vector_id = cursor.next_id()?;
            let component_id = cursor.next_id()?;
            let index_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let vector = t.state.require_value(vector_id)?;
            let elem = t.state.require_value(component_id)?;
            let index = t.state.require_value(index_id)?;
            let instr = t.insert(ty, Op::InsertElement { vector, elem, index })?;
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
            Ok(())
        }
        VectorShuffle => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let vector1_id = cursor.next_id()?;
            let vector2_id = cursor.next_id()?;
            let ty = t.state.require_type(result_type_id)?;
            let a = t.state.require_value(vector1_id)?;
            let b = t.state.require_value(vector2_id)?;
            let mut mask = Vec::new();
            while !cursor.is_empty() {
                let component = cursor.next_u32()?;
                mask.push(if component == UNDEF_COMPONENT { None } else { Some(component) });
            }
            let instr = t.insert(ty, Op::ShuffleVector { a, b, mask })?;
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
            Ok(())
        }
        CompositeConstruct => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let constituent_ids = cursor.rest_as_ids()?;
            let ty = t.state.require_type(result_type_id)?;
            let constituents = constituent_ids
                .iter()
                .map(|id| t.state.require_value(*id))
                .collect::<Result<Vec<_>>>()?;

            let is_vector = matches!(t.builder.module().types[ty].inner, TypeInner::Vector { .. });
            let mut agg = ValueRef::Poison(ty);
            for (i, elem) in constituents.into_iter().enumerate() {
                let op = if is_vector {
                    let index = ValueRef::Const(t.builder.const_int(t.builder.int_type(32, false), i as u64));
                    Op::InsertElement { vector: agg, elem, index }
                } else {
                    Op::InsertValue { agg, elem, indices: vec![i as u32] }
                };
                let instr = t.insert(ty, op)?;
                agg = ValueRef::Instr(instr);
            }
            t.state.bind(result, record.op(), Binding::Value(agg));
            Ok(())
        }
        CompositeExtract => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let composite_id = cursor.next_id()?;
            let indices = cursor.rest_as_words();
            let ty = t.state.require_type(result_type_id)?;
            let agg = t.state.require_value(composite_id)?;

            let agg_ty = t.value_type(agg);
            let is_vector = matches!(t.builder.module().types[agg_ty].inner, TypeInner::Vector { .. });
            let instr = if is_vector && indices.len() == 1 {
                let index = ValueRef::Const(t.builder.const_int(t.builder.int_type(32, false), indices[0] as u64));
                t.insert(ty, Op::ExtractElement { vector: agg, index })?
            } else {
                t.insert(ty, Op::ExtractValue { agg, indices })?
            };
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
            Ok(())
        }
        CompositeInsert => {
            let mut cursor = record.cursor();
            let result_type_id = cursor.next_id()?;
            let result = cursor.next_id()?;
            let object_id = cursor.next_id()?;
            let composite_id = cursor.next_id()?;
            let indices = cursor.rest_as_words();
            let ty = t.state.require_type(result_type_id)?;
            let elem = t.state.require_value(object_id)?;
            let agg = t.state.require_value(composite_id)?;

            let is_vector = matches!(t.builder.module().types[ty].inner, TypeInner::Vector { .. });
            let instr = if is_vector && indices.len() == 1 {
                let index = ValueRef::Const(t.builder.const_int(t.builder.int_type(32, false), indices[0] as u64));
                t.insert(ty, Op::InsertElement { vector: agg, elem, index })?
            } else {
                t.insert(ty, Op::InsertValue { agg, elem, indices })?
            };
            t.state.bind(result, record.op(), Binding::Value(ValueRef::Instr(instr)));
            Ok(())
        }
        other => Err(ErrorKind::UnsupportedOpcode(other).into()),
    }
}
