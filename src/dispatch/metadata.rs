//! spec.md §4.1.1: metadata opcodes — capabilities, extensions, names,
//! decorations, memory model, entry points, execution modes.

use super::Translator;
use crate::error::{ErrorKind, Result};
use crate::ext_inst::{ExtInstContext, ExtInstSet};
use crate::id::SpvId;
use crate::ir::values::ValueRef;
use crate::opcode::OpcodeRecord;
use crate::state::decorations::{DecorationOperand, DecorationRecord};
use crate::state::{Binding, EntryPointRecord, ExecutionModeRecord};

pub fn translate_noop(_t: &mut Translator<'_>, _record: &OpcodeRecord) -> Result<()> {
    Ok(())
}

pub fn translate_source(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let _language: u32 = cursor.next_u32()?;
    let _version = cursor.next_u32()?;
    if !cursor.is_empty() {
        let _file_id = cursor.next_id().ok();
        if !cursor.is_empty() {
            let text = cursor.next_string().unwrap_or_default();
            t.state.source_metadata.push_str(&text);
        }
    }
    Ok(())
}

pub fn translate_source_continued(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let text = cursor.next_string()?;
    t.state.source_metadata.push_str(&text);
    Ok(())
}

pub fn translate_name(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let target = cursor.next_id()?;
    let name = cursor.next_string()?;
    t.state.names.insert(target, name);
    Ok(())
}

pub fn translate_string(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result = cursor.next_id()?;
    let text = cursor.next_string()?;
    t.state.debug_strings.insert(result, text);
    Ok(())
}

pub fn translate_extension(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let name = cursor.next_string()?;
    if !t.device.supports_extension(&name) {
        return Err(ErrorKind::UnsupportedExtension(name).into());
    }
    t.state.extensions.insert(name);
    Ok(())
}

pub fn translate_capability(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let cap: spirv::Capability = cursor.next_enum()?;
    if !t.device.supports_capability(cap) {
        return Err(ErrorKind::UnsupportedCapability(cap).into());
    }
    t.state.capabilities.insert(cap);
    Ok(())
}

pub fn translate_ext_inst_import(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result = cursor.next_id()?;
    let name = cursor.next_string()?;
    let set = ExtInstSet::from_name(&name)
        .ok_or_else(|| ErrorKind::UnsupportedExtInstSet(name.clone()))?;
    if set.disables_implicit_debug_scopes() {
        t.state.implicit_debug_scopes_enabled = false;
    }
    t.state.extended_instr_sets.insert(result, set);
    t.state.bind(result, record.op(), Binding::ExtInstImport(set));
    Ok(())
}

pub fn translate_ext_inst(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let result_type_id = cursor.next_id()?;
    let result_id = cursor.next_id()?;
    let set_id = cursor.next_id()?;
    let instruction = cursor.next_u32()?;
    let mut operand_ids = Vec::new();
    while !cursor.is_empty() {
        operand_ids.push(cursor.next_id()?);
    }

    let set = match t.state.require_bound(set_id)? {
        Binding::ExtInstImport(set) => set,
        _ => {
            return Err(ErrorKind::MalformedInstruction {
                op: spirv::Op::ExtInst,
                reason: "OpExtInst set operand is not an OpExtInstImport result",
            }
            .into())
        }
    };
    let result_type = t.state.require_type(result_type_id)?;
    let mut operands = Vec::with_capacity(operand_ids.len());
    for id in operand_ids {
        operands.push(t.state.require_value(id)?);
    }

    let function = t.current_function()?;
    let block = t.current_block()?;
    let handler = t.ext_inst.handler_for(set);
    let mut ctx = ExtInstContext {
        builder: t.builder,
        debug: t.debug,
        mangler: t.mangler,
        function,
        block,
        result_type,
        operands,
        literal_words: &[],
    };
    let value = handler.create(instruction, &mut ctx)?;
    if let Some(value) = value {
        if let ValueRef::Instr(instr) = value {
            t.cursor.debug_scope.record_instruction(instr);
        }
        t.state.bind(result_id, record.op(), Binding::Value(value));
    }
    Ok(())
}

fn read_decoration(cursor: &mut crate::opcode::OperandCursor<'_>, decoration: spirv::Decoration) -> DecorationOperand {
    if cursor.is_empty() {
        DecorationOperand::None
    } else {
        match decoration {
            spirv::Decoration::LinkageAttributes => cursor
                .next_string()
                .map(DecorationOperand::String)
                .unwrap_or(DecorationOperand::None),
            _ => cursor
                .next_u32()
                .map(DecorationOperand::Literal)
                .unwrap_or(DecorationOperand::None),
        }
    }
}

pub fn translate_decorate(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let target = cursor.next_id()?;
    let decoration: spirv::Decoration = cursor.next_enum()?;
    let operand = read_decoration(&mut cursor, decoration);
    t.state
        .decorations
        .decorate(target, DecorationRecord { decoration, operand });
    Ok(())
}

pub fn translate_member_decorate(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let target = cursor.next_id()?;
    let member = cursor.next_u32()?;
    let decoration: spirv::Decoration = cursor.next_enum()?;
    let operand = read_decoration(&mut cursor, decoration);
    t.state
        .decorations
        .member_decorate(target, member, DecorationRecord { decoration, operand });
    Ok(())
}

pub fn translate_group_decorate(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let group = cursor.next_id()?;
    let targets = cursor.rest_as_ids()?;
    t.state.decorations.group_decorate(group, &targets);
    Ok(())
}

pub fn translate_group_member_decorate(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let group = cursor.next_id()?;
    let mut pairs = Vec::new();
    while !cursor.is_empty() {
        let target = cursor.next_id()?;
        let member = cursor.next_u32()?;
        pairs.push((target, member));
    }
    t.state.decorations.group_member_decorate(group, &pairs);
    Ok(())
}

pub fn translate_memory_model(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let addressing: spirv::AddressingModel = cursor.next_enum()?;
    let _memory_model: spirv::MemoryModel = cursor.next_enum()?;
    let model = crate::device::AddressingModel::from_spirv(addressing)
        .ok_or(ErrorKind::UnsupportedAddressingModel(addressing))?;
    if model != t.device.addressing_model {
        return Err(ErrorKind::UnsupportedAddressingModel(addressing).into());
    }
    // Logical addressing still needs concrete bitness for the data
    // layout string; the device descriptor supplies it (spec.md §6).
    let bits = if model == crate::device::AddressingModel::Logical {
        t.device.addressing_bits
    } else {
        model.bits()
    };
    t.state.addressing_bits = bits;
    t.builder.module_mut().set_addressing_bits(bits);
    Ok(())
}

pub fn translate_entry_point(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let execution_model: spirv::ExecutionModel = cursor.next_enum()?;
    let function = cursor.next_id()?;
    let name = cursor.next_string()?;
    // Remaining operands are interface global ids; the core does not
    // need them beyond recognizing them as already-valid ids.
    let _interface = cursor.rest_as_ids()?;
    t.state.entry_points.insert(
        function,
        EntryPointRecord {
            execution_model,
            name,
            function,
        },
    );
    Ok(())
}

pub fn translate_execution_mode(t: &mut Translator<'_>, record: &OpcodeRecord) -> Result<()> {
    let mut cursor = record.cursor();
    let entry_point: SpvId = cursor.next_id()?;
    let mode: spirv::ExecutionMode = cursor.next_enum()?;
    let operands = cursor.rest_as_words();
    if mode == spirv::ExecutionMode::LocalSize && operands.len() == 3 {
        t.state.workgroup_size_hint = Some((operands[0], operands[1], operands[2]));
    }
    t.state
        .execution_modes
        .entry(entry_point)
        .or_default()
        .push(ExecutionModeRecord { mode, operands });
    Ok(())
}
