//! Shared scaffolding for the end-to-end scenario/property tests: builds a
//! `Translator` around the concrete `LlirBuilder`/`DwarfDebugBuilder`/
//! `ItaniumMangler` and feeds it a hand-built `OpcodeRecord` stream,
//! bypassing the binary reader entirely (spec.md §1 places the reader out
//! of scope for the core under test here).

use spirvll_core::backend::debug::DwarfDebugBuilder;
use spirvll_core::backend::llir::LlirBuilder;
use spirvll_core::backend::mangle::ItaniumMangler;
use spirvll_core::device::{AddressingModel, DeviceDescriptor, SpecializationInfoProvider};
use spirvll_core::error::Result;
use spirvll_core::ir::Module;
use spirvll_core::opcode::OpcodeRecord;
use spirvll_core::state::ModuleState;
use spirvll_core::{FastHashSet, Translator};

pub fn rec(op: spirv::Op, words: Vec<u32>) -> OpcodeRecord {
    OpcodeRecord::new(op, words)
}

/// Packs a SPIR-V `LiteralString` operand: UTF-8 bytes, nul-terminated,
/// padded to a whole number of 4-byte little-endian words.
pub fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn device(capabilities: &[spirv::Capability], addressing_model: AddressingModel, addressing_bits: u8) -> DeviceDescriptor {
    DeviceDescriptor {
        addressing_model,
        addressing_bits,
        extensions: FastHashSet::default(),
        capabilities: capabilities.iter().copied().collect(),
    }
}

/// Translates `records` against `device` with no specialization info
/// provider, returning the finished module.
pub fn run(device: &DeviceDescriptor, records: Vec<OpcodeRecord>) -> Result<Module> {
    run_with_spec_info(device, records, None).map(|(module, _)| module)
}

pub fn run_with_spec_info(
    device: &DeviceDescriptor,
    records: Vec<OpcodeRecord>,
    spec_info: Option<Box<dyn SpecializationInfoProvider>>,
) -> Result<(Module, ModuleState)> {
    let mut builder = LlirBuilder::new();
    let mut debug = DwarfDebugBuilder::new();
    let mangler = ItaniumMangler;
    let mut translator = Translator::new(&mut builder, &mut debug, &mangler, device);
    translator.state.spec_info = spec_info;
    translator.translate_module(records.into_iter().map(Ok))?;
    let state = translator.state;
    Ok((builder.into_module(), state))
}
