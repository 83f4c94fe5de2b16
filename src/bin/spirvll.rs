//! CLI front end: read a `.spv` module, translate it through
//! [`spirvll_core::Translator`], and print the resulting IR
//! (SPEC_FULL.md §A).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use spirvll_core::backend::debug::DwarfDebugBuilder;
use spirvll_core::backend::llir::LlirBuilder;
use spirvll_core::backend::mangle::ItaniumMangler;
use spirvll_core::device::{AddressingModel, DeviceDescriptor};
use spirvll_core::ir::instr::Op;
use spirvll_core::ir::Module;
use spirvll_core::reader::{ModuleReader, OpcodeStream};
use spirvll_core::Translator;

#[derive(Parser)]
#[clap(name = "spirvll", about = "Translate a SPIR-V module to OpenCL-targeted low-level IR")]
struct Cli {
    /// Path to the input SPIR-V binary module.
    input: PathBuf,

    /// Write the printed IR here instead of stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Addressing model the module is expected to declare: "logical",
    /// "physical32", or "physical64".
    #[clap(long, default_value = "physical64")]
    addressing_model: String,

    /// Pointer width to assume for a `Logical` addressing model
    /// (ignored for `Physical32`/`Physical64`, which are self-describing).
    #[clap(long, default_value = "64")]
    addressing_bits: u8,

    /// Increase logging verbosity (-v, -vv).
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("spirvll: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(&cli.input)?;
    let (header, body) = ModuleReader::from_bytes(&bytes)?;
    log::info!(
        "read {} ({} words, SPIR-V {}.{}, bound {})",
        cli.input.display(),
        body.len(),
        header.version.0,
        header.version.1,
        header.bound
    );

    let mut builder = LlirBuilder::new();
    let mut debug = DwarfDebugBuilder::new();
    let mangler = ItaniumMangler;
    let addressing_model = match cli.addressing_model.as_str() {
        "logical" => AddressingModel::Logical,
        "physical32" => AddressingModel::Physical32,
        _ => AddressingModel::Physical64,
    };
    let device = DeviceDescriptor {
        addressing_model,
        addressing_bits: cli.addressing_bits,
        ..DeviceDescriptor::default()
    };

    let mut translator = Translator::new(&mut builder, &mut debug, &mangler, &device);
    translator.translate_module(OpcodeStream::new(&body))?;

    let rendered = render_module(builder.module());
    match &cli.output {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{}", rendered),
    }
    Ok(())
}

/// A minimal, LLVM-flavored text dump: enough to inspect what a
/// translation produced without pulling in a real textual-IR printer
/// (spec.md §1: emitting that representation is the host backend's job,
/// not this core's).
fn render_module(module: &Module) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "target datalayout = \"{}\"", module.data_layout);
    let _ = writeln!(out, "target triple = \"{}\"", module.target_triple);
    if !module.source_metadata.is_empty() {
        let _ = writeln!(out, "; source: {}", module.source_metadata);
    }

    for (handle, global) in module.globals.iter() {
        let _ = writeln!(
            out,
            "@{} = {:?} addrspace({}) global {:?} ; {:?}",
            global.name, global.linkage, global.addr_space, global.ty, handle
        );
    }

    for (_, function) in module.functions.iter() {
        if function.is_declaration_only {
            let _ = writeln!(out, "declare {:?} @{}(...)", function.ty, function.name);
            continue;
        }
        let _ = writeln!(
            out,
            "define {:?} @{}({} params) {:?} {{",
            function.ty,
            function.name,
            function.params.len(),
            function.attrs
        );
        for block_id in &function.block_order {
            let _ = writeln!(out, "  {:?}:", block_id);
            for instr_id in &function.blocks[*block_id].instructions {
                let instr = &function.instructions[*instr_id];
                let _ = writeln!(out, "    {:?} = {:?}", instr_id, instr.op);
            }
        }
        let _ = writeln!(out, "}}");
    }
    out
}
