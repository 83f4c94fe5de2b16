//! Binary word-stream → [`OpcodeRecord`] segmentation (SPEC_FULL.md §A).
//!
//! spec.md places this out of scope for the core itself ("the core does
//! not parse this directly"); it is implemented here as a standalone,
//! swappable piece so the crate is runnable end to end without an
//! external reader.

use crate::error::{ErrorKind, Result};
use crate::opcode::OpcodeRecord;
use num_traits::FromPrimitive;

pub const MAGIC_NUMBER: u32 = 0x0723_0203;

#[derive(Clone, Copy, Debug)]
pub struct ModuleHeader {
    pub version: (u8, u8),
    pub generator: u32,
    pub bound: u32,
}

/// Splits a raw SPIR-V binary (little-endian 32-bit words) into a header
/// plus a lazily-decoded sequence of [`OpcodeRecord`]s.
pub struct ModuleReader<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> ModuleReader<'a> {
    /// `bytes` must be a whole number of 4-byte little-endian words.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<(ModuleHeader, Vec<u32>)> {
        if bytes.len() % 4 != 0 {
            return Err(ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "module length is not a multiple of 4 bytes",
            }
            .into());
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let mut reader = ModuleReader {
            words: &words,
            pos: 0,
        };
        let header = reader.read_header()?;
        let body = words[5..].to_vec();
        Ok((header, body))
    }

    fn next_word(&mut self) -> Result<u32> {
        let w = self.words.get(self.pos).copied().ok_or_else(|| {
            ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "unexpected end of module while reading header",
            }
        })?;
        self.pos += 1;
        Ok(w)
    }

    fn read_header(&mut self) -> Result<ModuleHeader> {
        let magic = self.next_word()?;
        if magic != MAGIC_NUMBER {
            return Err(ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "bad magic number",
            }
            .into());
        }
        let version = self.next_word()?;
        let generator = self.next_word()?;
        let bound = self.next_word()?;
        let _schema = self.next_word()?;
        Ok(ModuleHeader {
            version: (((version >> 16) & 0xff) as u8, ((version >> 8) & 0xff) as u8),
            generator,
            bound,
        })
    }
}

/// Walks a module's body words (post-header, as returned by
/// [`ModuleReader::from_bytes`]) and yields one [`OpcodeRecord`] per
/// instruction.
pub struct OpcodeStream<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> OpcodeStream<'a> {
    pub fn new(body: &'a [u32]) -> Self {
        OpcodeStream { words: body, pos: 0 }
    }
}

impl<'a> Iterator for OpcodeStream<'a> {
    type Item = Result<OpcodeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.words.len() {
            return None;
        }
        let leading = self.words[self.pos];
        let word_count = (leading >> 16) as usize;
        let opcode_number = leading & 0xffff;
        if word_count == 0 || self.pos + word_count > self.words.len() {
            return Some(Err(ErrorKind::MalformedInstruction {
                op: spirv::Op::Nop,
                reason: "instruction word count overruns the module",
            }
            .into()));
        }
        let op = match spirv::Op::from_u32(opcode_number) {
            Some(op) => op,
            None => {
                return Some(Err(ErrorKind::MalformedInstruction {
                    op: spirv::Op::Nop,
                    reason: "unrecognized opcode number",
                }
                .into()))
            }
        };
        let operands = self.words[self.pos + 1..self.pos + word_count].to_vec();
        self.pos += word_count;
        Some(Ok(OpcodeRecord::new(op, operands)))
    }
}
