//! The opcode record: an immutable, typed view over a single SPIR-V
//! instruction (spec.md §2 item 1, §3 "Identifier").
//!
//! A binary reader (see [`crate::reader`]) segments the raw word stream
//! into these records; the dispatch core never looks at raw words itself.

use crate::id::SpvId;
use num_traits::FromPrimitive;

/// All the 32-bit operand words of one instruction, after the leading
/// `(word_count << 16) | opcode` word has been stripped off.
#[derive(Clone, Debug)]
pub struct OpcodeRecord {
    op: spirv::Op,
    word_count: u16,
    operands: Vec<u32>,
}

impl OpcodeRecord {
    pub fn new(op: spirv::Op, operands: Vec<u32>) -> Self {
        OpcodeRecord {
            op,
            word_count: operands.len() as u16 + 1,
            operands,
        }
    }

    pub fn op(&self) -> spirv::Op {
        self.op
    }

    pub fn word_count(&self) -> u16 {
        self.word_count
    }

    pub fn operand_words(&self) -> &[u32] {
        &self.operands
    }

    /// A sequential cursor over this instruction's operand words.
    pub fn cursor(&self) -> OperandCursor<'_> {
        OperandCursor {
            op: self.op,
            words: &self.operands,
            pos: 0,
        }
    }
}

/// Name-safe sequential access over one instruction's operand words.
///
/// Every read advances `pos`; reading past the end or in a shape that
/// does not match the opcode's grammar produces
/// [`crate::error::ErrorKind::MalformedInstruction`].
pub struct OperandCursor<'a> {
    op: spirv::Op,
    words: &'a [u32],
    pos: usize,
}

impl<'a> OperandCursor<'a> {
    fn malformed(&self, reason: &'static str) -> crate::error::ErrorKind {
        crate::error::ErrorKind::MalformedInstruction {
            op: self.op,
            reason,
        }
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u32(&self) -> Option<u32> {
        self.words.get(self.pos).copied()
    }

    pub fn next_u32(&mut self) -> crate::error::Result<u32> {
        let w = self
            .words
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.malformed("expected an operand word, found end of instruction"))?;
        self.pos += 1;
        Ok(w)
    }

    pub fn next_id(&mut self) -> crate::error::Result<SpvId> {
        let raw = self.next_u32()?;
        Ok(SpvId::new(raw).ok_or_else(|| self.malformed("id operand was 0"))?)
    }

    pub fn next_enum<T: FromPrimitive>(&mut self) -> crate::error::Result<T> {
        let raw = self.next_u32()?;
        Ok(T::from_u32(raw).ok_or_else(|| self.malformed("unrecognized enum operand"))?)
    }

    /// Reads a nul-terminated UTF-8 string packed little-endian across
    /// whole words (the SPIR-V `LiteralString` encoding).
    pub fn next_string(&mut self) -> crate::error::Result<String> {
        let mut bytes = Vec::new();
        loop {
            let w = self.next_u32()?;
            let chunk = w.to_le_bytes();
            let mut done = false;
            for b in chunk {
                if b == 0 {
                    done = true;
                    break;
                }
                bytes.push(b);
            }
            if done {
                break;
            }
        }
        Ok(String::from_utf8(bytes).map_err(|_| self.malformed("literal string was not valid UTF-8"))?)
    }

    /// Consumes all remaining words as a list of ids (e.g. the target list
    /// of `OpGroupDecorate`, the constituents of `OpConstantComposite`).
    pub fn rest_as_ids(&mut self) -> crate::error::Result<Vec<SpvId>> {
        let mut out = Vec::with_capacity(self.remaining());
        while !self.is_empty() {
            out.push(self.next_id()?);
        }
        Ok(out)
    }

    pub fn rest_as_words(&mut self) -> Vec<u32> {
        let out = self.words[self.pos..].to_vec();
        self.pos = self.words.len();
        out
    }
}
