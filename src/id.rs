use std::num::NonZeroU32;

/// A SPIR-V result id. IDs are 32-bit, non-zero, and share a single flat
/// namespace across types, values, labels, and everything else the module
/// declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct SpvId(NonZeroU32);

impl SpvId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(SpvId)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Debug for SpvId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl std::fmt::Display for SpvId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}
