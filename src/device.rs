//! Read-only collaborators the core queries but never owns (spec.md §6).

use crate::FastHashSet;

/// What the target device supports. The core treats every field as
/// read-only for the lifetime of a translation.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct DeviceDescriptor {
    pub addressing_model: AddressingModel,
    pub addressing_bits: u8,
    pub extensions: FastHashSet<String>,
    pub capabilities: FastHashSet<spirv::Capability>,
}

impl DeviceDescriptor {
    pub fn supports_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn supports_capability(&self, cap: spirv::Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum AddressingModel {
    Logical,
    Physical32,
    Physical64,
}

impl Default for AddressingModel {
    fn default() -> Self {
        AddressingModel::Logical
    }
}

impl AddressingModel {
    pub fn from_spirv(model: spirv::AddressingModel) -> Option<Self> {
        match model {
            spirv::AddressingModel::Logical => Some(AddressingModel::Logical),
            spirv::AddressingModel::Physical32 => Some(AddressingModel::Physical32),
            spirv::AddressingModel::Physical64 => Some(AddressingModel::Physical64),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            AddressingModel::Logical => 0,
            AddressingModel::Physical32 => 32,
            AddressingModel::Physical64 => 64,
        }
    }
}

/// A raw specialization value, as supplied by the client for one
/// `SpecId`. Vulkan never hands out 8-byte values; the core substitutes a
/// sentinel in that case rather than failing (spec.md §6).
#[derive(Clone, Debug)]
pub enum SpecializationValue {
    Bytes1([u8; 1]),
    Bytes2([u8; 2]),
    Bytes4([u8; 4]),
    Bytes8([u8; 8]),
}

impl SpecializationValue {
    pub fn as_u64(&self) -> u64 {
        match *self {
            SpecializationValue::Bytes1(b) => b[0] as u64,
            SpecializationValue::Bytes2(b) => u16::from_le_bytes(b) as u64,
            SpecializationValue::Bytes4(b) => u32::from_le_bytes(b) as u64,
            SpecializationValue::Bytes8(b) => u64::from_le_bytes(b),
        }
    }
}

/// Client-supplied specialization constant values, keyed by `SpecId`
/// (spec.md §6). Optional: a module with no provider uses literal
/// defaults throughout.
pub trait SpecializationInfoProvider {
    fn value_for(&self, spec_id: u32) -> Option<SpecializationValue>;
}

#[derive(Default)]
pub struct MapSpecializationInfo {
    values: crate::FastHashMap<u32, SpecializationValue>,
}

impl MapSpecializationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spec_id: u32, value: SpecializationValue) -> Self {
        self.values.insert(spec_id, value);
        self
    }
}

impl SpecializationInfoProvider for MapSpecializationInfo {
    fn value_for(&self, spec_id: u32) -> Option<SpecializationValue> {
        self.values.get(&spec_id).cloned()
    }
}
