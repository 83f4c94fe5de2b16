//! A SPIR-V to low-level IR translator targeting OpenCL-style compute
//! kernels.
//!
//! [`dispatch::Translator`] is the central structure of the crate: feed it
//! an [`opcode::OpcodeRecord`] stream (see [`reader`]) and a
//! [`backend::IrBuilder`]/[`backend::DebugBuilder`] pair, and it drives
//! both to build the target IR one instruction at a time.
#![deny(clippy::panic)]

pub mod arena;
pub mod backend;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod ext_inst;
pub mod id;
pub mod ir;
pub mod opcode;
pub mod reader;
pub mod state;

pub use crate::arena::{Arena, Handle};
pub use crate::dispatch::Translator;

use std::{collections::{HashMap, HashSet}, hash::BuildHasherDefault};

/// Hash map that is faster but not resilient to DoS attacks.
pub type FastHashMap<K, T> = HashMap<K, T, BuildHasherDefault<fxhash::FxHasher>>;
/// Hash set that is faster but not resilient to DoS attacks.
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<fxhash::FxHasher>>;
