//! The extended-instruction handler registry (spec.md §2 item 6, §4.4).

pub mod debug_info;
pub mod group_async_copies;
pub mod opencl_debug_info_100;
pub mod opencl_std;

use crate::backend::{DebugBuilder, IrBuilder, Mangler};
use crate::error::Result;
use crate::ir::function::BlockId;
use crate::ir::FunctionId;
use crate::ir::types::TypeId;
use crate::ir::values::ValueRef;

/// The fixed set of extended-instruction-set names the core recognizes
/// (spec.md §4.1.1). Any other `OpExtInstImport` string fails with
/// `UnsupportedExtInstSet`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ExtInstSet {
    OpenClStd,
    GroupAsyncCopies,
    DebugInfo,
    OpenClDebugInfo100,
}

impl ExtInstSet {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OpenCL.std" => Some(ExtInstSet::OpenClStd),
            "Codeplay.GroupAsyncCopies" | "NonSemantic.Codeplay.GroupAsyncCopies" => {
                Some(ExtInstSet::GroupAsyncCopies)
            }
            "DebugInfo" => Some(ExtInstSet::DebugInfo),
            "OpenCL.DebugInfo.100" => Some(ExtInstSet::OpenClDebugInfo100),
            _ => None,
        }
    }

    /// spec.md §4.1.1: importing either debug set disables implicit
    /// debug-scope synthesis — the set owns scope creation instead.
    pub fn disables_implicit_debug_scopes(self) -> bool {
        matches!(self, ExtInstSet::DebugInfo | ExtInstSet::OpenClDebugInfo100)
    }
}

/// Context handed to an ext-inst handler: everything it needs to emit IR
/// for one instruction number without reaching back into the dispatch
/// core's internals (spec.md §4.4: "the core does not inspect the
/// handler's internals", the dual of which is that handlers don't
/// inspect the core's).
pub struct ExtInstContext<'a> {
    pub builder: &'a mut dyn IrBuilder,
    pub debug: &'a mut dyn DebugBuilder,
    pub mangler: &'a dyn Mangler,
    pub function: FunctionId,
    pub block: BlockId,
    pub result_type: TypeId,
    pub operands: Vec<ValueRef>,
    /// Any trailing literal (non-id) words the instruction number needs,
    /// already stripped of the leading result-type/result-id/ext-set
    /// words by the dispatch core.
    pub literal_words: &'a [u32],
}

/// spec.md §4.4: `create(op) -> Ok | Err`. Returns the `ValueRef` the
/// instruction number produced, if it produces a result.
pub trait ExtInstHandler {
    fn create(&mut self, instruction: u32, ctx: &mut ExtInstContext<'_>) -> Result<Option<ValueRef>>;
}

pub struct ExtInstRegistry {
    opencl_std: opencl_std::OpenClStdHandler,
    group_async_copies: group_async_copies::GroupAsyncCopiesHandler,
    debug_info: debug_info::DebugInfoHandler,
    opencl_debug_info_100: opencl_debug_info_100::OpenClDebugInfo100Handler,
}

impl Default for ExtInstRegistry {
    fn default() -> Self {
        ExtInstRegistry {
            opencl_std: opencl_std::OpenClStdHandler::default(),
            group_async_copies: group_async_copies::GroupAsyncCopiesHandler::default(),
            debug_info: debug_info::DebugInfoHandler::default(),
            opencl_debug_info_100: opencl_debug_info_100::OpenClDebugInfo100Handler::default(),
        }
    }
}

impl ExtInstRegistry {
    pub fn handler_for(&mut self, set: ExtInstSet) -> &mut dyn ExtInstHandler {
        match set {
            ExtInstSet::OpenClStd => &mut self.opencl_std,
            ExtInstSet::GroupAsyncCopies => &mut self.group_async_copies,
            ExtInstSet::DebugInfo => &mut self.debug_info,
            ExtInstSet::OpenClDebugInfo100 => &mut self.opencl_debug_info_100,
        }
    }
}
