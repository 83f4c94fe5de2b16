//! spec.md §2 item 4 / §4.1.11: the debug-info builder facade, plus the
//! scope-tracking primitives it hands back to the dispatch core.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct FileId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct CompileUnitId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct SubprogramId(pub u32);

/// Either a subprogram or a lexical block: the two kinds of scope a
/// location can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ScopeId {
    Subprogram(SubprogramId),
    LexicalBlock(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub scope: ScopeId,
    pub inlined_at: Option<ScopeId>,
}

/// spec.md §2 item 4.
pub trait DebugBuilder {
    fn create_file(&mut self, name: String, directory: String) -> FileId;
    fn create_compile_unit(
        &mut self,
        file: FileId,
        language: u32,
        producer: String,
    ) -> CompileUnitId;
    fn create_subprogram(
        &mut self,
        file: FileId,
        name: String,
        line: u32,
        unit: CompileUnitId,
    ) -> SubprogramId;
    fn create_lexical_block(&mut self, parent: ScopeId, file: FileId, line: u32, column: u32) -> u32;
    fn create_location(
        &mut self,
        line: u32,
        column: u32,
        scope: ScopeId,
        inlined_at: Option<ScopeId>,
    ) -> SourceLocation;
}

#[derive(Default)]
pub struct DwarfDebugBuilder {
    next_file: u32,
    next_unit: u32,
    next_subprogram: u32,
    next_block: u32,
    pub files: indexmap::IndexMap<FileId, (String, String)>,
    pub subprograms: indexmap::IndexMap<SubprogramId, (FileId, String, u32, CompileUnitId)>,
}

impl DwarfDebugBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DebugBuilder for DwarfDebugBuilder {
    fn create_file(&mut self, name: String, directory: String) -> FileId {
        let id = FileId(self.next_file);
        self.next_file += 1;
        self.files.insert(id, (name, directory));
        id
    }

    fn create_compile_unit(
        &mut self,
        _file: FileId,
        _language: u32,
        _producer: String,
    ) -> CompileUnitId {
        let id = CompileUnitId(self.next_unit);
        self.next_unit += 1;
        id
    }

    fn create_subprogram(
        &mut self,
        file: FileId,
        name: String,
        line: u32,
        unit: CompileUnitId,
    ) -> SubprogramId {
        let id = SubprogramId(self.next_subprogram);
        self.next_subprogram += 1;
        self.subprograms.insert(id, (file, name, line, unit));
        id
    }

    fn create_lexical_block(
        &mut self,
        _parent: ScopeId,
        _file: FileId,
        _line: u32,
        _column: u32,
    ) -> u32 {
        let id = self.next_block;
        self.next_block += 1;
        id
    }

    fn create_location(
        &mut self,
        line: u32,
        column: u32,
        scope: ScopeId,
        inlined_at: Option<ScopeId>,
    ) -> SourceLocation {
        SourceLocation {
            line,
            column,
            scope,
            inlined_at,
        }
    }
}
