//! Decoration storage and group replay (spec.md §3, §4.2).

use crate::id::SpvId;
use indexmap::IndexMap;

#[derive(Clone, Debug)]
pub enum DecorationOperand {
    None,
    Literal(u32),
    String(String),
}

#[derive(Clone, Debug)]
pub struct DecorationRecord {
    pub decoration: spirv::Decoration,
    pub operand: DecorationOperand,
}

/// Ordered, insertion-stable decoration tables. A `Vec` per key preserves
/// "first decoration of kind K" semantics without needing a secondary
/// ordering index (spec.md §4.2).
#[derive(Default)]
pub struct DecorationTable {
    on_id: IndexMap<SpvId, Vec<DecorationRecord>>,
    on_member: IndexMap<(SpvId, u32), Vec<DecorationRecord>>,
    /// Ids which are themselves decoration groups (`OpDecorationGroup`);
    /// their entries in `on_id` are replayed, never applied directly.
    groups: crate::FastHashSet<SpvId>,
}

impl DecorationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_group(&mut self, id: SpvId) {
        self.groups.insert(id);
    }

    pub fn is_group(&self, id: SpvId) -> bool {
        self.groups.contains(&id)
    }

    pub fn decorate(&mut self, target: SpvId, record: DecorationRecord) {
        self.on_id.entry(target).or_default().push(record);
    }

    pub fn member_decorate(&mut self, target: SpvId, member: u32, record: DecorationRecord) {
        self.on_member
            .entry((target, member))
            .or_default()
            .push(record);
    }

    pub fn decorations_of(&self, target: SpvId) -> &[DecorationRecord] {
        self.on_id.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn member_decorations_of(&self, target: SpvId, member: u32) -> &[DecorationRecord] {
        self.on_member
            .get(&(target, member))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First decoration of kind `kind` attached to `target`, if any.
    pub fn first_of(&self, target: SpvId, kind: spirv::Decoration) -> Option<&DecorationRecord> {
        self.decorations_of(target)
            .iter()
            .find(|d| d.decoration == kind)
    }

    pub fn has(&self, target: SpvId, kind: spirv::Decoration) -> bool {
        self.first_of(target, kind).is_some()
    }

    /// `OpGroupDecorate`: replay every decoration attached to `group` onto
    /// each of `targets` (spec.md §4.1.1).
    pub fn group_decorate(&mut self, group: SpvId, targets: &[SpvId]) {
        let records = self.on_id.get(&group).cloned().unwrap_or_default();
        for &target in targets {
            for record in &records {
                self.decorate(target, record.clone());
            }
        }
    }

    /// `OpGroupMemberDecorate`: replay onto (target, member) pairs.
    pub fn group_member_decorate(&mut self, group: SpvId, targets: &[(SpvId, u32)]) {
        let records = self.on_id.get(&group).cloned().unwrap_or_default();
        for &(target, member) in targets {
            for record in &records {
                self.member_decorate(target, member, record.clone());
            }
        }
    }
}
