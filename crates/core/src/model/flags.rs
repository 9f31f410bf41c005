use std::collections::BTreeSet;

use crate::model::ids::QuestionId;

/// Questions the user marked for later attention during a session.
///
/// Kept in memory only; nothing in the attempt stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlaggedSet(BTreeSet<QuestionId>);

impl FlaggedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag for `id`. Returns whether it is flagged afterwards.
    pub fn toggle(&mut self, id: QuestionId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.0.iter().copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
