/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// Questions selected for this attempt.
    pub total: usize,
    /// Questions with a chosen option.
    pub answered: usize,
    pub skipped: usize,
    pub remaining_unanswered: usize,
    pub position: usize,
    pub flagged: usize,
}
