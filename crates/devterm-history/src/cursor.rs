/// Position of an in-progress history recall.
///
/// A reset cursor points past the newest entry. Tabs keep their own cursor
/// and reset it whenever a command is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCursor {
    position: Option<usize>,
}

impl HistoryCursor {
    pub fn reset() -> Self {
        Self::default()
    }

    pub(crate) fn at(position: usize) -> Self {
        Self {
            position: Some(position),
        }
    }

    pub fn is_reset(&self) -> bool {
        self.position.is_none()
    }

    /// Index of the recalled entry, oldest first.
    pub fn position(&self) -> Option<usize> {
        self.position
    }
}
