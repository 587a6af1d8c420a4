use thiserror::Error;

pub const RECALL_MARKER: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("{0}: event not found")]
    EventNotFound(usize),
    #[error("{0}: event not found")]
    InvalidEvent(String),
}

/// Fixed-size ring of accepted input lines. Slot indices are stable: the
/// line at index `n` stays there until the cursor wraps around onto it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    slots: Vec<Option<String>>,
    cursor: usize,
    written: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            cursor: 0,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        if self.slots.is_empty() {
            return;
        }

        self.slots[self.cursor] = Some(line.into());
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.written += 1;
    }

    pub fn recall(&self, index: usize) -> Result<&str, HistoryError> {
        if index >= self.written.min(self.capacity()) {
            return Err(HistoryError::EventNotFound(index));
        }

        self.slots[index]
            .as_deref()
            .ok_or(HistoryError::EventNotFound(index))
    }

    /// Written slots in index order.
    pub fn list(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_deref().map(|line| (index, line)))
    }
}

/// `Some` when the line is a recall directive such as `!3`.
pub fn parse_recall(line: &str) -> Option<Result<usize, HistoryError>> {
    let event = line.strip_prefix(RECALL_MARKER)?;

    Some(
        event
            .trim()
            .parse::<usize>()
            .map_err(|_| HistoryError::InvalidEvent(event.to_owned())),
    )
}
