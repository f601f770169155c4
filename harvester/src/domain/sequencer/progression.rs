//! Strategy state behind [`Sequencer`](super::Sequencer).

use std::collections::BTreeMap;

use crate::domain::{ArgumentSet, ArgumentValue};

use super::SequencerError;

/// Progression strategy chosen at construction.
#[derive(Debug, Clone)]
pub(super) enum ProgressionKind {
    Incrementing(IncrementingProgression),
    FixedList(FixedListProgression),
}

impl ProgressionKind {
    pub(super) fn peek(&self, position: usize) -> ArgumentSet {
        match self {
            Self::Incrementing(state) => state.peek(),
            Self::FixedList(state) => state.tuple_at(position),
        }
    }

    pub(super) fn advance(&mut self, position: usize) -> Option<ArgumentSet> {
        match self {
            Self::Incrementing(state) => state.advance(),
            Self::FixedList(state) => Some(state.tuple_at(position)),
        }
    }

    /// Position is tracked by the sequencer; only incrementing state moves here.
    pub(super) fn retreat(&mut self) {
        if let Self::Incrementing(state) = self {
            state.retreat();
        }
    }

    pub(super) fn is_exhausted(&self, position: usize) -> bool {
        match self {
            Self::Incrementing(state) => state.next.is_none(),
            Self::FixedList(state) => position >= state.length,
        }
    }
}

/// `next` is `None` once an integer argument would overflow.
#[derive(Debug, Clone)]
pub(super) struct IncrementingProgression {
    next: Option<ArgumentSet>,
    last_issued: Option<ArgumentSet>,
}

impl IncrementingProgression {
    pub(super) fn new(start: ArgumentSet) -> Self {
        Self {
            next: Some(start),
            last_issued: None,
        }
    }

    fn peek(&self) -> ArgumentSet {
        self.next
            .as_ref()
            .or(self.last_issued.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Option<ArgumentSet> {
        let issued = self.next.take()?;
        self.next = issued.incremented();
        self.last_issued = Some(issued.clone());
        Some(issued)
    }

    /// Restores the snapshot of the last issued set rather than stepping back.
    fn retreat(&mut self) {
        if let Some(issued) = self.last_issued.take() {
            self.next = Some(issued);
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct FixedListProgression {
    lists: BTreeMap<String, Vec<ArgumentValue>>,
    length: usize,
}

impl FixedListProgression {
    pub(super) fn new(lists: BTreeMap<String, Vec<ArgumentValue>>) -> Result<Self, SequencerError> {
        if lists.is_empty() {
            return Err(SequencerError::NoFixedArguments);
        }
        if let Some((parameter, _)) = lists.iter().find(|(_, values)| values.is_empty()) {
            return Err(SequencerError::EmptyFixedList {
                parameter: parameter.clone(),
            });
        }
        let length = lists.values().map(Vec::len).max().unwrap_or_default();
        Ok(Self { lists, length })
    }

    fn tuple_at(&self, position: usize) -> ArgumentSet {
        self.lists
            .iter()
            .filter_map(|(name, values)| {
                let len = values.len();
                values
                    .get(position % len.max(1))
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}
