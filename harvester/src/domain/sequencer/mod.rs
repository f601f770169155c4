//! Argument progression for sequenced fetches.
//!
//! A [`Sequencer`] owns the argument state for the next request. It hands out
//! one [`SequenceStep`] per [`Sequencer::next`] call and can undo exactly one
//! step with [`Sequencer::rollback`] so the fetch loop retries the same
//! logical item after a transient failure.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{ArgumentSet, ArgumentValue, EndpointId};

mod progression;

use progression::{FixedListProgression, IncrementingProgression, ProgressionKind};

/// One request's worth of arguments handed out by [`Sequencer::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    /// Endpoint the arguments belong to.
    pub endpoint: EndpointId,
    /// Arguments to send.
    pub arguments: ArgumentSet,
    /// Zero-based logical position in the sequence.
    pub position: usize,
}

/// Errors raised by argument progression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// `rollback` was called without a preceding successful `next`.
    #[error("rollback requires an intervening call to next")]
    RollbackWithoutAdvance,
    /// A fixed-list progression was built from an empty table.
    #[error("fixed-list progression needs at least one parameter")]
    NoFixedArguments,
    /// One of the fixed-list parameters has no values.
    #[error("fixed-list parameter `{parameter}` has no values")]
    EmptyFixedList {
        /// Offending parameter name.
        parameter: String,
    },
}

/// Stateful generator of successive argument sets.
///
/// # Examples
/// ```
/// use harvester::domain::{ArgumentSet, ArgumentValue, EndpointId, Sequencer};
///
/// let endpoint = EndpointId::new("match").expect("valid endpoint");
/// let mut sequencer =
///     Sequencer::incrementing(endpoint, ArgumentSet::new().with("matchId", 100_i64))
///         .with_request_cap(2);
///
/// let first = sequencer.next().expect("first step");
/// assert_eq!(first.arguments.get("matchId"), Some(&ArgumentValue::Integer(100)));
/// sequencer.rollback().expect("one rollback per step");
/// let retry = sequencer.next().expect("retry step");
/// assert_eq!(retry.arguments, first.arguments);
/// assert!(sequencer.next().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Sequencer {
    endpoint: EndpointId,
    kind: ProgressionKind,
    request_cap: u64,
    requests_issued: u64,
    call_count: u64,
    position: usize,
    rollback_armed: bool,
}

impl Sequencer {
    /// Build a progression that adds one to every integer argument per step.
    pub fn incrementing(endpoint: EndpointId, start: ArgumentSet) -> Self {
        Self::from_kind(
            endpoint,
            ProgressionKind::Incrementing(IncrementingProgression::new(start)),
        )
    }

    /// Build a progression that walks per-parameter value lists in lockstep.
    ///
    /// The sequence is as long as the longest list; shorter lists are reused
    /// cyclically.
    ///
    /// # Examples
    /// ```
    /// use std::collections::BTreeMap;
    ///
    /// use harvester::domain::{ArgumentValue, EndpointId, Sequencer};
    ///
    /// let endpoint = EndpointId::new("champion").expect("valid endpoint");
    /// let lists = BTreeMap::from([(
    ///     "id".to_owned(),
    ///     vec![ArgumentValue::Integer(1), ArgumentValue::Integer(7)],
    /// )]);
    /// let mut sequencer = Sequencer::fixed_list(endpoint, lists).expect("valid lists");
    /// assert_eq!(sequencer.next().map(|step| step.position), Some(0));
    /// assert_eq!(sequencer.next().map(|step| step.position), Some(1));
    /// assert!(sequencer.next().is_none());
    /// ```
    pub fn fixed_list(
        endpoint: EndpointId,
        lists: BTreeMap<String, Vec<ArgumentValue>>,
    ) -> Result<Self, SequencerError> {
        let progression = FixedListProgression::new(lists)?;
        Ok(Self::from_kind(
            endpoint,
            ProgressionKind::FixedList(progression),
        ))
    }

    fn from_kind(endpoint: EndpointId, kind: ProgressionKind) -> Self {
        Self {
            endpoint,
            kind,
            request_cap: 0,
            requests_issued: 0,
            call_count: 0,
            position: 0,
            rollback_armed: false,
        }
    }

    /// Cap the number of steps handed out. Zero means unbounded.
    #[must_use]
    pub fn with_request_cap(mut self, request_cap: u64) -> Self {
        self.request_cap = request_cap;
        self
    }

    /// Endpoint this progression drives.
    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    /// Arguments the next call to [`Sequencer::next`] would hand out.
    pub fn current_arguments(&self) -> ArgumentSet {
        self.kind.peek(self.position)
    }

    /// Hand out the next step, or `None` once the progression is exhausted.
    pub fn next(&mut self) -> Option<SequenceStep> {
        self.call_count = self.call_count.saturating_add(1);
        if self.is_exhausted() {
            self.rollback_armed = false;
            return None;
        }

        let Some(arguments) = self.kind.advance(self.position) else {
            self.rollback_armed = false;
            return None;
        };
        let step = SequenceStep {
            endpoint: self.endpoint.clone(),
            arguments,
            position: self.position,
        };
        self.position = self.position.saturating_add(1);
        self.requests_issued = self.requests_issued.saturating_add(1);
        self.rollback_armed = true;
        Some(step)
    }

    /// Undo the most recent step so the next call repeats its arguments.
    ///
    /// The request already issued still counts towards the request cap.
    pub fn rollback(&mut self) -> Result<(), SequencerError> {
        if !self.rollback_armed {
            return Err(SequencerError::RollbackWithoutAdvance);
        }
        self.rollback_armed = false;
        self.position = self.position.saturating_sub(1);
        self.kind.retreat();
        Ok(())
    }

    /// Whether the request cap, the end of a fixed list, or the top of the
    /// `i64` range has been reached.
    pub fn is_exhausted(&self) -> bool {
        let capped = self.request_cap != 0 && self.requests_issued >= self.request_cap;
        capped || self.kind.is_exhausted(self.position)
    }

    /// Total `next` invocations, including ones that reported exhaustion.
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Steps handed out so far; this is what the request cap bounds.
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }
}

#[cfg(test)]
mod tests;
