//! Domain model and orchestration for sequenced fetching.
//!
//! Purpose: own the argument progression, the fetch loop state machine, and
//! the record predicates and aggregators that need no infrastructure. Outbound
//! effects go through the traits in [`ports`].
//!
//! Public surface:
//! - `ArgumentSet`, `ArgumentValue`, `EndpointId`, `Record`: request and
//!   response data.
//! - `Sequencer`: incrementing or fixed-list argument progression.
//! - `Fetcher`: the fetch loop, with `FetcherConfig` and `FetchReport`.
//! - `FieldMatchFilter`, `FieldTallySink`: stock filter and aggregating sink.

pub mod arguments;
pub mod fetcher;
pub mod filters;
pub mod ports;
pub mod sequencer;
pub mod tally;

pub use self::arguments::{
    ArgumentParseError, ArgumentSet, ArgumentValue, EndpointId, EndpointIdError, Record,
};
pub use self::fetcher::{
    FetchError, FetchReport, FetchSleeper, Fetcher, FetcherConfig, FetcherPorts, FetcherRuntime,
    MalformedPolicy, Termination, TokioSleeper,
};
pub use self::filters::{FieldMatchFilter, FilterRuleError, MatchMode};
pub use self::sequencer::{SequenceStep, Sequencer, SequencerError};
pub use self::tally::{FieldTallySink, TallyHandle};
