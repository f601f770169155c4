//! Per-run arguments for the `harvest` binary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use crate::domain::{
    ArgumentSet, ArgumentValue, EndpointId, FetcherConfig, FieldMatchFilter, MalformedPolicy,
    Sequencer, SequencerError,
};

/// One `--fixed name=v1,v2,...` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedListArg {
    /// Parameter name.
    pub name: String,
    /// Values in request order.
    pub values: Vec<ArgumentValue>,
}

/// `harvest` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "harvest",
    about = "Fetch records from a rate-limited JSON API by sequenced arguments",
    version
)]
pub struct HarvestArgs {
    /// Endpoint to query, for example `match` or `champion`.
    #[arg(long, value_name = "name", value_parser = parse_endpoint)]
    pub endpoint: EndpointId,
    /// Starting argument for an incrementing run. Integer values advance by
    /// one per item.
    #[arg(
        long = "start",
        value_name = "name=value",
        value_parser = parse_start,
        required_unless_present = "fixed",
        conflicts_with = "fixed"
    )]
    pub start: Vec<(String, ArgumentValue)>,
    /// Fixed list of values for one parameter. Lists advance in lockstep.
    #[arg(long = "fixed", value_name = "name=v1,v2", value_parser = parse_fixed)]
    pub fixed: Vec<FixedListArg>,
    /// Stop after this many accepted records.
    #[arg(long = "result-cap", value_name = "count")]
    pub result_cap: u64,
    /// Maximum transport calls, retries included. Zero is unbounded.
    #[arg(long = "request-cap", value_name = "count", default_value_t = 0)]
    pub request_cap: u64,
    /// Keep records whose field matches: `field=a|b` exact or `field~a|b`
    /// substring. Every rule must accept a record.
    #[arg(long = "filter", value_name = "rule", value_parser = parse_filter)]
    pub filters: Vec<FieldMatchFilter>,
    /// NDJSON output file.
    #[arg(long, value_name = "path", default_value = "records.ndjson")]
    pub output: PathBuf,
    /// Report progress every this many accepted records.
    #[arg(long = "update-interval", value_name = "count")]
    pub update_interval: Option<u64>,
    /// Count accepted records per value of this field.
    #[arg(long = "tally-field", value_name = "path")]
    pub tally_field: Option<String>,
    /// Retry malformed responses this many times before skipping the item.
    #[arg(long = "malformed-retries", value_name = "count")]
    pub malformed_retries: Option<u32>,
    /// Skip an item after this many consecutive rate limits or server errors.
    #[arg(long = "max-transient-retries", value_name = "count")]
    pub max_transient_retries: Option<u32>,
}

impl HarvestArgs {
    /// Build the sequencer described by `--start` or `--fixed`.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError`] when a fixed list is empty.
    pub fn sequencer(&self) -> Result<Sequencer, SequencerError> {
        let sequencer = if self.fixed.is_empty() {
            let start: ArgumentSet = self.start.iter().cloned().collect();
            Sequencer::incrementing(self.endpoint.clone(), start)
        } else {
            let lists: BTreeMap<String, Vec<ArgumentValue>> = self
                .fixed
                .iter()
                .map(|list| (list.name.clone(), list.values.clone()))
                .collect();
            Sequencer::fixed_list(self.endpoint.clone(), lists)?
        };
        Ok(sequencer.with_request_cap(self.request_cap))
    }

    /// Loop configuration for this run.
    pub fn fetcher_config(&self) -> FetcherConfig {
        let mut config = FetcherConfig::new(self.result_cap);
        config.update_interval = self.update_interval.filter(|interval| *interval > 0);
        config.malformed_policy = match self.malformed_retries {
            Some(max_retries) if max_retries > 0 => MalformedPolicy::Retry { max_retries },
            _ => MalformedPolicy::Skip,
        };
        config.max_transient_retries = self.max_transient_retries;
        config
    }
}

fn parse_endpoint(raw: &str) -> Result<EndpointId, String> {
    EndpointId::new(raw).map_err(|error| error.to_string())
}

fn parse_start(raw: &str) -> Result<(String, ArgumentValue), String> {
    ArgumentSet::parse_assignment(raw).map_err(|error| error.to_string())
}

fn parse_fixed(raw: &str) -> Result<FixedListArg, String> {
    let (name, _) = ArgumentSet::parse_assignment(raw).map_err(|error| error.to_string())?;
    let values = raw
        .split_once('=')
        .map(|(_, values)| values)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ArgumentValue::parse)
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Err(format!("fixed list `{raw}` has no values"));
    }
    Ok(FixedListArg { name, values })
}

fn parse_filter(raw: &str) -> Result<FieldMatchFilter, String> {
    FieldMatchFilter::parse_rule(raw).map_err(|error| error.to_string())
}
