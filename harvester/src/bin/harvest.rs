//! Fetch records from a rate-limited JSON API into an NDJSON file.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use harvester::domain::ports::FetchObserver;
use harvester::domain::{FetchReport, Fetcher, FetcherPorts, FieldTallySink, TallyHandle};
use harvester::inbound::cli::{HarvestArgs, HarvestSettings};
use harvester::outbound::endpoint_catalog::TemplateEndpointCatalog;
use harvester::outbound::http::{HttpIdentity, ReqwestRecordTransport};
use harvester::outbound::ndjson_sink::NdjsonFileSink;
use harvester::outbound::tracing_observer::TracingFetchObserver;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = HarvestArgs::parse();
    let settings = HarvestSettings::load_from_iter([OsString::from("harvest")])
        .map_err(|error| eyre!("failed to load HARVEST settings: {error}"))?;

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(harvest(args, settings))
}

async fn harvest(args: HarvestArgs, settings: HarvestSettings) -> Result<()> {
    let identity = settings
        .user_agent
        .clone()
        .map(|user_agent| HttpIdentity { user_agent })
        .unwrap_or_default();
    let transport = ReqwestRecordTransport::with_identity(settings.request_timeout(), identity)
        .wrap_err("build HTTP client")?;
    let catalog = match settings.base_url.as_deref() {
        Some(base) => {
            TemplateEndpointCatalog::riot_with_base(&settings.api_key, settings.region(), base)
        }
        None => TemplateEndpointCatalog::riot(&settings.api_key, settings.region()),
    }
    .wrap_err("build endpoint catalog")?;

    let observer: Arc<dyn FetchObserver> = Arc::new(TracingFetchObserver);
    #[cfg(feature = "metrics")]
    let registry = prometheus::Registry::new();
    #[cfg(feature = "metrics")]
    let observer: Arc<dyn FetchObserver> = Arc::new(
        harvester::outbound::metrics::PrometheusFetchObserver::wrapping(&registry, observer)
            .wrap_err("register fetch metrics")?,
    );

    let ports =
        FetcherPorts::new(Arc::new(transport), Arc::new(catalog)).with_observer(observer);
    let sequencer = args.sequencer().wrap_err("build argument sequence")?;
    let mut fetcher = Fetcher::new(sequencer, ports, args.fetcher_config())
        .wrap_err_with(|| format!("endpoint `{}` cannot be requested", args.endpoint))?;

    for filter in args.filters.iter().cloned() {
        fetcher.register_filter(filter);
    }
    let sink = NdjsonFileSink::create(&args.output, settings.batch_size())
        .wrap_err_with(|| format!("open output {}", args.output.display()))?;
    fetcher.register_sink(sink);
    let tally = args.tally_field.as_deref().map(|field| {
        let (sink, handle) = FieldTallySink::new(field);
        fetcher.register_sink(sink);
        handle
    });

    let report = fetcher.run().await.wrap_err("harvest run failed")?;
    print_summary(&report, tally.as_ref());

    #[cfg(feature = "metrics")]
    print_metrics(&registry)?;

    Ok(())
}

fn print_summary(report: &FetchReport, tally: Option<&TallyHandle>) {
    println!("run_id={}", report.run_id);
    println!("termination={}", report.termination.as_str());
    println!("number_of_results={}", report.number_of_results);
    println!("amount_of_requests={}", report.amount_of_requests);
    println!("call_count={}", report.call_count);
    println!("skipped={}", report.skipped);
    println!("filtered_out={}", report.filtered_out);
    println!("elapsed_ms={}", report.elapsed().num_milliseconds());
    if let Some(tally) = tally {
        for (value, count) in tally.snapshot() {
            println!("tally[{value}]={count}");
        }
    }
}

#[cfg(feature = "metrics")]
fn print_metrics(registry: &prometheus::Registry) -> Result<()> {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .wrap_err("encode fetch metrics")?;
    eprint!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
