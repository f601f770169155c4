//! Structured-logging adapter for fetch loop events.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::FetchReport;
use crate::domain::ports::{
    BackoffNotice, FetchObserver, FetchState, MalformedDecision, MalformedNotice, OutcomeKind,
    ProgressUpdate, SkipNotice, SkipReason,
};

/// Emits one `tracing` event per fetch loop decision.
///
/// Progress and termination log at `info`, backoffs, skips and malformed
/// responses at `warn`, and per-call chatter at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFetchObserver;

impl FetchObserver for TracingFetchObserver {
    fn on_state_change(&self, run_id: Uuid, state: FetchState) {
        debug!(%run_id, state = state.as_str(), "fetch state changed");
    }

    fn on_outcome(&self, run_id: Uuid, kind: OutcomeKind) {
        debug!(%run_id, outcome = kind.as_str(), "transport call classified");
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        info!(
            run_id = %update.run_id,
            accepted = update.accepted,
            target = update.target,
            "fetched {}/{} ({:.2}%)",
            update.accepted,
            update.target,
            update.percent(),
        );
    }

    fn on_backoff(&self, notice: &BackoffNotice) {
        warn!(
            run_id = %notice.run_id,
            endpoint = %notice.endpoint,
            arguments = %notice.arguments,
            reason = notice.reason.as_str(),
            delay_ms = u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
            will_retry = notice.will_retry,
            consecutive_failures = notice.consecutive_failures,
            "backing off before next request"
        );
    }

    fn on_skip(&self, notice: &SkipNotice) {
        match &notice.reason {
            SkipReason::ClientError { status, message } => warn!(
                run_id = %notice.run_id,
                endpoint = %notice.endpoint,
                arguments = %notice.arguments,
                status,
                error_message = message.as_deref().unwrap_or(""),
                "item skipped after client error"
            ),
            SkipReason::Malformed { reason } => warn!(
                run_id = %notice.run_id,
                endpoint = %notice.endpoint,
                arguments = %notice.arguments,
                %reason,
                "item skipped after malformed response"
            ),
            SkipReason::TransientRetriesExhausted { attempts } => warn!(
                run_id = %notice.run_id,
                endpoint = %notice.endpoint,
                arguments = %notice.arguments,
                attempts,
                "item skipped after exhausting transient retries"
            ),
        }
    }

    fn on_malformed(&self, notice: &MalformedNotice) {
        let (decision, attempt) = match notice.decision {
            MalformedDecision::Skip => ("skip", 0),
            MalformedDecision::Retry { attempt, .. } => ("retry", attempt),
        };
        warn!(
            run_id = %notice.run_id,
            endpoint = %notice.endpoint,
            arguments = %notice.arguments,
            reason = %notice.reason,
            decision,
            attempt,
            "malformed response"
        );
    }

    fn on_terminated(&self, report: &FetchReport) {
        info!(
            run_id = %report.run_id,
            termination = report.termination.as_str(),
            results = report.number_of_results,
            requests = report.amount_of_requests,
            calls = report.call_count,
            skipped = report.skipped,
            filtered_out = report.filtered_out,
            elapsed_ms = report.elapsed().num_milliseconds(),
            "fetch run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    //! Event content checks against a captured JSON subscriber.

    use std::io;
    use std::sync::{Arc, Mutex};

    use rstest::rstest;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::domain::{ArgumentSet, EndpointId};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(emit: impl FnOnce(&TracingFetchObserver)) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(captured.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || emit(&TracingFetchObserver));
        let bytes = captured.0.lock().expect("capture buffer").clone();
        String::from_utf8(bytes).expect("utf-8 log output")
    }

    #[rstest]
    fn progress_reports_count_and_percentage() {
        let output = capture(|observer| {
            observer.on_progress(&ProgressUpdate {
                run_id: Uuid::nil(),
                accepted: 5,
                target: 10,
            });
        });

        assert!(output.contains("fetched 5/10 (50.00%)"), "output: {output}");
        assert!(output.contains(r#""level":"INFO""#), "output: {output}");
    }

    #[rstest]
    fn client_error_skips_carry_status_and_arguments() {
        let output = capture(|observer| {
            observer.on_skip(&SkipNotice {
                run_id: Uuid::nil(),
                endpoint: EndpointId::new("match").expect("valid endpoint"),
                arguments: ArgumentSet::new().with("matchId", 404_i64),
                reason: SkipReason::ClientError {
                    status: 404,
                    message: Some("Not Found".to_owned()),
                },
            });
        });

        assert!(output.contains("item skipped after client error"), "output: {output}");
        assert!(output.contains(r#""status":404"#), "output: {output}");
        assert!(output.contains(r#""arguments":"matchId=404""#), "output: {output}");
        assert!(output.contains(r#""error_message":"Not Found""#), "output: {output}");
        assert!(output.contains(r#""level":"WARN""#), "output: {output}");
    }
}
