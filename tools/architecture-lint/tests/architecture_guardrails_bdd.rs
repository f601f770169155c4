//! Behaviour tests for the architecture guardrails.

use std::fs;
use std::path::{Path, PathBuf};

use architecture_lint::{ArchitectureLintError, Violation};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const VALID_ARGUMENTS: &str =
    "pub struct EndpointId(String); impl EndpointId { pub fn new(v: &str) -> Self { Self(v.to_owned()) } }";
const VALID_CLI: &str = "use crate::domain::arguments::EndpointId; use clap::Parser; \
     fn build() { let _id = EndpointId::new(\"match\"); }";
const VALID_TRANSPORT: &str = "use crate::domain::arguments::EndpointId; use reqwest::Client; \
     pub struct Transport; impl Transport { pub fn send(&self, _id: EndpointId) {} }";

#[derive(Debug)]
struct LintWorld {
    workspace: TempDir,
    result: Option<Result<(), ArchitectureLintError>>,
}

impl LintWorld {
    fn crate_dir(&self) -> PathBuf {
        self.workspace.path().join("harvester")
    }

    fn write_source(&self, relative: &str, contents: &str) {
        let path = self.crate_dir().join("src").join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write source file");
    }

    fn write_valid_modules(&self) {
        self.write_source("domain/arguments.rs", VALID_ARGUMENTS);
        self.write_source("inbound/cli/args.rs", VALID_CLI);
        self.write_source("outbound/http/transport.rs", VALID_TRANSPORT);
    }

    fn violations(&self) -> Vec<Violation> {
        match self.result.as_ref().expect("lint must have run") {
            Ok(()) => panic!("expected violations, lint succeeded"),
            Err(ArchitectureLintError::Violations(violations)) => violations.clone(),
            Err(other) => panic!("expected violations error, got: {other:?}"),
        }
    }

    fn assert_violation(&self, file: &str, fragment: &str) {
        let violations = self.violations();
        assert!(
            violations
                .iter()
                .any(|violation| violation.file == Path::new(file)
                    && violation.message.contains(fragment)),
            "expected violation in '{file}' containing '{fragment}', got: {violations:?}"
        );
    }
}

#[fixture]
fn world() -> LintWorld {
    LintWorld {
        workspace: TempDir::new().expect("tempdir"),
        result: None,
    }
}

#[given("valid domain, inbound, and outbound modules")]
fn valid_modules(world: &mut LintWorld) {
    world.write_valid_modules();
}

#[given("an inbound module that imports the outbound layer")]
fn inbound_imports_outbound(world: &mut LintWorld) {
    world.write_source(
        "inbound/cli/args.rs",
        "use harvester::outbound::ndjson_sink; fn build() { let _ = ndjson_sink::NdjsonFileSink::create; }",
    );
}

#[given("an inbound module that imports reqwest directly")]
fn inbound_imports_reqwest(world: &mut LintWorld) {
    world.write_source(
        "inbound/cli/args.rs",
        "use reqwest::Client; fn build() { let _ = Client::new; }",
    );
}

#[given("a domain module that imports tracing")]
fn domain_imports_tracing(world: &mut LintWorld) {
    world.write_source(
        "domain/fetcher/mod.rs",
        "use tracing::warn; fn back_off() { warn!(\"backing off\"); }",
    );
}

#[given("an outbound module that imports the inbound layer")]
fn outbound_imports_inbound(world: &mut LintWorld) {
    world.write_source(
        "outbound/http/bad_cross_boundary.rs",
        "use crate::inbound::cli; fn send() { let _ = 1; }",
    );
}

#[given("valid modules mixed with multiple boundary violations")]
fn valid_modules_with_multiple_violations(world: &mut LintWorld) {
    world.write_valid_modules();
    world.write_source(
        "inbound/cli/bad_cross_boundary.rs",
        "use harvester::outbound::http::ReqwestRecordTransport; fn build() { let _ = ReqwestRecordTransport::new; }",
    );
    world.write_source(
        "domain/bad.rs",
        "use tracing::info; fn run() { info!(\"started\"); }",
    );
}

#[when("the architecture lint runs")]
fn run_architecture_lint(world: &mut LintWorld) {
    world.result = Some(architecture_lint::lint_harvester_sources(
        &world.crate_dir(),
    ));
}

#[then("the lint succeeds")]
fn lint_succeeds(world: &mut LintWorld) {
    let outcome = world.result.as_ref().expect("lint must have run");
    assert!(outcome.is_ok(), "expected success, got: {outcome:?}");
}

#[then("the lint fails")]
fn lint_fails(world: &mut LintWorld) {
    let outcome = world.result.as_ref().expect("lint must have run");
    assert!(outcome.is_err(), "expected failure, got: {outcome:?}");
}

#[then("the lint fails due to outbound access from inbound")]
fn lint_fails_due_to_outbound_access(world: &mut LintWorld) {
    world.assert_violation("inbound/cli/args.rs", "crate::outbound");
}

#[then("the lint fails due to inbound access from outbound")]
fn lint_fails_due_to_inbound_access(world: &mut LintWorld) {
    world.assert_violation("outbound/http/bad_cross_boundary.rs", "crate::inbound");
}

#[then("the lint fails due to infrastructure crate usage")]
fn lint_fails_due_to_infrastructure_crate(world: &mut LintWorld) {
    world.assert_violation("inbound/cli/args.rs", "external crate `reqwest`");
}

#[then("the lint fails due to telemetry crate usage in the domain")]
fn lint_fails_due_to_telemetry_crate(world: &mut LintWorld) {
    world.assert_violation("domain/fetcher/mod.rs", "external crate `tracing`");
}

#[then("all boundary violations are reported")]
fn all_boundary_violations_are_reported(world: &mut LintWorld) {
    let violations = world.violations();
    assert_eq!(violations.len(), 2, "got: {violations:?}");
    world.assert_violation("inbound/cli/bad_cross_boundary.rs", "crate::outbound");
    world.assert_violation("domain/bad.rs", "external crate `tracing`");
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Valid layering passes"
)]
fn valid_layering_passes(world: LintWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Inbound code must not reach outbound adapters"
)]
fn inbound_code_must_not_reach_outbound_adapters(world: LintWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Inbound code must not use the HTTP client directly"
)]
fn inbound_code_must_not_use_the_http_client_directly(world: LintWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "The domain must not log directly"
)]
fn the_domain_must_not_log_directly(world: LintWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Outbound code must not reach inbound adapters"
)]
fn outbound_code_must_not_reach_inbound_adapters(world: LintWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Every violation is reported"
)]
fn every_violation_is_reported(world: LintWorld) {
    drop(world);
}
