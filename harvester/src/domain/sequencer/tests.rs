//! Unit coverage for incrementing and fixed-list progression.

use std::collections::BTreeMap;

use rstest::{fixture, rstest};

use super::*;

fn endpoint() -> EndpointId {
    EndpointId::new("match").expect("valid endpoint")
}

fn int(value: i64) -> ArgumentValue {
    ArgumentValue::Integer(value)
}

#[fixture]
fn incrementing() -> Sequencer {
    Sequencer::incrementing(
        endpoint(),
        ArgumentSet::new()
            .with("matchId", 100_i64)
            .with("queue", "solo")
            .with("ranked", true),
    )
}

#[rstest]
fn incrementing_advances_integers_after_each_step(mut incrementing: Sequencer) {
    let first = incrementing.next().expect("first step");
    let second = incrementing.next().expect("second step");

    assert_eq!(first.arguments.get("matchId"), Some(&int(100)));
    assert_eq!(second.arguments.get("matchId"), Some(&int(101)));
    assert_eq!(second.arguments.get("queue"), Some(&ArgumentValue::from("solo")));
    assert_eq!(second.arguments.get("ranked"), Some(&ArgumentValue::Flag(true)));
    assert_eq!((first.position, second.position), (0, 1));
}

#[rstest]
fn rollback_restores_pre_step_arguments_without_drift(mut incrementing: Sequencer) {
    let before = incrementing.current_arguments();
    for _ in 0..5 {
        let step = incrementing.next().expect("step");
        assert_eq!(step.arguments, before);
        incrementing.rollback().expect("rollback after next");
        assert_eq!(incrementing.current_arguments(), before);
    }
    assert_eq!(incrementing.requests_issued(), 5);
}

#[rstest]
fn double_rollback_is_rejected(mut incrementing: Sequencer) {
    incrementing.next().expect("step");
    incrementing.rollback().expect("first rollback");

    let err = incrementing.rollback().expect_err("second rollback rejected");

    assert_eq!(err, SequencerError::RollbackWithoutAdvance);
    assert_eq!(incrementing.current_arguments().get("matchId"), Some(&int(100)));
}

#[rstest]
fn rollback_before_any_step_is_rejected(mut incrementing: Sequencer) {
    assert_eq!(
        incrementing.rollback(),
        Err(SequencerError::RollbackWithoutAdvance)
    );
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(10)]
fn request_cap_bounds_steps(incrementing: Sequencer, #[case] cap: u64) {
    let mut sequencer = incrementing.with_request_cap(cap);

    let mut handed_out = 0_u64;
    while sequencer.next().is_some() {
        handed_out += 1;
        assert!(handed_out <= cap, "cap exceeded");
    }

    assert_eq!(handed_out, cap);
    assert!(sequencer.is_exhausted());
    assert_eq!(sequencer.call_count(), cap + 1);
}

#[rstest]
fn retries_consume_the_request_cap(incrementing: Sequencer) {
    let mut sequencer = incrementing.with_request_cap(2);
    sequencer.next().expect("first");
    sequencer.rollback().expect("rollback");
    sequencer.next().expect("retry");

    assert!(sequencer.next().is_none());
    assert_eq!(sequencer.requests_issued(), 2);
}

#[rstest]
fn zero_cap_is_unbounded(incrementing: Sequencer) {
    let mut sequencer = incrementing.with_request_cap(0);
    for _ in 0..1_000 {
        assert!(sequencer.next().is_some());
    }
    assert!(!sequencer.is_exhausted());
}

#[rstest]
fn rollback_is_unavailable_after_exhaustion(incrementing: Sequencer) {
    let mut sequencer = incrementing.with_request_cap(1);
    sequencer.next().expect("only step");
    assert!(sequencer.next().is_none());
    assert_eq!(
        sequencer.rollback(),
        Err(SequencerError::RollbackWithoutAdvance)
    );
}

fn lists(entries: &[(&str, &[i64])]) -> BTreeMap<String, Vec<ArgumentValue>> {
    entries
        .iter()
        .map(|(name, values)| {
            (
                (*name).to_owned(),
                values.iter().copied().map(ArgumentValue::Integer).collect(),
            )
        })
        .collect()
}

#[rstest]
fn fixed_list_walks_tuples_in_lockstep() {
    let mut sequencer = Sequencer::fixed_list(
        endpoint(),
        lists(&[("a", &[1, 2, 3]), ("b", &[10, 20, 30])]),
    )
    .expect("valid lists");

    let seen: Vec<(ArgumentValue, ArgumentValue)> = std::iter::from_fn(|| sequencer.next())
        .map(|step| {
            (
                step.arguments.get("a").cloned().expect("a bound"),
                step.arguments.get("b").cloned().expect("b bound"),
            )
        })
        .collect();

    assert_eq!(
        seen,
        vec![(int(1), int(10)), (int(2), int(20)), (int(3), int(30))]
    );
}

#[rstest]
fn fixed_list_wraps_shorter_lists_up_to_the_longest() {
    let mut sequencer =
        Sequencer::fixed_list(endpoint(), lists(&[("a", &[1, 2, 3, 4]), ("b", &[7, 8])]))
            .expect("valid lists");

    let b_values: Vec<ArgumentValue> = std::iter::from_fn(|| sequencer.next())
        .map(|step| step.arguments.get("b").cloned().expect("b bound"))
        .collect();

    assert_eq!(b_values, vec![int(7), int(8), int(7), int(8)]);
    assert!(sequencer.is_exhausted());
}

#[rstest]
fn fixed_list_rollback_repeats_the_tuple() {
    let mut sequencer = Sequencer::fixed_list(endpoint(), lists(&[("id", &[5, 6])]))
        .expect("valid lists");

    let first = sequencer.next().expect("first");
    sequencer.rollback().expect("rollback");
    let retry = sequencer.next().expect("retry");
    let second = sequencer.next().expect("second");

    assert_eq!(retry, first);
    assert_eq!(second.arguments.get("id"), Some(&int(6)));
    assert!(sequencer.next().is_none());
}

#[rstest]
fn fixed_list_rollback_at_the_end_reopens_the_last_item() {
    let mut sequencer =
        Sequencer::fixed_list(endpoint(), lists(&[("id", &[5])])).expect("valid lists");
    sequencer.next().expect("only");
    assert!(sequencer.is_exhausted());

    sequencer.rollback().expect("rollback");

    assert!(!sequencer.is_exhausted());
    assert_eq!(sequencer.next().map(|step| step.position), Some(0));
}

#[rstest]
fn fixed_list_rejects_empty_table() {
    let err = Sequencer::fixed_list(endpoint(), BTreeMap::new()).expect_err("empty table");
    assert_eq!(err, SequencerError::NoFixedArguments);
}

#[rstest]
fn fixed_list_rejects_empty_parameter_list() {
    let err = Sequencer::fixed_list(endpoint(), lists(&[("a", &[1]), ("b", &[])]))
        .expect_err("empty list");
    assert_eq!(
        err,
        SequencerError::EmptyFixedList {
            parameter: "b".to_owned()
        }
    );
}

#[rstest]
fn rollback_at_the_top_of_the_integer_range_repeats_the_same_item() {
    let mut sequencer =
        Sequencer::incrementing(endpoint(), ArgumentSet::new().with("matchId", i64::MAX));
    let before = sequencer.current_arguments();

    let first = sequencer.next().expect("first step");
    sequencer.rollback().expect("rollback after next");
    let retry = sequencer.next().expect("retry step");

    assert_eq!(first.arguments, before);
    assert_eq!(retry.arguments, before);
    assert_eq!(retry.position, first.position);
}

#[rstest]
fn integer_overflow_exhausts_the_progression() {
    let mut sequencer =
        Sequencer::incrementing(endpoint(), ArgumentSet::new().with("matchId", i64::MAX - 1));

    let issued: Vec<_> = std::iter::from_fn(|| sequencer.next())
        .map(|step| step.arguments.get("matchId").cloned())
        .collect();

    assert_eq!(issued, vec![Some(int(i64::MAX - 1)), Some(int(i64::MAX))]);
    assert!(sequencer.is_exhausted());
    assert_eq!(sequencer.call_count(), 3);
    assert_eq!(sequencer.rollback(), Err(SequencerError::RollbackWithoutAdvance));
}
