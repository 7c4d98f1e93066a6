//! Mapping host verdicts onto protocol step results.

use cuke_harness_messages::{
    ExceptionSummary, MessageDuration, TestStepResult, TestStepResultStatus,
};

use crate::host::{NativeEvent, NativeVerdict};

const UNDEFINED_PREFIX: &str = "No matching step definitions found";
const AMBIGUOUS_PREFIX: &str = "Multiple matching step definitions found";

/// Map a native event onto the protocol step result.
///
/// Undefined and ambiguous steps surface to the host as ordinary failures
/// whose message wording is fixed; the mapper recognizes them by prefix and
/// restores the distinct statuses. For any other failure, only the error's
/// type name is retained.
#[must_use]
pub fn map_step_result(event: &NativeEvent) -> TestStepResult {
    let (status, exception) = match &event.verdict {
        NativeVerdict::Passed => (TestStepResultStatus::Passed, None),
        NativeVerdict::Skipped => (TestStepResultStatus::Skipped, None),
        NativeVerdict::Pending => (TestStepResultStatus::Pending, None),
        NativeVerdict::Failed {
            message,
            exception_type,
        } => {
            if message.starts_with(UNDEFINED_PREFIX) {
                (TestStepResultStatus::Undefined, None)
            } else if message.starts_with(AMBIGUOUS_PREFIX) {
                (TestStepResultStatus::Ambiguous, None)
            } else {
                (
                    TestStepResultStatus::Failed,
                    Some(ExceptionSummary {
                        exception_type: exception_type
                            .clone()
                            .unwrap_or_else(|| "Error".to_string()),
                    }),
                )
            }
        }
    };
    TestStepResult {
        duration: MessageDuration::from_millis(event.duration_millis),
        status,
        exception,
    }
}

/// Whether a correlated result makes the run unsuccessful.
///
/// Passed, skipped and unknown are the only statuses compatible with a
/// successful run.
#[must_use]
pub fn is_non_success(result: &TestStepResult) -> bool {
    !matches!(
        result.status,
        TestStepResultStatus::Unknown
            | TestStepResultStatus::Passed
            | TestStepResultStatus::Skipped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::STEP_NESTING;
    use rstest::rstest;

    fn event(verdict: NativeVerdict) -> NativeEvent {
        NativeEvent {
            file: "features/a.feature".into(),
            nesting: STEP_NESTING,
            name: "a step".into(),
            verdict,
            duration_millis: 1_500,
        }
    }

    #[rstest]
    #[case(NativeVerdict::Passed, TestStepResultStatus::Passed)]
    #[case(NativeVerdict::Skipped, TestStepResultStatus::Skipped)]
    #[case(NativeVerdict::Pending, TestStepResultStatus::Pending)]
    fn maps_plain_verdicts(#[case] verdict: NativeVerdict, #[case] expected: TestStepResultStatus) {
        let result = map_step_result(&event(verdict));
        assert_eq!(result.status, expected);
        assert!(result.exception.is_none());
        assert_eq!(result.duration.seconds, 1);
        assert_eq!(result.duration.nanos, 500_000_000);
    }

    #[test]
    fn undefined_is_recognized_by_message_prefix() {
        let result = map_step_result(&event(NativeVerdict::Failed {
            message: "No matching step definitions found for text \"x\"".into(),
            exception_type: Some("UndefinedStepError".into()),
        }));
        assert_eq!(result.status, TestStepResultStatus::Undefined);
        assert!(result.exception.is_none());
    }

    #[test]
    fn ambiguous_is_recognized_by_message_prefix() {
        let result = map_step_result(&event(NativeVerdict::Failed {
            message: "Multiple matching step definitions found for text \"x\":\n1) a.rs:1:1".into(),
            exception_type: None,
        }));
        assert_eq!(result.status, TestStepResultStatus::Ambiguous);
    }

    #[test]
    fn other_failures_retain_only_the_type_name() {
        let result = map_step_result(&event(NativeVerdict::Failed {
            message: "connection refused".into(),
            exception_type: Some("IoError".into()),
        }));
        assert_eq!(result.status, TestStepResultStatus::Failed);
        assert_eq!(
            result.exception.map(|summary| summary.exception_type),
            Some("IoError".into())
        );
    }

    #[rstest]
    #[case(TestStepResultStatus::Unknown, false)]
    #[case(TestStepResultStatus::Passed, false)]
    #[case(TestStepResultStatus::Skipped, false)]
    #[case(TestStepResultStatus::Pending, true)]
    #[case(TestStepResultStatus::Undefined, true)]
    #[case(TestStepResultStatus::Ambiguous, true)]
    #[case(TestStepResultStatus::Failed, true)]
    fn success_predicate(#[case] status: TestStepResultStatus, #[case] non_success: bool) {
        let result = TestStepResult {
            duration: MessageDuration::default(),
            status,
            exception: None,
        };
        assert_eq!(is_non_success(&result), non_success);
    }
}
