//! Request Orchestrator (C6).
//!
//! Ties C4 (dispatch) → C5 (admission) → C3 (filter) → C2 (runner) → C7
//! (metrics) together for a single submission and packages the result into
//! the response envelope. Mirrors the original `run_code` handler's shape
//! (resolve runtime, admit, run under the semaphore, package), but with the
//! admission slot's lifetime pinned to a single RAII guard instead of the
//! manual `current_waiting -= 1` the original repeats in both its happy and
//! exception paths.

use crate::admission::AdmissionController;
use crate::errors::SandboxError;
use crate::limits::ResourceLimits;
use crate::metrics::Metrics;
use crate::registry::RuntimeRegistry;
use crate::runner;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeData {
    pub stdout: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub message: String,
    pub data: EnvelopeData,
}

impl Envelope {
    fn dispatch_rejected(reason: String) -> Self {
        Self {
            code: 400,
            message: "error".to_string(),
            data: EnvelopeData {
                stdout: String::new(),
                error: reason,
            },
        }
    }

    fn filter_rejected(reason: String) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: EnvelopeData {
                stdout: String::new(),
                error: reason,
            },
        }
    }

    fn executed(outcome: runner::ExecutionOutcome) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: EnvelopeData {
                stdout: outcome.stdout,
                error: outcome.error,
            },
        }
    }

    fn internal(reason: String) -> Self {
        Self {
            code: 500,
            message: "internal_error".to_string(),
            data: EnvelopeData {
                stdout: String::new(),
                error: reason,
            },
        }
    }
}

/// Distinguishes the one response shape that bypasses the envelope
/// entirely (queue-full, surfaced as a bare HTTP 429) from everything else.
pub enum OrchestratorOutcome {
    Envelope(Envelope),
    QueueFull,
}

/// Runs one submission end to end. Never panics past this boundary: any
/// unexpected internal failure is packaged as an envelope code 500 rather
/// than propagated, per the orchestrator's failure semantics.
pub async fn handle_run(
    registry: &RuntimeRegistry,
    admission: &AdmissionController,
    metrics: &Metrics,
    limits: &ResourceLimits,
    language: &str,
    code: &str,
) -> OrchestratorOutcome {
    let descriptor = match registry.resolve(language) {
        Ok(descriptor) => descriptor.clone(),
        Err(SandboxError::UnknownRuntime(name)) => {
            return OrchestratorOutcome::Envelope(Envelope::dispatch_rejected(format!(
                "Unsupported language: {name}"
            )));
        }
        Err(other) => {
            return OrchestratorOutcome::Envelope(Envelope::internal(other.to_string()));
        }
    };

    let guard = match admission.admit().await {
        Ok(guard) => guard,
        Err(SandboxError::QueueFull) => return OrchestratorOutcome::QueueFull,
        Err(other) => return OrchestratorOutcome::Envelope(Envelope::internal(other.to_string())),
    };

    metrics.record_admission(&descriptor.name, "run");
    metrics.set_queue_size(admission.waiting() as i64);
    metrics.set_concurrent_requests(admission.running() as i64);
    let started_at = Instant::now();

    // The admission slot (`guard`) stays held through the static filter's
    // rejection path, released only when this function returns, keeping
    // the waiting/running accounting symmetric regardless of outcome.
    let envelope = if let Some(reason) = crate::filter::check(code, &descriptor) {
        Envelope::filter_rejected(reason)
    } else {
        let limits = *limits;
        let family = descriptor.family;
        let argv = vec![script_flag(family).to_string(), code.to_string()];
        let command = descriptor.command.clone();

        // Execution runs on its own task so a slow child never occupies the
        // same task slot that is polling the admission semaphore for the
        // next waiter.
        match tokio::spawn(async move { runner::run(&command, &argv, &limits, family).await })
            .await
        {
            Ok(Ok(outcome)) => Envelope::executed(outcome),
            Ok(Err(e)) => Envelope::internal(e.to_string()),
            Err(join_error) => Envelope::internal(format!("execution task failed: {join_error}")),
        }
    };

    metrics
        .duration_histogram(&descriptor.name)
        .observe(started_at.elapsed().as_secs_f64());

    drop(guard);
    metrics.set_concurrent_requests(admission.running() as i64);
    metrics.set_queue_size(admission.waiting() as i64);

    OrchestratorOutcome::Envelope(envelope)
}

/// Both supported families accept source on the command line, but under
/// different flags: CPython's `-c` executes the argument as a program;
/// Node's `-c` only checks syntax, so the js-like family needs `-e` to
/// actually run the submission.
fn script_flag(family: crate::registry::RuntimeFamily) -> &'static str {
    match family {
        crate::registry::RuntimeFamily::PythonLike => "-c",
        crate::registry::RuntimeFamily::JsLike => "-e",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn test_registry() -> RuntimeRegistry {
        RuntimeRegistry::from_config(&AppConfig::default())
    }

    fn test_limits() -> ResourceLimits {
        ResourceLimits::from_config(&crate::config::ResourceLimitsConfig::default())
    }

    #[tokio::test]
    async fn unknown_language_returns_envelope_400() {
        let registry = test_registry();
        let admission = AdmissionController::new(10, 20);
        let metrics = Metrics::new();
        let limits = test_limits();

        let outcome = handle_run(&registry, &admission, &metrics, &limits, "ruby", "1+1").await;
        match outcome {
            OrchestratorOutcome::Envelope(envelope) => {
                assert_eq!(envelope.code, 400);
                assert!(envelope.data.error.contains("ruby"));
            }
            OrchestratorOutcome::QueueFull => panic!("expected envelope"),
        }
        assert_eq!(admission.waiting(), 0);
        assert_eq!(admission.running(), 0);
    }

    #[tokio::test]
    async fn queue_full_is_reported_distinctly() {
        let registry = test_registry();
        let admission = AdmissionController::new(1, 0);
        let metrics = Metrics::new();
        let limits = test_limits();

        // Occupy the only concurrency slot directly so the next call sees
        // `waiting >= max_queue_size` (0) and rejects before admitting.
        let _holder = admission.admit().await.unwrap();

        let outcome = handle_run(
            &registry, &admission, &metrics, &limits, "python3", "print(1)",
        )
        .await;
        assert!(matches!(outcome, OrchestratorOutcome::QueueFull));
    }

    #[tokio::test]
    async fn admission_counters_return_to_zero_after_filter_rejection() {
        let registry = test_registry();
        let admission = AdmissionController::new(10, 20);
        let metrics = Metrics::new();
        let limits = test_limits();

        let outcome = handle_run(
            &registry,
            &admission,
            &metrics,
            &limits,
            "python3",
            "import os\nprint(os.name)",
        )
        .await;

        match outcome {
            OrchestratorOutcome::Envelope(envelope) => {
                assert_eq!(envelope.code, 0);
                assert_eq!(envelope.data.error, "Unsupported package: os");
                assert_eq!(envelope.data.stdout, "");
            }
            OrchestratorOutcome::QueueFull => panic!("expected envelope"),
        }
        assert_eq!(admission.waiting(), 0);
        assert_eq!(admission.running(), 0);
    }
}
