//! Confirmation gates for the test-first checkpoint.

use std::io::Write;

use async_trait::async_trait;

use crate::domain::model::SubmissionOutcome;
use crate::domain::ports::ContinueGate;

const PREVIEW_CHARS: usize = 500;

/// Interactive gate: shows the test outcome on stdout and asks yes/no on
/// stdin, exactly once per run.
pub struct PromptGate;

#[async_trait]
impl ContinueGate for PromptGate {
    async fn confirm_continue(&self, tested: &SubmissionOutcome, remaining: usize) -> bool {
        print_test_report(tested);
        let answer = tokio::task::spawn_blocking(move || {
            print!("Continue with remaining {remaining} records? (yes/no): ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(_) => line,
                Err(_) => String::new(),
            }
        })
        .await
        .unwrap_or_default();
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn print_test_report(outcome: &SubmissionOutcome) {
    let bar = "=".repeat(80);
    println!("{bar}");
    if outcome.success {
        println!("✅ TEST SUCCESSFUL (record index {})", outcome.record_index);
    } else {
        println!("❌ TEST FAILED (record index {})", outcome.record_index);
    }
    println!("{}", "-".repeat(80));
    let status = outcome
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    println!("Status code: {status}");
    println!("Request id:  {}", outcome.request_id);
    if let Some(error) = &outcome.error {
        println!("Error: {error}");
    }
    if outcome.response_body.is_some() {
        println!("Response preview:");
        println!("{}", outcome.response_preview(PREVIEW_CHARS));
    }
    println!("{bar}");
}

/// Non-interactive gate with a fixed answer, for tests and callers that
/// confirmed out of band.
pub struct StaticGate(pub bool);

#[async_trait]
impl ContinueGate for StaticGate {
    async fn confirm_continue(&self, _tested: &SubmissionOutcome, _remaining: usize) -> bool {
        self.0
    }
}
