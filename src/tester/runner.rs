//! Test Runner
//!
//! Registers named async test cases against plugins and runs them with
//! per-case task isolation: a panicking or hanging case is contained and
//! reported while the rest of the suite continues.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use regex::Regex;
use tokio::time::timeout;
use super::error::{TesterError, TesterResult};

/// Default per-case timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome a test case body reports
pub type CaseOutcome = Result<(), String>;

type CaseBody = Arc<dyn Fn() -> BoxFuture<'static, CaseOutcome> + Send + Sync>;

struct TestCase {
    plugin_name: String,
    test_name: String,
    body: CaseBody,
}

/// Result of one executed test case
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Plugin the case belongs to
    pub plugin_name: String,

    /// Case name
    pub test_name: String,

    /// Whether the case passed
    pub passed: bool,

    /// Failure detail; empty for passing cases
    pub message: String,

    /// Wall-clock execution time
    pub duration: Duration,
}

impl TestResult {
    /// Short label for display
    pub fn outcome_label(&self) -> &'static str {
        if self.passed { "PASS" } else { "FAIL" }
    }
}

struct RunnerSettings {
    timeout: Duration,
    verbose: bool,
}

/// Runner for plugin test cases
///
/// Cases run sequentially in registration order, each inside its own
/// spawned task so panics and timeouts stay contained. The runner uses
/// interior mutability and can be shared behind an `Arc`.
pub struct TestRunner {
    cases: Mutex<Vec<TestCase>>,
    settings: Mutex<RunnerSettings>,
}

impl TestRunner {
    /// Create a runner with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a runner with a specific per-case timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cases: Mutex::new(Vec::new()),
            settings: Mutex::new(RunnerSettings {
                timeout,
                verbose: false,
            }),
        }
    }

    /// Set the per-case timeout for subsequent runs
    pub fn set_timeout(&self, timeout: Duration) {
        self.settings.lock().timeout = timeout;
    }

    /// The currently configured per-case timeout
    pub fn timeout(&self) -> Duration {
        self.settings.lock().timeout
    }

    /// Enable or disable per-case progress logging
    pub fn set_verbose(&self, verbose: bool) {
        self.settings.lock().verbose = verbose;
    }

    /// Register a test case for a plugin
    ///
    /// Case names are unique per plugin; registering a duplicate fails.
    pub fn add_test_case<F, Fut>(&self, plugin_name: &str, test_name: &str, body: F) -> TesterResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseOutcome> + Send + 'static,
    {
        let mut cases = self.cases.lock();
        if cases.iter().any(|c| c.plugin_name == plugin_name && c.test_name == test_name) {
            return Err(TesterError::case_already_exists(plugin_name, test_name));
        }
        cases.push(TestCase {
            plugin_name: plugin_name.to_string(),
            test_name: test_name.to_string(),
            body: Arc::new(move || body().boxed()),
        });
        Ok(())
    }

    /// Remove a single test case
    pub fn remove_test_case(&self, plugin_name: &str, test_name: &str) -> TesterResult<()> {
        let mut cases = self.cases.lock();
        let before = cases.len();
        cases.retain(|c| !(c.plugin_name == plugin_name && c.test_name == test_name));
        if cases.len() == before {
            return Err(TesterError::case_not_found(plugin_name, test_name));
        }
        Ok(())
    }

    /// Remove every case registered for a plugin, returning how many went
    pub fn remove_plugin_cases(&self, plugin_name: &str) -> usize {
        let mut cases = self.cases.lock();
        let before = cases.len();
        cases.retain(|c| c.plugin_name != plugin_name);
        before - cases.len()
    }

    /// Total number of registered cases
    pub fn case_count(&self) -> usize {
        self.cases.lock().len()
    }

    /// Number of cases registered for a plugin
    pub fn case_count_for(&self, plugin_name: &str) -> usize {
        self.cases.lock().iter().filter(|c| c.plugin_name == plugin_name).count()
    }

    /// Run all cases registered for one plugin
    pub async fn run_plugin(&self, plugin_name: &str) -> Vec<TestResult> {
        let selected = self.select(|c| c.plugin_name == plugin_name);
        self.run_cases(selected).await
    }

    /// Run every registered case
    pub async fn run_all(&self) -> Vec<TestResult> {
        let selected = self.select(|_| true);
        self.run_cases(selected).await
    }

    /// Run cases whose `plugin::case` path matches the pattern
    pub async fn run_filtered(&self, pattern: &Regex) -> Vec<TestResult> {
        let selected = self.select(|c| {
            pattern.is_match(&format!("{}::{}", c.plugin_name, c.test_name))
        });
        self.run_cases(selected).await
    }

    fn select<P>(&self, predicate: P) -> Vec<(String, String, CaseBody)>
    where
        P: Fn(&TestCase) -> bool,
    {
        self.cases
            .lock()
            .iter()
            .filter(|c| predicate(c))
            .map(|c| (c.plugin_name.clone(), c.test_name.clone(), Arc::clone(&c.body)))
            .collect()
    }

    async fn run_cases(&self, selected: Vec<(String, String, CaseBody)>) -> Vec<TestResult> {
        let (timeout_duration, verbose) = {
            let settings = self.settings.lock();
            (settings.timeout, settings.verbose)
        };

        let mut results = Vec::with_capacity(selected.len());
        for (plugin_name, test_name, body) in selected {
            if verbose {
                log::info!("Running test '{}::{}'", plugin_name, test_name);
            }

            let started = Instant::now();
            let mut handle = tokio::spawn((body)());

            let (passed, message) = match timeout(timeout_duration, &mut handle).await {
                Ok(Ok(Ok(()))) => (true, String::new()),
                Ok(Ok(Err(message))) => (false, message),
                Ok(Err(join_err)) => {
                    let detail = if join_err.is_panic() {
                        panic_detail(join_err.into_panic())
                    } else {
                        "test task was cancelled".to_string()
                    };
                    (false, detail)
                }
                Err(_) => {
                    // the case is still running; cut it loose
                    handle.abort();
                    let message =
                        TesterError::test_timeout(&test_name, timeout_duration.as_secs_f64())
                            .to_string();
                    (false, message)
                }
            };

            let result = TestResult {
                plugin_name,
                test_name,
                passed,
                message,
                duration: started.elapsed(),
            };
            if verbose {
                log::info!(
                    "Test '{}::{}' {} in {:?}",
                    result.plugin_name,
                    result.test_name,
                    result.outcome_label(),
                    result.duration
                );
            } else if !result.passed {
                log::debug!(
                    "Test '{}::{}' failed: {}",
                    result.plugin_name,
                    result.test_name,
                    result.message
                );
            }
            results.push(result);
        }
        results
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
