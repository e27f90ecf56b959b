use std::path::Path;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::command::{Command, Outcome};
use crate::controller::SessionController;
use crate::search::SearchStatus;

/// Script format for headless session tests
///
/// One directive per line:
/// - any command string (e.g. `navigate:/tmp`, `back`, `type:report`)
/// - `wait` / `settle` - wait until no background work is outstanding
/// - `wait:<ms>` - sleep for a fixed duration
/// - `assert:<property>:<value>` - check the current view
/// - `print` - print the view model as JSON
/// - `immediate` - stop settling after each command
/// - `settle_mode` - settle after each command again
/// - `no_initial_settle` - skip the settle before the first directive
/// - `# comment` - ignored
///
/// Example:
/// ```text
/// navigate:/tmp
/// assert:current_path:/tmp
/// immediate
/// type:rep
/// type:report
/// settle
/// assert:search_query:report
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Command(Command),
    Settle,
    Sleep(u64),
    Assert(String),
    Print,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub directive: Directive,
    pub immediate: bool,
}

#[derive(Debug, Clone)]
pub struct TestScript {
    pub lines: Vec<ScriptLine>,
    pub initial_settle: bool,
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    pub script: TestScript,
    pub current_line: usize,
    pub max_settle_time: Duration,
}

impl TestRunner {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content)
    }

    pub fn from_string(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut lines = Vec::new();
        let mut immediate_mode = false;
        let mut initial_settle = true;

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line {
                "immediate" => {
                    immediate_mode = true;
                    continue;
                }
                "settle_mode" => {
                    immediate_mode = false;
                    continue;
                }
                "no_initial_settle" => {
                    initial_settle = false;
                    continue;
                }
                _ => {}
            }

            let directive = if line == "wait" || line == "settle" {
                Directive::Settle
            } else if let Some(ms) = line.strip_prefix("wait:") {
                let ms = ms.trim().parse::<u64>().map_err(|_| {
                    format!("Invalid wait duration on line {}: {}", line_num + 1, ms)
                })?;
                Directive::Sleep(ms)
            } else if let Some(assertion) = line.strip_prefix("assert:") {
                Directive::Assert(assertion.to_string())
            } else if line == "print" {
                Directive::Print
            } else {
                let command = Command::from_string(line)
                    .map_err(|e| format!("Invalid command on line {}: {}", line_num + 1, e))?;
                Directive::Command(command)
            };

            lines.push(ScriptLine {
                directive,
                immediate: immediate_mode,
            });
        }

        Ok(TestRunner {
            script: TestScript {
                lines,
                initial_settle,
            },
            current_line: 0,
            max_settle_time: Duration::from_secs(10),
        })
    }

    pub async fn run(&mut self, controller: &mut SessionController) -> TestResult {
        let start_time = Instant::now();
        let mut commands_applied = 0;
        let mut assertions_passed = 0;
        let mut assertions_failed = 0;
        let mut errors = Vec::new();

        log::info!("Starting test run with {} directives", self.script.lines.len());

        if self.script.initial_settle {
            if let Err(e) = self.wait_for_settlement(controller).await {
                errors.push(format!("Initial settlement failed: {}", e));
            }
        }

        for (index, line) in self.script.lines.iter().enumerate() {
            self.current_line = index;
            log::debug!("Executing directive {}: {:?}", index, line.directive);

            match &line.directive {
                Directive::Command(command) => match command.apply(controller).await {
                    Ok(Outcome::Ignored) => {
                        log::debug!("Command had no effect: {}", command.to_string());
                        commands_applied += 1;
                    }
                    Ok(_) => commands_applied += 1,
                    Err(e) => errors.push(format!("{} failed: {}", command.to_string(), e)),
                },
                Directive::Settle => {
                    if let Err(e) = self.wait_for_settlement(controller).await {
                        errors.push(format!("Settlement wait failed: {}", e));
                    }
                }
                Directive::Sleep(ms) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
                Directive::Assert(assertion) => match evaluate_assertion(controller, assertion) {
                    Ok(true) => {
                        assertions_passed += 1;
                        log::debug!("Assertion passed: {}", assertion);
                    }
                    Ok(false) => {
                        assertions_failed += 1;
                        errors.push(format!("Assertion failed: {}", assertion));
                    }
                    Err(e) => {
                        assertions_failed += 1;
                        errors.push(format!("Assertion error: {}", e));
                    }
                },
                Directive::Print => match serde_json::to_string_pretty(&controller.view_model()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => errors.push(format!("Print failed: {}", e)),
                },
            }

            if !line.immediate && matches!(line.directive, Directive::Command(_)) {
                if let Err(e) = self.wait_for_settlement(controller).await {
                    errors.push(format!("Post-command settlement failed: {}", e));
                }
            }
        }

        let duration = start_time.elapsed();
        log::info!("Test run completed in {:?}", duration);

        let success = assertions_failed == 0 && errors.is_empty();
        TestResult {
            duration,
            commands_applied,
            assertions_passed,
            assertions_failed,
            errors,
            success,
        }
    }

    async fn wait_for_settlement(&self, controller: &mut SessionController) -> Result<(), String> {
        timeout(self.max_settle_time, controller.settle())
            .await
            .map_err(|_| format!("session still busy after {:?}", self.max_settle_time))
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        TestRunner {
            script: TestScript {
                lines: Vec::new(),
                initial_settle: true,
            },
            current_line: 0,
            max_settle_time: Duration::from_secs(10),
        }
    }
}

/// Evaluate `property:value` against the controller's current view
pub fn evaluate_assertion(
    controller: &SessionController,
    assertion: &str,
) -> Result<bool, String> {
    let (property, expected) = assertion
        .split_once(':')
        .ok_or_else(|| "Assertion must be in format 'property:value'".to_string())?;
    let view = controller.view_model();

    let parse_bool = |what: &str| {
        expected
            .parse::<bool>()
            .map_err(|_| format!("{} expects boolean value", what))
    };
    let parse_count = |what: &str| {
        expected
            .parse::<usize>()
            .map_err(|_| format!("{} expects numeric value", what))
    };

    match property {
        "current_path" => Ok(match view.current_path.as_deref() {
            Some(path) => path == expected,
            None => expected == "none",
        }),
        "entry_count" => Ok(view.displayed_entries.len() == parse_count("entry_count")?),
        "has_entry" => Ok(view.displayed_entries.iter().any(|e| e.name == expected)),
        "loading" => Ok(view.loading == parse_bool("loading")?),
        "error" => Ok(match view.error.as_deref() {
            Some(message) => message == expected,
            None => expected == "none",
        }),
        "error_contains" => Ok(view.error.as_deref().is_some_and(|m| m.contains(expected))),
        "can_go_back" => Ok(view.can_go_back == parse_bool("can_go_back")?),
        "can_go_forward" => Ok(view.can_go_forward == parse_bool("can_go_forward")?),
        "history_len" => Ok(controller.history().len() == parse_count("history_len")?),
        "search_active" => Ok(view.search_active == parse_bool("search_active")?),
        "search_query" => Ok(match view.search_query.as_deref() {
            Some(query) => query == expected,
            None => expected == "none",
        }),
        "search_status" => {
            let actual = match controller.search_session().map(|s| s.status()) {
                None => "none".to_string(),
                Some(SearchStatus::Failed(_)) => "Failed".to_string(),
                Some(status) => format!("{:?}", status),
            };
            Ok(actual.eq_ignore_ascii_case(expected))
        }
        "selected" => Ok(match view.selection.first() {
            Some(path) => path == expected,
            None => expected == "none",
        }),
        "selection_count" => Ok(view.selection.len() == parse_count("selection_count")?),
        "show_hidden" => Ok(view.show_hidden == parse_bool("show_hidden")?),
        "live_subscriptions" => {
            Ok(controller.live_subscriptions() == parse_count("live_subscriptions")?)
        }
        _ => Err(format!("Unknown assertion property: {}", property)),
    }
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub duration: Duration,
    pub commands_applied: usize,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
    pub errors: Vec<String>,
    pub success: bool,
}

impl TestResult {
    pub fn print_summary(&self) {
        println!("Test Results:");
        println!("   Duration: {:?}", self.duration);
        println!("   Commands applied: {}", self.commands_applied);
        println!("   Assertions passed: {}", self.assertions_passed);
        println!("   Assertions failed: {}", self.assertions_failed);

        if !self.errors.is_empty() {
            println!("   Errors:");
            for error in &self.errors {
                println!("     - {}", error);
            }
        }

        if self.success {
            println!("   Status: PASSED");
        } else {
            println!("   Status: FAILED");
        }
    }
}
