//! Scheduled rule runs with an explicit dry-run / live switch.

use crate::{
    evaluate_snapshot, Action, AutomationRule, EvaluationResult, MetricSnapshot, RuleError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Whether fired actions are handed to the executor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Report what would happen; never execute.
    #[default]
    DryRun,
    /// Execute fired actions.
    Live,
}

/// Applies actions against a live ad account.
pub trait ActionExecutor {
    fn execute(&mut self, rule: &AutomationRule, action: &Action) -> Result<(), RuleError>;
}

/// Results of one run over a rule set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub results: Vec<EvaluationResult>,
    /// Indexes into the rule slice whose actions were executed.
    pub dispatched: Vec<usize>,
}

impl RunReport {
    pub fn fired(&self) -> usize {
        self.results.iter().filter(|r| r.condition_held).count()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RuleRunner {
    mode: RunMode,
}

impl RuleRunner {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Evaluate all rules, then dispatch fired actions when live.
    ///
    /// Evaluation completes for every rule before any action is dispatched,
    /// so a configuration error leaves the account untouched.
    pub fn run(
        &self,
        rules: &[AutomationRule],
        snapshot: &MetricSnapshot,
        executor: &mut dyn ActionExecutor,
    ) -> Result<RunReport, RuleError> {
        let results = evaluate_snapshot(rules, snapshot)?;
        let mut dispatched = Vec::new();
        if self.mode == RunMode::Live {
            for (idx, (rule, res)) in rules.iter().zip(&results).enumerate() {
                if let Some(action) = &res.action {
                    executor.execute(rule, action)?;
                    dispatched.push(idx);
                }
            }
        }
        let report = RunReport {
            mode: self.mode,
            results,
            dispatched,
        };
        info!(
            mode = ?report.mode,
            rules = rules.len(),
            fired = report.fired(),
            dispatched = report.dispatched.len(),
            "rule run complete"
        );
        Ok(report)
    }
}

struct NoExecutor;

impl ActionExecutor for NoExecutor {
    fn execute(&mut self, _rule: &AutomationRule, _action: &Action) -> Result<(), RuleError> {
        Ok(())
    }
}

/// Dry-run evaluation without an executor.
pub fn dry_run(
    rules: &[AutomationRule],
    snapshot: &MetricSnapshot,
) -> Result<RunReport, RuleError> {
    RuleRunner::new(RunMode::DryRun).run(rules, snapshot, &mut NoExecutor)
}
