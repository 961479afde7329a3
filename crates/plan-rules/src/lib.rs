#![deny(warnings)]

//! Automation rules: "if metric crosses threshold, do action".
//!
//! Evaluation is a pure function of a rule and an observed metric reading.
//! Nothing here executes an action; [`RuleRunner`] hands fired actions to an
//! [`ActionExecutor`] only when running in [`RunMode::Live`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

mod runner;

pub use runner::{dry_run, ActionExecutor, RuleRunner, RunMode, RunReport};

/// Errors raised by malformed rules or readings.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("unknown action type: {0}")]
    UnknownAction(String),
    /// Budget actions need a percentage value.
    #[error("action `{0}` requires a value")]
    MissingActionValue(String),
    #[error("invalid action value: {0}")]
    InvalidActionValue(f64),
    #[error("threshold must be finite")]
    NonFiniteThreshold,
    #[error("observed value for {0} must be finite")]
    NonFiniteObservation(Metric),
    /// Snapshot text is not `METRIC=NUMBER`.
    #[error("malformed snapshot entry: `{0}`")]
    MalformedSnapshot(String),
    /// Snapshot carries no reading for the rule's metric.
    #[error("no observation for metric {0}")]
    MissingObservation(Metric),
    /// Failure reported by an action executor.
    #[error("action execution failed: {0}")]
    Execution(String),
}

/// Ad performance metric a rule watches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    Cpa,
    Roas,
    Cpc,
    Cpm,
    Ctr,
    Spend,
    Conversions,
    Frequency,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cpa => "CPA",
            Metric::Roas => "ROAS",
            Metric::Cpc => "CPC",
            Metric::Cpm => "CPM",
            Metric::Ctr => "CTR",
            Metric::Spend => "spend",
            Metric::Conversions => "conversions",
            Metric::Frequency => "frequency",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpa" => Ok(Metric::Cpa),
            "roas" => Ok(Metric::Roas),
            "cpc" => Ok(Metric::Cpc),
            "cpm" => Ok(Metric::Cpm),
            "ctr" => Ok(Metric::Ctr),
            "spend" => Ok(Metric::Spend),
            "conversions" => Ok(Metric::Conversions),
            "frequency" => Ok(Metric::Frequency),
            _ => Err(RuleError::UnknownMetric(s.to_string())),
        }
    }
}

/// Comparison applied as `observed <op> threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    /// Exact floating-point equality, no tolerance.
    Eq,
    Ge,
    Le,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    #[allow(clippy::float_cmp)]
    pub fn holds(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => observed > threshold,
            Operator::Lt => observed < threshold,
            Operator::Eq => observed == threshold,
            Operator::Ge => observed >= threshold,
            Operator::Le => observed <= threshold,
        }
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            "=" => Ok(Operator::Eq),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            _ => Err(RuleError::UnknownOperator(s.to_string())),
        }
    }
}

/// Action to take when a rule fires.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    PauseCampaign,
    ResumeCampaign,
    IncreaseBudget { percent: f64 },
    DecreaseBudget { percent: f64 },
    Notify,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PauseCampaign => f.write_str("Pause campaign"),
            Action::ResumeCampaign => f.write_str("Resume campaign"),
            Action::IncreaseBudget { percent } => write!(f, "Increase budget by {percent}%"),
            Action::DecreaseBudget { percent } => write!(f, "Decrease budget by {percent}%"),
            Action::Notify => f.write_str("Send notification"),
        }
    }
}

/// Action as stored with a rule: a type identifier and optional value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl ActionSpec {
    pub fn new(kind: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    /// Resolve the identifier and value into a typed [`Action`].
    pub fn parse(&self) -> Result<Action, RuleError> {
        let percent = || match self.value {
            None => Err(RuleError::MissingActionValue(self.kind.clone())),
            Some(v) if !v.is_finite() || v <= 0.0 => Err(RuleError::InvalidActionValue(v)),
            Some(v) => Ok(v),
        };
        match self.kind.trim() {
            "pauseCampaign" => Ok(Action::PauseCampaign),
            "resumeCampaign" => Ok(Action::ResumeCampaign),
            "increaseBudget" => Ok(Action::IncreaseBudget { percent: percent()? }),
            "decreaseBudget" => Ok(Action::DecreaseBudget { percent: percent()? }),
            "notify" => Ok(Action::Notify),
            other => Err(RuleError::UnknownAction(other.to_string())),
        }
    }
}

/// A stored automation rule. Identifiers are kept as written and checked
/// when the rule is evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub action: ActionSpec,
}

/// A rule with every identifier resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompiledRule {
    pub metric: Metric,
    pub operator: Operator,
    pub threshold: f64,
    pub action: Action,
}

impl AutomationRule {
    pub fn compile(&self) -> Result<CompiledRule, RuleError> {
        let metric: Metric = self.metric.parse()?;
        let operator: Operator = self.operator.parse()?;
        if !self.threshold.is_finite() {
            return Err(RuleError::NonFiniteThreshold);
        }
        let action = self.action.parse()?;
        Ok(CompiledRule {
            metric,
            operator,
            threshold: self.threshold,
            action,
        })
    }

    /// Human summary, e.g. "CPA > 200 => Pause campaign".
    pub fn describe(&self) -> String {
        let action = match self.action.parse() {
            Ok(a) => a.to_string(),
            Err(_) => self.action.kind.clone(),
        };
        format!(
            "{} {} {} => {}",
            self.metric, self.operator, self.threshold, action
        )
    }
}

/// Outcome of evaluating one rule against one reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub metric: Metric,
    pub condition_held: bool,
    pub observed_value: f64,
    pub threshold: f64,
    pub described_action: String,
    /// The action that would fire; `None` when the condition did not hold.
    pub action: Option<Action>,
}

/// Description used when a rule does not fire.
pub const NO_ACTION: &str = "No action";

/// Evaluate `rule` against an observed reading. Never performs the action.
pub fn evaluate(rule: &AutomationRule, observed_value: f64) -> Result<EvaluationResult, RuleError> {
    let compiled = rule.compile()?;
    if !observed_value.is_finite() {
        return Err(RuleError::NonFiniteObservation(compiled.metric));
    }
    let condition_held = compiled.operator.holds(observed_value, compiled.threshold);
    let (described_action, action) = if condition_held {
        (compiled.action.to_string(), Some(compiled.action))
    } else {
        (NO_ACTION.to_string(), None)
    };
    debug!(
        metric = %compiled.metric,
        op = compiled.operator.symbol(),
        threshold = compiled.threshold,
        observed = observed_value,
        held = condition_held,
        "evaluated rule"
    );
    Ok(EvaluationResult {
        metric: compiled.metric,
        condition_held,
        observed_value,
        threshold: compiled.threshold,
        described_action,
        action,
    })
}

/// Latest reading per metric for one campaign or account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSnapshot(BTreeMap<Metric, f64>);

impl MetricSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.0.insert(metric, value);
        self
    }

    pub fn insert(&mut self, metric: Metric, value: f64) {
        self.0.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

/// Parses `METRIC=VALUE` pairs separated by commas, e.g. `CPA=250,ROAS=1.8`.
impl FromStr for MetricSnapshot {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut snap = MetricSnapshot::new();
        for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| RuleError::MalformedSnapshot(pair.trim().to_string()))?;
            let metric: Metric = name.parse()?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| RuleError::MalformedSnapshot(pair.trim().to_string()))?;
            snap.insert(metric, value);
        }
        Ok(snap)
    }
}

/// Evaluate each rule against the snapshot reading for its metric.
///
/// Results are returned in rule order.
pub fn evaluate_snapshot(
    rules: &[AutomationRule],
    snapshot: &MetricSnapshot,
) -> Result<Vec<EvaluationResult>, RuleError> {
    rules
        .iter()
        .map(|rule| {
            let metric: Metric = rule.metric.parse()?;
            let observed = snapshot
                .get(metric)
                .ok_or(RuleError::MissingObservation(metric))?;
            evaluate(rule, observed)
        })
        .collect()
}
