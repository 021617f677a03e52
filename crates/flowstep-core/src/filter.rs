//! Condition evaluation for branch filters.
//!
//! The core only depends on the `FilterEvaluator` contract: given a filter
//! payload and the invocation's event, answer whether the event matches.
//! Evaluation is synchronous and side-effect free. `JexlFilterEvaluator` is
//! the bundled implementation; deployments with their own filter language
//! plug in a different one.
//!
//! **Security note:** event data is always passed as the evaluation context,
//! never interpolated into expression strings.

use flowstep_types::invocation::FlowEvent;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Errors produced by a filter evaluator. They reach the caller of
/// `ActionRunner::run` unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("filter evaluation failed: {0}")]
    EvalFailed(String),

    #[error("invalid filters: {0}")]
    InvalidFilters(String),
}

/// Decides whether an event matches a filter payload.
pub trait FilterEvaluator: Send + Sync {
    /// `event` is `None` for invocations that were not started by an event.
    fn matches(&self, filters: &Value, event: Option<&FlowEvent>) -> Result<bool, FilterError>;
}

// ---------------------------------------------------------------------------
// JexlFilterEvaluator
// ---------------------------------------------------------------------------

/// JEXL-backed evaluator with string and collection transforms registered.
///
/// `filters` is either an expression string or an object carrying one under
/// `expression`:
///
/// ```yaml
/// filters: "event.event == '$pageview'"
/// # or
/// filters:
///   expression: "event.properties.plan|lower == 'pro'"
/// ```
///
/// Expressions see a single `event` object with `event`, `distinct_id`,
/// `properties` and `timestamp`. Results are coerced to boolean with
/// JavaScript-like truthiness.
pub struct JexlFilterEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

fn str_arg(args: &[Value], position: usize) -> &str {
    args.get(position).and_then(Value::as_str).unwrap_or("")
}

impl JexlFilterEvaluator {
    pub fn new() -> Self {
        let evaluator = jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| Ok(json!(str_arg(args, 0).trim())))
            .with_transform("contains", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).contains(str_arg(args, 1))))
            })
            .with_transform("startsWith", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).starts_with(str_arg(args, 1))))
            })
            .with_transform("endsWith", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).ends_with(str_arg(args, 1))))
            })
            .with_transform("length", |args: &[Value]| {
                let len = match args.first() {
                    Some(Value::String(s)) => s.chars().count(),
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            });

        Self { evaluator }
    }

    /// Extract the expression string from a filter payload.
    fn expression(filters: &Value) -> Result<&str, FilterError> {
        let expression = match filters {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map
                .get("expression")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    FilterError::InvalidFilters("object filters need an 'expression' string".to_string())
                })?,
            other => {
                return Err(FilterError::InvalidFilters(format!(
                    "expected an expression string or object, got {other}"
                )));
            }
        };

        if expression.trim().is_empty() {
            return Err(FilterError::InvalidFilters("expression is empty".to_string()));
        }
        Ok(expression)
    }

    /// Build the evaluation context for an event.
    fn context(event: Option<&FlowEvent>) -> Value {
        match event {
            Some(event) => json!({
                "event": {
                    "event": event.event,
                    "distinct_id": event.distinct_id,
                    "properties": event.properties,
                    "timestamp": event.timestamp,
                }
            }),
            None => json!({ "event": {} }),
        }
    }

    /// JavaScript-like truthiness.
    fn truthy(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl Default for JexlFilterEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEvaluator for JexlFilterEvaluator {
    fn matches(&self, filters: &Value, event: Option<&FlowEvent>) -> Result<bool, FilterError> {
        let expression = Self::expression(filters)?;
        let context = Self::context(event);
        let result = self
            .evaluator
            .eval_in_context(expression, &context)
            .map_err(|e| FilterError::EvalFailed(e.to_string()))?;
        Ok(Self::truthy(&result))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
