use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Verdict of a custom rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomOutcome {
    Valid,
    /// Rule failed; the message replaces the default `custom` message when set.
    Invalid(Option<String>),
}

impl CustomOutcome {
    pub fn invalid(message: impl Into<String>) -> Self {
        CustomOutcome::Invalid(Some(message.into()))
    }
}

impl From<bool> for CustomOutcome {
    fn from(valid: bool) -> Self {
        if valid {
            CustomOutcome::Valid
        } else {
            CustomOutcome::Invalid(None)
        }
    }
}

impl From<Result<(), String>> for CustomOutcome {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => CustomOutcome::Valid,
            Err(message) => CustomOutcome::Invalid(Some(message)),
        }
    }
}

/// Failure raised while running a custom rule (remote call, timeout, ...).
#[derive(Debug, Error)]
pub enum CustomRuleError {
    #[error("custom rule unavailable: {0}")]
    Unavailable(String),
    #[error("custom rule failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Async predicate over a field value and the whole form values.
#[async_trait]
pub trait CustomValidator: Send + Sync {
    async fn check(&self, value: &Value, values: &Value) -> Result<CustomOutcome, CustomRuleError>;
}

#[async_trait]
impl<F, Fut> CustomValidator for F
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CustomOutcome, CustomRuleError>> + Send + 'static,
{
    async fn check(&self, value: &Value, values: &Value) -> Result<CustomOutcome, CustomRuleError> {
        (self)(value.clone(), values.clone()).await
    }
}

/// Pins the closure signature so async rules can be written inline.
pub fn async_rule<F, Fut>(rule: F) -> F
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CustomOutcome, CustomRuleError>> + Send + 'static,
{
    rule
}

/// Synchronous custom rule adapter.
pub struct SyncRule<F>(F);

/// Wraps a synchronous predicate so it can be used as a custom rule.
pub fn sync_rule<F, O>(predicate: F) -> SyncRule<F>
where
    F: Fn(&Value, &Value) -> O + Send + Sync,
    O: Into<CustomOutcome>,
{
    SyncRule(predicate)
}

#[async_trait]
impl<F, O> CustomValidator for SyncRule<F>
where
    F: Fn(&Value, &Value) -> O + Send + Sync,
    O: Into<CustomOutcome> + 'static,
{
    async fn check(&self, value: &Value, values: &Value) -> Result<CustomOutcome, CustomRuleError> {
        Ok((self.0)(value, values).into())
    }
}
