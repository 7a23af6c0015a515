//! Response hooks
//!
//! Some values only exist in the completion payload of a background job
//! (a generated gateway name, for instance). A hook inspects that payload
//! and may return one extracted value.

use super::envelope::HookPayload;
use std::fmt;
use std::sync::Arc;

type HookFn = dyn Fn(&HookPayload) -> Option<String> + Send + Sync;

/// Callback run once per successful call with the untyped results
#[derive(Clone)]
pub struct ResponseHook {
    name: String,
    func: Arc<HookFn>,
}

impl ResponseHook {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HookPayload) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Hook returning the string at `key`, if present and non-empty
    pub fn field(key: &str) -> Self {
        let key = key.to_string();
        Self::new(format!("field:{key}"), move |payload: &HookPayload| {
            payload.str_field(&key).map(str::to_string)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, payload: &HookPayload) -> Option<String> {
        (self.func)(payload)
    }
}

impl fmt::Debug for ResponseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHook").field("name", &self.name).finish()
    }
}

/// Ordered, append-only list of hooks.
/// Registering the same hook twice runs it twice.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<ResponseHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: ResponseHook) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in registration order against the same payload.
    /// Returns the first non-empty value produced.
    pub fn run(&self, payload: &HookPayload) -> Option<String> {
        let mut extracted: Option<String> = None;
        for hook in &self.hooks {
            let value = hook.invoke(payload).filter(|v| !v.is_empty());
            tracing::trace!("hook {} produced {:?}", hook.name(), value.is_some());
            if extracted.is_none() {
                extracted = value;
            }
        }
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_field_hook() {
        let payload = HookPayload::from_results(&json!({ "ha_gw_name": "aws-vpc-1-gw-1-1" }));
        let hook = ResponseHook::field("ha_gw_name");
        assert_eq!(hook.invoke(&payload).as_deref(), Some("aws-vpc-1-gw-1-1"));
        assert_eq!(hook.name(), "field:ha_gw_name");
    }

    #[test]
    fn test_first_non_empty_result_wins() {
        let mut registry = HookRegistry::new();
        registry.register(ResponseHook::new("empty", |_: &HookPayload| Some(String::new())));
        registry.register(ResponseHook::new("none", |_: &HookPayload| None));
        registry.register(ResponseHook::new("first", |_: &HookPayload| Some("a".to_string())));
        registry.register(ResponseHook::new("second", |_: &HookPayload| Some("b".to_string())));

        assert_eq!(registry.run(&HookPayload::default()).as_deref(), Some("a"));
    }

    #[test]
    fn test_every_hook_runs_even_after_a_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook = ResponseHook::new("count", move |_: &HookPayload| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("x".to_string())
        });

        let mut registry = HookRegistry::new();
        registry.register(hook.clone());
        registry.register(hook);
        assert_eq!(registry.len(), 2);

        registry.run(&HookPayload::default());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_registry() {
        let registry = HookRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.run(&HookPayload::default()), None);
    }
}
