//! Shared testing utilities for the Cascadia workspace.
//!
//! `ScriptedAdapter` stands in for a real provider: each provider name gets
//! a scripted behaviour and every call is recorded, so tests can assert on
//! both the cascade trace and which providers were actually invoked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cascadia_config::EndpointKind;
use cascadia_llm::{
    AdapterFailure, AdapterRegistry, BackendAdapter, CascadeEngine, CascadeRequest, CascadeSettings,
    ProviderDescriptor, ProviderSet,
};
use cascadia_monitoring::{BlockedPrompt, CascadeOutcome, MetricsSink};
use secrecy::SecretString;

/// What a scripted provider does when called.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed(String),
    Fail(AdapterFailure),
    /// Sleep, then answer. Longer than the attempt budget means a timeout.
    RespondAfter(Duration, String),
    /// Never answers.
    Hang,
    /// One entry per call; the last entry repeats.
    Sequence(Vec<Behaviour>),
}

#[derive(Default)]
struct Script {
    behaviours: HashMap<String, Behaviour>,
    calls: Vec<String>,
    call_counts: HashMap<String, usize>,
}

/// In-memory adapter driven by per-provider scripts. Clones share state.
#[derive(Clone)]
pub struct ScriptedAdapter {
    kind: EndpointKind,
    script: Arc<Mutex<Script>>,
}

impl ScriptedAdapter {
    pub fn new(kind: EndpointKind) -> Self {
        Self { kind, script: Arc::new(Mutex::new(Script::default())) }
    }

    pub fn on(self, provider: &str, behaviour: Behaviour) -> Self {
        self.lock().behaviours.insert(provider.to_string(), behaviour);
        self
    }

    pub fn succeed(self, provider: &str, text: &str) -> Self {
        self.on(provider, Behaviour::Succeed(text.to_string()))
    }

    pub fn fail(self, provider: &str, failure: AdapterFailure) -> Self {
        self.on(provider, Behaviour::Fail(failure))
    }

    pub fn fail_http(self, provider: &str, status: u16) -> Self {
        self.fail(provider, AdapterFailure::Http { status })
    }

    pub fn respond_after(self, provider: &str, delay: Duration, text: &str) -> Self {
        self.on(provider, Behaviour::RespondAfter(delay, text.to_string()))
    }

    pub fn hang(self, provider: &str) -> Self {
        self.on(provider, Behaviour::Hang)
    }

    pub fn sequence(self, provider: &str, steps: Vec<Behaviour>) -> Self {
        self.on(provider, Behaviour::Sequence(steps))
    }

    /// Provider names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, provider: &str) -> usize {
        self.lock().call_counts.get(provider).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_behaviour(&self, provider: &str) -> Behaviour {
        let mut script = self.lock();
        script.calls.push(provider.to_string());
        let n = {
            let count = script.call_counts.entry(provider.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let mut behaviour = script
            .behaviours
            .get(provider)
            .cloned()
            .unwrap_or_else(|| Behaviour::Fail(AdapterFailure::Network(format!("no script for {provider}"))));
        // The n-th call takes the n-th step; nested sequences take their first.
        let mut step = n;
        while let Behaviour::Sequence(steps) = behaviour {
            behaviour = steps
                .get(step - 1)
                .or_else(|| steps.last())
                .cloned()
                .unwrap_or_else(|| Behaviour::Fail(AdapterFailure::Network("empty sequence".into())));
            step = 1;
        }
        behaviour
    }
}

#[async_trait]
impl BackendAdapter for ScriptedAdapter {
    fn kind(&self) -> EndpointKind {
        self.kind
    }

    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        _request: &CascadeRequest,
    ) -> Result<String, AdapterFailure> {
        match self.next_behaviour(provider.name()) {
            Behaviour::Succeed(text) => Ok(text),
            Behaviour::Fail(failure) => Err(failure),
            Behaviour::RespondAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Behaviour::Hang => {
                std::future::pending::<()>().await;
                Err(AdapterFailure::Timeout { after_ms: None })
            }
            Behaviour::Sequence(_) => Err(AdapterFailure::Network("unresolved sequence".into())),
        }
    }
}

/// Descriptor with a dummy key and `{name}-model` as model.
pub fn descriptor(name: &str) -> ProviderDescriptor {
    descriptor_of(name, EndpointKind::OpenAiCompatible)
}

pub fn descriptor_of(name: &str, kind: EndpointKind) -> ProviderDescriptor {
    ProviderDescriptor::new(name, SecretString::from(format!("{name}-key")), format!("{name}-model"), kind)
}

/// Ordered set of OpenAI-compatible descriptors.
///
/// # Panics
/// On duplicate names.
pub fn provider_set(names: &[&str]) -> ProviderSet {
    ProviderSet::new(names.iter().map(|n| descriptor(n)).collect()).expect("valid test provider set")
}

/// Engine over `names` with every provider served by `adapter`.
pub fn engine_with(names: &[&str], adapter: &ScriptedAdapter, settings: CascadeSettings) -> CascadeEngine {
    let registry = AdapterRegistry::new().with(Arc::new(adapter.clone()));
    CascadeEngine::new(provider_set(names), registry, settings)
}

/// Settings with a short attempt budget for timeout tests.
pub fn fast_settings(attempt_timeout: Duration) -> CascadeSettings {
    CascadeSettings { attempt_timeout, retries_per_provider: 0 }
}

pub fn request(prompt: &str) -> CascadeRequest {
    CascadeRequest::with_defaults(prompt).expect("valid test prompt")
}

/// Sink that keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<CascadeOutcome>>,
    blocked: Mutex<Vec<BlockedPrompt>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outcomes(&self) -> Vec<CascadeOutcome> {
        self.outcomes.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn blocked(&self) -> Vec<BlockedPrompt> {
        self.blocked.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl MetricsSink for RecordingSink {
    fn record_outcome(&self, outcome: &CascadeOutcome) {
        self.outcomes.lock().unwrap_or_else(|p| p.into_inner()).push(outcome.clone());
    }

    fn record_blocked(&self, blocked: &BlockedPrompt) {
        self.blocked.lock().unwrap_or_else(|p| p.into_inner()).push(*blocked);
    }
}
