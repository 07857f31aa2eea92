use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{strip_code_blocks, LanguageModel};
use futures::future::join_all;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{info, warn};

use matchday_common::{CommentaryResult, CommentarySlot};

use crate::budget::{panic_message, StepBudget, StepTimeout};

#[derive(Debug, Clone, Copy)]
pub struct FanOutLimits {
    pub per_call: Duration,
    pub deadline: Option<Instant>,
}

/// Send `prompt` to every model at once. Each model gets exactly one slot,
/// in the order given, whatever happens to its call.
pub async fn fan_out(
    prompt: &str,
    models: &[Arc<dyn LanguageModel>],
    limits: FanOutLimits,
) -> CommentaryResult {
    if models.is_empty() {
        return Vec::new();
    }

    info!(backends = models.len(), prompt_chars = prompt.len(), "Fanning out prompt");
    let budget = StepBudget::new(limits.per_call, limits.deadline);
    let calls = models.iter().map(|model| ask(model.as_ref(), prompt, budget));
    let slots = join_all(calls).await;

    let failed = slots.iter().filter(|slot| slot.is_error()).count();
    info!(backends = slots.len(), failed, "Commentary collected");
    slots
}

async fn ask(model: &dyn LanguageModel, prompt: &str, budget: StepBudget) -> CommentarySlot {
    let name = model.name();
    let started = Instant::now();
    let call = AssertUnwindSafe(model.complete(prompt)).catch_unwind();

    match budget.run(call).await {
        Ok(Ok(Ok(text))) => {
            info!(backend = name, elapsed_ms = started.elapsed().as_millis() as u64, "Backend answered");
            CommentarySlot::text(name, strip_code_blocks(&text))
        }
        Ok(Ok(Err(e))) => {
            warn!(backend = name, error = %e, "Backend failed");
            CommentarySlot::error(name, e.to_string())
        }
        Ok(Err(payload)) => {
            let message = panic_message(payload.as_ref());
            warn!(backend = name, error = %message, "Backend panicked");
            CommentarySlot::error(name, format!("{name} panicked: {message}"))
        }
        Err(StepTimeout::Deadline) => {
            warn!(backend = name, "Backend cancelled at request deadline");
            CommentarySlot::error(name, StepTimeout::Deadline.to_string())
        }
        Err(timeout) => {
            warn!(backend = name, "Backend timed out");
            CommentarySlot::error(name, format!("{name} {timeout}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use matchday_common::Outcome;

    fn limits(per_call: u64) -> FanOutLimits {
        FanOutLimits {
            per_call: Duration::from_secs(per_call),
            deadline: None,
        }
    }

    #[tokio::test]
    async fn no_models_no_slots() {
        assert!(fan_out("prompt", &[], limits(5)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slots_follow_model_order_despite_failures() {
        let models: Vec<Arc<dyn LanguageModel>> = vec![
            Arc::new(MockModel::slow("gemini", Duration::from_secs(2), "{\"a\":1}")),
            Arc::new(MockModel::failing("openai", "rate limited")),
            Arc::new(MockModel::hanging("cohere")),
            Arc::new(MockModel::replying("anthropic", "```json\n{\"b\":2}\n```")),
        ];

        let slots = fan_out("prompt", &models, limits(10)).await;

        let providers: Vec<_> = slots.iter().map(|s| s.provider.as_str()).collect();
        assert_eq!(providers, ["gemini", "openai", "cohere", "anthropic"]);
        assert_eq!(slots[0].outcome, Outcome::Text("{\"a\":1}".to_string()));
        assert!(slots[1].is_error());
        assert_eq!(
            slots[2].outcome,
            Outcome::Error("cohere timed out after 10s".to_string())
        );
        assert_eq!(slots[3].outcome, Outcome::Text("{\"b\":2}".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_does_not_hold_back_fast_ones() {
        let fast = Arc::new(MockModel::replying("gemini", "ok"));
        let models: Vec<Arc<dyn LanguageModel>> =
            vec![Arc::new(MockModel::hanging("openai")), fast.clone()];

        let started = Instant::now();
        let slots = fan_out("prompt", &models, limits(3)).await;

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(slots[1].outcome, Outcome::Text("ok".to_string()));
        assert_eq!(fast.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_pending_calls() {
        let models: Vec<Arc<dyn LanguageModel>> = vec![
            Arc::new(MockModel::replying("gemini", "quick")),
            Arc::new(MockModel::slow("openai", Duration::from_secs(30), "late")),
        ];
        let limits = FanOutLimits {
            per_call: Duration::from_secs(60),
            deadline: Some(Instant::now() + Duration::from_secs(5)),
        };

        let slots = fan_out("prompt", &models, limits).await;
        assert_eq!(slots[0].outcome, Outcome::Text("quick".to_string()));
        assert_eq!(slots[1].outcome, Outcome::Error("deadline exceeded".to_string()));
    }

    #[tokio::test]
    async fn panicking_backend_becomes_error_slot() {
        let models: Vec<Arc<dyn LanguageModel>> = vec![
            Arc::new(MockModel::panicking("mistral")),
            Arc::new(MockModel::replying("gemini", "fine")),
        ];

        let slots = fan_out("prompt", &models, limits(5)).await;
        assert!(slots[0].is_error());
        assert_eq!(slots[1].outcome, Outcome::Text("fine".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_per_call_limit_waits_for_the_answer() {
        let models: Vec<Arc<dyn LanguageModel>> = vec![Arc::new(MockModel::slow(
            "gemini",
            Duration::from_secs(90),
            "late but fine",
        ))];
        let limits = FanOutLimits {
            per_call: Duration::MAX,
            deadline: None,
        };

        let slots = fan_out("prompt", &models, limits).await;
        assert_eq!(slots[0].outcome, Outcome::Text("late but fine".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_is_reported_in_milliseconds() {
        let models: Vec<Arc<dyn LanguageModel>> = vec![Arc::new(MockModel::hanging("cohere"))];
        let limits = FanOutLimits {
            per_call: Duration::from_millis(500),
            deadline: None,
        };

        let slots = fan_out("prompt", &models, limits).await;
        assert_eq!(
            slots[0].outcome,
            Outcome::Error("cohere timed out after 500ms".to_string())
        );
    }

    #[tokio::test]
    async fn every_model_sees_the_same_prompt() {
        let a = Arc::new(MockModel::replying("gemini", "x"));
        let b = Arc::new(MockModel::replying("openai", "y"));
        let models: Vec<Arc<dyn LanguageModel>> = vec![a.clone(), b.clone()];

        fan_out("the prompt", &models, limits(5)).await;
        assert_eq!(a.last_prompt().as_deref(), Some("the prompt"));
        assert_eq!(b.last_prompt().as_deref(), Some("the prompt"));
    }
}
