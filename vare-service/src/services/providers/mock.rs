//! Mock provider implementation for tests and local development.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;

/// Canned analysis returned by [`MockTextProvider::sample`].
pub const SAMPLE_RESPONSE: &str = r#"{
  "category": "커리어",
  "title": "발표 공포를 넘어 팀 리더로",
  "succ": {
    "description": "두려움을 이겨내고 자신 있게 팀을 이끄는 모습입니다.",
    "todo": ["아침에 10분 발표 연습하기", "하루 업무 회고 작성하기"],
    "todo_cata": ["연습", "성찰"]
  },
  "fail": {
    "description": "두려움에 발표 기회를 피하며 성장이 멈춘 모습입니다.",
    "reason": ["과거의 실패 경험", "완벽주의", "타인의 평가에 대한 민감함", "준비 부족"],
    "percent": [40, 25, 20, 15],
    "action_title": ["작은 무대부터 시작하기", "피드백 요청하기"],
    "action_desc": ["소규모 회의에서 먼저 의견을 말해 봅니다.", "동료에게 구체적인 피드백을 부탁합니다."]
  }
}"#;

enum MockBehavior {
    Respond(String),
    Fail(String),
}

/// Mock text provider returning a fixed body or a fixed failure.
pub struct MockTextProvider {
    behavior: MockBehavior,
}

impl MockTextProvider {
    /// Always answer with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Respond(text.into()),
        }
    }

    /// Always answer with [`SAMPLE_RESPONSE`].
    pub fn sample() -> Self {
        Self::new(SAMPLE_RESPONSE)
    }

    /// Always fail with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.into()),
        }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        match &self.behavior {
            MockBehavior::Respond(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.len() as i32 / 4,
            }),
            MockBehavior::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_answers_with_canned_analysis() {
        let provider = MockTextProvider::sample();

        let response = tokio_test::block_on(
            provider.generate("prompt", &GenerationParams::deterministic_json()),
        )
        .unwrap();

        assert_eq!(response.text, SAMPLE_RESPONSE);
        assert!(response.output_tokens > 0);
    }

    #[test]
    fn failing_surfaces_api_error() {
        let provider = MockTextProvider::failing("boom");

        let err = tokio_test::block_on(provider.generate("p", &GenerationParams::default()))
            .unwrap_err();

        assert!(matches!(err, ProviderError::ApiError(msg) if msg == "boom"));
    }
}
