//! Generation adapter: fixed prompt in, strictly parsed analysis out.

use crate::dtos::{GenerateRequest, RecordCreate};
use crate::services::metrics::{GENERATION_DURATION, GENERATION_REQUESTS_TOTAL};
use crate::services::providers::{GenerationParams, ProviderError, TextProvider};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Output-format instruction appended after the user-specific prompt.
const OUTPUT_FORMAT: &str = r#"
응답은 반드시 아래 구조의 JSON 객체 하나로만 작성하세요:

{
  "category": "<목표가 속한 분야를 나타내는 짧은 단어>",
  "title": "<분석 전체를 요약하는 제목>",
  "succ": {
    "description": "<두려움을 극복하고 목표를 이룬 미래에 대한 묘사>",
    "todo": ["<매일 실천할 TO DO 항목>", "..."],
    "todo_cata": ["<같은 순서의 각 TO DO 항목 분류>", "..."]
  },
  "fail": {
    "description": "<두려움에 지배되어 실패한 미래에 대한 묘사>",
    "reason": ["<두려움의 원인 1>", "<원인 2>", "<원인 3>", "<원인 4>"],
    "percent": [<원인 1의 비중>, <원인 2의 비중>, <원인 3의 비중>, <원인 4의 비중>],
    "action_title": ["<두려움을 줄이기 위한 행동 제목>", "..."],
    "action_desc": ["<같은 순서의 각 행동 설명>", "..."]
  }
}

"reason"과 "percent"는 각각 정확히 4개이며 "percent"는 합계가 100인 정수입니다.
"todo"와 "todo_cata", "action_title"과 "action_desc"는 길이가 같아야 합니다.
모든 응답은 한국어로 작성하고, 설명이나 주석, MARKDOWN 서식 없이 순수 JSON만 출력하세요.
"#;

/// Build the full instruction for one request.
pub fn build_prompt(input: &GenerateRequest) -> String {
    format!(
        r#"
너는 한국어로 대답하는 상담 모델이며, 사용자의 입력을 바탕으로 분석 결과를 JSON 형식으로 생성해야 합니다.

입력은 다음 세 가지 요소로 구성됩니다:
1. 사용자가 이루고자 하는 미래(목표 또는 꿈)
2. 그것을 가로막고 있는 두려움(불안, 트라우마, 습관 등)
3. 현재 사용자가 처한 상황

아래는 사용자의 입력입니다:
- 사용자의 이상: {ideal}
- 사용자의 두려움: {afraid}
- 사용자의 현재 상황: {current}

작성할 내용:
- 두려움을 극복하고 미래를 성취한 모습의 시뮬레이션과, 그 미래를 위한 매일 단위의 TO DO 루틴.
  주, 월, 년 단위 계획이나 시간 표현 없이 해야 할 작업만 적으세요.
- 두려움에 지배당한 경우의 미래 시뮬레이션.
- 두려움의 원인 분석과 각 원인의 비중, 그리고 두려움을 줄이기 위한 구체적인 행동.
{format}"#,
        ideal = input.ideal,
        afraid = input.afraid,
        current = input.current,
        format = OUTPUT_FORMAT,
    )
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Upstream generation failed: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Generated text is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Generated JSON does not match the analysis schema: {0}")]
    UnexpectedShape(#[source] serde_json::Error),
}

impl GenerationError {
    fn outcome(&self) -> &'static str {
        match self {
            GenerationError::Upstream(_) => "upstream_error",
            GenerationError::InvalidJson(_) | GenerationError::UnexpectedShape(_) => {
                "parse_error"
            }
        }
    }
}

impl GenerationError {
    /// Client-facing summary. Provider detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            GenerationError::Upstream(ProviderError::RateLimited) => {
                "Generation provider is rate limited"
            }
            GenerationError::Upstream(ProviderError::ContentFiltered) => {
                "Generation was blocked by the provider's safety filter"
            }
            GenerationError::Upstream(_) => "Generation provider request failed",
            GenerationError::InvalidJson(_) | GenerationError::UnexpectedShape(_) => {
                "Generation returned an invalid analysis"
            }
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::BadGateway(err.public_message().to_string())
    }
}

/// Parse model output strictly: no fence stripping, no repair.
pub fn parse_generated(text: &str) -> Result<RecordCreate, GenerationError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(GenerationError::InvalidJson)?;
    serde_json::from_value(value).map_err(GenerationError::UnexpectedShape)
}

/// Issues the generation call with the fixed prompt and deterministic settings.
#[derive(Clone)]
pub struct GenerationAdapter {
    provider: Arc<dyn TextProvider>,
}

impl GenerationAdapter {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Whether the backing provider can take requests.
    pub async fn provider_ready(&self) -> bool {
        self.provider.health_check().await.is_ok()
    }

    #[instrument(skip(self, input), fields(provider = self.provider.name()))]
    pub async fn generate(&self, input: &GenerateRequest) -> Result<RecordCreate, GenerationError> {
        let prompt = build_prompt(input);

        let timer = GENERATION_DURATION
            .with_label_values(&[self.provider.name()])
            .start_timer();
        let result = self
            .provider
            .generate(&prompt, &GenerationParams::deterministic_json())
            .await;
        timer.observe_duration();

        let result = result
            .map_err(GenerationError::from)
            .and_then(|response| {
                info!(
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Generation completed"
                );
                parse_generated(&response.text)
            });

        match &result {
            Ok(_) => GENERATION_REQUESTS_TOTAL
                .with_label_values(&["success"])
                .inc(),
            Err(e) => {
                warn!(error = %e, "Generation failed");
                GENERATION_REQUESTS_TOTAL
                    .with_label_values(&[e.outcome()])
                    .inc();
            }
        }

        result
    }
}
