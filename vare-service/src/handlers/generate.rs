use axum::{extract::State, Json};

use crate::dtos::{GenerateRequest, RecordCreate};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use service_core::error::AppError;

/// Run the fixed prompt against the model and return the parsed analysis.
///
/// Nothing is persisted here; the client posts the result to `/db/`.
#[tracing::instrument(skip(state, request))]
pub async fn generate(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<GenerateRequest>,
) -> Result<Json<RecordCreate>, AppError> {
    let analysis = state.generator.generate(&request).await?;
    Ok(Json(analysis))
}
