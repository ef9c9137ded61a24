use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body extractor that also runs `validator` rules.
///
/// Unparseable bodies are rejected with 400, bodies with missing or mistyped
/// fields or failing rules with 422.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(e) => AppError::UnprocessableEntity(anyhow::anyhow!(
                    "Invalid request body: {}",
                    e.body_text()
                )),
                other => {
                    AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", other.body_text()))
                }
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(length(max = 3))]
        name: String,
    }

    fn router() -> Router {
        Router::new().route(
            "/",
            post(|ValidatedJson(p): ValidatedJson<Payload>| async move { p.name }),
        )
    }

    async fn status_for(body: &'static str) -> StatusCode {
        router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        assert_eq!(status_for(r#"{"name": "abc"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        assert_eq!(status_for(r#"{"name": "#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_field_is_unprocessable() {
        assert_eq!(status_for("{}").await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn failed_rule_is_unprocessable() {
        assert_eq!(
            status_for(r#"{"name": "abcd"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
