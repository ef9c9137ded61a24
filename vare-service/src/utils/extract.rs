use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;

/// `Path` extractor whose rejection is an `AppError` JSON body.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Invalid path parameter: {}",
                    rejection.body_text()
                ))
            })?;

        Ok(PathParam(value))
    }
}

/// `Query` extractor whose rejection is an `AppError` JSON body.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Invalid query string: {}",
                    rejection.body_text()
                ))
            })?;

        Ok(QueryParams(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Paging {
        limit: i64,
    }

    fn router() -> Router {
        Router::new()
            .route(
                "/items/:id",
                get(|PathParam(id): PathParam<i64>| async move { id.to_string() }),
            )
            .route(
                "/items",
                get(|QueryParams(paging): QueryParams<Paging>| async move {
                    paging.limit.to_string()
                }),
            )
    }

    async fn call(uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, bytes.to_vec())
    }

    #[tokio::test]
    async fn valid_path_and_query_pass_through() {
        assert_eq!(call("/items/7").await.2, b"7");
        assert_eq!(call("/items?limit=3").await.2, b"3");
    }

    #[tokio::test]
    async fn bad_path_is_json_bad_request() {
        let (status, content_type, body) = call("/items/abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid path parameter"));
    }

    #[tokio::test]
    async fn bad_query_is_json_bad_request() {
        let (status, content_type, body) = call("/items?limit=ten").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query string"));
    }
}
