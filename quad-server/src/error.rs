use std::fmt::Display;

use quad_api::{Error as ApiError, Uuid};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn permission_denied() -> Error {
        Error::Api(ApiError::PermissionDenied)
    }

    pub fn not_found(what: impl Display) -> Error {
        Error::Api(ApiError::not_found(what))
    }

    pub fn uuid_already_used(uuid: Uuid) -> Error {
        Error::Api(ApiError::UuidAlreadyUsed(uuid))
    }

    pub fn name_already_used(name: String) -> Error {
        Error::Api(ApiError::NameAlreadyUsed(name))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        };
        (err.status_code(), err.contents()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[tokio::test]
    async fn internal_errors_are_reported_as_unknown() {
        let resp = Error::from(anyhow::anyhow!("connection reset")).into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert!(matches!(ApiError::parse(&body), Ok(ApiError::Unknown(_))));
    }

    #[tokio::test]
    async fn api_errors_keep_their_status() {
        let resp = Error::not_found("post 42").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::NOT_FOUND);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(
            ApiError::parse(&body).unwrap(),
            ApiError::NotFound(String::from("post 42"))
        );
    }
}
