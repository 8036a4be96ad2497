use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;

use thiserror::Error;

use crate::client::WeatherError;
use crate::repo::StoreError;
use crate::service::SubscribeError;

pub type RestResult<T> = Result<T, RestError>;

const SUBSCRIPTION_FAILED: &str = "Subscription failed";

#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    ParseError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal Server Error")]
    InternalError(#[source] anyhow::Error),
}

impl RestError {
    fn internal(e: impl Into<anyhow::Error>) -> Self {
        let e = e.into();
        tracing::error!(error.cause_chain = ?e, "Internal server error: {}", e);
        Self::InternalError(e)
    }
}

impl From<StoreError> for RestError {
    fn from(e: StoreError) -> Self {
        Self::internal(e)
    }
}

impl From<SubscribeError> for RestError {
    fn from(e: SubscribeError) -> Self {
        match e {
            SubscribeError::Conflict => Self::Conflict(e.to_string()),
            SubscribeError::TokenSpaceExhausted => Self::internal(e),
            SubscribeError::ConfirmationNotSent(_)
            | SubscribeError::Link(_)
            | SubscribeError::Store(_) => {
                let e = anyhow::Error::from(e);
                tracing::error!(error.cause_chain = ?e, "Subscription failed: {}", e);
                Self::ParseError(SUBSCRIPTION_FAILED.into())
            }
        }
    }
}

impl From<WeatherError> for RestError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::EmptyCity | WeatherError::Unauthorized | WeatherError::Failed(_) => {
                Self::ParseError(e.to_string())
            }
            WeatherError::CityNotFound(_) => Self::NotFound(e.to_string()),
            WeatherError::RateLimited => Self::TooManyRequests(e.to_string()),
            WeatherError::MissingApiKey => Self::internal(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
        })
    }
}
