use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use serde::Deserialize;

use crate::error::{RestError, RestResult};
use crate::model::NewSubscription;
use crate::service::SubscriptionManager;

/// JSON body of a subscribe request
#[derive(Debug, Deserialize)]
pub struct NewSubscriptionBody {
    email: String,
    city: String,
    frequency: String,
}

impl TryFrom<NewSubscriptionBody> for NewSubscription {
    type Error = String;

    fn try_from(body: NewSubscriptionBody) -> Result<Self, Self::Error> {
        let email = body.email.parse()?;
        let city = body.city.parse()?;
        let frequency = body.frequency.parse()?;

        Ok(NewSubscription {
            email,
            city,
            frequency,
        })
    }
}

/// Subscribe an email to weather updates for a city
#[tracing::instrument(name = "Subscribe endpoint", skip(manager, body))]
#[post("")]
async fn subscribe(
    manager: web::Data<SubscriptionManager>,
    body: web::Json<NewSubscriptionBody>,
) -> RestResult<impl Responder> {
    let new_subscription: NewSubscription =
        body.into_inner().try_into().map_err(RestError::ParseError)?;

    let res = manager.subscribe(new_subscription).await?;

    Ok(HttpResponse::Ok().json(res))
}

/// Confirm a subscription through the emailed link
#[tracing::instrument(name = "Confirm endpoint", skip(manager, path))]
#[get("/confirm/{token}")]
async fn confirm(
    manager: web::Data<SubscriptionManager>,
    path: web::Path<(String,)>,
) -> RestResult<impl Responder> {
    let (token,) = path.into_inner();

    let res = manager.confirm(&token).await?;

    Ok(HttpResponse::Ok().json(res))
}

/// Remove a subscription through the emailed link
#[tracing::instrument(name = "Unsubscribe endpoint", skip(manager, path))]
#[get("/unsubscribe/{token}")]
async fn unsubscribe(
    manager: web::Data<SubscriptionManager>,
    path: web::Path<(String,)>,
) -> RestResult<impl Responder> {
    let (token,) = path.into_inner();

    let res = manager.unsubscribe(&token).await?;

    Ok(HttpResponse::Ok().json(res))
}

/// Subscription API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/subscription")
        .service(subscribe)
        .service(confirm)
        .service(unsubscribe)
}
