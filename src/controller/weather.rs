use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse, Responder};

use serde::Deserialize;

use crate::client::WeatherProvider;
use crate::error::RestResult;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    // Missing and blank are both answered with "City name is required"
    #[serde(default)]
    city: String,
}

/// Current weather for a city
#[tracing::instrument(name = "Weather endpoint", skip(weather))]
#[get("/weather")]
async fn current(
    weather: web::Data<dyn WeatherProvider>,
    query: web::Query<WeatherQuery>,
) -> RestResult<impl Responder> {
    let snapshot = weather.fetch_weather(&query.city).await?;

    Ok(HttpResponse::Ok().json(snapshot))
}

/// Weather API endpoints
pub fn scope() -> impl HttpServiceFactory {
    current
}
