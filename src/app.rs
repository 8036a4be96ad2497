use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{get, HttpRequest, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::client::WeatherProvider;
use crate::controller::{subscriptions, weather};
use crate::error::RestError;
use crate::service::SubscriptionManager;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}

/// Malformed JSON bodies are answered like any other parse error
fn json_error(e: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    RestError::ParseError(e.to_string()).into()
}

fn query_error(e: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    RestError::ParseError(e.to_string()).into()
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    manager: SubscriptionManager,
    weather_provider: Arc<dyn WeatherProvider>,
) -> anyhow::Result<Server> {
    // Wrap application data
    let manager = web::Data::new(manager);
    let weather_provider = web::Data::from(weather_provider);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(manager.clone())
            .app_data(weather_provider.clone())
            .service(health_check)
            .service(subscriptions::scope())
            .service(weather::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
