use reqwest::StatusCode;

use serde_json::{json, Value};

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, WEATHER_API_KEY};

#[tokio::test]
async fn weather_returns_current_conditions() {
    let app = TestApp::spawn().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Kyiv"))
        .and(query_param("appid", WEATHER_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": { "temp": 12.3, "humidity": 80 },
            "weather": [{ "description": "light rain" }]
        })))
        .expect(1)
        .mount(&app.weather_server)
        .await;

    let res = app.weather(Some("Kyiv")).await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        json!({ "temperature": 12.3, "humidity": 80.0, "description": "light rain" }),
        body
    );
}

#[tokio::test]
async fn empty_city_is_rejected_without_calling_upstream() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.weather_server)
        .await;

    for city in [Some(""), Some("   "), None] {
        let res = app.weather(city).await.expect("Failed to execute request");

        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "city {:?}", city);
        let body: Value = res.json().await.unwrap();
        assert_eq!("City name is required", body["message"]);
    }
}

#[tokio::test]
async fn unknown_city_is_not_found() {
    let app = TestApp::spawn().await;

    Mock::given(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&app.weather_server)
        .await;

    let res = app
        .weather(Some("Atlantis"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("City \"Atlantis\" not found", body["message"]);
}

#[tokio::test]
async fn upstream_failures_are_classified() {
    let cases = vec![
        (401, StatusCode::BAD_REQUEST, "Invalid Weather API key"),
        (429, StatusCode::TOO_MANY_REQUESTS, "Weather API request limit exceeded"),
        (500, StatusCode::BAD_REQUEST, "Failed to fetch weather data"),
    ];

    for (upstream, expected, message) in cases {
        let app = TestApp::spawn().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(upstream))
            .expect(1)
            .mount(&app.weather_server)
            .await;

        let res = app.weather(Some("London")).await.expect("Failed to execute request");

        assert_eq!(expected, res.status(), "upstream {}", upstream);
        let body: Value = res.json().await.unwrap();
        assert_eq!(message, body["message"]);
    }
}
