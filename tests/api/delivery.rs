use serde_json::json;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use weather_subscriptions::domain::Frequency;
use weather_subscriptions::service::TickSummary;

use crate::helpers::{token_of, NewSubscriber, TestApp};

async fn subscribe_and_confirm(app: &TestApp, email: &str, city: &str, frequency: &str) {
    app.subscribe(&NewSubscriber::new(email, city, frequency))
        .await
        .expect("Failed to execute request");

    let links = app.emailed_links("/subscription/confirm/").await;
    let link = links.last().expect("No confirmation link was emailed");
    app.confirm(&token_of(link))
        .await
        .expect("Failed to execute request");
}

#[tokio::test]
async fn tick_emails_weather_to_confirmed_subscribers() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email/withTemplate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
    Mock::given(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": { "temp": 20.5, "humidity": 65 },
            "weather": [{ "description": "clear sky" }]
        })))
        .expect(1)
        .mount(&app.weather_server)
        .await;

    subscribe_and_confirm(&app, "a@x.com", "London", "HOURLY").await;
    subscribe_and_confirm(&app, "b@x.com", "Paris", "DAILY").await;
    // Never confirmed
    app.subscribe(&NewSubscriber::new("c@x.com", "London", "HOURLY"))
        .await
        .expect("Failed to execute request");

    let summary = app.scheduler.tick(Frequency::Hourly).await;

    assert_eq!(TickSummary { delivered: 1, failed: 0 }, summary);

    let emails = app.emails().await;
    let updates: Vec<_> = emails
        .iter()
        .filter(|email| email["TemplateAlias"] == "weather-update")
        .collect();
    assert_eq!(1, updates.len());
    assert_eq!("a@x.com", updates[0]["To"]);

    let model = &updates[0]["TemplateModel"];
    assert_eq!("London", model["city"]);
    assert_eq!(20.5, model["temperature"]);
    assert_eq!(65.0, model["humidity"]);
    assert_eq!("clear sky", model["description"]);
    assert!(model["unsubscribeLink"]
        .as_str()
        .unwrap()
        .contains("/subscription/unsubscribe/"));
}

#[tokio::test]
async fn unknown_city_fails_only_its_subscriber() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email/withTemplate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
    Mock::given(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.weather_server)
        .await;
    Mock::given(query_param("q", "Kyiv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": { "temp": 3.0, "humidity": 90 },
            "weather": [{ "description": "snow" }]
        })))
        .mount(&app.weather_server)
        .await;

    subscribe_and_confirm(&app, "a@x.com", "Atlantis", "DAILY").await;
    subscribe_and_confirm(&app, "b@x.com", "Kyiv", "DAILY").await;

    let summary = app.scheduler.tick(Frequency::Daily).await;

    assert_eq!(TickSummary { delivered: 1, failed: 1 }, summary);
}
