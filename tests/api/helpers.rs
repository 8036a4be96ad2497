use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::Serialize;

use url::Url;

use wiremock::MockServer;

use weather_subscriptions::app;
use weather_subscriptions::client::{EmailClient, OpenWeatherClient, WeatherProvider};
use weather_subscriptions::model::Subscription;
use weather_subscriptions::repo::InMemorySubscriptionStore;
use weather_subscriptions::service::{DeliveryScheduler, SubscriptionLinks, SubscriptionManager};

pub const WEATHER_API_KEY: &str = "TestWeatherKey";

#[derive(Debug, Clone, Serialize)]
pub struct NewSubscriber {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl NewSubscriber {
    pub fn new(email: &str, city: &str, frequency: &str) -> Self {
        Self {
            email: Some(email.into()),
            city: Some(city.into()),
            frequency: Some(frequency.into()),
        }
    }
}

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub store: Arc<InMemorySubscriptionStore>,
    pub scheduler: Arc<DeliveryScheduler>,
    pub email_server: MockServer,
    pub weather_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let email_server = MockServer::start().await;
        let weather_server = MockServer::start().await;

        let email_client = {
            let sender = "test@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };
        let email_client = Arc::new(email_client);

        let weather_client: Arc<dyn WeatherProvider> = {
            let api_base_url =
                Url::parse(&weather_server.uri()).expect("Failed to parse mock server uri");
            let api_key = Some(Secret::new(WEATHER_API_KEY.into()));

            let client = OpenWeatherClient::new(
                api_base_url,
                api_key,
                Duration::from_secs(2),
                "metric".into(),
                "ua".into(),
            )
            .expect("Failed to create weather client");
            Arc::new(client)
        };

        let store = Arc::new(InMemorySubscriptionStore::new());
        let links = SubscriptionLinks::new(Url::parse(&addr).expect("Failed to parse app address"));

        let manager = SubscriptionManager::new(store.clone(), email_client.clone(), links.clone(), 8);
        let scheduler = Arc::new(DeliveryScheduler::new(
            store.clone(),
            weather_client.clone(),
            email_client,
            links,
            Duration::from_secs(5),
        ));

        let server =
            app::run(listener, manager, weather_client).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            store,
            scheduler,
            email_server,
            weather_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn subscribe(&self, new_subscriber: &NewSubscriber) -> reqwest::Result<Response> {
        self.request(Method::POST, "subscription")
            .json(new_subscriber)
            .send()
            .await
    }

    pub async fn confirm(&self, token: &str) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("subscription/confirm/{}", token))
            .send()
            .await
    }

    pub async fn unsubscribe(&self, token: &str) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("subscription/unsubscribe/{}", token))
            .send()
            .await
    }

    pub async fn weather(&self, city: Option<&str>) -> reqwest::Result<Response> {
        let req = self.request(Method::GET, "weather");
        let req = match city {
            Some(city) => req.query(&[("city", city)]),
            None => req,
        };
        req.send().await
    }

    /// Links carried by the emails sent so far whose path contains `segment`
    pub async fn emailed_links(&self, segment: &str) -> Vec<Url> {
        let requests = self
            .email_server
            .received_requests()
            .await
            .expect("Request recording is disabled");

        requests
            .iter()
            .flat_map(|req| {
                let body = String::from_utf8_lossy(&req.body).to_string();
                linkify::LinkFinder::new()
                    .links(&body)
                    .filter(|l| *l.kind() == linkify::LinkKind::Url)
                    .map(|l| Url::parse(l.as_str()).expect("Failed to parse emailed link"))
                    .collect::<Vec<_>>()
            })
            .filter(|link| link.path().contains(segment))
            .collect()
    }

    /// Emailed bodies, decoded
    pub async fn emails(&self) -> Vec<serde_json::Value> {
        self.email_server
            .received_requests()
            .await
            .expect("Request recording is disabled")
            .iter()
            .map(|req| serde_json::from_slice(&req.body).expect("Email body is not JSON"))
            .collect()
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.store.all().await
    }
}

/// Last path segment of a subscription link
pub fn token_of(link: &Url) -> String {
    link.path_segments()
        .and_then(|segments| segments.last())
        .expect("Link has no token")
        .to_string()
}
