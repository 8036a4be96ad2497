use url::Url;

/// Builds the public confirm / unsubscribe links handed out in notifications
#[derive(Debug, Clone)]
pub struct SubscriptionLinks {
    base_url: Url,
}

impl SubscriptionLinks {
    pub fn new(mut base_url: Url) -> Self {
        // Joining relative paths replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { base_url }
    }

    pub fn confirm(&self, token: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(&format!("subscription/confirm/{}", token))
    }

    pub fn unsubscribe(&self, token: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(&format!("subscription/unsubscribe/{}", token))
    }
}
