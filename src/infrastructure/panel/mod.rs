//! Panel connectivity check over the panel's admin API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::application::errors::PanelError;
use crate::domain::entities::PanelCredentials;
use crate::domain::traits::PanelChecker;

const TOKEN_PATH: &str = "/api/admin/token";

/// Logs in with the given credentials, first over HTTPS, then plain HTTP
pub struct HttpPanelChecker {
    client: Client,
}

impl HttpPanelChecker {
    pub fn new(timeout: Duration) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PanelError::Unreachable(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn token_urls(domain: &str) -> [String; 2] {
        let domain = domain.trim().trim_end_matches('/');
        [
            format!("https://{}{}", domain, TOKEN_PATH),
            format!("http://{}{}", domain, TOKEN_PATH),
        ]
    }

    async fn login(&self, url: &str, credentials: &PanelCredentials) -> Result<(), PanelError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
        }

        let response = self
            .client
            .post(url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PanelError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PanelError::Rejected(format!("panel answered {}", status)));
        }
        if !status.is_success() {
            return Err(PanelError::Unreachable(format!("panel answered {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PanelError::Unreachable(format!("unexpected response: {}", e)))?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(PanelError::Rejected("no access token in response".to_string())),
        }
    }
}

#[async_trait]
impl PanelChecker for HttpPanelChecker {
    async fn verify(&self, credentials: &PanelCredentials) -> Result<(), PanelError> {
        let mut last = PanelError::Unreachable("no attempt made".to_string());
        for url in Self::token_urls(&credentials.domain) {
            match self.login(&url, credentials).await {
                Ok(()) => {
                    tracing::info!("Panel login succeeded at {}", url);
                    return Ok(());
                }
                // Wrong credentials will not improve over another scheme.
                Err(e @ PanelError::Rejected(_)) => {
                    tracing::warn!("Panel rejected login at {}: {}", url, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!("Panel login failed at {}: {}", url, e);
                    last = e;
                }
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_urls_try_https_first() {
        let [https, http] = HttpPanelChecker::token_urls(" panel.example.com:8443/ ");
        assert_eq!(https, "https://panel.example.com:8443/api/admin/token");
        assert_eq!(http, "http://panel.example.com:8443/api/admin/token");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_reported_as_unreachable() {
        let checker = HttpPanelChecker::new(Duration::from_millis(500)).unwrap();
        let creds = PanelCredentials::new("127.0.0.1:1", "admin", "secret");
        assert!(matches!(checker.verify(&creds).await, Err(PanelError::Unreachable(_))));
    }
}
