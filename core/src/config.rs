//! Client configuration.
//!
//! The endpoint is parsed once, when the configuration is built, so a
//! malformed `MANTA_URL` fails before any request is attempted.

use url::Url;

use crate::error::StorageError;

pub const ENDPOINT_ENV: &str = "MANTA_URL";
pub const ACCOUNT_ENV: &str = "SDC_ACCOUNT";

const DEFAULT_USER_AGENT: &str = concat!("storage-core/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    endpoint: Url,
    account: String,
    user_agent: String,
}

impl ClientConfig {
    pub fn new(endpoint: &str, account: impl Into<String>) -> Result<Self, StorageError> {
        let url = Url::parse(endpoint).map_err(|source| StorageError::InvalidEndpoint {
            value: endpoint.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(StorageError::Config(format!(
                "endpoint {endpoint:?} must be an http or https URL"
            )));
        }
        let account = account.into();
        if account.is_empty() {
            return Err(StorageError::Config("account name must not be empty".to_string()));
        }
        Ok(Self {
            endpoint: url,
            account,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Read `MANTA_URL` and `SDC_ACCOUNT` from the process environment.
    pub fn from_env() -> Result<Self, StorageError> {
        let endpoint = env_var(ENDPOINT_ENV)?;
        let account = env_var(ACCOUNT_ENV)?;
        Self::new(&endpoint, account)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

fn env_var(name: &str) -> Result<String, StorageError> {
    std::env::var(name).map_err(|_| StorageError::Config(format!("{name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_endpoint() {
        let config = ClientConfig::new("https://us-east.manta.example.com", "acct").unwrap();
        assert_eq!(config.endpoint().host_str(), Some("us-east.manta.example.com"));
        assert_eq!(config.account(), "acct");
        assert!(config.user_agent().starts_with("storage-core/"));
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let err = ClientConfig::new("not a url", "acct").unwrap_err();
        assert!(matches!(err, StorageError::InvalidEndpoint { .. }));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = ClientConfig::new("ftp://files.example.com", "acct").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
        let err = ClientConfig::new("mailto:ops@example.com", "acct").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn empty_account_is_rejected() {
        let err = ClientConfig::new("http://localhost:8080", "").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn user_agent_can_be_overridden() {
        let config = ClientConfig::new("http://localhost:8080", "acct")
            .unwrap()
            .with_user_agent("wordcount/1.0");
        assert_eq!(config.user_agent(), "wordcount/1.0");
    }
}
