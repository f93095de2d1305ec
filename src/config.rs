use url::Url;

use crate::error::Error;

/// Default backend address, matching the local development server.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Enerlytics API configuration.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors.
///
/// ```rust,ignore
/// use enerlytics_client::ApiConfig;
///
/// let config = ApiConfig::new("https://api.enerlytics.example/api/v1".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
}

impl ApiConfig {
    /// Create a new configuration pointing at the given API root
    /// (e.g. `https://api.enerlytics.example/api/v1`).
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Create configuration from environment variables.
    ///
    /// # Optional env vars
    /// - `ENERLYTICS_API_URL`: API root URL. Defaults to the local
    ///   development backend (`http://127.0.0.1:8000/api/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `ENERLYTICS_API_URL` is set but is not a
    /// valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = match std::env::var("ENERLYTICS_API_URL") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("ENERLYTICS_API_URL: {e}")))?,
            Err(_) => DEFAULT_BASE_URL.parse().expect("valid default URL"),
        };
        Ok(Self { base_url })
    }

    /// Override the API root URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// API root URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an API path (`path` must start with `/`).
    pub(crate) fn endpoint(&self, path: &str) -> String {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_owned();
        url.push_str(path);
        url
    }
}
