use std::fmt;
use url::Url;

/// A normalized hostname used to look up the bucket governing a request.
///
/// Hostnames are lowercased and carry no port, so `https://API.example.com`
/// and `http://api.example.com:8080` share a key. A key built with
/// [`HostKey::with_port`] only matches URLs with that explicit port.
///
/// # Examples
///
/// ```
/// use wizz_lib::ratelimit::HostKey;
/// use url::Url;
///
/// let url = Url::parse("https://API.github.com/repos/user/repo").unwrap();
/// let host_key = HostKey::from_url(&url).unwrap();
/// assert_eq!(host_key.as_str(), "api.github.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey(String);

impl HostKey {
    /// Extract the host from `url`, ignoring the port.
    ///
    /// Returns `None` for URLs without a host, e.g. `file:///etc/hosts`.
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        url.host_str().map(HostKey::from)
    }

    /// The key for this host on an explicit port
    #[must_use]
    pub fn with_port(&self, port: u16) -> Self {
        HostKey(format!("{}:{port}", self.0))
    }

    /// Get the hostname as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HostKey {
    fn from(host: String) -> Self {
        HostKey(host.to_lowercase())
    }
}

impl From<&str> for HostKey {
    fn from(host: &str) -> Self {
        HostKey(host.to_lowercase())
    }
}
