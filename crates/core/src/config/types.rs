use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub nyaa: NyaaConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL, used when building links back to this server.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    7000
}

/// Link resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Delay between two status checks while the provider is still working.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total time budget for a single resolution.
    #[serde(default = "default_resolve_timeout_ms")]
    pub timeout_ms: u64,
    /// Rewrite plain http stream links to https.
    #[serde(default = "default_force_https")]
    pub force_https: bool,
    /// Placeholder video served while a torrent is still downloading.
    #[serde(default = "default_intro_video_url")]
    pub intro_video_url: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_resolve_timeout_ms(),
            force_https: default_force_https(),
            intro_video_url: default_intro_video_url(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_resolve_timeout_ms() -> u64 {
    30000
}

fn default_force_https() -> bool {
    true
}

fn default_intro_video_url() -> String {
    "https://cdn4.videas.fr/1503a1ff14ee4357869d8d8ab2634ea4/no-cache-mp4-source.mp4".to_string()
}

/// Nyaa torrent index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NyaaConfig {
    /// Nyaa base URL (e.g., "https://nyaa.si")
    #[serde(default = "default_nyaa_url")]
    pub base_url: String,
    /// Uploader whose listing is searched. Empty searches the whole site.
    #[serde(default = "default_uploader")]
    pub uploader: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum number of file-list pages fetched concurrently.
    #[serde(default = "default_max_parallel_fetches")]
    pub max_parallel_fetches: usize,
}

impl Default for NyaaConfig {
    fn default() -> Self {
        Self {
            base_url: default_nyaa_url(),
            uploader: default_uploader(),
            timeout_secs: default_timeout(),
            max_parallel_fetches: default_max_parallel_fetches(),
        }
    }
}

fn default_nyaa_url() -> String {
    "https://nyaa.si".to_string()
}

fn default_uploader() -> String {
    "Fan-Kai".to_string()
}

fn default_max_parallel_fetches() -> usize {
    4
}

fn default_timeout() -> u32 {
    30
}

/// Debrid provider endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_real_debrid_url")]
    pub real_debrid_url: String,
    #[serde(default = "default_all_debrid_url")]
    pub all_debrid_url: String,
    #[serde(default = "default_torbox_url")]
    pub torbox_url: String,
    /// Agent name sent to AllDebrid with every call.
    #[serde(default = "default_agent")]
    pub agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            real_debrid_url: default_real_debrid_url(),
            all_debrid_url: default_all_debrid_url(),
            torbox_url: default_torbox_url(),
            agent: default_agent(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_real_debrid_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_all_debrid_url() -> String {
    "https://api.alldebrid.com/v4".to_string()
}

fn default_torbox_url() -> String {
    "https://api.torbox.app/v1".to_string()
}

fn default_agent() -> String {
    "kaistream".to_string()
}

/// Client session storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionsConfig {
    /// Lifetime of a stored session, counted from its creation.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// How often expired sessions are swept from memory.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Upper bound accepted for `sessions.ttl_secs` (10 years).
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn default_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    600
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub resolver: ResolverConfig,
    pub nyaa: NyaaConfig,
    pub providers: SanitizedProvidersConfig,
    pub sessions: SessionsConfig,
}

/// Provider endpoints without the agent identity
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProvidersConfig {
    pub real_debrid_url: String,
    pub all_debrid_url: String,
    pub torbox_url: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            resolver: config.resolver.clone(),
            nyaa: config.nyaa.clone(),
            providers: SanitizedProvidersConfig {
                real_debrid_url: config.providers.real_debrid_url.clone(),
                all_debrid_url: config.providers.all_debrid_url.clone(),
                torbox_url: config.providers.torbox_url.clone(),
                timeout_secs: config.providers.timeout_secs,
            },
            sessions: config.sessions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.resolver.poll_interval_ms, 2000);
        assert_eq!(config.resolver.timeout_ms, 30000);
        assert!(config.resolver.force_https);
        assert_eq!(config.nyaa.uploader, "Fan-Kai");
        assert_eq!(config.sessions.ttl_secs, 604800);
    }

    #[test]
    fn test_deserialize_server_section() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
public_url = "https://kai.example.org"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://kai.example.org")
        );
    }

    #[test]
    fn test_deserialize_partial_sections_keep_defaults() {
        let toml = r#"
[nyaa]
uploader = ""
max_parallel_fetches = 8

[providers]
real_debrid_url = "http://localhost:9999"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.nyaa.uploader, "");
        assert_eq!(config.nyaa.max_parallel_fetches, 8);
        assert_eq!(config.nyaa.base_url, "https://nyaa.si");
        assert_eq!(config.providers.real_debrid_url, "http://localhost:9999");
        assert_eq!(config.providers.all_debrid_url, "https://api.alldebrid.com/v4");
        assert_eq!(config.providers.timeout_secs, 30);
    }

    #[test]
    fn test_sanitized_config_drops_agent() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json["providers"].get("agent").is_none());
        assert_eq!(json["server"]["port"], 7000);
        assert_eq!(json["providers"]["torbox_url"], "https://api.torbox.app/v1");
    }
}
