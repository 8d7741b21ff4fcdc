use clap::Parser;

/// Upper bound for the stats cache freshness window (one week).
pub const MAX_STATS_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Premier League dashboard proxy
#[derive(Parser, Debug, Clone)]
#[command(name = "pl-dashboard", version, about)]
pub struct Config {
    /// Listen address for the proxy and static dashboard
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: String,

    /// Directory holding the dashboard's static files
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    /// football-data.org API base URL
    #[arg(
        long,
        env = "FOOTBALL_DATA_URL",
        default_value = "https://api.football-data.org/v4"
    )]
    pub football_data_url: String,

    /// football-data.org token, sent as X-Auth-Token
    #[arg(long, env = "FD_TOKEN", default_value = "")]
    pub fd_token: String,

    /// Fantasy Premier League bootstrap URL (first fallback candidate)
    #[arg(
        long,
        env = "FPL_URL",
        default_value = "https://fantasy.premierleague.com/api/bootstrap-static/"
    )]
    pub fpl_url: String,

    /// Extra mirror URLs tried after the primary FPL URL (comma separated)
    #[arg(long, env = "FPL_MIRRORS", value_delimiter = ',')]
    pub fpl_mirrors: Vec<String>,

    /// Freshness window for the fantasy-stats cache, in seconds
    #[arg(long, env = "STATS_TTL_SECS", default_value = "300")]
    pub stats_ttl_secs: u64,

    /// Timeout applied to every upstream request, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "10")]
    pub upstream_timeout_secs: u64,

    /// Player headshot host (sizes and file name are appended)
    #[arg(
        long,
        env = "IMAGE_HOST_URL",
        default_value = "https://resources.premierleague.com/premierleague/photos/players"
    )]
    pub image_host_url: String,

    /// Optional API-Football (RapidAPI) base URL
    #[arg(long, env = "RAPID_BASE")]
    pub rapid_base: Option<String>,

    /// RapidAPI key
    #[arg(long, env = "RAPID_KEY")]
    pub rapid_key: Option<String>,

    /// RapidAPI host header value
    #[arg(long, env = "RAPID_HOST")]
    pub rapid_host: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("FOOTBALL_DATA_URL", &self.football_data_url),
            ("FPL_URL", &self.fpl_url),
            ("IMAGE_HOST_URL", &self.image_host_url),
        ] {
            if url::Url::parse(value).is_err() {
                anyhow::bail!("{} is not a valid URL: {}", name, value);
            }
        }
        for mirror in self.fpl_mirrors.iter().filter(|m| !m.trim().is_empty()) {
            if url::Url::parse(mirror.trim()).is_err() {
                anyhow::bail!("FPL_MIRRORS contains an invalid URL: {}", mirror);
            }
        }
        if let Some(base) = self.rapid_base.as_deref().filter(|b| !b.is_empty()) {
            if url::Url::parse(base).is_err() {
                anyhow::bail!("RAPID_BASE is not a valid URL: {}", base);
            }
        }
        if self.stats_ttl_secs == 0 || self.stats_ttl_secs > MAX_STATS_TTL_SECS {
            anyhow::bail!(
                "stats_ttl_secs must be between 1 and {}",
                MAX_STATS_TTL_SECS
            );
        }
        if self.upstream_timeout_secs == 0 {
            anyhow::bail!("upstream_timeout_secs must be positive");
        }
        Ok(())
    }

    /// The trimmed football-data token.
    pub fn token(&self) -> &str {
        self.fd_token.trim()
    }

    /// RapidAPI passthrough settings, present only when both base and key are set.
    pub fn rapid(&self) -> Option<RapidSettings> {
        let base = self.rapid_base.as_deref().map(str::trim).filter(|b| !b.is_empty())?;
        let key = self.rapid_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(RapidSettings {
            base: base.trim_end_matches('/').to_string(),
            key: key.to_string(),
            host: self
                .rapid_host
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RapidSettings {
    pub base: String,
    pub key: String,
    pub host: Option<String>,
}
