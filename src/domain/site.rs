//! Site identifiers and browse modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The movie listing sites the bot knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKey {
    Cinevood,
    Hdhub4u,
    Hdmovie2,
}

impl SiteKey {
    pub const ALL: [Self; 3] = [Self::Cinevood, Self::Hdhub4u, Self::Hdmovie2];

    /// Key used in configuration files and callback data
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cinevood => "cinevood",
            Self::Hdhub4u => "hdhub4u",
            Self::Hdmovie2 => "hdmovie2",
        }
    }

    /// Human readable name for menus
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cinevood => "Cinevood",
            Self::Hdhub4u => "HDHub4u",
            Self::Hdmovie2 => "HDMovie2",
        }
    }

    /// Domain used until an operator overrides it
    pub const fn default_domain(self) -> &'static str {
        match self {
            Self::Cinevood => "1cinevood.asia",
            Self::Hdhub4u => "hdhub4u.gratis",
            Self::Hdmovie2 => "hdmovie2.trading",
        }
    }

    /// HTTP client flavour the site needs
    pub const fn client_profile(self) -> ClientProfile {
        match self {
            Self::Hdhub4u => ClientProfile::Plain,
            Self::Cinevood | Self::Hdmovie2 => ClientProfile::Browser,
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown site key: {0}")]
pub struct UnknownSiteKey(pub String);

impl FromStr for SiteKey {
    type Err = UnknownSiteKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cinevood" => Ok(Self::Cinevood),
            "hdhub4u" => Ok(Self::Hdhub4u),
            "hdmovie2" => Ok(Self::Hdmovie2),
            other => Err(UnknownSiteKey(other.to_string())),
        }
    }
}

/// Whether a listing call browses the latest titles or runs a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseMode {
    Latest,
    Search,
}

impl BrowseMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Search => "search",
        }
    }

    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            "latest" => Some(Self::Latest),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

/// HTTP client flavour.
///
/// `Browser` replicates a full browser header set, keeps cookies, and detects
/// anti-bot challenge pages; `Plain` is a generic client with a realistic
/// user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProfile {
    Plain,
    Browser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_key_round_trips_through_str() {
        for key in SiteKey::ALL {
            assert_eq!(key.as_str().parse::<SiteKey>().unwrap(), key);
        }
        assert_eq!(" HDHub4u ".parse::<SiteKey>().unwrap(), SiteKey::Hdhub4u);
        assert!("yts".parse::<SiteKey>().is_err());
    }

    #[test]
    fn protected_sites_use_browser_profile() {
        assert_eq!(SiteKey::Hdhub4u.client_profile(), ClientProfile::Plain);
        assert_eq!(SiteKey::Cinevood.client_profile(), ClientProfile::Browser);
        assert_eq!(SiteKey::Hdmovie2.client_profile(), ClientProfile::Browser);
    }
}
