use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::info;

use ticketwatch_core::{AllowList, JourneyPlan, JourneyType, MonitorConfig, SourceId, Sources};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_INTERVAL_MINUTES: u64 = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Operators watched when `TARGET_COMPANIES` is not set.
pub(crate) const DEFAULT_COMPANIES: [&str; 7] = [
    "National Travels",
    "Desh Travels",
    "Grameen Travels",
    "KTC Hanif",
    "Hanif Enterprise",
    "Shyamoli N.R Travels",
    "Shyamoli NR Travels",
];

/// Runtime settings read from the process environment.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) travel_date: Option<NaiveDate>,
    pub(crate) return_date: Option<NaiveDate>,
    pub(crate) search_onward: bool,
    pub(crate) search_return: bool,
    pub(crate) interval: Duration,
    pub(crate) target_companies: Vec<String>,
    pub(crate) pushbullet_api_key: Option<String>,
    pub(crate) cache_dir: PathBuf,
    pub(crate) http_timeout: Duration,
    pub(crate) enabled_sources: Vec<SourceId>,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as unset.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let search_onward = match get("SEARCH_ONWARD").or_else(|| get("SEARCH_ONWORD")) {
            Some(raw) => parse_flag("SEARCH_ONWARD", &raw)?,
            None => true,
        };
        let search_return = match get("SEARCH_RETURN") {
            Some(raw) => parse_flag("SEARCH_RETURN", &raw)?,
            None => true,
        };
        if !search_onward && !search_return {
            bail!("both SEARCH_ONWARD and SEARCH_RETURN are false, nothing to watch");
        }

        let travel_date = get("TRAVEL_DATE")
            .map(|raw| parse_date("TRAVEL_DATE", &raw))
            .transpose()?;
        let return_date = get("RETURN_DATE")
            .map(|raw| parse_date("RETURN_DATE", &raw))
            .transpose()?;
        if search_onward && travel_date.is_none() {
            bail!("TRAVEL_DATE is required while onward search is enabled");
        }
        if search_return && return_date.is_none() {
            bail!("RETURN_DATE is required while return search is enabled");
        }

        let interval_minutes = match get("CHECK_INTERVAL_MINUTES") {
            Some(raw) => parse_positive("CHECK_INTERVAL_MINUTES", &raw)?,
            None => DEFAULT_INTERVAL_MINUTES,
        };
        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_positive("HTTP_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let target_companies = match get("TARGET_COMPANIES") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_COMPANIES.iter().map(|name| (*name).to_owned()).collect(),
        };

        let enabled_sources = match get("ENABLED_SOURCES") {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|id| SourceId(id.to_lowercase()))
                .collect(),
            None => vec![SourceId::from(Sources::BdTickets), SourceId::from(Sources::BusBd)],
        };
        if enabled_sources.is_empty() {
            bail!("ENABLED_SOURCES names no source");
        }

        Ok(Self {
            travel_date,
            return_date,
            search_onward,
            search_return,
            interval: Duration::from_secs(interval_minutes.saturating_mul(60)),
            target_companies,
            pushbullet_api_key: get("PUSHBULLET_API_KEY"),
            cache_dir: get("CACHE_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            http_timeout: Duration::from_secs(http_timeout_secs),
            enabled_sources,
        })
    }

    /// Journeys to check each cycle, onward first.
    pub(crate) fn journeys(&self) -> Vec<JourneyPlan> {
        let mut journeys = Vec::with_capacity(2);
        if self.search_onward
            && let Some(travel_date) = self.travel_date
        {
            journeys.push(JourneyPlan {
                journey_type: JourneyType::Onward,
                travel_date,
            });
        }
        if self.search_return
            && let Some(travel_date) = self.return_date
        {
            journeys.push(JourneyPlan {
                journey_type: JourneyType::Return,
                travel_date,
            });
        }
        journeys
    }

    pub(crate) fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            journeys: self.journeys(),
            allowed_companies: AllowList::new(self.target_companies.iter().cloned()),
            interval: self.interval,
        }
    }

    /// Log the effective settings. The push token is never printed.
    pub(crate) fn log_banner(&self, dry_run: bool) {
        let sources = self
            .enabled_sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        info!(
            onward_date = ?self.travel_date.filter(|_| self.search_onward),
            return_date = ?self.return_date.filter(|_| self.search_return),
            interval_secs = self.interval.as_secs(),
            companies = self.target_companies.len(),
            sources = %sources,
            cache_dir = %self.cache_dir.display(),
            dry_run,
            "ticketwatch starting"
        );
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => bail!("{key} must be true or false, got `{raw}`"),
    }
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .with_context(|| format!("{key} must be a YYYY-MM-DD date, got `{raw}`"))
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    let value: u64 = raw
        .parse()
        .with_context(|| format!("{key} must be a whole number, got `{raw}`"))?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
