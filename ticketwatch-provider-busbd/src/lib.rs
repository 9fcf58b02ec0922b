//! Source adapter for BusBD using its v2 search list API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use ticketwatch_core::{
    http::post_json,
    lenient::{null_as_default, string_or_number},
    model::{JourneyType, Query, RouteDescriptor, RoutePlan, SourceId, SourceMeta, Sources, TicketRecord},
    plugin::SourcePlugin,
    ports::{FetchError, SourcePort},
};

const SEARCH_URL: &str = "https://api.busbd.com.bd/api/v2/searchlist";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// BusBD stop ids for the cities we watch.
pub mod stops {
    /// Dhaka.
    pub const DHAKA: u32 = 14;
    /// Rajshahi.
    pub const RAJSHAHI: u32 = 55;
    /// Chapainawabganj.
    pub const CHAPAI: u32 = 9;
}

/// Body of POST /api/v2/searchlist
#[derive(Debug, Serialize)]
struct SearchRequest {
    jrdate: String,
    fromid: u32,
    toid: u32,
    // always sent, null means "any coach type"
    coach_type: Option<String>,
}

/// Response from /api/v2/searchlist
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchPayload>,
}

/// `data` is an object when coaches were found and an empty array otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Found(SearchData),
    Empty(Vec<IgnoredAny>),
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default, deserialize_with = "null_as_default")]
    coaches: Vec<CoachEntry>,
}

/// Single coach listing
#[derive(Debug, Deserialize)]
struct CoachEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    company_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    coach_no: String,
    #[serde(default, deserialize_with = "string_or_number")]
    route_name: String,
}

impl SearchResponse {
    fn into_coaches(self) -> Vec<CoachEntry> {
        match self.data {
            Some(SearchPayload::Found(data)) => data.coaches,
            Some(SearchPayload::Empty(_)) | None => Vec::new(),
        }
    }
}

/// Coach search implementation for BusBD.
pub struct BusBdSourcePort {
    client: Client,
    source: SourceId,
    url: String,
}

impl BusBdSourcePort {
    /// Create a new source port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_url(client, SEARCH_URL)
    }

    /// Create a source port talking to a different search endpoint.
    #[must_use]
    pub fn with_url<U: Into<String>>(client: Client, url: U) -> Self {
        Self {
            client,
            source: source_meta().id,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourcePort for BusBdSourcePort {
    async fn search(&self, query: &Query) -> Result<Vec<TicketRecord>, FetchError> {
        let RouteDescriptor::StopPair { from, to } = query.route else {
            return Err(FetchError::UnsupportedRoute(query.route.clone()));
        };

        let request = SearchRequest {
            jrdate: query.travel_date.format(DATE_FORMAT).to_string(),
            fromid: from,
            toid: to,
            coach_type: None,
        };

        let response = post_json::<_, SearchResponse>(&self.client, &self.url, &request).await?;

        Ok(normalize(response, query.journey_type, &self.source))
    }
}

/// Build the plugin bundle for the BusBD source with its default routes.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin {
        meta: source_meta(),
        port: Arc::new(BusBdSourcePort::new(client)),
        routes: default_routes(),
    }
}

/// Dhaka to Rajshahi and Chapainawabganj, and back.
#[must_use]
pub fn default_routes() -> RoutePlan {
    RoutePlan {
        onward: stop_pairs(&[stops::DHAKA], &[stops::RAJSHAHI, stops::CHAPAI]),
        returning: stop_pairs(&[stops::RAJSHAHI, stops::CHAPAI], &[stops::DHAKA]),
    }
}

/// Every `from` x `to` combination, `from`-major.
#[must_use]
pub fn stop_pairs(from_ids: &[u32], to_ids: &[u32]) -> Vec<RouteDescriptor> {
    from_ids
        .iter()
        .flat_map(|from| {
            to_ids
                .iter()
                .map(move |to| RouteDescriptor::StopPair { from: *from, to: *to })
        })
        .collect()
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId::from(Sources::BusBd),
        name: String::from("BusBD"),
    }
}

fn normalize(response: SearchResponse, journey_type: JourneyType, source: &SourceId) -> Vec<TicketRecord> {
    response
        .into_coaches()
        .into_iter()
        .map(|coach| TicketRecord {
            company: coach.company_name,
            coach_id: coach.coach_no,
            route: coach.route_name,
            journey_type,
            source: source.to_string(),
        })
        .collect()
}
