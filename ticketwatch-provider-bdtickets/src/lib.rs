//! Source adapter for BDTickets using its coach search API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ticketwatch_core::{
    http::post_json,
    lenient::{null_as_default, string_or_number},
    model::{JourneyType, Query, RouteDescriptor, RoutePlan, SourceId, SourceMeta, Sources, TicketRecord},
    plugin::SourcePlugin,
    ports::{FetchError, SourcePort},
};

const SEARCH_URL: &str = "https://api.bdtickets.com:20102/v1/coaches/search";
const DATE_FORMAT: &str = "%Y-%m-%d";
const STRUCTURE_TYPE: &str = "BUS";

/// Body of POST /v1/coaches/search
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    date: String,
    identifier: &'a str,
    structure_type: &'static str,
}

/// Response from /v1/coaches/search; `data` is null when nothing runs that day
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    data: Vec<CoachEntry>,
}

/// Single coach listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoachEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    company_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    coach_no: String,
    // fares, seat counts and boarding points exist but we don't need them
}

/// Coach search implementation for BDTickets.
pub struct BdTicketsSourcePort {
    client: Client,
    source: SourceId,
    url: String,
}

impl BdTicketsSourcePort {
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
impl SourcePort for BdTicketsSourcePort {
    async fn search(&self, query: &Query) -> Result<Vec<TicketRecord>, FetchError> {
        // BDTickets addresses routes by slug only.
        let RouteDescriptor::Slug(slug) = &query.route else {
            return Err(FetchError::UnsupportedRoute(query.route.clone()));
        };

        let request = SearchRequest {
            date: query.travel_date.format(DATE_FORMAT).to_string(),
            identifier: slug,
            structure_type: STRUCTURE_TYPE,
        };

        let response = post_json::<_, SearchResponse>(&self.client, &self.url, &request).await?;

        Ok(normalize(response, slug, query.journey_type, &self.source))
    }
}

/// Build the plugin bundle for the BDTickets source with its default routes.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin {
        meta: source_meta(),
        port: Arc::new(BdTicketsSourcePort::new(client)),
        routes: default_routes(),
    }
}

/// Dhaka to Rajshahi and Chapainawabganj, and back.
#[must_use]
pub fn default_routes() -> RoutePlan {
    RoutePlan {
        onward: vec![
            RouteDescriptor::slug("dhaka-to-rajshahi"),
            RouteDescriptor::slug("dhaka-to-chapainawabganj"),
        ],
        returning: vec![
            RouteDescriptor::slug("rajshahi-to-dhaka"),
            RouteDescriptor::slug("chapainawabganj-to-dhaka"),
        ],
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId::from(Sources::BdTickets),
        name: String::from("BDTickets"),
    }
}

fn normalize(
    response: SearchResponse,
    slug: &str,
    journey_type: JourneyType,
    source: &SourceId,
) -> Vec<TicketRecord> {
    response
        .data
        .into_iter()
        .map(|coach| TicketRecord {
            company: coach.company_name,
            coach_id: coach.coach_no,
            route: slug.to_owned(),
            journey_type,
            source: source.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ticketwatch_core::testing::serve_once;

    use super::*;

    fn parse(raw: &str) -> SearchResponse {
        serde_json::from_str(raw).expect("valid search response")
    }

    fn bdtickets() -> SourceId {
        SourceId::from(Sources::BdTickets)
    }

    fn onward_query(slug: &str) -> Query {
        Query {
            travel_date: NaiveDate::from_ymd_opt(2025, 3, 27).expect("valid date"),
            route: RouteDescriptor::slug(slug),
            journey_type: JourneyType::Onward,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = SearchRequest {
            date: "2025-03-27".to_owned(),
            identifier: "dhaka-to-rajshahi",
            structure_type: STRUCTURE_TYPE,
        };

        assert_eq!(
            serde_json::to_value(&request).expect("serializable request"),
            serde_json::json!({
                "date": "2025-03-27",
                "identifier": "dhaka-to-rajshahi",
                "structureType": "BUS"
            })
        );
    }

    #[test]
    fn test_listings_are_normalized() {
        let response = parse(
            r#"{
                "data": [
                    {"companyName": "National Travels", "coachNo": "NT-0715", "availableSeats": 12},
                    {"companyName": "Desh Travels", "coachNo": 2210, "availableSeats": 0}
                ]
            }"#,
        );

        let tickets = normalize(response, "dhaka-to-rajshahi", JourneyType::Onward, &bdtickets());

        assert_eq!(tickets.len(), 2);
        assert_eq!(
            tickets[0],
            TicketRecord {
                company: "National Travels".to_owned(),
                coach_id: "NT-0715".to_owned(),
                route: "dhaka-to-rajshahi".to_owned(),
                journey_type: JourneyType::Onward,
                source: "bdtickets".to_owned(),
            }
        );
        assert_eq!(tickets[1].coach_id, "2210");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let response = parse(r#"{"data": [{"coachNo": "X1"}, {}]}"#);
        let tickets = normalize(response, "rajshahi-to-dhaka", JourneyType::Return, &bdtickets());

        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].company, "");
        assert_eq!(tickets[1].coach_id, "");
        assert_eq!(tickets[1].journey_type, JourneyType::Return);
    }

    #[test]
    fn test_null_or_absent_data_means_no_coaches() {
        assert!(parse(r#"{"data": null}"#).data.is_empty());
        assert!(parse(r#"{"message": "no trips"}"#).data.is_empty());
    }

    #[test]
    fn test_default_routes_are_slugs_both_ways() {
        let routes = default_routes();
        assert_eq!(routes.routes(JourneyType::Onward).len(), 2);
        assert_eq!(
            routes.routes(JourneyType::Return),
            &[
                RouteDescriptor::slug("rajshahi-to-dhaka"),
                RouteDescriptor::slug("chapainawabganj-to-dhaka"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_pair_route_is_rejected() {
        let port = BdTicketsSourcePort::new(Client::new());
        let query = Query {
            travel_date: NaiveDate::from_ymd_opt(2025, 3, 27).expect("valid date"),
            route: RouteDescriptor::StopPair { from: 14, to: 55 },
            journey_type: JourneyType::Onward,
        };

        let result = port.search(&query).await;
        assert!(matches!(result, Err(FetchError::UnsupportedRoute(_))));
    }

    #[tokio::test]
    async fn test_search_posts_slug_and_tags_records() {
        let (url, request) = serve_once(
            200,
            r#"{"data": [{"companyName": "Hanif Enterprise", "coachNo": "HE-7"}]}"#,
        )
        .await;
        let port = BdTicketsSourcePort::with_url(Client::new(), url);

        let tickets = port
            .search(&onward_query("dhaka-to-chapainawabganj"))
            .await
            .expect("listing answer");

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].route, "dhaka-to-chapainawabganj");
        assert_eq!(tickets[0].source, "bdtickets");
        let request = request.await.expect("server task");
        assert!(request.contains(r#""identifier":"dhaka-to-chapainawabganj""#));
        assert!(request.contains(r#""structureType":"BUS""#));
    }

    #[tokio::test]
    async fn test_unavailable_upstream_reports_status_and_body() {
        let (url, _request) = serve_once(503, r#"{"message": "maintenance"}"#).await;
        let port = BdTicketsSourcePort::with_url(Client::new(), url);

        match port.search(&onward_query("dhaka-to-rajshahi")).await {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("maintenance"));
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_answer_is_an_error() {
        let (url, _request) = serve_once(200, "{not json").await;
        let port = BdTicketsSourcePort::with_url(Client::new(), url);

        let result = port.search(&onward_query("dhaka-to-rajshahi")).await;
        assert!(matches!(result, Err(FetchError::Network(err)) if err.is_decode()));
    }
}
