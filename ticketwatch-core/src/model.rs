//! Domain data structures for ticket sources, search queries, and normalized tickets.

use std::fmt;

use chrono::NaiveDate;

/// Built-in ticket sources supported by the application.
pub enum Sources {
    /// bdtickets.com coach search.
    BdTickets,
    /// busbd.com.bd coach search.
    BusBd,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identifier for a ticket source known to ticketwatch.
pub struct SourceId(pub String);

impl fmt::Display for Sources {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Sources::BdTickets => "bdtickets",
            Sources::BusBd => "busbd",
        };
        write!(formatter, "{slug}")
    }
}

impl From<Sources> for SourceId {
    fn from(source: Sources) -> Self {
        SourceId(source.to_string())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
/// Metadata describing a ticket source and its human-friendly name.
pub struct SourceMeta {
    /// Unique identifier, also used to name the cache partition.
    pub id: SourceId,
    /// Display name used in notifications.
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Leg of a round trip.
pub enum JourneyType {
    /// Outbound leg.
    Onward,
    /// Inbound leg.
    Return,
}

impl JourneyType {
    /// Key used for this direction inside persisted cache documents.
    #[must_use]
    pub fn cache_key(self) -> &'static str {
        match self {
            JourneyType::Onward => "onward",
            JourneyType::Return => "return",
        }
    }
}

impl fmt::Display for JourneyType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JourneyType::Onward => "Onward",
            JourneyType::Return => "Return",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Normalized result of a single upstream coach listing.
pub struct TicketRecord {
    /// Operator name exactly as reported upstream.
    pub company: String,
    /// Upstream coach identifier, used as the dedup key.
    pub coach_id: String,
    /// Human-readable route label.
    pub route: String,
    /// Direction this listing was searched for.
    pub journey_type: JourneyType,
    /// Identifier of the source that produced the listing.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Source-specific origin/destination descriptor.
pub enum RouteDescriptor {
    /// Route slug such as `dhaka-to-rajshahi`.
    Slug(String),
    /// Pair of upstream stop identifiers.
    StopPair {
        /// Departure stop id.
        from: u32,
        /// Arrival stop id.
        to: u32,
    },
}

impl RouteDescriptor {
    /// Convenience constructor for slug routes.
    #[must_use]
    pub fn slug<S: Into<String>>(slug: S) -> Self {
        RouteDescriptor::Slug(slug.into())
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDescriptor::Slug(slug) => formatter.write_str(slug),
            RouteDescriptor::StopPair { from, to } => write!(formatter, "{from} -> {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single search submitted to one source adapter.
pub struct Query {
    /// Date of travel.
    pub travel_date: NaiveDate,
    /// Source-specific route to search.
    pub route: RouteDescriptor,
    /// Direction the resulting tickets are tagged with.
    pub journey_type: JourneyType,
}

#[derive(Debug, Clone, Default)]
/// Routes a source searches for each direction.
pub struct RoutePlan {
    /// Routes searched for the onward leg.
    pub onward: Vec<RouteDescriptor>,
    /// Routes searched for the return leg.
    pub returning: Vec<RouteDescriptor>,
}

impl RoutePlan {
    /// Routes configured for the given direction.
    #[must_use]
    pub fn routes(&self, journey_type: JourneyType) -> &[RouteDescriptor] {
        match journey_type {
            JourneyType::Onward => &self.onward,
            JourneyType::Return => &self.returning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A direction to search together with its travel date.
pub struct JourneyPlan {
    /// Direction searched.
    pub journey_type: JourneyType,
    /// Date of travel for that direction.
    pub travel_date: NaiveDate,
}
