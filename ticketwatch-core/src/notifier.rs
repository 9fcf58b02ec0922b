//! Turns a batch of newly available tickets into one push message.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::model::{JourneyType, SourceMeta, TicketRecord};
use crate::ports::{NotifyError, PushPort};

#[derive(Debug, Clone)]
/// Non-empty group of tickets from one source and one direction.
pub struct NotificationBatch {
    source_name: String,
    journey_type: JourneyType,
    tickets: Vec<TicketRecord>,
}

impl NotificationBatch {
    /// Group `tickets` under `source`; `None` when there is nothing to report.
    ///
    /// The direction is taken from the first ticket; callers pass one direction at a time.
    #[must_use]
    pub fn new(source: &SourceMeta, tickets: &[TicketRecord]) -> Option<Self> {
        let first = tickets.first()?;
        Some(Self {
            source_name: source.name.clone(),
            journey_type: first.journey_type,
            tickets: tickets.to_vec(),
        })
    }

    /// Number of tickets in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the batch holds no tickets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Distinct operators in order of first appearance.
    #[must_use]
    pub fn companies(&self) -> Vec<&str> {
        distinct(self.tickets.iter().map(|ticket| ticket.company.as_str()))
    }

    /// Distinct route labels in order of first appearance.
    #[must_use]
    pub fn routes(&self) -> Vec<&str> {
        distinct(self.tickets.iter().map(|ticket| ticket.route.as_str()))
    }

    /// Push title naming the direction and the source.
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "\u{1f68c} {} Bus Availability - {}",
            self.journey_type, self.source_name
        )
    }

    /// Push body with the count, operators, and routes.
    #[must_use]
    pub fn body(&self) -> String {
        format!(
            "Available Buses: {}\nCompanies: {}\nRoutes: {}",
            self.tickets.len(),
            self.companies().join(", "),
            self.routes().join(", ")
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}

/// Formats batches and hands them to the push transport.
pub struct Notifier {
    push: Arc<dyn PushPort>,
}

impl Notifier {
    /// Create a notifier delivering through `push`.
    #[must_use]
    pub fn new(push: Arc<dyn PushPort>) -> Self {
        Self { push }
    }

    /// Send one message describing `tickets`.
    ///
    /// An empty slice sends nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`NotifyError`] when delivery fails.
    pub async fn notify(
        &self,
        source: &SourceMeta,
        tickets: &[TicketRecord],
    ) -> Result<(), NotifyError> {
        let Some(batch) = NotificationBatch::new(source, tickets) else {
            return Ok(());
        };

        let title = batch.title();
        self.push.send(&title, &batch.body()).await?;
        info!(source = %source.id, count = batch.len(), %title, "notification sent");
        Ok(())
    }
}
