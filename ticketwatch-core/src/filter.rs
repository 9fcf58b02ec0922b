//! Operator allow-list applied to normalized tickets.

use std::collections::BTreeSet;

use crate::model::TicketRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Set of operator names whose tickets are worth a notification.
///
/// Matching is exact and case-sensitive; spelling variants of one operator must each be listed.
pub struct AllowList {
    companies: BTreeSet<String>,
}

impl AllowList {
    /// Build an allow-list from operator names.
    #[must_use]
    pub fn new<I, S>(companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            companies: companies.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `company` is allowed.
    #[must_use]
    pub fn contains(&self, company: &str) -> bool {
        self.companies.contains(company)
    }

    /// Whether no operator is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// Keep the tickets whose operator is on the allow-list, in input order.
#[must_use]
pub fn apply(tickets: &[TicketRecord], allowed: &AllowList) -> Vec<TicketRecord> {
    tickets
        .iter()
        .filter(|ticket| allowed.contains(&ticket.company))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JourneyType;

    fn make_ticket(company: &str, coach_id: &str) -> TicketRecord {
        TicketRecord {
            company: company.to_owned(),
            coach_id: coach_id.to_owned(),
            route: "dhaka-to-rajshahi".to_owned(),
            journey_type: JourneyType::Onward,
            source: "bdtickets".to_owned(),
        }
    }

    #[test]
    fn test_keeps_only_allowed_operators() {
        let allowed = AllowList::new(["National Travels"]);
        let tickets = vec![
            make_ticket("National Travels", "C1"),
            make_ticket("Desh Travels", "C2"),
        ];

        let filtered = apply(&tickets, &allowed);
        assert_eq!(filtered, vec![make_ticket("National Travels", "C1")]);
    }

    #[test]
    fn test_preserves_input_order() {
        let allowed = AllowList::new(["Desh Travels", "National Travels"]);
        let tickets = vec![
            make_ticket("National Travels", "C3"),
            make_ticket("Hanif Enterprise", "C9"),
            make_ticket("Desh Travels", "C1"),
            make_ticket("National Travels", "C2"),
        ];

        let ids: Vec<_> = apply(&tickets, &allowed)
            .into_iter()
            .map(|ticket| ticket.coach_id)
            .collect();
        assert_eq!(ids, vec!["C3", "C1", "C2"]);
    }

    #[test]
    fn test_matching_is_exact_and_case_sensitive() {
        let allowed = AllowList::new(["Shyamoli N.R Travels"]);
        let tickets = vec![
            make_ticket("Shyamoli NR Travels", "C1"),
            make_ticket("shyamoli n.r travels", "C2"),
            make_ticket("Shyamoli N.R Travels ", "C3"),
            make_ticket("Shyamoli N.R Travels", "C4"),
        ];

        let filtered = apply(&tickets, &allowed);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].coach_id, "C4");
    }

    #[test]
    fn test_listed_variants_each_match() {
        let allowed = AllowList::new(["Shyamoli N.R Travels", "Shyamoli NR Travels"]);
        let tickets = vec![
            make_ticket("Shyamoli NR Travels", "C1"),
            make_ticket("Shyamoli N.R Travels", "C2"),
        ];

        assert_eq!(apply(&tickets, &allowed).len(), 2);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let allowed = AllowList::new(["National Travels", "KTC Hanif"]);
        let tickets = vec![
            make_ticket("KTC Hanif", "C1"),
            make_ticket("Grameen Travels", "C2"),
            make_ticket("National Travels", "C3"),
            make_ticket("KTC Hanif", "C1"),
        ];

        let once = apply(&tickets, &allowed);
        let twice = apply(&once, &allowed);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_allow_list_rejects_everything() {
        let allowed = AllowList::default();
        assert!(allowed.is_empty());
        assert!(apply(&[make_ticket("National Travels", "C1")], &allowed).is_empty());
    }
}
