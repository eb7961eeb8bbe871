use std::collections::HashMap;

use serde::Serialize;

use super::domain::{DependentRelation, EmployerId};
use super::repository::DependentTally;

/// Reference counts for one employer across every relation that points at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactRow {
    pub employer_id: EmployerId,
    pub placements: u64,
    pub project_roles: u64,
    pub project_trades: u64,
    pub site_trades: u64,
    pub agreements: u64,
    pub visits: u64,
    pub capabilities: u64,
    pub aliases: u64,
    pub builder_projects: u64,
}

impl ImpactRow {
    fn empty(employer_id: EmployerId) -> Self {
        Self {
            employer_id,
            placements: 0,
            project_roles: 0,
            project_trades: 0,
            site_trades: 0,
            agreements: 0,
            visits: 0,
            capabilities: 0,
            aliases: 0,
            builder_projects: 0,
        }
    }

    pub fn count(&self, relation: DependentRelation) -> u64 {
        match relation {
            DependentRelation::Placements => self.placements,
            DependentRelation::ProjectRoles => self.project_roles,
            DependentRelation::ProjectTrades => self.project_trades,
            DependentRelation::SiteTrades => self.site_trades,
            DependentRelation::Agreements => self.agreements,
            DependentRelation::Visits => self.visits,
            DependentRelation::Capabilities => self.capabilities,
            DependentRelation::Aliases => self.aliases,
            DependentRelation::BuilderProjects => self.builder_projects,
        }
    }

    fn slot(&mut self, relation: DependentRelation) -> &mut u64 {
        match relation {
            DependentRelation::Placements => &mut self.placements,
            DependentRelation::ProjectRoles => &mut self.project_roles,
            DependentRelation::ProjectTrades => &mut self.project_trades,
            DependentRelation::SiteTrades => &mut self.site_trades,
            DependentRelation::Agreements => &mut self.agreements,
            DependentRelation::Visits => &mut self.visits,
            DependentRelation::Capabilities => &mut self.capabilities,
            DependentRelation::Aliases => &mut self.aliases,
            DependentRelation::BuilderProjects => &mut self.builder_projects,
        }
    }

    /// Blast radius: every dependent record a merge would have to reassign.
    pub fn total(&self) -> u64 {
        DependentRelation::ALL
            .iter()
            .map(|relation| self.count(*relation))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub rows: Vec<ImpactRow>,
    pub total_dependents: u64,
}

/// Left-join the requested ids onto the grouped tallies.
///
/// Ids with no tallies (unknown employers included) still get an all-zero row, and
/// rows follow the input order one for one.
pub fn summarize_impact(employer_ids: &[EmployerId], tallies: &[DependentTally]) -> ImpactReport {
    let mut by_employer: HashMap<&EmployerId, ImpactRow> = HashMap::new();
    for tally in tallies {
        let row = by_employer
            .entry(&tally.employer_id)
            .or_insert_with(|| ImpactRow::empty(tally.employer_id.clone()));
        *row.slot(tally.relation) += tally.count;
    }

    let rows: Vec<ImpactRow> = employer_ids
        .iter()
        .map(|id| {
            by_employer
                .get(id)
                .cloned()
                .unwrap_or_else(|| ImpactRow::empty(id.clone()))
        })
        .collect();
    let total_dependents = rows.iter().map(ImpactRow::total).sum();

    ImpactReport {
        rows,
        total_dependents,
    }
}
