//! Grouping of arbitrage opportunities by match signature.
//!
//! Opportunities arrive already filtered. Groups keep the order in which
//! their first member was seen, so sorting afterwards is stable with
//! respect to storage order.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{ArbitrageOpportunity, SortKey, SortOrder, UNKNOWN};
use crate::services::pagination::{paginate, PageRequest, Pagination};

/// One match signature and its best opportunity
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub match_signature: String,
    pub best_arbitrage: ArbitrageOpportunity,
    pub total_arbitrages: usize,
    pub max_profit: f64,
    pub min_profit: f64,
    pub markets_count: usize,
    pub markets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedPage {
    pub groups: Vec<GroupSummary>,
    pub pagination: Pagination,
}

struct GroupBuilder {
    best: ArbitrageOpportunity,
    total: usize,
    max_profit: f64,
    min_profit: f64,
    markets: Vec<String>,
}

impl GroupBuilder {
    fn new(first: ArbitrageOpportunity) -> Self {
        let market = first.market();
        Self {
            max_profit: first.profit,
            min_profit: first.profit,
            total: 1,
            markets: vec![market],
            best: first,
        }
    }

    fn push(&mut self, opp: ArbitrageOpportunity) {
        self.total += 1;
        self.max_profit = self.max_profit.max(opp.profit);
        self.min_profit = self.min_profit.min(opp.profit);
        let market = opp.market();
        if !self.markets.contains(&market) {
            self.markets.push(market);
        }
        // Strictly greater keeps the earliest member on ties
        if opp.profit > self.best.profit {
            self.best = opp;
        }
    }

    fn finish(self) -> GroupSummary {
        GroupSummary {
            match_signature: self.best.match_signature.clone(),
            markets_count: self.markets.len(),
            markets: self.markets,
            total_arbitrages: self.total,
            max_profit: self.max_profit,
            min_profit: self.min_profit,
            best_arbitrage: self.best,
        }
    }
}

/// Partition by exact signature, pick the best per group, sort and page.
pub fn group_opportunities(
    opportunities: Vec<ArbitrageOpportunity>,
    sort_key: SortKey,
    sort_order: SortOrder,
    page: PageRequest,
) -> GroupedPage {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut builders: Vec<GroupBuilder> = Vec::new();

    for opp in opportunities {
        match index.get(&opp.match_signature) {
            Some(&slot) => builders[slot].push(opp),
            None => {
                index.insert(opp.match_signature.clone(), builders.len());
                builders.push(GroupBuilder::new(opp));
            }
        }
    }

    let mut groups: Vec<GroupSummary> = builders.into_iter().map(GroupBuilder::finish).collect();
    groups.sort_by(|a, b| {
        directed(
            compare_by(&a.best_arbitrage, &b.best_arbitrage, sort_key),
            sort_order,
        )
    });

    let (groups, pagination) = paginate(groups, page);
    GroupedPage { groups, pagination }
}

/// Stable sort of raw opportunities, used by the flat listing.
pub fn sort_opportunities(
    opportunities: &mut [ArbitrageOpportunity],
    sort_key: SortKey,
    sort_order: SortOrder,
) {
    opportunities.sort_by(|a, b| directed(compare_by(a, b, sort_key), sort_order));
}

/// Unparseable kickoffs compare lowest.
fn compare_by(a: &ArbitrageOpportunity, b: &ArbitrageOpportunity, key: SortKey) -> Ordering {
    match key {
        SortKey::Profit => a.profit.total_cmp(&b.profit),
        SortKey::KickoffDatetime => a.kickoff().cmp(&b.kickoff()),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

// ==================== Match view ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchInfo {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub country: String,
    pub kickoff_datetime: Option<String>,
}

/// Every opportunity of one signature, bucketed by first-leg market
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub match_signature: String,
    pub arbitrages: Vec<ArbitrageOpportunity>,
    pub markets_data: BTreeMap<String, Vec<ArbitrageOpportunity>>,
    pub total_count: usize,
    pub max_profit: f64,
    pub min_profit: f64,
    pub markets: Vec<String>,
    pub match_info: MatchInfo,
}

/// `None` when the signature has no opportunities.
pub fn match_view(
    signature: &str,
    mut opportunities: Vec<ArbitrageOpportunity>,
    sort_key: SortKey,
    sort_order: SortOrder,
) -> Option<MatchView> {
    sort_opportunities(&mut opportunities, sort_key, sort_order);
    let first = opportunities.first()?;

    let leg = first.first_leg().unwrap_or_default();
    let text_or_unknown =
        |v: Option<String>| v.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| UNKNOWN.to_string());
    let match_info = MatchInfo {
        home_team: text_or_unknown(leg.home_team.clone()),
        away_team: text_or_unknown(leg.away_team.clone()),
        league: leg.league_or_unknown(),
        country: leg.country_or_unknown(),
        kickoff_datetime: first.kickoff_datetime.clone(),
    };

    let mut markets = Vec::new();
    let mut markets_data: BTreeMap<String, Vec<ArbitrageOpportunity>> = BTreeMap::new();
    let mut max_profit = f64::MIN;
    let mut min_profit = f64::MAX;
    for opp in &opportunities {
        let market = opp.market();
        if !markets.contains(&market) {
            markets.push(market.clone());
        }
        markets_data.entry(market).or_default().push(opp.clone());
        max_profit = max_profit.max(opp.profit);
        min_profit = min_profit.min(opp.profit);
    }

    Some(MatchView {
        match_signature: signature.to_string(),
        total_count: opportunities.len(),
        arbitrages: opportunities,
        markets_data,
        max_profit,
        min_profit,
        markets,
        match_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arbitrage::sample_opportunity;

    const SIG_AB: &str = "A vs B - Match Result";
    const SIG_CD: &str = "C vs D - Match Result";

    fn page(page: usize, per_page: usize) -> PageRequest {
        PageRequest { page, per_page }
    }

    fn scenario() -> Vec<ArbitrageOpportunity> {
        vec![
            sample_opportunity(1, SIG_AB, 2.5),
            sample_opportunity(2, SIG_AB, 4.1),
            sample_opportunity(3, SIG_AB, 1.9),
            sample_opportunity(4, SIG_CD, 3.0),
        ]
    }

    #[test]
    fn test_groups_three_plus_one() {
        let result = group_opportunities(scenario(), SortKey::Profit, SortOrder::Desc, page(1, 20));
        assert_eq!(result.groups.len(), 2);

        let first = &result.groups[0];
        assert_eq!(first.match_signature, SIG_AB);
        assert_eq!(first.total_arbitrages, 3);
        assert_eq!(first.best_arbitrage.profit, 4.1);
        assert_eq!(first.best_arbitrage.id, 2);
        assert_eq!(first.max_profit, 4.1);
        assert_eq!(first.min_profit, 1.9);
        assert_eq!(first.markets, vec!["Match Result".to_string()]);
        assert_eq!(first.markets_count, 1);

        let second = &result.groups[1];
        assert_eq!(second.total_arbitrages, 1);
        assert_eq!(second.best_arbitrage.profit, 3.0);

        let total: usize = result.groups.iter().map(|g| g.total_arbitrages).sum();
        assert_eq!(total, 4);
        assert_eq!(result.pagination.total, 2);
    }

    #[test]
    fn test_best_keeps_first_on_tie() {
        let opps = vec![
            sample_opportunity(1, SIG_AB, 3.0),
            sample_opportunity(2, SIG_AB, 3.0),
        ];
        let result = group_opportunities(opps, SortKey::Profit, SortOrder::Desc, page(1, 20));
        assert_eq!(result.groups[0].best_arbitrage.id, 1);
    }

    #[test]
    fn test_signatures_group_byte_exact() {
        let opps = vec![
            sample_opportunity(1, SIG_AB, 1.0),
            sample_opportunity(2, "a vs b - Match Result", 1.0),
            sample_opportunity(3, "A vs B - Match Result ", 1.0),
        ];
        let result = group_opportunities(opps, SortKey::Profit, SortOrder::Desc, page(1, 20));
        assert_eq!(result.groups.len(), 3);
    }

    #[test]
    fn test_sort_ascending_and_by_created_at() {
        let result = group_opportunities(scenario(), SortKey::Profit, SortOrder::Asc, page(1, 20));
        assert_eq!(result.groups[0].match_signature, SIG_CD);

        // Best of AB is id 2, created before id 4
        let result =
            group_opportunities(scenario(), SortKey::CreatedAt, SortOrder::Desc, page(1, 20));
        assert_eq!(result.groups[0].match_signature, SIG_CD);
    }

    #[test]
    fn test_unparseable_kickoff_sorts_lowest() {
        let mut early = sample_opportunity(1, "E vs F - Match Result", 1.0);
        early.kickoff_datetime = Some("2024-01-01 10:00:00".into());
        let mut garbage = sample_opportunity(2, "G vs H - Match Result", 1.0);
        garbage.kickoff_datetime = Some("someday".into());
        let mut missing = sample_opportunity(3, "I vs J - Match Result", 1.0);
        missing.kickoff_datetime = None;

        let result = group_opportunities(
            vec![garbage, early, missing],
            SortKey::KickoffDatetime,
            SortOrder::Asc,
            page(1, 20),
        );
        let ids: Vec<i64> = result.groups.iter().map(|g| g.best_arbitrage.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_pages_concatenate_to_full_list() {
        let opps: Vec<_> = (1..=11)
            .map(|i| sample_opportunity(i, &format!("T{i} vs U - Match Result"), i as f64 / 3.0))
            .collect();
        let full = group_opportunities(opps.clone(), SortKey::Profit, SortOrder::Desc, page(1, 100));

        let mut concatenated = Vec::new();
        for p in 1..=4 {
            let result = group_opportunities(opps.clone(), SortKey::Profit, SortOrder::Desc, page(p, 3));
            assert_eq!(result.pagination.total_pages, 4);
            concatenated.extend(result.groups.into_iter().map(|g| g.match_signature));
        }
        let expected: Vec<String> = full.groups.into_iter().map(|g| g.match_signature).collect();
        assert_eq!(concatenated, expected);

        let beyond = group_opportunities(opps, SortKey::Profit, SortOrder::Desc, page(5, 3));
        assert!(beyond.groups.is_empty());
        assert!(beyond.pagination.has_prev);
        assert!(!beyond.pagination.has_next);
    }

    #[test]
    fn test_empty_input() {
        let result = group_opportunities(Vec::new(), SortKey::Profit, SortOrder::Desc, page(1, 20));
        assert!(result.groups.is_empty());
        assert_eq!(result.pagination.total, 0);
        assert_eq!(result.pagination.total_pages, 0);
    }

    #[test]
    fn test_malformed_legs_count_as_unknown_market() {
        let mut broken = sample_opportunity(2, SIG_AB, 1.0);
        broken.combination_details = "not json".into();
        let opps = vec![sample_opportunity(1, SIG_AB, 2.0), broken];
        let result = group_opportunities(opps, SortKey::Profit, SortOrder::Desc, page(1, 20));
        assert_eq!(
            result.groups[0].markets,
            vec!["Match Result".to_string(), UNKNOWN.to_string()]
        );
        assert_eq!(result.groups[0].markets_count, 2);
    }

    #[test]
    fn test_match_view_buckets_by_market() {
        let mut totals = sample_opportunity(3, SIG_AB, 5.0);
        totals.combination_details =
            r#"[{"name":"Over","bookmaker":"A","odds":2.1,"market":"Totals"}]"#.into();
        let opps = vec![
            sample_opportunity(1, SIG_AB, 2.0),
            sample_opportunity(2, SIG_AB, 3.0),
            totals,
        ];
        let view = match_view(SIG_AB, opps, SortKey::Profit, SortOrder::Desc).unwrap();
        assert_eq!(view.total_count, 3);
        assert_eq!(view.arbitrages[0].id, 3);
        assert_eq!(view.markets, vec!["Totals".to_string(), "Match Result".to_string()]);
        assert_eq!(view.markets_data["Match Result"].len(), 2);
        assert_eq!(view.max_profit, 5.0);
        assert_eq!(view.min_profit, 2.0);
        // Match info comes from the first opportunity after sorting
        assert_eq!(view.match_info.home_team, UNKNOWN);

        assert!(match_view(SIG_AB, Vec::new(), SortKey::Profit, SortOrder::Desc).is_none());
    }
}
