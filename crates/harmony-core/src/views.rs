//! Read-only projections over the state lists: filtered issue and event lists,
//! the dashboard summary and the leaderboard. Nothing here mutates state.

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::trace;

use crate::model::{
    Issue, IssueCategory, IssuePriority, IssueStatus, Resource, ResourceCategory, Standing, User,
    VolunteerEvent,
};
use crate::state::Rewards;

const NEARBY_ISSUE_LIMIT: usize = 5;
const DASHBOARD_EVENT_LIMIT: usize = 3;

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Free-text search plus optional equality filters, all intersected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    pub search: String,
    pub category: Option<IssueCategory>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
}

impl IssueQuery {
    pub fn matches(&self, issue: &Issue) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = contains_folded(&issue.title, &needle)
            || contains_folded(&issue.description, &needle)
            || contains_folded(&issue.location.address, &needle);

        matches_search
            && self.category.is_none_or(|c| issue.category == c)
            && self.status.is_none_or(|s| issue.status == s)
            && self.priority.is_none_or(|p| issue.priority == p)
    }

    /// Matching issues, order preserved.
    pub fn apply(&self, issues: &[Issue]) -> Vec<Issue> {
        let out: Vec<Issue> = issues.iter().filter(|i| self.matches(i)).cloned().collect();
        trace!(total = issues.len(), matched = out.len(), "issue query applied");
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventTab {
    #[default]
    Upcoming,
    Past,
    Mine,
    All,
}

impl FromStr for EventTab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "past" => Ok(Self::Past),
            "mine" | "my" => Ok(Self::Mine),
            "all" => Ok(Self::All),
            other => Err(anyhow!(
                "unknown event tab '{other}' (expected upcoming, past, mine or all)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub search: String,
    pub tab: EventTab,
}

impl EventQuery {
    pub fn matches(
        &self,
        event: &VolunteerEvent,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = contains_folded(&event.title, &needle)
            || contains_folded(&event.description, &needle)
            || contains_folded(&event.location.address, &needle);
        if !matches_search {
            return false;
        }

        match self.tab {
            EventTab::Upcoming => !event.is_past(now),
            EventTab::Past => event.is_past(now),
            EventTab::Mine => {
                user_id.is_some_and(|id| event.is_organizer(id) || event.is_participant(id))
            }
            EventTab::All => true,
        }
    }

    /// Matching events sorted ascending by date.
    pub fn apply(
        &self,
        events: &[VolunteerEvent],
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<VolunteerEvent> {
        let mut out: Vec<VolunteerEvent> = events
            .iter()
            .filter(|e| self.matches(e, user_id, now))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.date);
        trace!(total = events.len(), matched = out.len(), tab = ?self.tab, "event query applied");
        out
    }
}

/// What the RSVP control offers the current user for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpAction {
    Join,
    Leave,
    Full,
    Past,
    Organizer,
    SignedOut,
}

impl RsvpAction {
    pub fn for_event(event: &VolunteerEvent, user: Option<&User>, now: DateTime<Utc>) -> Self {
        let Some(user) = user else {
            return Self::SignedOut;
        };
        if event.is_past(now) {
            Self::Past
        } else if event.is_organizer(&user.id) {
            Self::Organizer
        } else if event.is_participant(&user.id) {
            Self::Leave
        } else if event.is_full() {
            Self::Full
        } else {
            Self::Join
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    pub search: String,
    pub category: Option<ResourceCategory>,
}

impl ResourceQuery {
    pub fn matches(&self, resource: &Resource) -> bool {
        let needle = self.search.to_lowercase();
        (contains_folded(&resource.title, &needle)
            || contains_folded(&resource.description, &needle))
            && self.category.is_none_or(|c| resource.category == c)
    }

    pub fn apply<'a>(&self, resources: &'a [Resource]) -> Vec<&'a Resource> {
        resources.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_reports: usize,
    pub resolved: usize,
    pub in_progress: usize,
    pub points: u32,
    pub nearby_issues: Vec<Issue>,
    pub upcoming_events: Vec<VolunteerEvent>,
}

impl DashboardSummary {
    pub fn compute(
        user: Option<&User>,
        issues: &[Issue],
        events: &[VolunteerEvent],
        now: DateTime<Utc>,
    ) -> Self {
        let user_id = user.map(|u| u.id.as_str());
        let mine: Vec<&Issue> = issues
            .iter()
            .filter(|i| user_id == Some(i.reporter_id.as_str()))
            .collect();

        let nearby_issues = issues
            .iter()
            .filter(|i| i.status != IssueStatus::Resolved)
            .take(NEARBY_ISSUE_LIMIT)
            .cloned()
            .collect();

        let mut upcoming_events = EventQuery::default().apply(events, user_id, now);
        upcoming_events.truncate(DASHBOARD_EVENT_LIMIT);

        Self {
            total_reports: mine.len(),
            resolved: mine
                .iter()
                .filter(|i| i.status == IssueStatus::Resolved)
                .count(),
            in_progress: mine
                .iter()
                .filter(|i| i.status == IssueStatus::InProgress)
                .count(),
            points: user.map_or(0, |u| u.points),
            nearby_issues,
            upcoming_events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub points: u32,
    pub badges: u32,
    pub is_current_user: bool,
}

/// Standings sorted by points, highest first. The signed-in user's row carries
/// their live points and badge count.
pub fn leaderboard(standings: &[Standing], user: Option<&User>) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = standings
        .iter()
        .map(|s| {
            let current = user.filter(|u| u.id == s.user_id);
            LeaderboardRow {
                rank: 0,
                user_id: s.user_id.clone(),
                name: s.name.clone(),
                points: current.map_or(s.points, |u| u.points),
                badges: current.map_or(s.badges, |u| {
                    u32::try_from(u.badges.len()).unwrap_or(u32::MAX)
                }),
                is_current_user: current.is_some(),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.points.cmp(&a.points));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}

pub fn rank_of(rows: &[LeaderboardRow], user_id: &str) -> Option<usize> {
    rows.iter().find(|r| r.user_id == user_id).map(|r| r.rank)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningRule {
    pub points: u32,
    pub action: &'static str,
    pub hint: &'static str,
}

pub fn earning_rules(rewards: Rewards) -> Vec<EarningRule> {
    vec![
        EarningRule {
            points: rewards.report,
            action: "Report an Issue",
            hint: "Help identify problems",
        },
        EarningRule {
            points: rewards.organize,
            action: "Organize an Event",
            hint: "Lead community activities",
        },
        EarningRule {
            points: rewards.attend,
            action: "Attend an Event",
            hint: "Volunteer your time",
        },
        EarningRule {
            points: rewards.resolved,
            action: "Issue Resolved",
            hint: "Your report gets fixed",
        },
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::seed::Seed;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn category_filter_returns_only_that_category() {
        let seed = Seed::builtin().unwrap();
        let query = IssueQuery {
            category: Some(IssueCategory::Roads),
            ..IssueQuery::default()
        };

        let out = query.apply(&seed.issues);
        assert!(!out.is_empty());
        assert!(out.iter().all(|i| i.category == IssueCategory::Roads));
    }

    #[test]
    fn search_covers_title_description_and_address_case_insensitively() {
        let seed = Seed::builtin().unwrap();
        let ids = |search: &str| -> Vec<String> {
            IssueQuery {
                search: search.to_string(),
                ..IssueQuery::default()
            }
            .apply(&seed.issues)
            .into_iter()
            .map(|i| i.id)
            .collect()
        };

        assert_eq!(ids("POTHOLE"), vec!["issue-1"]);
        assert_eq!(ids("pests"), vec!["issue-4"]);
        assert_eq!(ids("elm street"), vec!["issue-2"]);
        assert_eq!(ids("").len(), seed.issues.len());
    }

    #[test]
    fn filters_intersect() {
        let seed = Seed::builtin().unwrap();
        let query = IssueQuery {
            search: String::new(),
            category: None,
            status: Some(IssueStatus::Acknowledged),
            priority: Some(IssuePriority::Low),
        };
        let out = query.apply(&seed.issues);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "issue-5");
    }

    #[test]
    fn event_tabs_split_on_date_and_sort_ascending() {
        let seed = Seed::builtin().unwrap();
        let now = at(2025, 2, 20);

        let upcoming = EventQuery::default().apply(&seed.events, Some("user-1"), now);
        let upcoming_ids: Vec<&str> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(upcoming_ids, vec!["event-2", "event-3"]);

        let past = EventQuery {
            tab: EventTab::Past,
            ..EventQuery::default()
        }
        .apply(&seed.events, Some("user-1"), now);
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, "event-1");

        let all = EventQuery {
            tab: EventTab::All,
            ..EventQuery::default()
        }
        .apply(&seed.events, None, now);
        let dates: Vec<NaiveDate> = all.iter().map(|e| e.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn mine_tab_needs_a_user() {
        let seed = Seed::builtin().unwrap();
        let now = at(2025, 1, 1);
        let mine = EventQuery {
            tab: EventTab::Mine,
            ..EventQuery::default()
        };

        let ids: Vec<String> = mine
            .apply(&seed.events, Some("user-1"), now)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["event-1", "event-2"]);
        assert!(mine.apply(&seed.events, None, now).is_empty());
    }

    #[test]
    fn rsvp_action_mirrors_detail_page() {
        let seed = Seed::builtin().unwrap();
        let user = seed.user.clone();
        let now = at(2025, 1, 1);
        let event = |id: &str| seed.events.iter().find(|e| e.id == id).unwrap().clone();

        assert_eq!(RsvpAction::for_event(&event("event-1"), Some(&user), now), RsvpAction::Organizer);
        assert_eq!(RsvpAction::for_event(&event("event-2"), Some(&user), now), RsvpAction::Leave);
        assert_eq!(RsvpAction::for_event(&event("event-3"), Some(&user), now), RsvpAction::Join);
        assert_eq!(RsvpAction::for_event(&event("event-3"), None, now), RsvpAction::SignedOut);
        assert_eq!(
            RsvpAction::for_event(&event("event-3"), Some(&user), at(2026, 1, 1)),
            RsvpAction::Past
        );

        let mut full = event("event-3");
        full.max_participants = 0;
        assert_eq!(RsvpAction::for_event(&full, Some(&user), now), RsvpAction::Full);
    }

    #[test]
    fn dashboard_summary_counts_my_reports() {
        let seed = Seed::builtin().unwrap();
        let summary = DashboardSummary::compute(
            Some(&seed.user),
            &seed.issues,
            &seed.events,
            at(2025, 2, 1),
        );

        assert_eq!(summary.total_reports, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.points, 1250);
        assert_eq!(summary.nearby_issues.len(), 4);
        assert!(summary.nearby_issues.iter().all(|i| i.status != IssueStatus::Resolved));
        assert_eq!(summary.upcoming_events.len(), 3);
        assert_eq!(summary.upcoming_events[0].id, "event-1");

        let anonymous = DashboardSummary::compute(None, &seed.issues, &seed.events, at(2025, 2, 1));
        assert_eq!(anonymous.total_reports, 0);
        assert_eq!(anonymous.points, 0);
    }

    #[test]
    fn leaderboard_uses_live_points_for_current_user() {
        let seed = Seed::builtin().unwrap();
        let mut user = seed.user.clone();

        let rows = leaderboard(&seed.leaderboard, Some(&user));
        assert_eq!(rows[0].name, "Emma Thompson");
        assert_eq!(rank_of(&rows, "user-1"), Some(3));

        user.points = 2000;
        let rows = leaderboard(&seed.leaderboard, Some(&user));
        assert_eq!(rank_of(&rows, "user-1"), Some(2));
        assert!(rows[1].is_current_user);
        assert_eq!(rows[1].badges, 3);
        assert!(rows.windows(2).all(|w| w[0].points >= w[1].points));
        assert_eq!(rank_of(&rows, "user-99"), None);
    }

    #[test]
    fn resource_query_filters_by_category_and_text() {
        let seed = Seed::builtin().unwrap();
        let query = ResourceQuery {
            search: "volunteer".to_string(),
            category: Some(ResourceCategory::Safety),
        };
        let out = query.apply(&seed.resources);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "resource-2");
    }

    #[test]
    fn earning_rules_follow_rewards() {
        let rules = earning_rules(Rewards {
            report: 5,
            ..Rewards::default()
        });
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].points, 5);
        assert_eq!(rules[3].points, 100);
    }
}
