use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::model::{
    EventCategory, Issue, IssueCategory, IssuePatch, IssuePriority, IssueStatus, Location,
    Notification, Participant, Resource, Standing, StatusUpdate, User, VolunteerEvent, new_id,
};
use crate::seed::Seed;

const DEFAULT_ISSUE_ADDRESS: &str = "123 Main Street, Harmony City";
const DEFAULT_EVENT_ADDRESS: &str = "Harmony Park, Harmony City";

/// Points handed out per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewards {
    pub report: u32,
    pub organize: u32,
    pub attend: u32,
    pub resolved: u32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            report: 25,
            organize: 50,
            attend: 30,
            resolved: 100,
        }
    }
}

#[derive(Debug)]
struct Session {
    user: Option<User>,
    issues: Vec<Issue>,
    events: Vec<VolunteerEvent>,
    notifications: Vec<Notification>,
}

/// Process-wide holder of the mutable lists. Every mutation replaces records in
/// place under the lock and never reports failure.
#[derive(Debug)]
pub struct AppState {
    session: Mutex<Session>,
    demo_user: User,
    resources: Vec<Resource>,
    standings: Vec<Standing>,
    rewards: Rewards,
}

impl AppState {
    pub fn from_seed(seed: Seed, rewards: Rewards) -> Self {
        let user = seed.signed_in.then(|| seed.user.clone());
        info!(
            signed_in = user.is_some(),
            issues = seed.issues.len(),
            events = seed.events.len(),
            notifications = seed.notifications.len(),
            "state seeded"
        );
        Self {
            session: Mutex::new(Session {
                user,
                issues: seed.issues,
                events: seed.events,
                notifications: seed.notifications,
            }),
            demo_user: seed.user,
            resources: seed.resources,
            standings: seed.leaderboard,
            rewards,
        }
    }

    pub fn rewards(&self) -> Rewards {
        self.rewards
    }

    pub fn user(&self) -> Option<User> {
        self.session.lock().user.clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.session.lock().user = user;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.lock().user.is_some()
    }

    /// Signs the demo user in for any non-empty email. The password is not checked.
    #[instrument(skip(self, _password))]
    pub fn login(&self, email: &str, _password: &str) -> bool {
        if email.is_empty() {
            debug!("login rejected: empty email");
            return false;
        }
        self.session.lock().user = Some(self.demo_user.clone());
        info!(user = %self.demo_user.id, "signed in");
        true
    }

    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.session.lock().user = None;
        info!("signed out");
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.session.lock().issues.clone()
    }

    pub fn issue(&self, id: &str) -> Option<Issue> {
        self.session.lock().issues.iter().find(|i| i.id == id).cloned()
    }

    /// Prepends `issue`, posts a points notification and credits the signed-in user.
    #[instrument(skip(self, issue), fields(id = %issue.id))]
    pub fn add_issue(&self, issue: Issue) {
        let now = Utc::now();
        let points = self.rewards.report;
        let mut session = self.session.lock();

        session.issues.insert(0, issue);
        session
            .notifications
            .insert(0, Notification::points_earned(points, "reporting an issue", now));

        if let Some(user) = session.user.as_mut() {
            user.points = user.points.saturating_add(points);
            info!(user = %user.id, points, total = user.points, "issue added, points awarded");
        } else {
            info!("issue added without a signed-in user");
        }
    }

    /// Shallow-merges `patch` into the issue and stamps `updated_at`.
    #[instrument(skip(self, patch))]
    pub fn update_issue(&self, id: &str, patch: IssuePatch) -> Option<Issue> {
        let now = Utc::now();
        let mut session = self.session.lock();
        let Some(issue) = session.issues.iter_mut().find(|i| i.id == id) else {
            debug!("update ignored: unknown issue");
            return None;
        };

        patch.merge_into(issue);
        issue.updated_at = now;
        info!(status = %issue.status, "issue updated");
        Some(issue.clone())
    }

    pub fn events(&self) -> Vec<VolunteerEvent> {
        self.session.lock().events.clone()
    }

    pub fn event(&self, id: &str) -> Option<VolunteerEvent> {
        self.session.lock().events.iter().find(|e| e.id == id).cloned()
    }

    /// Prepends `event` and credits the signed-in user as organizer.
    #[instrument(skip(self, event), fields(id = %event.id))]
    pub fn add_event(&self, event: VolunteerEvent) {
        let points = self.rewards.organize;
        let mut session = self.session.lock();

        session.events.insert(0, event);

        if let Some(user) = session.user.as_mut() {
            user.points = user.points.saturating_add(points);
            info!(user = %user.id, points, total = user.points, "event added, points awarded");
        } else {
            info!("event added without a signed-in user");
        }
    }

    /// Appends the current user to the roster. Capacity and existing membership
    /// are not checked here.
    #[instrument(skip(self))]
    pub fn join_event(&self, id: &str) -> Option<VolunteerEvent> {
        let now = Utc::now();
        let mut session = self.session.lock();
        let Some(participant) = session.user.as_ref().map(|u| Participant::from_user(u, now))
        else {
            debug!("join ignored: no signed-in user");
            return None;
        };
        let Some(event) = session.events.iter_mut().find(|e| e.id == id) else {
            debug!("join ignored: unknown event");
            return None;
        };

        event.participants.push(participant);
        info!(participants = event.participants.len(), "event joined");
        Some(event.clone())
    }

    /// Drops every roster entry belonging to the current user.
    #[instrument(skip(self))]
    pub fn leave_event(&self, id: &str) -> Option<VolunteerEvent> {
        let mut session = self.session.lock();
        let Some(user_id) = session.user.as_ref().map(|u| u.id.clone()) else {
            debug!("leave ignored: no signed-in user");
            return None;
        };
        let Some(event) = session.events.iter_mut().find(|e| e.id == id) else {
            debug!("leave ignored: unknown event");
            return None;
        };

        let before = event.participants.len();
        event.participants.retain(|p| p.user_id != user_id);
        info!(
            removed = before - event.participants.len(),
            participants = event.participants.len(),
            "event left"
        );
        Some(event.clone())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.session.lock().notifications.clone()
    }

    #[instrument(skip(self))]
    pub fn mark_notification_read(&self, id: &str) -> bool {
        let mut session = self.session.lock();
        match session.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                debug!("notification marked read");
                true
            }
            None => {
                debug!("mark read ignored: unknown notification");
                false
            }
        }
    }

    pub fn unread_count(&self) -> usize {
        self.session
            .lock()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    /// Current state in seed shape, suitable for `Seed::export`.
    pub fn snapshot(&self) -> Seed {
        let session = self.session.lock();
        Seed {
            user: session.user.clone().unwrap_or_else(|| self.demo_user.clone()),
            signed_in: session.user.is_some(),
            issues: session.issues.clone(),
            events: session.events.clone(),
            notifications: session.notifications.clone(),
            resources: self.resources.clone(),
            leaderboard: self.standings.clone(),
        }
    }
}

/// Fields of the "report an issue" form.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub address: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub photo_url: Option<String>,
}

impl IssueDraft {
    pub fn new(title: String) -> Self {
        Self {
            title,
            description: String::new(),
            category: IssueCategory::Other,
            priority: IssuePriority::Medium,
            address: None,
            coordinates: None,
            photo_url: None,
        }
    }

    pub fn into_issue(self, reporter: &User, now: DateTime<Utc>) -> Issue {
        let address = self
            .address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUE_ADDRESS.to_string());
        let location = match self.coordinates {
            Some((lat, lng)) => Location { lat, lng, address },
            None => Location::at_city_centre(address),
        };

        Issue {
            id: new_id("issue"),
            title: self.title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            status: IssueStatus::Reported,
            location,
            photo_url: self.photo_url,
            reporter_id: reporter.id.clone(),
            reporter_name: reporter.name.clone(),
            created_at: now,
            updated_at: now,
            status_history: vec![StatusUpdate::by_user(
                reporter,
                IssueStatus::Reported,
                "Issue reported by resident".to_string(),
                now,
            )],
            comments: vec![],
        }
    }
}

/// Fields of the "create event" form.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub address: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_participants: u32,
}

impl EventDraft {
    pub fn into_event(self, organizer: &User, now: DateTime<Utc>) -> VolunteerEvent {
        let address = self
            .address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_ADDRESS.to_string());
        let location = match self.coordinates {
            Some((lat, lng)) => Location { lat, lng, address },
            None => Location::at_city_centre(address),
        };

        VolunteerEvent {
            id: new_id("event"),
            title: self.title,
            description: self.description,
            category: self.category,
            location,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            organizer_id: organizer.id.clone(),
            organizer_name: organizer.name.clone(),
            max_participants: self.max_participants,
            participants: vec![],
            created_at: now,
        }
    }
}
