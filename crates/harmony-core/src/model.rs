use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh entity id of the form `<prefix>-<uuid>`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    pub const CITY_CENTRE: (f64, f64) = (40.7128, -74.006);

    pub fn at_city_centre(address: String) -> Self {
        let (lat, lng) = Self::CITY_CENTRE;
        Self { lat, lng, address }
    }
}

/// Declares a closed string enum with serde names, display labels and a
/// case-insensitive `FromStr` that also accepts the listed aliases.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => $wire:literal, $label:literal $(| $alias:literal)*;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lower = s.trim().to_ascii_lowercase();
                match lower.as_str() {
                    $($wire $(| $alias)* => Ok($name::$variant),)+
                    other => Err(anyhow!(
                        "unknown {} '{other}' (expected one of: {})",
                        $what,
                        [$($wire),+].join(", ")
                    )),
                }
            }
        }
    };
}

labelled_enum! {
    IssueCategory, "issue category" {
        Roads => "roads", "Roads" | "road";
        Trash => "trash", "Trash";
        Graffiti => "graffiti", "Graffiti";
        Lights => "lights", "Lights" | "light";
        Parks => "parks", "Parks" | "park";
        Other => "other", "Other";
    }
}

labelled_enum! {
    IssuePriority, "priority" {
        Low => "low", "Low" | "l";
        Medium => "medium", "Medium" | "m" | "med";
        High => "high", "High" | "h";
    }
}

labelled_enum! {
    IssueStatus, "issue status" {
        Reported => "reported", "Reported";
        Acknowledged => "acknowledged", "Acknowledged" | "ack";
        InProgress => "in-progress", "In Progress" | "in_progress" | "inprogress";
        Resolved => "resolved", "Resolved";
    }
}

labelled_enum! {
    EventCategory, "event category" {
        Cleanup => "cleanup", "Cleanup";
        Repair => "repair", "Repair";
        Gardening => "gardening", "Gardening";
        Other => "other", "Other";
    }
}

labelled_enum! {
    Role, "role" {
        Resident => "resident", "Resident";
        Volunteer => "volunteer", "Volunteer";
        Authority => "authority", "Authority";
        Admin => "admin", "Admin";
    }
}

labelled_enum! {
    NotificationKind, "notification type" {
        StatusUpdate => "status_update", "Status Update";
        Comment => "comment", "Comment";
        EventReminder => "event_reminder", "Event Reminder";
        BadgeEarned => "badge_earned", "Badge Earned";
        PointsEarned => "points_earned", "Points Earned";
    }
}

labelled_enum! {
    ResourceCategory, "resource category" {
        Reporting => "reporting", "Reporting";
        Safety => "safety", "Safety";
        Volunteering => "volunteering", "Volunteering";
        Community => "community", "Community";
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdate {
    pub id: String,
    pub status: IssueStatus,
    pub message: String,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn by_user(user: &User, status: IssueStatus, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id("sh"),
            status,
            message,
            updated_by: user.name.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_user(user: &User, content: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id("comment"),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            content,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub location: Location,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub reporter_id: String,
    pub reporter_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status_history: Vec<StatusUpdate>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Partial issue record. `Some` fields replace the stored value wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<IssueCategory>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub location: Option<Location>,
    pub photo_url: Option<Option<String>>,
    pub status_history: Option<Vec<StatusUpdate>>,
    pub comments: Option<Vec<Comment>>,
}

impl IssuePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch appending `comment` to the issue's existing thread.
    pub fn append_comment(issue: &Issue, comment: Comment) -> Self {
        let mut comments = issue.comments.clone();
        comments.push(comment);
        Self {
            comments: Some(comments),
            ..Self::default()
        }
    }

    /// Patch moving the issue to `update.status` and recording it in the history.
    pub fn transition(issue: &Issue, update: StatusUpdate) -> Self {
        let status = update.status;
        let mut history = issue.status_history.clone();
        history.push(update);
        Self {
            status: Some(status),
            status_history: Some(history),
            ..Self::default()
        }
    }

    pub(crate) fn merge_into(self, issue: &mut Issue) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(category) = self.category {
            issue.category = category;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(location) = self.location {
            issue.location = location;
        }
        if let Some(photo_url) = self.photo_url {
            issue.photo_url = photo_url;
        }
        if let Some(history) = self.status_history {
            issue.status_history = history;
        }
        if let Some(comments) = self.comments {
            issue.comments = comments;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub rsvp_at: DateTime<Utc>,
}

impl Participant {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            rsvp_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolunteerEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub location: Location,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub organizer_id: String,
    pub organizer_name: String,
    pub max_participants: u32,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl VolunteerEvent {
    /// Instant used for the upcoming/past split: the event day at midnight UTC.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.starts_at() < now
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_organizer(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }

    pub fn spots_left(&self) -> usize {
        (self.max_participants as usize).saturating_sub(self.participants.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_at: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub points: u32,
    #[serde(default)]
    pub badges: Vec<Badge>,
    pub role: Role,
    pub joined_at: NaiveDate,
}

impl User {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("Neighbor")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub link: Option<String>,
}

impl Notification {
    pub fn points_earned(points: u32, action: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id("notif"),
            kind: NotificationKind::PointsEarned,
            title: "Points Earned".to_string(),
            message: format!("You earned {points} points for {action}!"),
            read: false,
            created_at: now,
            link: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ResourceCategory,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: NaiveDate,
}

/// One row of the seeded community leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    pub user_id: String,
    pub name: String,
    pub points: u32,
    pub badges: u32,
}
