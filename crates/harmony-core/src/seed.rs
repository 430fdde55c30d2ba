use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::model::{Issue, Notification, Resource, Standing, User, VolunteerEvent};

const BUILTIN_SEED: &str = include_str!("../data/seed.json");

/// Everything the state container starts from, and the shape `export` writes back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seed {
    /// Demo account. `login` signs this user back in.
    pub user: User,
    #[serde(default = "signed_in_default")]
    pub signed_in: bool,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub events: Vec<VolunteerEvent>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub leaderboard: Vec<Standing>,
}

fn signed_in_default() -> bool {
    true
}

impl Seed {
    pub fn builtin() -> anyhow::Result<Self> {
        serde_json::from_str(BUILTIN_SEED).context("failed parsing built-in seed data")
    }

    /// Loads `path` when given, otherwise the built-in demo data.
    #[tracing::instrument(skip(path))]
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("using built-in seed");
                Self::builtin()
            }
        }
    }

    #[tracing::instrument(skip(path), fields(file = %path.display()))]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading seed {}", path.display()))?;
        let seed: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing seed {}", path.display()))?;
        info!(
            issues = seed.issues.len(),
            events = seed.events.len(),
            notifications = seed.notifications.len(),
            "loaded seed file"
        );
        Ok(seed)
    }

    /// Writes the seed as pretty JSON through a temp file in the target directory.
    #[tracing::instrument(skip(self, path), fields(file = %path.display()))]
    pub fn export(&self, path: &Path) -> anyhow::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, self)?;
        writeln!(temp)?;
        temp.flush()?;

        temp.persist(path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

        info!(
            issues = self.issues.len(),
            events = self.events.len(),
            "exported snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Seed;
    use crate::model::IssueStatus;

    #[test]
    fn builtin_seed_matches_demo_data() {
        let seed = Seed::builtin().unwrap();
        assert_eq!(seed.user.id, "user-1");
        assert_eq!(seed.user.points, 1250);
        assert_eq!(seed.user.badges.len(), 3);
        assert!(seed.signed_in);
        assert_eq!(seed.issues.len(), 5);
        assert_eq!(seed.events.len(), 3);
        assert_eq!(seed.notifications.len(), 5);
        assert_eq!(seed.resources.len(), 4);
        assert_eq!(seed.leaderboard.len(), 10);
        assert_eq!(seed.issues[0].status, IssueStatus::InProgress);
        assert_eq!(seed.issues[0].status_history.len(), 3);
    }
}
