pub mod classify;
pub mod project;
pub mod schema;
pub mod store;

use serde::{Deserialize, Serialize};

/// Internal event taxonomy.
///
/// The archive serves dozens of external type tags; only four map onto
/// this set, everything else is dropped at classification. Adding a tag
/// means adding a match arm here, so new classification decisions are
/// explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PullRequest,
    Comment,
    Commit,
}

impl EventKind {
    /// Resolve an external archive type tag, or `None` for any tag
    /// outside the recognized set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PullRequestEvent" => Some(Self::PullRequest),
            "IssueCommentEvent" | "CommitCommentEvent" => Some(Self::Comment),
            "PushEvent" => Some(Self::Commit),
            _ => None,
        }
    }

    /// Stable string persisted in the event table's `type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::Comment => "comment",
            Self::Commit => "commit",
        }
    }

    /// Inverse of [`EventKind::as_str`] for rows read back from the store.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pull_request" => Some(Self::PullRequest),
            "comment" => Some(Self::Comment),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRow {
    pub id: i64,
    pub login: String,
    pub url: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRow {
    pub id: i64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub id: i64,
    pub kind: EventKind,
    pub actor_id: i64,
    pub repo_id: i64,
    pub payload: String,
    pub created_at: String,
    pub comment: String,
    pub count: i64,
}

/// The three rows a single raw record projects into. A record yields a
/// complete triple or nothing at all.
#[derive(Debug, Clone)]
pub struct ProjectedTriple {
    pub actor: ActorRow,
    pub repo: RepoRow,
    pub event: EventRow,
}
