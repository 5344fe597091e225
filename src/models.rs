use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Open,
    Merged,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            _ => Err(format!("Invalid pull request status: {}", s)),
        }
    }
}

/// A pull request together with its current active reviewer set.
///
/// The reviewer set is derived from the active assignment rows at read time,
/// never stored on the request row itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: RequestStatus,
    pub assigned_reviewers: Vec<String>,
    pub created_at: String,
    pub merged_at: Option<String>,
}

/// Abbreviated request row returned by per-user listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: RequestStatus,
}

/// Fields a caller supplies when opening a request. Status, timestamps, and
/// reviewers are assigned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

/// Aggregate request counters for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub total_prs: i64,
    pub open_prs: i64,
    pub merged_prs: i64,
    pub avg_reviewers: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_round_trips_through_str() {
        assert_eq!(RequestStatus::from_str("OPEN").unwrap(), RequestStatus::Open);
        assert_eq!(
            RequestStatus::from_str("MERGED").unwrap(),
            RequestStatus::Merged
        );
        assert_eq!(RequestStatus::Open.as_str(), "OPEN");
        assert_eq!(RequestStatus::Merged.as_str(), "MERGED");
    }

    #[test]
    fn request_status_rejects_unknown_values() {
        assert!(RequestStatus::from_str("CLOSED").is_err());
        assert!(RequestStatus::from_str("open").is_err());
    }

    #[test]
    fn request_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&RequestStatus::Merged).unwrap();
        assert_eq!(json, "\"MERGED\"");
    }
}
