use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two founder roles. Matching always pairs a role with its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "CEO")]
    Ceo,
    #[serde(rename = "CTO")]
    Cto,
}

impl Role {
    /// The role this role is matched against.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Ceo => Role::Cto,
            Role::Cto => Role::Ceo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Cto => "CTO",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CEO" => Ok(Role::Ceo),
            "CTO" => Ok(Role::Cto),
            other => Err(format!("Invalid role: {other}")),
        }
    }
}

/// A stored vector for one owner, tagged with the text it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub owner_id: String,
    pub role: Role,
    /// Source tag, e.g. "summary". Only same-source vectors are ever compared.
    pub source: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// AI-written summary of an owner's interview. One per owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub text: String,
}

/// Account record as provided by the identity layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub onboarded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub availability: Option<String>,
    pub commitment: Option<String>,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub availability: Option<String>,
    pub commitment: Option<String>,
}

/// Startup details filled in by a CEO.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Startup {
    pub stage: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub equity_offer: Option<String>,
    pub salary_offer: Option<String>,
}

/// Technical background filled in by a CTO.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechBackground {
    pub primary_stack: Option<String>,
    pub years_experience: Option<i32>,
    pub domains: Option<String>,
    pub track_record: Option<String>,
}

/// Role-specific block attached to an enriched match. Exactly one variant per candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RoleDetail {
    #[serde(rename = "startup")]
    Startup(Startup),
    #[serde(rename = "techBackground")]
    TechBackground(TechBackground),
}

/// Ranked counterpart, not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub user_id: String,
    pub score: f32,
}

/// A ranked candidate with rationale and display fields, not persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMatch {
    pub user_id: String,
    pub score: f32,
    pub rationale: String,
    pub name: String,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub availability: Option<String>,
    pub commitment: Option<String>,
    #[serde(flatten)]
    pub detail: Option<RoleDetail>,
}

impl EnrichedMatch {
    pub fn startup(&self) -> Option<&Startup> {
        match &self.detail {
            Some(RoleDetail::Startup(s)) => Some(s),
            _ => None,
        }
    }

    pub fn tech_background(&self) -> Option<&TechBackground> {
        match &self.detail {
            Some(RoleDetail::TechBackground(t)) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntroStatus {
    Pending,
    Accepted,
    Declined,
}

impl IntroStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IntroStatus::Pending => "PENDING",
            IntroStatus::Accepted => "ACCEPTED",
            IntroStatus::Declined => "DECLINED",
        }
    }
}

impl FromStr for IntroStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(IntroStatus::Pending),
            "ACCEPTED" => Ok(IntroStatus::Accepted),
            "DECLINED" => Ok(IntroStatus::Declined),
            other => Err(format!("Invalid intro status: {other}")),
        }
    }
}

/// Request from one user to be introduced to another.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroRequest {
    pub id: String,
    pub requester_id: String,
    pub target_id: String,
    pub status: IntroStatus,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}
