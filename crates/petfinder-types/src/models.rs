use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Account roles. Anything outside this set is rejected at token
/// deserialization, before any handler or store access runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Listing lifecycle for a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStatus {
    Available,
    Reserved,
    Lost,
    Found,
}

impl PetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetStatus::Available => "available",
            PetStatus::Reserved => "reserved",
            PetStatus::Lost => "lost",
            PetStatus::Found => "found",
        }
    }

    pub fn parse(s: &str) -> Option<PetStatus> {
        match s {
            "available" => Some(PetStatus::Available),
            "reserved" => Some(PetStatus::Reserved),
            "lost" => Some(PetStatus::Lost),
            "found" => Some(PetStatus::Found),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Lost,
    Found,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Lost => "lost",
            ReportType::Found => "found",
        }
    }

    pub fn parse(s: &str) -> Option<ReportType> {
        match s {
            "lost" => Some(ReportType::Lost),
            "found" => Some(ReportType::Found),
            _ => None,
        }
    }
}

/// The externally visible view of an account. Password material and
/// one-time codes never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Parse a stored TEXT uuid, logging and substituting the nil uuid on
/// corruption so a single bad row cannot poison a whole listing.
pub fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", context, raw, e);
        Uuid::default()
    })
}

/// Parse a timestamp as stored by SQLite. `datetime('now')` defaults come
/// back as "YYYY-MM-DD HH:MM:SS" without a timezone, so fall back to naive
/// UTC when RFC 3339 parsing fails.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}
