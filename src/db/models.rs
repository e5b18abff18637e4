use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::password::{self, Credential};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Donor,
    Beneficiary,
    #[default]
    Visitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Donor => "donor",
            Self::Beneficiary => "beneficiary",
            Self::Visitor => "visitor",
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
            "admin" => Ok(Self::Admin),
            "donor" => Ok(Self::Donor),
            "beneficiary" => Ok(Self::Beneficiary),
            "visitor" => Ok(Self::Visitor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Where a user's login credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Column,
    LegacyBio,
}

/// A stored user. Deliberately not `Serialize`: clients get [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub bio: String,
    pub credential: Option<Credential>,
    pub auth_provider: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The credential to check a password against. The dedicated column wins;
    /// otherwise a hash embedded in the bio is used.
    pub fn login_credential(&self) -> Option<(Credential, CredentialSource)> {
        if let Some(ref credential) = self.credential {
            return Some((credential.clone(), CredentialSource::Column));
        }
        let (hash, _) = password::split_legacy_bio(&self.bio);
        hash.map(|h| (Credential::bcrypt(h), CredentialSource::LegacyBio))
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            bio: password::visible_bio(&self.bio).to_string(),
            auth_provider: self.auth_provider.clone(),
            email_verified: self.email_verified,
            is_active: self.is_active,
            last_login: self.last_login.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// The client-facing view of a user: no hash, visible bio only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub bio: String,
    pub auth_provider: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub budget: i64,
    pub beneficiaries_count: i64,
    pub progress_percentage: i64,
    pub location: Option<String>,
    pub featured: bool,
    pub created_at: String,
}
