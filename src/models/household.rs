use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// An individual within a household, tracked separately for viewing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(household_id: Uuid, name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            created_at: at,
        }
    }
}

/// The billing and viewing unit. Always holds at least one member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

impl Household {
    /// Creates a household together with its founding member
    pub fn new(name: impl Into<String>, founding_member: impl Into<String>) -> Self {
        Self::founded_at(name, founding_member, Utc::now())
    }

    pub fn founded_at(
        name: impl Into<String>,
        founding_member: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.into(),
            members: vec![Member::new(id, founding_member, at)],
            created_at: at,
        }
    }

    /// Adds a member created for this household. A member of another household or a
    /// repeated id is rejected and leaves the household untouched.
    pub fn add_member(&mut self, member: Member) -> AppResult<()> {
        if member.household_id != self.id {
            return Err(AppError::InvalidInput(format!(
                "member {} belongs to household {}",
                member.id, member.household_id
            )));
        }
        if self.has_member(member.id) {
            return Err(AppError::Conflict(format!("member {} already exists", member.id)));
        }

        self.members.push(member);
        Ok(())
    }

    /// Removes a member. Fails, leaving the household untouched, if the member is the
    /// last one or does not belong to this household.
    pub fn remove_member(&mut self, member_id: Uuid) -> AppResult<Member> {
        let position = self
            .members
            .iter()
            .position(|m| m.id == member_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "member {} in household {}",
                    member_id, self.id
                ))
            })?;

        if self.members.len() <= 1 {
            return Err(AppError::MembershipConstraint(
                "household must have at least one member".to_string(),
            ));
        }

        Ok(self.members.remove(position))
    }

    pub fn has_member(&self, member_id: Uuid) -> bool {
        self.members.iter().any(|m| m.id == member_id)
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.id).collect()
    }
}
