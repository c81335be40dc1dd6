//! Current staff identity, supplied by an external auth provider.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StaffConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Yields the signed-in user, if any. Used only to stamp ownership.
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<StaffUser>;
}

/// Fixed identity taken from configuration or the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<StaffUser>,
}

impl StaticAuth {
    pub fn signed_in(user: StaffUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_config(staff: &StaffConfig) -> Self {
        match staff.user_id {
            Some(id) => Self::signed_in(StaffUser {
                id,
                email: staff.email.clone(),
            }),
            None => Self::anonymous(),
        }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<StaffUser> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let id = Uuid::new_v4();
        let staff = StaffConfig {
            user_id: Some(id),
            email: Some("front@hellomolar.example".into()),
        };
        assert_eq!(StaticAuth::from_config(&staff).current_user().map(|u| u.id), Some(id));
        assert_eq!(StaticAuth::from_config(&StaffConfig::default()).current_user(), None);
    }
}
