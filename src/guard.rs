use crate::error::AppError;
use crate::models::role::RoleName;

/// A change to an existing membership that the admin guard must approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Remove,
    ChangeRole(RoleName),
}

impl MembershipChange {
    pub fn drops_admin(self, current: RoleName) -> bool {
        current.is_admin()
            && match self {
                MembershipChange::Remove => true,
                MembershipChange::ChangeRole(role) => !role.is_admin(),
            }
    }
}

/// Keeps every service at or above its minimum number of admins.
///
/// The guard only decides; callers must evaluate it against the same
/// snapshot the mutation is applied to (see `db::members`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGuard {
    pub min_admins: i64,
}

impl Default for AdminGuard {
    fn default() -> Self {
        Self { min_admins: 1 }
    }
}

impl AdminGuard {
    pub fn new(min_admins: i64) -> Self {
        Self {
            min_admins: min_admins.max(1),
        }
    }

    pub fn allows(&self, current: RoleName, change: MembershipChange, admin_count: i64) -> bool {
        !change.drops_admin(current) || admin_count - 1 >= self.min_admins
    }

    pub fn check(
        &self,
        current: RoleName,
        change: MembershipChange,
        admin_count: i64,
    ) -> Result<(), AppError> {
        if self.allows(current, change, admin_count) {
            Ok(())
        } else {
            Err(AppError::AdminLimitReached {
                required: self.min_admins,
            })
        }
    }
}
