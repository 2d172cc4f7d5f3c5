use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::role::RoleName;

/// Lifecycle state of an invite. `Expired` is derived from the creation
/// time and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteState {
    Pending,
    Expired,
    Disabled,
}

/// Expiry and attempt limits applied to every invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitePolicy {
    pub ttl: Duration,
    pub max_attempts: u32,
}

impl Default for InvitePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            max_attempts: 3,
        }
    }
}

/// Where a completed invite places the user. Self-signup invites have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteTarget {
    pub service_id: String,
    pub role: RoleName,
}

/// Snapshot of a stored invite. Transitions never mutate it; they return an
/// [`InviteDelta`] that the store persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub id: String,
    pub email: String,
    pub telephone_number: Option<String>,
    pub disabled: bool,
    pub login_counter: u32,
    pub created_at: DateTime<Utc>,
    pub otp_key: String,
    pub target: Option<InviteTarget>,
    pub sender_id: Option<String>,
}

/// The persisted part of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteDelta {
    pub login_counter: u32,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpTransition {
    /// Code matched; the invite is consumed and a membership follows.
    Complete(InviteDelta),
    Retry { remaining: u32, delta: InviteDelta },
    /// Last allowed attempt failed; the invite is now disabled.
    Exhausted(InviteDelta),
}

impl OtpTransition {
    pub fn delta(&self) -> InviteDelta {
        match self {
            OtpTransition::Complete(delta) | OtpTransition::Exhausted(delta) => *delta,
            OtpTransition::Retry { delta, .. } => *delta,
        }
    }
}

impl Invite {
    pub fn is_expired(&self, now: DateTime<Utc>, policy: &InvitePolicy) -> bool {
        now - self.created_at > policy.ttl
    }

    pub fn state(&self, now: DateTime<Utc>, policy: &InvitePolicy) -> InviteState {
        if self.disabled || self.login_counter >= policy.max_attempts {
            InviteState::Disabled
        } else if self.is_expired(now, policy) {
            InviteState::Expired
        } else {
            InviteState::Pending
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>, policy: &InvitePolicy) -> bool {
        self.state(now, policy) == InviteState::Pending
    }

    /// Apply one OTP verification result.
    ///
    /// Unusable invites are rejected with their state and the counter is
    /// left alone, so a disabled invite's counter is frozen.
    pub fn attempt_otp(
        &self,
        code_matches: bool,
        now: DateTime<Utc>,
        policy: &InvitePolicy,
    ) -> Result<OtpTransition, InviteState> {
        let state = self.state(now, policy);
        if state != InviteState::Pending {
            return Err(state);
        }

        if code_matches {
            return Ok(OtpTransition::Complete(InviteDelta {
                login_counter: self.login_counter,
                disabled: true,
            }));
        }

        let login_counter = self.login_counter + 1;
        if login_counter >= policy.max_attempts {
            Ok(OtpTransition::Exhausted(InviteDelta {
                login_counter,
                disabled: true,
            }))
        } else {
            Ok(OtpTransition::Retry {
                remaining: policy.max_attempts - login_counter,
                delta: InviteDelta {
                    login_counter,
                    disabled: false,
                },
            })
        }
    }

    /// Consume the invite without an OTP check.
    pub fn complete(
        &self,
        now: DateTime<Utc>,
        policy: &InvitePolicy,
    ) -> Result<InviteDelta, InviteState> {
        match self.state(now, policy) {
            InviteState::Pending => Ok(InviteDelta {
                login_counter: self.login_counter,
                disabled: true,
            }),
            other => Err(other),
        }
    }

    pub fn view(&self, invite_link: Option<String>) -> InviteView {
        InviteView {
            email: self.email.clone(),
            telephone_number: self.telephone_number.clone(),
            disabled: self.disabled,
            login_counter: self.login_counter,
            invite_type: if self.target.is_some() {
                "service"
            } else {
                "user"
            },
            role: self.target.as_ref().map(|t| t.role),
            invite_link,
        }
    }
}

/// Public representation. The OTP key and code hash never leave the store.
#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone_number: Option<String>,
    pub disabled: bool,
    pub login_counter: u32,
    #[serde(rename = "type")]
    pub invite_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateServiceInvite {
    pub email: String,
    pub role_name: String,
    pub service_id: String,
    pub sender_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSelfSignupInvite {
    pub email: String,
    pub telephone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateOtp {
    pub code: String,
    pub telephone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateOtp {
    pub code: String,
    pub otp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn invite() -> Invite {
        Invite {
            id: "1".to_string(),
            email: "invitee@example.com".to_string(),
            telephone_number: None,
            disabled: false,
            login_counter: 0,
            created_at: created_at(),
            otp_key: "KEY".to_string(),
            target: Some(InviteTarget {
                service_id: "svc".to_string(),
                role: RoleName::ViewOnly,
            }),
            sender_id: None,
        }
    }

    fn apply(invite: &Invite, delta: InviteDelta) -> Invite {
        Invite {
            login_counter: delta.login_counter,
            disabled: delta.disabled,
            ..invite.clone()
        }
    }

    #[test]
    fn test_usable_just_before_ttl() {
        let policy = InvitePolicy::default();
        let now = created_at() + Duration::hours(23) + Duration::minutes(59);
        assert!(invite().is_usable(now, &policy));
    }

    #[test]
    fn test_usable_exactly_at_ttl() {
        let policy = InvitePolicy::default();
        assert!(invite().is_usable(created_at() + Duration::hours(24), &policy));
    }

    #[test]
    fn test_expired_one_second_after_ttl() {
        let policy = InvitePolicy::default();
        let now = created_at() + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(invite().state(now, &policy), InviteState::Expired);
        assert!(!invite().is_usable(now, &policy));
    }

    #[test]
    fn test_disabled_wins_over_expired() {
        let policy = InvitePolicy::default();
        let disabled = Invite {
            disabled: true,
            ..invite()
        };
        let now = created_at() + Duration::days(7);
        assert_eq!(disabled.state(now, &policy), InviteState::Disabled);
    }

    #[test]
    fn test_three_wrong_codes_disable_the_invite() {
        let policy = InvitePolicy::default();
        let now = created_at() + Duration::minutes(5);
        let mut current = invite();

        let first = current.attempt_otp(false, now, &policy).unwrap();
        assert!(matches!(first, OtpTransition::Retry { remaining: 2, .. }));
        current = apply(&current, first.delta());

        let second = current.attempt_otp(false, now, &policy).unwrap();
        assert!(matches!(second, OtpTransition::Retry { remaining: 1, .. }));
        current = apply(&current, second.delta());

        let third = current.attempt_otp(false, now, &policy).unwrap();
        assert_eq!(
            third,
            OtpTransition::Exhausted(InviteDelta {
                login_counter: 3,
                disabled: true
            })
        );
        current = apply(&current, third.delta());

        assert_eq!(
            current.attempt_otp(true, now, &policy),
            Err(InviteState::Disabled)
        );
        assert_eq!(current.login_counter, 3);
    }

    #[test]
    fn test_matching_code_completes() {
        let policy = InvitePolicy::default();
        let now = created_at() + Duration::minutes(1);
        let with_failure = Invite {
            login_counter: 1,
            ..invite()
        };
        assert_eq!(
            with_failure.attempt_otp(true, now, &policy),
            Ok(OtpTransition::Complete(InviteDelta {
                login_counter: 1,
                disabled: true
            }))
        );
    }

    #[test]
    fn test_expired_invite_rejects_without_counting() {
        let policy = InvitePolicy::default();
        let now = created_at() + Duration::days(2);
        assert_eq!(
            invite().attempt_otp(false, now, &policy),
            Err(InviteState::Expired)
        );
    }

    #[test]
    fn test_complete_is_one_way() {
        let policy = InvitePolicy::default();
        let now = created_at();
        let delta = invite().complete(now, &policy).unwrap();
        assert!(delta.disabled);
        let completed = apply(&invite(), delta);
        assert_eq!(completed.complete(now, &policy), Err(InviteState::Disabled));
    }

    #[test]
    fn test_custom_policy() {
        let policy = InvitePolicy {
            ttl: Duration::hours(1),
            max_attempts: 1,
        };
        let now = created_at() + Duration::minutes(30);
        assert!(matches!(
            invite().attempt_otp(false, now, &policy),
            Ok(OtpTransition::Exhausted(_))
        ));
        assert_eq!(
            invite().state(created_at() + Duration::minutes(61), &policy),
            InviteState::Expired
        );
    }

    #[test]
    fn test_view_hides_secrets() {
        let view = invite().view(Some("https://example.com/invites/abc".to_string()));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "service");
        assert_eq!(json["role"], "view-only");
        assert!(json.get("otp_key").is_none());
        assert!(json.get("telephone_number").is_none());
    }
}
