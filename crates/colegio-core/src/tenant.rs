//! Tenant context resolution.
//!
//! Every scoped operation receives an explicit [`TenantContext`] value.
//! The context is derived from the authenticated actor, the institution
//! stored in their session and their memberships; there is no ambient
//! "current institution".

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ColegioError, ColegioResult};
use crate::models::institution::Institution;
use crate::repository::{InstitutionRepository, MembershipRepository};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    /// Global administrators bypass institution scoping entirely.
    pub is_superuser: bool,
}

impl Actor {
    pub fn staff(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_superuser: false,
        }
    }

    pub fn superuser(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_superuser: true,
        }
    }
}

/// The institution an operation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantContext {
    /// Global administrator: no institution filter applies.
    Global,
    /// A concrete active institution.
    Institution(Uuid),
    /// No institution could be determined. Scoped operations are denied.
    Unresolved,
}

impl TenantContext {
    pub fn institution_id(&self) -> Option<Uuid> {
        match self {
            Self::Institution(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Row filter for scoped reads: `Some(id)` restricts to one
    /// institution, `None` means no restriction.
    pub fn filter(&self) -> ColegioResult<Option<Uuid>> {
        match self {
            Self::Global => Ok(None),
            Self::Institution(id) => Ok(Some(*id)),
            Self::Unresolved => Err(ColegioError::scope("no active institution")),
        }
    }

    /// Check that this context may act on data owned by `institution_id`.
    pub fn authorize(&self, institution_id: Uuid) -> ColegioResult<()> {
        match self {
            Self::Global => Ok(()),
            Self::Institution(active) if *active == institution_id => Ok(()),
            Self::Institution(active) => {
                warn!(
                    active = %active,
                    target = %institution_id,
                    "Cross-institution access denied"
                );
                Err(ColegioError::scope(format!(
                    "institution {institution_id} is outside the active institution"
                )))
            }
            Self::Unresolved => Err(ColegioError::scope("no active institution")),
        }
    }
}

/// Result of resolving a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub context: TenantContext,
    /// The institution was chosen from the actor's single membership
    /// rather than from the session; callers may persist it.
    pub auto_selected: bool,
    /// The session pointed at an institution that is no longer usable
    /// and should be cleared.
    pub stale_session: bool,
}

impl Resolution {
    fn new(context: TenantContext) -> Self {
        Self {
            context,
            auto_selected: false,
            stale_session: false,
        }
    }
}

/// Resolve the active institution.
///
/// `member_of` holds the institutions the actor has a membership in.
/// Precedence: global administrator, then the session's institution
/// when the actor belongs to it and its license is current, then the
/// actor's only membership when that institution is active.
pub fn resolve_context(
    actor: &Actor,
    session_institution: Option<Uuid>,
    member_of: &[Institution],
    today: NaiveDate,
) -> Resolution {
    if actor.is_superuser {
        return Resolution::new(TenantContext::Global);
    }

    let mut stale_session = false;
    if let Some(selected) = session_institution {
        match member_of.iter().find(|inst| inst.id == selected) {
            Some(inst) if inst.is_active(today) => {
                return Resolution::new(TenantContext::Institution(inst.id));
            }
            _ => stale_session = true,
        }
    }

    if let [only] = member_of {
        if only.is_active(today) {
            return Resolution {
                context: TenantContext::Institution(only.id),
                auto_selected: true,
                stale_session,
            };
        }
    }

    Resolution {
        context: TenantContext::Unresolved,
        auto_selected: false,
        stale_session,
    }
}

/// Loads memberships and institutions, then applies [`resolve_context`].
///
/// Storage failures degrade to [`TenantContext::Unresolved`].
pub struct ContextResolver<I: InstitutionRepository, M: MembershipRepository> {
    institutions: I,
    memberships: M,
}

impl<I: InstitutionRepository, M: MembershipRepository> ContextResolver<I, M> {
    pub fn new(institutions: I, memberships: M) -> Self {
        Self {
            institutions,
            memberships,
        }
    }

    pub async fn resolve(
        &self,
        actor: &Actor,
        session_institution: Option<Uuid>,
        today: NaiveDate,
    ) -> Resolution {
        if actor.is_superuser {
            return Resolution::new(TenantContext::Global);
        }

        let member_of = match self.load_member_institutions(actor.user_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!(user_id = %actor.user_id, error = %e, "Failed to load memberships");
                return Resolution {
                    context: TenantContext::Unresolved,
                    auto_selected: false,
                    stale_session: false,
                };
            }
        };

        let resolution = resolve_context(actor, session_institution, &member_of, today);
        debug!(
            user_id = %actor.user_id,
            context = ?resolution.context,
            auto_selected = resolution.auto_selected,
            "Resolved tenant context"
        );
        resolution
    }

    async fn load_member_institutions(&self, user_id: Uuid) -> ColegioResult<Vec<Institution>> {
        let memberships = self.memberships.list_by_user(user_id).await?;
        let mut institutions = Vec::with_capacity(memberships.len());
        for membership in memberships {
            match self.institutions.get_by_id(membership.institution_id).await {
                Ok(inst) => institutions.push(inst),
                Err(ColegioError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(institutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::institution::InstitutionKind;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn institution(license_end: NaiveDate) -> Institution {
        Institution {
            id: Uuid::new_v4(),
            name: "CTP".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            phone: String::new(),
            address: String::new(),
            kind: InstitutionKind::Technical,
            license_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            license_end,
            created_at: Utc::now(),
        }
    }

    fn valid() -> Institution {
        institution(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    fn expired() -> Institution {
        institution(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    #[test]
    fn superuser_resolves_to_global() {
        let actor = Actor::superuser(Uuid::new_v4());
        let r = resolve_context(&actor, Some(Uuid::new_v4()), &[], today());
        assert_eq!(r.context, TenantContext::Global);
        assert!(r.context.filter().unwrap().is_none());
    }

    #[test]
    fn session_institution_wins_when_member_and_active() {
        let a = valid();
        let b = valid();
        let actor = Actor::staff(Uuid::new_v4());
        let r = resolve_context(&actor, Some(b.id), &[a, b.clone()], today());
        assert_eq!(r.context, TenantContext::Institution(b.id));
        assert!(!r.auto_selected);
        assert!(!r.stale_session);
    }

    #[test]
    fn single_membership_is_auto_selected() {
        let a = valid();
        let actor = Actor::staff(Uuid::new_v4());
        let r = resolve_context(&actor, None, std::slice::from_ref(&a), today());
        assert_eq!(r.context, TenantContext::Institution(a.id));
        assert!(r.auto_selected);
    }

    #[test]
    fn expired_session_institution_is_flagged_stale() {
        let a = expired();
        let actor = Actor::staff(Uuid::new_v4());
        let r = resolve_context(&actor, Some(a.id), std::slice::from_ref(&a), today());
        assert_eq!(r.context, TenantContext::Unresolved);
        assert!(r.stale_session);
    }

    #[test]
    fn session_institution_without_membership_is_ignored() {
        let a = valid();
        let foreign = valid();
        let actor = Actor::staff(Uuid::new_v4());
        let r = resolve_context(&actor, Some(foreign.id), std::slice::from_ref(&a), today());
        assert_eq!(r.context, TenantContext::Institution(a.id));
        assert!(r.stale_session);
        assert!(r.auto_selected);
    }

    #[test]
    fn several_memberships_without_selection_stay_unresolved() {
        let actor = Actor::staff(Uuid::new_v4());
        let r = resolve_context(&actor, None, &[valid(), valid()], today());
        assert_eq!(r.context, TenantContext::Unresolved);
        assert!(r.context.filter().is_err());
    }

    #[test]
    fn authorize_rules() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(TenantContext::Global.authorize(a).is_ok());
        assert!(TenantContext::Institution(a).authorize(a).is_ok());
        assert!(matches!(
            TenantContext::Institution(a).authorize(b),
            Err(ColegioError::ScopeViolation { .. })
        ));
        assert!(matches!(
            TenantContext::Unresolved.authorize(a),
            Err(ColegioError::ScopeViolation { .. })
        ));
    }
}
