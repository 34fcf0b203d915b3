//! Scoped repository gate.
//!
//! [`ScopedRepository`] is the single place where institution scoping is
//! applied to tenant-owned entities. Stores implement [`ScopedStore`]
//! per entity kind for list/detail reads. Kinds whose rows may be freely
//! created, edited and removed also implement [`ScopedWriteStore`];
//! meal benefits and meal registrations do not, since their writes must
//! go through the cafeteria services.
//!
//! Ownership checks are pushed into the store's conditional mutations
//! (`update_owned`/`delete_owned`), so the check and the write happen in
//! the same statement.

use tracing::warn;
use uuid::Uuid;

use crate::error::{ColegioError, ColegioResult};
use crate::repository::{PaginatedResult, Pagination};
use crate::tenant::TenantContext;

/// An entity owned by exactly one institution.
pub trait InstitutionOwned {
    fn institution_id(&self) -> Uuid;
}

/// A create payload that may or may not carry its institution yet.
pub trait InstitutionStamp {
    fn institution_id(&self) -> Option<Uuid>;
    fn stamp(&mut self, institution_id: Uuid);
}

/// Read access to one tenant-owned entity kind.
///
/// An `institution_id` of `None` in the filter arguments means "any
/// institution" and is only passed for the global context.
pub trait ScopedStore: Send + Sync {
    type Entity: InstitutionOwned + Send;

    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// List rows in the store's default ordering.
    fn list(
        &self,
        institution_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = ColegioResult<PaginatedResult<Self::Entity>>> + Send;

    /// Unscoped lookup by id.
    fn lookup(&self, id: Uuid) -> impl Future<Output = ColegioResult<Option<Self::Entity>>> + Send;
}

/// Direct writes for entity kinds without service-level invariants.
pub trait ScopedWriteStore: ScopedStore {
    type Create: InstitutionStamp + Send;
    type Update: Send;

    /// Insert a stamped payload.
    fn insert(&self, input: Self::Create) -> impl Future<Output = ColegioResult<Self::Entity>> + Send;

    /// Apply `input` only when the row belongs to `institution_id`.
    /// Returns `None` when no row matched.
    fn update_owned(
        &self,
        institution_id: Option<Uuid>,
        id: Uuid,
        input: Self::Update,
    ) -> impl Future<Output = ColegioResult<Option<Self::Entity>>> + Send;

    /// Delete only when the row belongs to `institution_id`. Returns
    /// whether a row was removed.
    fn delete_owned(
        &self,
        institution_id: Option<Uuid>,
        id: Uuid,
    ) -> impl Future<Output = ColegioResult<bool>> + Send;
}

/// Institution-scoped access to a [`ScopedStore`].
#[derive(Clone)]
pub struct ScopedRepository<S: ScopedStore> {
    store: S,
}

impl<S: ScopedStore> ScopedRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rows of the context's institution, or every row for the global
    /// context. Order is the store's default.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        pagination: Pagination,
    ) -> ColegioResult<PaginatedResult<S::Entity>> {
        let filter = ctx.filter()?;
        self.store.list(filter, pagination).await
    }

    /// Rows outside the context's institution are reported as missing.
    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> ColegioResult<S::Entity> {
        let filter = ctx.filter()?;
        match self.store.lookup(id).await? {
            Some(entity) if filter.is_none_or(|inst| entity.institution_id() == inst) => Ok(entity),
            _ => Err(ColegioError::not_found(S::ENTITY, id)),
        }
    }
}

impl<S: ScopedWriteStore> ScopedRepository<S> {

    /// Stamp the payload with the context's institution when it has none.
    pub async fn create(&self, ctx: &TenantContext, mut input: S::Create) -> ColegioResult<S::Entity> {
        match (ctx, input.institution_id()) {
            (TenantContext::Unresolved, _) => {
                return Err(ColegioError::scope(format!(
                    "cannot create {} without an active institution",
                    S::ENTITY
                )));
            }
            (TenantContext::Institution(active), None) => input.stamp(*active),
            (TenantContext::Institution(active), Some(stamped)) if stamped != *active => {
                warn!(
                    entity = S::ENTITY,
                    active = %active,
                    target = %stamped,
                    "Cross-institution create denied"
                );
                return Err(ColegioError::scope(format!(
                    "cannot create {} for another institution",
                    S::ENTITY
                )));
            }
            (TenantContext::Global, None) => {
                return Err(ColegioError::Validation {
                    message: format!("{} requires an institution", S::ENTITY),
                });
            }
            _ => {}
        }
        self.store.insert(input).await
    }

    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: S::Update,
    ) -> ColegioResult<S::Entity> {
        let filter = ctx.filter()?;
        match self.store.update_owned(filter, id, input).await? {
            Some(entity) => Ok(entity),
            None => Err(self.classify_miss(filter, id).await),
        }
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> ColegioResult<()> {
        let filter = ctx.filter()?;
        if self.store.delete_owned(filter, id).await? {
            Ok(())
        } else {
            Err(self.classify_miss(filter, id).await)
        }
    }

    /// A conditional mutation touched nothing: either the row does not
    /// exist or it belongs to another institution.
    async fn classify_miss(&self, filter: Option<Uuid>, id: Uuid) -> ColegioError {
        let Some(active) = filter else {
            return ColegioError::not_found(S::ENTITY, id);
        };
        match self.store.lookup(id).await {
            Ok(Some(entity)) => {
                warn!(
                    entity = S::ENTITY,
                    id = %id,
                    active = %active,
                    owner = %entity.institution_id(),
                    "Cross-institution mutation denied"
                );
                ColegioError::scope(format!("{} {id} belongs to another institution", S::ENTITY))
            }
            Ok(None) => ColegioError::not_found(S::ENTITY, id),
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    struct Note {
        id: Uuid,
        institution_id: Uuid,
        text: String,
    }

    impl InstitutionOwned for Note {
        fn institution_id(&self) -> Uuid {
            self.institution_id
        }
    }

    struct NewNote {
        institution_id: Option<Uuid>,
        text: String,
    }

    impl InstitutionStamp for NewNote {
        fn institution_id(&self) -> Option<Uuid> {
            self.institution_id
        }

        fn stamp(&mut self, institution_id: Uuid) {
            self.institution_id = Some(institution_id);
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Note>>,
    }

    fn owned_by(row: &Note, filter: Option<Uuid>) -> bool {
        filter.is_none_or(|inst| row.institution_id == inst)
    }

    impl ScopedStore for MemoryStore {
        type Entity = Note;

        const ENTITY: &'static str = "note";

        async fn list(
            &self,
            institution_id: Option<Uuid>,
            pagination: Pagination,
        ) -> ColegioResult<PaginatedResult<Note>> {
            let rows = self.rows.lock().unwrap();
            let matching: Vec<Note> = rows
                .iter()
                .filter(|r| owned_by(r, institution_id))
                .cloned()
                .collect();
            Ok(PaginatedResult {
                total: matching.len() as u64,
                items: matching,
                offset: pagination.offset,
                limit: pagination.limit,
            })
        }

        async fn lookup(&self, id: Uuid) -> ColegioResult<Option<Note>> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }
    }

    impl ScopedWriteStore for MemoryStore {
        type Create = NewNote;
        type Update = String;

        async fn insert(&self, input: NewNote) -> ColegioResult<Note> {
            let note = Note {
                id: Uuid::new_v4(),
                institution_id: input.institution_id.unwrap(),
                text: input.text,
            };
            self.rows.lock().unwrap().push(note.clone());
            Ok(note)
        }

        async fn update_owned(
            &self,
            institution_id: Option<Uuid>,
            id: Uuid,
            input: String,
        ) -> ColegioResult<Option<Note>> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows
                .iter_mut()
                .find(|r| r.id == id && owned_by(r, institution_id))
                .map(|r| {
                    r.text = input;
                    r.clone()
                }))
        }

        async fn delete_owned(&self, institution_id: Option<Uuid>, id: Uuid) -> ColegioResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| !(r.id == id && owned_by(r, institution_id)));
            Ok(rows.len() != before)
        }
    }

    fn new_note(institution_id: Option<Uuid>, text: &str) -> NewNote {
        NewNote {
            institution_id,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn create_stamps_active_institution() {
        let repo = ScopedRepository::new(MemoryStore::default());
        let a = Uuid::new_v4();
        let note = repo
            .create(&TenantContext::Institution(a), new_note(None, "x"))
            .await
            .unwrap();
        assert_eq!(note.institution_id, a);
    }

    #[tokio::test]
    async fn create_rejects_unresolved_and_foreign_stamps() {
        let repo = ScopedRepository::new(MemoryStore::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let unresolved = repo
            .create(&TenantContext::Unresolved, new_note(None, "x"))
            .await;
        assert!(matches!(unresolved, Err(ColegioError::ScopeViolation { .. })));

        let foreign = repo
            .create(&TenantContext::Institution(a), new_note(Some(b), "x"))
            .await;
        assert!(matches!(foreign, Err(ColegioError::ScopeViolation { .. })));

        let global = repo
            .create(&TenantContext::Global, new_note(Some(b), "x"))
            .await
            .unwrap();
        assert_eq!(global.institution_id, b);
    }

    #[tokio::test]
    async fn list_filters_by_institution_except_global() {
        let repo = ScopedRepository::new(MemoryStore::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for (inst, n) in [(a, 3), (b, 2)] {
            for i in 0..n {
                repo.create(&TenantContext::Global, new_note(Some(inst), &i.to_string()))
                    .await
                    .unwrap();
            }
        }

        let only_a = repo
            .list(&TenantContext::Institution(a), Pagination::default())
            .await
            .unwrap();
        assert_eq!(only_a.items.len(), 3);
        assert!(only_a.items.iter().all(|n| n.institution_id == a));

        let all = repo
            .list(&TenantContext::Global, Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.total, 5);

        let denied = repo
            .list(&TenantContext::Unresolved, Pagination::default())
            .await;
        assert!(denied.is_err());
    }

    #[tokio::test]
    async fn foreign_rows_are_hidden_and_immutable() {
        let repo = ScopedRepository::new(MemoryStore::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let owned_by_b = repo
            .create(&TenantContext::Institution(b), new_note(None, "b"))
            .await
            .unwrap();
        let ctx_a = TenantContext::Institution(a);

        assert!(matches!(
            repo.get(&ctx_a, owned_by_b.id).await,
            Err(ColegioError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update(&ctx_a, owned_by_b.id, "hijack".into()).await,
            Err(ColegioError::ScopeViolation { .. })
        ));
        assert!(matches!(
            repo.delete(&ctx_a, owned_by_b.id).await,
            Err(ColegioError::ScopeViolation { .. })
        ));

        let fetched = repo.get(&TenantContext::Global, owned_by_b.id).await.unwrap();
        assert_eq!(fetched.text, "b");
    }

    #[tokio::test]
    async fn global_context_never_raises_scope_violation() {
        let repo = ScopedRepository::new(MemoryStore::default());
        let b = Uuid::new_v4();
        let note = repo
            .create(&TenantContext::Institution(b), new_note(None, "b"))
            .await
            .unwrap();

        let updated = repo
            .update(&TenantContext::Global, note.id, "edited".into())
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
        repo.delete(&TenantContext::Global, note.id).await.unwrap();

        assert!(matches!(
            repo.delete(&TenantContext::Global, note.id).await,
            Err(ColegioError::NotFound { .. })
        ));
    }
}
