//! Repository port for zones, products, equipment and methods.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::cleaning_reference::{CleaningReference, ReferenceKind};

#[derive(Debug, Default, Clone)]
pub struct ReferenceQuery {
    pub organization_id: Option<Uuid>,
    pub kind: Option<ReferenceKind>,
    pub parent_id: Option<Uuid>,
    pub active_only: bool,
}

#[async_trait]
pub trait CleaningReferenceRepository: Send + Sync {
    async fn create(&self, reference: &CleaningReference) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningReference>>;

    /// Overwrite name, details and active flag. Kind and parent are fixed.
    async fn update(&self, reference: &CleaningReference) -> DomainResult<()>;

    /// Delete a reference; the sub-zones of a zone go with it.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List references, ordered by kind then name.
    async fn list(&self, query: ReferenceQuery) -> DomainResult<Vec<CleaningReference>>;

    /// Number of tasks linked to the reference or, for a zone, to one of
    /// its sub-zones.
    async fn count_linked_tasks(&self, id: Uuid) -> DomainResult<u64>;
}
