//! Zones, sub-zones, products, equipment and methods, and the links from
//! catalog tasks to them.
//!
//! Tasks keep their zone as a name so that library plans work without any
//! reference data. Linking a task to a zone from the reference table records
//! the zone id next to that name, and zone lookups match both: tasks linked
//! to the zone and unlinked tasks carrying its name.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_reference::{CleaningReference, ReferenceKind};
use crate::domain::models::cleaning_task::CleaningTask;
use crate::domain::ports::{CleaningReferenceRepository, CleaningTaskRepository, ReferenceQuery, TaskQuery};

/// Requested link changes, by reference name. `None` leaves a link as it
/// is, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct LinkRequest {
    pub zone: Option<Option<String>>,
    pub sub_zone: Option<Option<String>>,
    pub product: Option<Option<String>>,
    pub equipment: Option<Option<String>>,
    pub method: Option<Option<String>>,
}

impl LinkRequest {
    pub fn is_empty(&self) -> bool {
        self.zone.is_none()
            && self.sub_zone.is_none()
            && self.product.is_none()
            && self.equipment.is_none()
            && self.method.is_none()
    }
}

pub struct ReferenceCatalog<F: CleaningReferenceRepository, T: CleaningTaskRepository> {
    references: Arc<F>,
    tasks: Arc<T>,
    organization_id: Option<Uuid>,
}

impl<F: CleaningReferenceRepository, T: CleaningTaskRepository> ReferenceCatalog<F, T> {
    pub fn new(references: Arc<F>, tasks: Arc<T>) -> Self {
        Self {
            references,
            tasks,
            organization_id: None,
        }
    }

    pub fn with_organization(mut self, organization_id: Option<Uuid>) -> Self {
        self.organization_id = organization_id;
        self
    }

    /// Validate and store a reference. Names are unique per kind, and per
    /// zone for sub-zones, ignoring case.
    #[instrument(skip(self, reference), fields(kind = %reference.kind, name = %reference.name))]
    pub async fn create_reference(&self, mut reference: CleaningReference) -> DomainResult<CleaningReference> {
        reference.name = reference.name.trim().to_string();
        reference.steps = reference.steps.iter().map(|s| s.trim().to_string()).collect();
        if reference.organization_id.is_none() {
            reference.organization_id = self.organization_id;
        }
        reference.validate()?;

        if let Some(parent_id) = reference.parent_id {
            let parent = self.get_reference(parent_id).await?;
            if parent.kind != ReferenceKind::Zone {
                return Err(DomainError::ValidationFailed(format!(
                    "'{}' is a {}, not a zone",
                    parent.name, parent.kind
                )));
            }
        }

        if self
            .lookup(reference.kind, &reference.name, reference.parent_id)
            .await?
            .is_some()
        {
            return Err(DomainError::ValidationFailed(format!(
                "{} '{}' already exists",
                reference.kind, reference.name
            )));
        }

        self.references.create(&reference).await?;
        info!(reference_id = %reference.id, "created cleaning reference");
        Ok(reference)
    }

    pub async fn get_reference(&self, id: Uuid) -> DomainResult<CleaningReference> {
        self.references.get(id).await?.ok_or(DomainError::ReferenceNotFound(id))
    }

    pub async fn list_references(
        &self,
        kind: Option<ReferenceKind>,
        active_only: bool,
    ) -> DomainResult<Vec<CleaningReference>> {
        self.references
            .list(ReferenceQuery {
                organization_id: self.organization_id,
                kind,
                parent_id: None,
                active_only,
            })
            .await
            .map_err(|e| DomainError::fetch_failed("cleaning references", &e))
    }

    pub async fn sub_zones(&self, zone_id: Uuid) -> DomainResult<Vec<CleaningReference>> {
        self.references
            .list(ReferenceQuery {
                organization_id: self.organization_id,
                kind: Some(ReferenceKind::SubZone),
                parent_id: Some(zone_id),
                active_only: false,
            })
            .await
            .map_err(|e| DomainError::fetch_failed("sub-zones", &e))
    }

    /// Inactive references stay linked where they are but can no longer be
    /// linked to a task.
    pub async fn set_active(&self, id: Uuid, active: bool) -> DomainResult<CleaningReference> {
        let mut reference = self.get_reference(id).await?;
        if reference.is_active != active {
            reference.is_active = active;
            self.references.update(&reference).await?;
            info!(reference_id = %id, active, "changed reference status");
        }
        Ok(reference)
    }

    /// Delete a reference no task links to. Deleting a zone deletes its
    /// sub-zones.
    #[instrument(skip(self))]
    pub async fn delete_reference(&self, id: Uuid) -> DomainResult<CleaningReference> {
        let reference = self.get_reference(id).await?;
        let linked = self.references.count_linked_tasks(id).await?;
        if linked > 0 {
            warn!(reference_id = %id, tasks = linked, "refusing to delete linked reference");
            return Err(DomainError::ValidationFailed(format!(
                "{} '{}' is linked to {linked} task(s); deactivate it instead",
                reference.kind, reference.name
            )));
        }

        self.references.delete(id).await?;
        info!(reference_id = %id, kind = %reference.kind, "deleted cleaning reference");
        Ok(reference)
    }

    /// Find a reference by name, ignoring case and surrounding blanks.
    pub async fn lookup(
        &self,
        kind: ReferenceKind,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> DomainResult<Option<CleaningReference>> {
        let candidates = self
            .references
            .list(ReferenceQuery {
                organization_id: self.organization_id,
                kind: Some(kind),
                parent_id,
                active_only: false,
            })
            .await?;
        Ok(candidates.into_iter().find(|r| r.matches_name(name)))
    }

    async fn linkable(&self, kind: ReferenceKind, name: &str, parent_id: Option<Uuid>) -> DomainResult<Uuid> {
        match self.lookup(kind, name, parent_id).await? {
            Some(reference) if reference.is_active => Ok(reference.id),
            Some(reference) => Err(DomainError::ValidationFailed(format!(
                "{} '{}' is inactive",
                kind, reference.name
            ))),
            None => Err(DomainError::ValidationFailed(format!("unknown {kind} '{}'", name.trim()))),
        }
    }

    /// Apply `request` to the zone and links of `task`.
    ///
    /// A zone name without a matching reference is kept as plain text. A
    /// sub-zone is looked up inside the task's linked zone, and is dropped
    /// when the zone changes to one it does not belong to.
    pub async fn link_task(&self, task: &mut CleaningTask, request: LinkRequest) -> DomainResult<()> {
        if let Some(zone) = request.zone {
            let zone = zone.map(|z| z.trim().to_string()).filter(|z| !z.is_empty());
            let linked = match &zone {
                Some(name) => self.lookup(ReferenceKind::Zone, name, None).await?,
                None => None,
            };
            match linked {
                Some(reference) if !reference.is_active => {
                    return Err(DomainError::ValidationFailed(format!(
                        "zone '{}' is inactive",
                        reference.name
                    )));
                }
                Some(reference) => {
                    task.zone = Some(reference.name);
                    task.references.zone_id = Some(reference.id);
                }
                None => {
                    task.zone = zone;
                    task.references.zone_id = None;
                }
            }

            if let Some(sub_zone_id) = task.references.sub_zone_id {
                let parent = self.references.get(sub_zone_id).await?.and_then(|s| s.parent_id);
                if parent != task.references.zone_id {
                    debug!(task_id = %task.id, "dropping sub-zone outside the new zone");
                    task.references.sub_zone_id = None;
                }
            }
        }

        if let Some(sub_zone) = request.sub_zone {
            task.references.sub_zone_id = match sub_zone {
                Some(name) => {
                    let Some(zone_id) = task.references.zone_id else {
                        return Err(DomainError::ValidationFailed(
                            "a sub-zone needs a zone from the reference table".to_string(),
                        ));
                    };
                    Some(self.linkable(ReferenceKind::SubZone, &name, Some(zone_id)).await?)
                }
                None => None,
            };
        }

        for (kind, name) in [
            (ReferenceKind::Product, request.product),
            (ReferenceKind::Equipment, request.equipment),
            (ReferenceKind::Method, request.method),
        ] {
            if let Some(name) = name {
                let id = match name {
                    Some(name) => Some(self.linkable(kind, &name, None).await?),
                    None => None,
                };
                task.references.set(kind, id);
            }
        }

        Ok(())
    }

    /// Tasks of a zone, optionally narrowed to one of its sub-zones.
    ///
    /// A zone known to the reference table matches linked tasks and unlinked
    /// tasks carrying its name; any other name matches the task zone text.
    pub async fn zone_tasks(
        &self,
        zone: &str,
        sub_zone: Option<&str>,
        active_only: bool,
    ) -> DomainResult<Vec<CleaningTask>> {
        let mut query = TaskQuery {
            organization_id: self.organization_id,
            active_only,
            zone: Some(zone.trim().to_string()),
            ..TaskQuery::default()
        };

        match self.lookup(ReferenceKind::Zone, zone, None).await? {
            Some(reference) => {
                if let Some(name) = sub_zone {
                    let sub = self
                        .lookup(ReferenceKind::SubZone, name, Some(reference.id))
                        .await?
                        .ok_or_else(|| {
                            DomainError::ValidationFailed(format!(
                                "unknown sub_zone '{}' in zone '{}'",
                                name.trim(),
                                reference.name
                            ))
                        })?;
                    query.sub_zone_id = Some(sub.id);
                }
                query.zone = Some(reference.name);
                query.zone_id = Some(reference.id);
            }
            None if sub_zone.is_some() => {
                return Err(DomainError::ValidationFailed(format!(
                    "unknown zone '{}'",
                    zone.trim()
                )));
            }
            None => {}
        }

        self.tasks
            .list(query)
            .await
            .map_err(|e| DomainError::fetch_failed("cleaning tasks", &e))
    }

    /// References linked to `task`, zone first. Links to deleted references
    /// are skipped.
    pub async fn links_of(&self, task: &CleaningTask) -> DomainResult<Vec<CleaningReference>> {
        let mut links = Vec::new();
        for id in task.references.ids() {
            if let Some(reference) = self.references.get(id).await? {
                links.push(reference);
            }
        }
        Ok(links)
    }
}
