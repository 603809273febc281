//! Reference data the catalog points at.
//!
//! Zones (with their sub-zones), cleaning products, equipment and methods
//! are kept in one table keyed by [`ReferenceKind`]. A task may link to one
//! reference of each kind through [`TaskReferences`]; the free-text zone of
//! a task stays the zone name so library plans keep working without
//! reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_record::stored_precision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Zone,
    SubZone,
    Product,
    Equipment,
    Method,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 5] = [
        Self::Zone,
        Self::SubZone,
        Self::Product,
        Self::Equipment,
        Self::Method,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::SubZone => "sub_zone",
            Self::Product => "product",
            Self::Equipment => "equipment",
            Self::Method => "method",
        }
    }

    /// Parse a kind name; French names of the admin screens are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "zone" | "zones" => Some(Self::Zone),
            "sub_zone" | "subzone" | "sous_zone" => Some(Self::SubZone),
            "product" | "produit" => Some(Self::Product),
            "equipment" | "equipement" | "équipement" => Some(Self::Equipment),
            "method" | "methode" | "méthode" => Some(Self::Method),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Zone => "Zone",
            Self::SubZone => "Sous-zone",
            Self::Product => "Produit",
            Self::Equipment => "Équipement",
            Self::Method => "Méthode",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zone, sub-zone, product, piece of equipment or cleaning method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReference {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub kind: ReferenceKind,
    /// Owning zone of a sub-zone; `None` for every other kind.
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Product or equipment type.
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Ordered steps of a method.
    pub steps: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CleaningReference {
    pub fn new(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: None,
            kind,
            parent_id: None,
            name: name.into(),
            description: None,
            category: None,
            brand: None,
            steps: Vec::new(),
            is_active: true,
            created_at: stored_precision(Utc::now()),
        }
    }

    /// A sub-zone of `zone`.
    pub fn sub_zone(zone: &CleaningReference, name: impl Into<String>) -> Self {
        let mut sub = Self::new(ReferenceKind::SubZone, name);
        sub.parent_id = Some(zone.id);
        sub.organization_id = zone.organization_id;
        sub
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "{} name is required",
                self.kind
            )));
        }
        match (self.kind, self.parent_id) {
            (ReferenceKind::SubZone, None) => {
                return Err(DomainError::ValidationFailed(
                    "a sub-zone belongs to a zone".to_string(),
                ))
            }
            (ReferenceKind::SubZone, Some(_)) | (_, None) => {}
            (kind, Some(_)) => {
                return Err(DomainError::ValidationFailed(format!(
                    "a {kind} cannot have a parent"
                )))
            }
        }
        if self.kind != ReferenceKind::Method && !self.steps.is_empty() {
            return Err(DomainError::ValidationFailed(
                "only methods have steps".to_string(),
            ));
        }
        if self.steps.iter().any(|s| s.trim().is_empty()) {
            return Err(DomainError::ValidationFailed(
                "method steps cannot be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// References a task links to, one per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReferences {
    pub zone_id: Option<Uuid>,
    pub sub_zone_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub method_id: Option<Uuid>,
}

impl TaskReferences {
    pub fn is_empty(&self) -> bool {
        self.ids().next().is_none()
    }

    /// Linked ids, zone first.
    pub fn ids(&self) -> impl Iterator<Item = Uuid> {
        [
            self.zone_id,
            self.sub_zone_id,
            self.product_id,
            self.equipment_id,
            self.method_id,
        ]
        .into_iter()
        .flatten()
    }

    pub fn get(&self, kind: ReferenceKind) -> Option<Uuid> {
        match kind {
            ReferenceKind::Zone => self.zone_id,
            ReferenceKind::SubZone => self.sub_zone_id,
            ReferenceKind::Product => self.product_id,
            ReferenceKind::Equipment => self.equipment_id,
            ReferenceKind::Method => self.method_id,
        }
    }

    pub fn set(&mut self, kind: ReferenceKind, id: Option<Uuid>) {
        let slot = match kind {
            ReferenceKind::Zone => &mut self.zone_id,
            ReferenceKind::SubZone => &mut self.sub_zone_id,
            ReferenceKind::Product => &mut self.product_id,
            ReferenceKind::Equipment => &mut self.equipment_id,
            ReferenceKind::Method => &mut self.method_id,
        };
        *slot = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        for kind in ReferenceKind::ALL {
            assert_eq!(ReferenceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ReferenceKind::parse("sous-zone"), Some(ReferenceKind::SubZone));
        assert_eq!(ReferenceKind::parse("Produit"), Some(ReferenceKind::Product));
        assert_eq!(ReferenceKind::parse("supplier"), None);
    }

    #[test]
    fn test_sub_zone_needs_zone_parent() {
        let zone = CleaningReference::new(ReferenceKind::Zone, "CUISINE");
        assert!(zone.validate().is_ok());

        let sub = CleaningReference::sub_zone(&zone, "Plonge");
        assert_eq!(sub.parent_id, Some(zone.id));
        assert!(sub.validate().is_ok());

        let orphan = CleaningReference::new(ReferenceKind::SubZone, "Plonge");
        assert!(matches!(orphan.validate(), Err(DomainError::ValidationFailed(_))));

        let mut product = CleaningReference::new(ReferenceKind::Product, "Dégraissant");
        product.parent_id = Some(zone.id);
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_steps_belong_to_methods() {
        let method = CleaningReference::new(ReferenceKind::Method, "Nettoyage en 4 temps")
            .with_steps(["Pré-nettoyer", "Laver", "Rincer", "Désinfecter"]);
        assert!(method.validate().is_ok());

        let blank = CleaningReference::new(ReferenceKind::Method, "M").with_steps(["Laver", " "]);
        assert!(blank.validate().is_err());

        let product = CleaningReference::new(ReferenceKind::Product, "P").with_steps(["Laver"]);
        assert!(product.validate().is_err());
        assert!(CleaningReference::new(ReferenceKind::Equipment, " ").validate().is_err());
    }

    #[test]
    fn test_task_references_slots() {
        let mut refs = TaskReferences::default();
        assert!(refs.is_empty());

        let zone = Uuid::new_v4();
        let method = Uuid::new_v4();
        refs.set(ReferenceKind::Method, Some(method));
        refs.set(ReferenceKind::Zone, Some(zone));
        assert_eq!(refs.get(ReferenceKind::Zone), Some(zone));
        assert_eq!(refs.ids().collect::<Vec<_>>(), vec![zone, method]);

        refs.set(ReferenceKind::Zone, None);
        assert_eq!(refs.ids().count(), 1);
    }
}
