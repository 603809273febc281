//! Cleaning task domain model.
//!
//! A CleaningTask is a template for a recurring cleaning duty: what to
//! clean, where, how, and how often. The frequency describes the expected
//! cadence only; occurrences are created explicitly by the occurrence
//! generator, never by the task itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_record::stored_precision;
use crate::domain::models::cleaning_reference::TaskReferences;

/// Expected cadence of a cleaning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    /// After each use of the equipment (event driven, never pre-scheduled).
    AfterUse,
    /// After each service (event driven, never pre-scheduled).
    AfterService,
    /// Every `every_days` days.
    Custom { every_days: u32 },
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AfterUse => "after_use",
            Self::AfterService => "after_service",
            Self::Custom { .. } => "custom",
        }
    }

    /// Parse a frequency from its stored name and optional day count.
    ///
    /// Accepts the French labels used by older data (`quotidien`,
    /// `hebdomadaire`, `mensuel`).
    pub fn parse(s: &str, every_days: Option<u32>) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "quotidien" | "quotidienne" => Some(Self::Daily),
            "weekly" | "hebdomadaire" => Some(Self::Weekly),
            "monthly" | "mensuel" | "mensuelle" => Some(Self::Monthly),
            "after_use" | "after_each_use" | "after-use" => Some(Self::AfterUse),
            "after_service" | "after_each_service" | "after-service" => Some(Self::AfterService),
            "custom" => every_days.map(|every_days| Self::Custom { every_days }),
            _ => None,
        }
    }

    /// Day count stored alongside `custom` frequencies.
    pub fn every_days(&self) -> Option<u32> {
        match self {
            Self::Custom { every_days } => Some(*every_days),
            _ => None,
        }
    }

    /// Whether occurrences of this frequency can be laid out on a calendar
    /// ahead of time.
    pub fn is_schedulable(&self) -> bool {
        !matches!(self, Self::AfterUse | Self::AfterService)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Daily => "Quotidien".to_string(),
            Self::Weekly => "Hebdomadaire".to_string(),
            Self::Monthly => "Mensuel".to_string(),
            Self::AfterUse => "Après chaque utilisation".to_string(),
            Self::AfterService => "Après chaque service".to_string(),
            Self::Custom { every_days } => format!("Tous les {every_days} jour(s)"),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom { every_days } => write!(f, "custom:{every_days}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A recurring cleaning duty template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTask {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub frequency: Frequency,
    pub zone: Option<String>,
    pub action_to_perform: String,
    pub responsible_role: Option<String>,
    /// Linked zone, sub-zone, product, equipment and method.
    #[serde(default)]
    pub references: TaskReferences,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CleaningTask {
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        action_to_perform: impl Into<String>,
    ) -> Self {
        let now = stored_precision(Utc::now());
        Self {
            id: Uuid::new_v4(),
            organization_id: None,
            name: name.into(),
            frequency,
            zone: None,
            action_to_perform: action_to_perform.into(),
            responsible_role: None,
            references: TaskReferences::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    // Builder methods
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_responsible_role(mut self, role: impl Into<String>) -> Self {
        self.responsible_role = Some(role.into());
        self
    }

    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Check the rules enforced by the catalog admin form.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "task name is required".to_string(),
            ));
        }
        if self.action_to_perform.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "action to perform is required".to_string(),
            ));
        }
        if let Frequency::Custom { every_days } = self.frequency {
            if every_days == 0 {
                return Err(DomainError::ValidationFailed(
                    "custom frequency must be at least one day".to_string(),
                ));
            }
        }
        Ok(())
    }
}
