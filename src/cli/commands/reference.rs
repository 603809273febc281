//! Reference table commands: zones, sub-zones, products, equipment, methods.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_reference_id;
use crate::cli::output::{output, short_id, ActionOutput, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::cleaning_reference::{CleaningReference, ReferenceKind};
use crate::domain::ports::CleaningReferenceRepository;

#[derive(Args, Debug)]
pub struct ReferenceArgs {
    #[command(subcommand)]
    pub command: ReferenceCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReferenceCommands {
    /// Add a zone, sub-zone, product, equipment or method
    Add {
        /// zone, sub_zone, product, equipment or method
        kind: String,
        name: String,
        /// Zone a sub-zone belongs to
        #[arg(long, short)]
        zone: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        /// Product or equipment type
        #[arg(long = "type")]
        category: Option<String>,
        /// Product brand
        #[arg(long)]
        brand: Option<String>,
        /// Method step, repeat in order
        #[arg(long = "step")]
        steps: Vec<String>,
    },
    /// List references
    List {
        /// Only this kind
        kind: Option<String>,
        /// Include inactive references
        #[arg(long)]
        all: bool,
    },
    /// Show one reference, with the sub-zones of a zone
    Show {
        /// Reference ID (full UUID or prefix)
        id: String,
    },
    /// Stop offering a reference for new links
    Deactivate { id: String },
    /// Offer a deactivated reference again
    Activate { id: String },
    /// Delete a reference no task links to; a zone takes its sub-zones along
    Delete { id: String },
}

#[derive(Debug, serde::Serialize)]
pub struct ReferenceSummary {
    pub id: Uuid,
    pub short_id: String,
    pub kind: ReferenceKind,
    pub kind_label: String,
    pub name: String,
    /// Zone name of a sub-zone.
    pub zone: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub steps: Vec<String>,
    pub is_active: bool,
}

impl ReferenceSummary {
    fn new(reference: &CleaningReference, zone: Option<String>) -> Self {
        Self {
            id: reference.id,
            short_id: short_id(&reference.id),
            kind: reference.kind,
            kind_label: reference.kind.label().to_string(),
            name: reference.name.clone(),
            zone,
            description: reference.description.clone(),
            category: reference.category.clone(),
            brand: reference.brand.clone(),
            steps: reference.steps.clone(),
            is_active: reference.is_active,
        }
    }

    /// Type, brand and step count, whichever are set.
    pub fn details(&self) -> String {
        let mut parts: Vec<String> = [&self.category, &self.brand].into_iter().flatten().cloned().collect();
        if !self.steps.is_empty() {
            parts.push(format!("{} étape(s)", self.steps.len()));
        }
        parts.join(", ")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ReferenceListOutput {
    pub references: Vec<ReferenceSummary>,
    pub total: usize,
}

impl CommandOutput for ReferenceListOutput {
    fn to_human(&self) -> String {
        if self.references.is_empty() {
            return "No references found.".to_string();
        }
        format!(
            "{}\n{} reference(s)",
            TableFormatter::new().format_references(&self.references),
            self.total
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ReferenceDetailOutput {
    #[serde(flatten)]
    pub reference: ReferenceSummary,
    pub sub_zones: Vec<String>,
    pub linked_tasks: u64,
}

impl CommandOutput for ReferenceDetailOutput {
    fn to_human(&self) -> String {
        let r = &self.reference;
        let mut lines = vec![format!("{}: {}", r.kind_label, r.name), format!("ID: {}", r.id)];
        if let Some(zone) = &r.zone {
            lines.push(format!("Zone: {zone}"));
        }
        if let Some(description) = &r.description {
            lines.push(format!("Description: {description}"));
        }
        if let Some(category) = &r.category {
            lines.push(format!("Type: {category}"));
        }
        if let Some(brand) = &r.brand {
            lines.push(format!("Brand: {brand}"));
        }
        for (i, step) in r.steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", i + 1));
        }
        if !self.sub_zones.is_empty() {
            lines.push(format!("Sub-zones: {}", self.sub_zones.join(", ")));
        }
        lines.push(format!("Active: {}", if r.is_active { "yes" } else { "no" }));
        lines.push(format!("Linked tasks: {}", self.linked_tasks));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn parse_kind(kind: &str) -> Result<ReferenceKind> {
    ReferenceKind::parse(kind)
        .ok_or_else(|| anyhow!("Unknown reference kind '{kind}'. Use zone, sub_zone, product, equipment or method"))
}

fn text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn execute(args: ReferenceArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let catalog = ctx.reference_catalog();

    match args.command {
        ReferenceCommands::Add {
            kind,
            name,
            zone,
            description,
            category,
            brand,
            steps,
        } => {
            let kind = parse_kind(&kind)?;
            let mut reference = match (kind, zone) {
                (ReferenceKind::SubZone, Some(zone)) => {
                    let parent = catalog
                        .lookup(ReferenceKind::Zone, &zone, None)
                        .await?
                        .ok_or_else(|| anyhow!("Unknown zone '{zone}'. Add it first with 'reference add zone'"))?;
                    CleaningReference::sub_zone(&parent, name)
                }
                (ReferenceKind::SubZone, None) => bail!("A sub-zone needs --zone"),
                (_, Some(_)) => bail!("Only sub-zones take --zone"),
                (kind, None) => CleaningReference::new(kind, name),
            };
            reference.description = text(description);
            reference.category = text(category);
            reference.brand = text(brand);
            reference.steps = steps;

            let reference = catalog.create_reference(reference).await?;
            output(
                &ActionOutput::ok(format!(
                    "{} '{}' created ({})",
                    reference.kind.label(),
                    reference.name,
                    short_id(&reference.id)
                )),
                json_mode,
            );
        }

        ReferenceCommands::List { kind, all } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let references = catalog.list_references(kind, !all).await?;
            let zones: HashMap<Uuid, String> = catalog
                .list_references(Some(ReferenceKind::Zone), false)
                .await?
                .into_iter()
                .map(|z| (z.id, z.name))
                .collect();
            let out = ReferenceListOutput {
                total: references.len(),
                references: references
                    .iter()
                    .map(|r| ReferenceSummary::new(r, r.parent_id.and_then(|p| zones.get(&p).cloned())))
                    .collect(),
            };
            output(&out, json_mode);
        }

        ReferenceCommands::Show { id } => {
            let id = resolve_reference_id(&ctx.pool, &id).await?;
            let reference = catalog.get_reference(id).await?;
            let zone = match reference.parent_id {
                Some(parent) => Some(catalog.get_reference(parent).await?.name),
                None => None,
            };
            let sub_zones = match reference.kind {
                ReferenceKind::Zone => catalog.sub_zones(id).await?.into_iter().map(|s| s.name).collect(),
                _ => Vec::new(),
            };
            let linked_tasks = ctx.references.count_linked_tasks(id).await?;
            output(
                &ReferenceDetailOutput {
                    reference: ReferenceSummary::new(&reference, zone),
                    sub_zones,
                    linked_tasks,
                },
                json_mode,
            );
        }

        ReferenceCommands::Deactivate { id } => {
            let id = resolve_reference_id(&ctx.pool, &id).await?;
            let reference = catalog.set_active(id, false).await?;
            output(&ActionOutput::ok(format!("'{}' deactivated", reference.name)), json_mode);
        }

        ReferenceCommands::Activate { id } => {
            let id = resolve_reference_id(&ctx.pool, &id).await?;
            let reference = catalog.set_active(id, true).await?;
            output(&ActionOutput::ok(format!("'{}' activated", reference.name)), json_mode);
        }

        ReferenceCommands::Delete { id } => {
            let id = resolve_reference_id(&ctx.pool, &id).await?;
            let reference = catalog.delete_reference(id).await?;
            output(
                &ActionOutput::ok(format!("{} '{}' deleted", reference.kind.label(), reference.name)),
                json_mode,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_reports_choices() {
        assert_eq!(parse_kind("sous-zone").unwrap(), ReferenceKind::SubZone);
        let err = parse_kind("supplier").unwrap_err().to_string();
        assert!(err.contains("sub_zone"));
    }

    #[test]
    fn test_details_join_set_fields() {
        let method = CleaningReference::new(ReferenceKind::Method, "4 temps").with_steps(["Laver", "Rincer"]);
        assert_eq!(ReferenceSummary::new(&method, None).details(), "2 étape(s)");

        let product = CleaningReference::new(ReferenceKind::Product, "Javel").with_category("Désinfectant");
        assert_eq!(ReferenceSummary::new(&product, None).details(), "Désinfectant");
    }
}
