//! Built-in library of predefined cleaning tasks, grouped by zone and
//! category, used to bootstrap a cleaning plan for a whole zone.

use serde::Serialize;

use super::cleaning_task::Frequency;

/// A task suggested by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredefinedTask {
    pub zone: &'static str,
    pub category: &'static str,
    pub name: &'static str,
    pub default_frequency: Frequency,
}

const fn task(
    zone: &'static str,
    category: &'static str,
    name: &'static str,
    default_frequency: Frequency,
) -> PredefinedTask {
    PredefinedTask {
        zone,
        category,
        name,
        default_frequency,
    }
}

static LIBRARY: &[PredefinedTask] = &[
    task("CUISINE", "APRÈS CHAQUE UTILISATION", "Nettoyage des friteuses", Frequency::AfterUse),
    task("CUISINE", "APRÈS CHAQUE UTILISATION", "Essuyage des surfaces (Essa)", Frequency::AfterUse),
    task("CUISINE", "QUOTIDIEN", "Sols, plinthes, grilles et siphons", Frequency::Daily),
    task("CUISINE", "QUOTIDIEN", "Désinfection des poignées de portes et interrupteurs", Frequency::Daily),
    task("CUISINE", "QUOTIDIEN", "Nettoyage des ustensiles, planches et couteaux", Frequency::Daily),
    task("CUISINE", "QUOTIDIEN", "Désinfection des plans de travail", Frequency::Daily),
    task("CUISINE", "QUOTIDIEN", "Nettoyage du passe-plat", Frequency::Daily),
    task("CUISINE", "HEBDOMADAIRE", "Nettoyage des échelles", Frequency::Weekly),
    task("CUISINE", "HEBDOMADAIRE", "Détartrage des hottes et remplacement des filtres", Frequency::Weekly),
    task("CUISINE", "HEBDOMADAIRE", "Nettoyage de la cellule de refroidissement", Frequency::Weekly),
    task("CUISINE", "MENSUEL", "Nettoyage des murs et portes", Frequency::Monthly),
    task("CUISINE", "MENSUEL", "Désinfection des tiroirs et étagères", Frequency::Monthly),
    task("CUISINE", "MENSUEL", "Nettoyage de l'armoire froide", Frequency::Monthly),
    task("ECONOMAT", "APRÈS CHAQUE SERVICE", "Nettoyage des sols, plinthes, grilles et siphons", Frequency::AfterService),
    task("ECONOMAT", "HEBDOMADAIRE", "Nettoyage des étagères et clayettes", Frequency::Weekly),
    task("ECONOMAT", "HEBDOMADAIRE", "Désinfection des chambres froides", Frequency::Weekly),
    task("ECONOMAT", "MENSUEL", "Nettoyage des murs et portes", Frequency::Monthly),
];

/// Every predefined task.
pub fn predefined_tasks() -> &'static [PredefinedTask] {
    LIBRARY
}

/// Distinct zone names, in library order.
pub fn zones() -> Vec<&'static str> {
    let mut zones: Vec<&'static str> = Vec::new();
    for t in LIBRARY {
        if !zones.contains(&t.zone) {
            zones.push(t.zone);
        }
    }
    zones
}

/// Tasks of one zone (case-insensitive).
pub fn tasks_for_zone(zone: &str) -> Vec<PredefinedTask> {
    LIBRARY
        .iter()
        .filter(|t| t.zone.eq_ignore_ascii_case(zone.trim()))
        .copied()
        .collect()
}
