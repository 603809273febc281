use clap::Parser;
use haccp_plan::cli::commands::plan::PlanCommands;
use haccp_plan::cli::commands::record::RecordCommands;
use haccp_plan::cli::commands::reference::ReferenceCommands;
use haccp_plan::cli::commands::task::TaskCommands;
use haccp_plan::cli::{Cli, Commands};

#[test]
fn test_parse_task_add() {
    let cli = Cli::try_parse_from([
        "haccp-plan",
        "task",
        "add",
        "Nettoyage des sols",
        "--frequency",
        "custom",
        "--every-days",
        "3",
        "--action",
        "Laver",
        "--zone",
        "CUISINE",
    ])
    .unwrap();

    match cli.command {
        Commands::Task(args) => match args.command {
            TaskCommands::Add {
                name,
                frequency,
                every_days,
                zone,
                role,
                ..
            } => {
                assert_eq!(name, "Nettoyage des sols");
                assert_eq!(frequency, "custom");
                assert_eq!(every_days, Some(3));
                assert_eq!(zone.as_deref(), Some("CUISINE"));
                assert!(role.is_none());
            }
            _ => panic!("Wrong task command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_global_json_after_subcommand() {
    let cli = Cli::try_parse_from(["haccp-plan", "record", "list", "--tab", "overdue", "--json"]).unwrap();
    assert!(cli.json);
    match cli.command {
        Commands::Record(args) => match args.command {
            RecordCommands::List { tab, task, limit } => {
                assert_eq!(tab, "overdue");
                assert!(task.is_none());
                assert!(limit.is_none());
            }
            _ => panic!("Wrong record command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_plan_repeat_defaults() {
    let cli = Cli::try_parse_from(["haccp-plan", "plan", "repeat", "1a2b", "--start", "2024-03-01 06:00"]).unwrap();
    match cli.command {
        Commands::Plan(args) => match args.command {
            PlanCommands::Repeat {
                task,
                start,
                interval,
                count,
            } => {
                assert_eq!(task, "1a2b");
                assert_eq!(start, "2024-03-01 06:00");
                assert_eq!(interval, "daily");
                assert!(count.is_none());
            }
            _ => panic!("Wrong plan command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_calendar_negative_shift() {
    let cli = Cli::try_parse_from(["haccp-plan", "calendar", "--view", "week", "--shift", "-2"]).unwrap();
    match cli.command {
        Commands::Calendar(args) => {
            assert_eq!(args.view, "week");
            assert_eq!(args.shift, -2);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_edit_rejects_conflicting_flags() {
    assert!(Cli::try_parse_from(["haccp-plan", "record", "edit", "abcd", "--compliant", "--non-compliant"]).is_err());
    assert!(Cli::try_parse_from([
        "haccp-plan",
        "record",
        "edit",
        "abcd",
        "--photo",
        "a.jpg",
        "--remove-photo"
    ])
    .is_err());
}

#[test]
fn test_missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["haccp-plan"]).is_err());
    assert!(Cli::try_parse_from(["haccp-plan", "task"]).is_err());
}

#[test]
fn test_parse_task_list_sub_zone_needs_zone() {
    let cli = Cli::try_parse_from(["haccp-plan", "task", "list", "--zone", "CUISINE", "--sub-zone", "Plonge"]).unwrap();
    match cli.command {
        Commands::Task(args) => match args.command {
            TaskCommands::List { zone, sub_zone, all } => {
                assert_eq!(zone.as_deref(), Some("CUISINE"));
                assert_eq!(sub_zone.as_deref(), Some("Plonge"));
                assert!(!all);
            }
            _ => panic!("Wrong task command"),
        },
        _ => panic!("Wrong top-level command"),
    }

    assert!(Cli::try_parse_from(["haccp-plan", "task", "list", "--sub-zone", "Plonge"]).is_err());
}

#[test]
fn test_parse_task_update_links() {
    let cli = Cli::try_parse_from([
        "haccp-plan", "task", "update", "1a2b", "--product", "Javel", "--method", "",
    ])
    .unwrap();
    match cli.command {
        Commands::Task(args) => match args.command {
            TaskCommands::Update { links, zone, .. } => {
                assert!(zone.is_none());
                assert_eq!(links.product.as_deref(), Some("Javel"));
                assert_eq!(links.method.as_deref(), Some(""));
                assert!(links.equipment.is_none());
            }
            _ => panic!("Wrong task command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_reference_add_method_steps() {
    let cli = Cli::try_parse_from([
        "haccp-plan", "ref", "add", "method", "Nettoyage en 4 temps", "--step", "Laver", "--step", "Rincer",
    ])
    .unwrap();
    match cli.command {
        Commands::Reference(args) => match args.command {
            ReferenceCommands::Add { kind, name, steps, zone, .. } => {
                assert_eq!(kind, "method");
                assert_eq!(name, "Nettoyage en 4 temps");
                assert_eq!(steps, vec!["Laver", "Rincer"]);
                assert!(zone.is_none());
            }
            _ => panic!("Wrong reference command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}
