//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskgroups_core` linkage.
//! - Optionally print the display tree of one stored scope.
//!
//! Usage: `taskgroups [tree [scope]]`; the database comes from
//! `TASKGROUPS_DB_PATH`.

use std::process::ExitCode;
use std::sync::Arc;
use taskgroups_core::{
    CollectionsRepository, CoreConfig, DisplayNode, ScopeKey, SqliteBlobRepository,
};

fn main() -> ExitCode {
    println!("taskgroups_core ping={}", taskgroups_core::ping());
    println!("taskgroups_core version={}", taskgroups_core::core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => ExitCode::SUCCESS,
        Some("tree") => match print_tree(args.get(1).map(String::as_str)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("error: unknown command `{other}`; expected `tree [scope]`");
            ExitCode::from(2)
        }
    }
}

fn print_tree(scope: Option<&str>) -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    taskgroups_core::init_logging_from_config(&config)?;
    let scope = match scope {
        Some(raw) => ScopeKey::parse(raw).map_err(|err| err.to_string())?,
        None => config.default_scope.clone(),
    };
    let blobs = SqliteBlobRepository::open(&config.db_path).map_err(|err| err.to_string())?;
    let collections = CollectionsRepository::new(Arc::new(blobs)).load(&scope);

    println!("db={} scope={}", config.db_path.display(), scope);
    let tree = taskgroups_core::build_tree(&collections.mains, &collections.groups);
    for node in &tree {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &DisplayNode, depth: usize) {
    println!(
        "{}- [{}] {} ({})",
        "  ".repeat(depth),
        node.symbol,
        node.title,
        node.id
    );
    for child in node.children.iter().flatten() {
        print_node(child, depth + 1);
    }
}
