//! Dependency commands

use anyhow::{Context, Result};
use cpo_core::HierarchicalConfigLoader;
use cpo_deps::{
    DependencyManager, DependencyUpdate, DependencyVersion, ExecOptions, InstalledDependency,
    ManagerSettings,
};
use std::collections::HashMap;
use std::process::ExitCode;
use tabled::{settings::Style as TableStyle, Table, Tabled};
use tracing::debug;

use crate::cli::{Cli, DependencyCommands, ExecArgs, ListArgs, PathArgs, UpdateArgs};
use crate::output;

pub async fn run(command: &DependencyCommands, cli: &Cli) -> Result<ExitCode> {
    let mut manager = build_manager(cli)?;

    match command {
        DependencyCommands::Update(args) => update(&mut manager, args, cli.quiet).await,
        DependencyCommands::List(args) => list(&mut manager, args),
        DependencyCommands::Path(args) => path(&mut manager, args).await,
        DependencyCommands::Exec(args) => exec(&mut manager, args).await,
    }
}

/// Load configuration and create a manager with the built-in plugins
fn build_manager(cli: &Cli) -> Result<DependencyManager> {
    let loader = match &cli.data_dir {
        Some(dir) => HierarchicalConfigLoader::with_dir(dir.clone()),
        None => HierarchicalConfigLoader::new()?,
    };

    let mut config = loader
        .load_runtime_config()
        .context("Failed to load runtime configuration")?;
    if cli.no_progress || cli.quiet {
        config.display.progress = false;
    }

    let data_dir = loader.config_dir().as_std_path().to_path_buf();
    debug!("Using data directory {:?}", data_dir);
    let mut manager = DependencyManager::new(ManagerSettings::new(data_dir, config))?;
    cpo_plugins::register_defaults(&mut manager)?;

    Ok(manager)
}

async fn update(manager: &mut DependencyManager, args: &UpdateArgs, quiet: bool) -> Result<ExitCode> {
    let updates = manager.ensure_latest().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&updates)?);
    } else if !quiet {
        print_updates(&updates);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_updates(updates: &[DependencyUpdate]) {
    if updates.is_empty() {
        output::success("All dependencies are up to date");
        return;
    }

    for update in updates {
        match &update.previous {
            Some(previous) => output::success(&format!(
                "Updated {} {} -> {}",
                update.alias, previous, update.installed
            )),
            None => output::success(&format!("Installed {} {}", update.alias, update.installed)),
        }
    }
}

#[derive(Tabled)]
struct DependencyRow {
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl From<&InstalledDependency> for DependencyRow {
    fn from(dependency: &InstalledDependency) -> Self {
        let version = match (&dependency.version, dependency.supported) {
            (Some(version), _) => version.to_string(),
            (None, true) => "not installed".to_string(),
            (None, false) => "unsupported".to_string(),
        };

        Self {
            alias: dependency.alias.clone(),
            name: dependency.display_name.clone(),
            version,
            path: dependency
                .binary_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn list(manager: &mut DependencyManager, args: &ListArgs) -> Result<ExitCode> {
    let installed = manager.installed()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
        return Ok(ExitCode::SUCCESS);
    }

    if installed.is_empty() {
        output::info("No dependencies registered");
        return Ok(ExitCode::SUCCESS);
    }

    output::header("Dependencies");
    output::kv("Platform", manager.platform().tag());
    output::kv("Manifest", &manager.manifest_path().display().to_string());
    println!();

    let rows: Vec<DependencyRow> = installed.iter().map(DependencyRow::from).collect();
    println!("{}", Table::new(&rows).with(TableStyle::rounded()));

    Ok(ExitCode::SUCCESS)
}

async fn path(manager: &mut DependencyManager, args: &PathArgs) -> Result<ExitCode> {
    let version = match &args.use_version {
        Some(text) => DependencyVersion::parse(text)?.version,
        None => manager.download_if_required_by_alias(&args.alias).await?,
    };

    let binary = manager.binary_path_by_alias(&args.alias, &version)?;
    println!("{}", binary.display());

    Ok(ExitCode::SUCCESS)
}

async fn exec(manager: &mut DependencyManager, args: &ExecArgs) -> Result<ExitCode> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let options = ExecOptions::default().with_check(false);

    let result = manager
        .execute_by_alias(
            &args.alias,
            args.use_version.clone().map(Into::into),
            &args.args,
            &env,
            options,
        )
        .await?;

    Ok(ExitCode::from(exit_status(result.return_code)))
}

/// Map a child return code onto this process's exit status
fn exit_status(return_code: i32) -> u8 {
    u8::try_from(return_code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dependency(version: Option<&str>, supported: bool) -> InstalledDependency {
        InstalledDependency {
            alias: "oc".to_string(),
            display_name: "OpenShift CLI".to_string(),
            version: version.map(|v| semver::Version::parse(v).unwrap()),
            supported,
            binary_path: version.map(|v| PathBuf::from(format!("/data/bin/oc-{}", v))),
        }
    }

    #[test]
    fn test_row_for_installed_dependency() {
        let row = DependencyRow::from(&dependency(Some("4.15.3"), true));
        assert_eq!(row.version, "4.15.3");
        assert_eq!(row.path, "/data/bin/oc-4.15.3");
    }

    #[test]
    fn test_row_for_missing_dependency() {
        let row = DependencyRow::from(&dependency(None, true));
        assert_eq!(row.version, "not installed");
        assert_eq!(row.path, "-");

        let row = DependencyRow::from(&dependency(None, false));
        assert_eq!(row.version, "unsupported");
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(-9), 1);
        assert_eq!(exit_status(300), 1);
    }
}
