//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// cpo - Cloud Pak operations CLI
#[derive(Parser, Debug)]
#[command(name = "cpo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// CLI data directory (defaults to $CPO_DATA_DIR or ~/.cpo)
    #[arg(long, global = true, env = "CPO_DATA_DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    /// Disable download progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Manage downloaded dependencies (oc, ibmcloud, openshift-install)
    #[command(subcommand, visible_alias = "deps")]
    Dependency(DependencyCommands),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum DependencyCommands {
    /// Download the latest release of every dependency
    Update(UpdateArgs),

    /// List registered dependencies and their recorded versions
    List(ListArgs),

    /// Print the binary path of a dependency, installing it if required
    Path(PathArgs),

    /// Run a dependency binary
    Exec(ExecArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Dependency alias (e.g. oc)
    pub alias: String,

    /// Version to resolve instead of the recorded one
    #[arg(long = "use-version", value_name = "VERSION")]
    pub use_version: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Dependency alias (e.g. oc)
    pub alias: String,

    /// Version to run instead of the recorded one
    #[arg(long = "use-version", value_name = "VERSION")]
    pub use_version: Option<String>,

    /// Arguments passed to the binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dependency_update() {
        let cli = Cli::try_parse_from(["cpo", "dependency", "update", "--json"]).unwrap();
        match cli.command {
            Commands::Dependency(DependencyCommands::Update(args)) => assert!(args.json),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cpo",
            "deps",
            "list",
            "--data-dir",
            "/tmp/cpo",
            "--no-progress",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(cli.no_progress);
        assert_eq!(cli.data_dir, Some(Utf8PathBuf::from("/tmp/cpo")));
    }

    #[test]
    fn test_exec_passes_hyphenated_arguments_through() {
        let cli = Cli::try_parse_from([
            "cpo",
            "dependency",
            "exec",
            "oc",
            "--use-version",
            "4.14.9",
            "get",
            "pods",
            "-n",
            "default",
        ])
        .unwrap();

        match cli.command {
            Commands::Dependency(DependencyCommands::Exec(args)) => {
                assert_eq!(args.alias, "oc");
                assert_eq!(args.use_version.as_deref(), Some("4.14.9"));
                assert_eq!(args.args, vec!["get", "pods", "-n", "default"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_path_requires_alias() {
        assert!(Cli::try_parse_from(["cpo", "dependency", "path"]).is_err());
    }
}
