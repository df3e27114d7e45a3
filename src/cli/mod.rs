//! CLI command handling.
//!
//! Provides subcommands for:
//! - Listing registered drops (`drops`)
//! - Checking whether a drop can run an action (`can-perform`)
//! - Running a drop action (`perform`)
//! - Reconciling a container spec directly (`apply`)
//! - Checking the Docker daemon and configuration (`doctor`)
//! - Generating shell completions (`completion`)

mod completion;
mod doctor;
mod perform;

pub use completion::Completion;
pub use doctor::run_doctor_command;
pub use perform::{run_apply_command, run_can_perform_command, run_perform_command};

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

use crate::performer::DropRegistry;

#[derive(Parser, Debug)]
#[command(name = "dropdock")]
#[command(about = "Reconcile declared containers against a Docker daemon")]
#[command(
    long_about = "dropdock runs named drops against namespaced scopes. Use 'dropdock <subcommand> --help' for details.\nExamples:\n  dropdock apply web.yml -n dewey  # Converge one container\n  dropdock perform container up -- web.yml -n dewey"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the drops this binary can run
    #[command(
        about = "List drops",
        long_about = "Lists registered drops with a short description.\nExample: dropdock drops"
    )]
    Drops,

    /// Report whether a drop can perform an action
    #[command(
        about = "Check a drop action",
        long_about = "Builds the drop and reports whether it defines the action.\nExample: dropdock can-perform container up -- web.yml"
    )]
    CanPerform {
        /// Drop name
        drop: String,

        /// Action name
        action: String,

        /// Arguments passed to the drop's factory
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Run a drop action
    #[command(
        about = "Run a drop action",
        long_about = "Builds the drop and runs the action, printing its JSON result.\nExample: dropdock perform container status -- -n dewey"
    )]
    Perform {
        /// Drop name
        drop: String,

        /// Action name
        action: String,

        /// Arguments passed to the drop's factory
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Reconcile one container spec
    #[command(
        about = "Apply a container spec",
        long_about = "Converges the scope's container to a YAML or JSON spec.\nExample: dropdock apply web.yml --namespace dewey"
    )]
    Apply {
        /// YAML or JSON container spec
        spec: PathBuf,

        /// Scope namespace (defaults to DROPDOCK_DEFAULT_NAMESPACE)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Ping the Docker daemon and validate configuration
    #[command(
        about = "Run diagnostics",
        long_about = "Checks Docker availability and config validity.\nExample: dropdock doctor"
    )]
    Doctor,

    /// Generate shell completion scripts
    #[command(
        about = "Generate completions",
        long_about = "Generates shell completion scripts.\nExample: dropdock completion --shell bash > dropdock.bash"
    )]
    Completion(Completion),
}

/// Print registered drops.
pub fn run_drops_command(registry: &DropRegistry) {
    if registry.is_empty() {
        println!("No drops registered.");
        return;
    }

    println!("{:<16} DESCRIPTION", "NAME");
    println!("{}", "-".repeat(60));
    for (name, description) in registry.list() {
        println!("{:<16} {}", name, description);
    }
}
