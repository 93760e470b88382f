use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use constpatch::commands::{
    init_config_command, patch_command, restore_command, run_command, select_command,
    show_config_command, verify_command,
};

/// Const-promotion patcher and read-only section verifier for the decimal
/// floating-point library.
///
/// This CLI is a thin wrapper around `constpatch-core`; all substantive logic
/// lives in the library so it can be tested and reused.
#[derive(Parser, Debug)]
#[command(
    name = "constpatch",
    version,
    about = "Promote static lookup tables to const and verify their placement",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Patch, build and (with --verify) check the resulting archive.
    ///
    /// Fails before touching anything when a required tool is missing.
    Run {
        /// Build root holding the upstream tree. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Annotate promoted tables and verify their section flags after the build.
        #[arg(long, env = "CONSTPATCH_VERIFY", value_parser = BoolishValueParser::new())]
        verify: bool,

        /// Section inspector: builtin or readelf.
        #[arg(long, default_value = "builtin")]
        inspector: String,

        /// Skip `make` and use the archive a previous build left in the library dir.
        #[arg(long)]
        no_build: bool,

        /// Report what would be patched; write nothing and stop before the build.
        #[arg(long)]
        dry_run: bool,

        /// Emit the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Const-promote the selected sources without building.
    Patch {
        #[arg(long, default_value = ".")]
        root: String,

        /// Also add the section annotation to promoted declarations.
        #[arg(long, env = "CONSTPATCH_VERIFY", value_parser = BoolishValueParser::new())]
        verify: bool,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// List the files the patcher would consider.
    Select {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        json: bool,
    },

    /// Check an existing archive for writable annotated sections.
    Verify {
        #[arg(long, default_value = ".")]
        root: String,

        /// Archive to check. Defaults to the configured output archive.
        #[arg(long)]
        archive: Option<String>,

        #[arg(long, default_value = "builtin")]
        inspector: String,

        /// Section name to look for. Defaults to the configured annotation section.
        #[arg(long)]
        section: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Put every backed-up source in the library tree back.
    Restore {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        json: bool,
    },

    /// Write the default config to `constpatch.yaml`.
    InitConfig {
        #[arg(long, default_value = ".")]
        root: String,

        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Show the effective config and key paths.
    ShowConfig {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { root, verify, inspector, no_build, dry_run, json } => {
            run_command(&root, verify, &inspector, no_build, dry_run, json)?
        }
        Command::Patch { root, verify, dry_run, json } => {
            patch_command(&root, verify, dry_run, json)?
        }
        Command::Select { root, json } => select_command(&root, json)?,
        Command::Verify { root, archive, inspector, section, json } => {
            verify_command(&root, archive, &inspector, section, json)?
        }
        Command::Restore { root, json } => restore_command(&root, json)?,
        Command::InitConfig { root, force } => init_config_command(&root, force)?,
        Command::ShowConfig { root, json } => show_config_command(&root, json)?,
    }

    Ok(())
}
