#![forbid(unsafe_code)]

mod cmd;
mod output;
mod session;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use session::Session;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wt: work item type hierarchy and link topology engine",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides `--json`, `FORMAT` and the user config.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Catalog file layered over the system catalog.
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Leave the built-in system catalog out.
    #[arg(long, global = true)]
    no_system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List work item types",
        long_about = "List work item types in tree order, optionally limited to one subtree.",
        after_help = "EXAMPLES:\n    # Every type\n    wt types\n\n    # A type and its descendants\n    wt types --under planneritem\n\n    # Emit machine-readable output\n    wt types --json"
    )]
    Types(cmd::types::TypesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one work item type",
        long_about = "Show a work item type with its path, ancestry and field schema.",
        after_help = "EXAMPLES:\n    # By name\n    wt show bug\n\n    # By id\n    wt show 26787039-b68f-4e28-8814-c2f93be1ef4e\n\n    # Emit the type document\n    wt show bug --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        name = "is-a",
        next_help_heading = "Read",
        about = "Test subtype containment",
        long_about = "Report whether TYPE is ANCESTOR itself or one of its descendants.",
        after_help = "EXAMPLES:\n    # A bug is a planner item\n    wt is-a bug planneritem\n\n    # Siblings are unrelated\n    wt is-a bug feature"
    )]
    IsA(cmd::is_a::IsAArgs),

    #[command(
        next_help_heading = "Read",
        about = "List link types",
        long_about = "List link types with their endpoints, names and topology, or show one as a document.",
        after_help = "EXAMPLES:\n    # Every link type\n    wt links\n\n    # Only trees\n    wt links --topology tree\n\n    # One link type as a document\n    wt links \"Bug blocker\" --json"
    )]
    Links(cmd::links::LinksArgs),

    #[command(
        next_help_heading = "Validate",
        about = "Validate the effective catalog",
        long_about = "Resolve the effective catalog, validate every record and load it into a repository.",
        after_help = "EXAMPLES:\n    # Check the project catalog\n    wt check\n\n    # Check a file on its own\n    wt check --no-system --catalog types.toml"
    )]
    Check,

    #[command(
        next_help_heading = "Validate",
        about = "Convert field values through a type's schema",
        long_about = "Convert stored field values to external form, or external values to stored form with --to-model.",
        after_help = "EXAMPLES:\n    # Stored values to external form\n    wt convert bug stored.json\n\n    # External values to stored form, from stdin\n    echo '{\"system.title\": \"x\"}' | wt convert bug --to-model\n\n    # A whole stored work item\n    wt convert bug item.json --item"
    )]
    Convert(cmd::convert::ConvertArgs),

    #[command(
        next_help_heading = "Validate",
        about = "Preview a document update",
        long_about = "Merge an update document onto a type or link type, re-validate it and save it to an in-memory copy of the catalog with a version check.",
        after_help = "EXAMPLES:\n    # Change a link type's topology\n    echo '{\"data\": {\"type\": \"workitemlinktypes\", \"attributes\": {\"topology\": \"tree\"}}}' \\\n        | wt patch link-type \"Bug blocker\""
    )]
    Patch(cmd::patch::PatchArgs),

    #[command(
        next_help_heading = "Utilities",
        about = "Print the path segment for an id",
        long_about = "Print the sanitized form of an identifier as used in type paths.",
        after_help = "EXAMPLES:\n    wt sanitize 26787039-b68f-4e28-8814-c2f93be1ef4e"
    )]
    Sanitize(cmd::sanitize::SanitizeArgs),

    #[command(
        next_help_heading = "Utilities",
        about = "Generate shell completions",
        long_about = "Generate shell completion scripts for wt.",
        after_help = "EXAMPLES:\n    # Bash\n    wt completions bash > ~/.local/share/bash-completion/completions/wt\n\n    # Zsh\n    wt completions zsh > ~/.zfunc/_wt"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WITYPE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "witype=debug,info"
        } else {
            "witype=info,warn"
        })
    });

    let format = env::var("WITYPE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(args) = &cli.command {
        return cmd::completions::run_completions(args.shell, &mut Cli::command());
    }

    let cwd = env::current_dir()?;
    let session = Session::resolve(&cwd, cli.format, cli.json, cli.catalog, cli.no_system)?;

    match cli.command {
        Commands::Types(ref args) => cmd::types::run_types(args, &session),
        Commands::Show(ref args) => cmd::show::run_show(args, &session),
        Commands::IsA(ref args) => cmd::is_a::run_is_a(args, &session),
        Commands::Links(ref args) => cmd::links::run_links(args, &session),
        Commands::Check => cmd::check::run_check(&session),
        Commands::Convert(ref args) => cmd::convert::run_convert(args, &session),
        Commands::Patch(ref args) => cmd::patch::run_patch(args, &session),
        Commands::Sanitize(ref args) => cmd::sanitize::run_sanitize(args, session.output),
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from([
            "wt",
            "types",
            "--under",
            "planneritem",
            "--json",
            "--no-system",
            "--catalog",
            "types.toml",
        ]);
        assert!(cli.json);
        assert!(cli.no_system);
        assert_eq!(cli.catalog, Some(PathBuf::from("types.toml")));
        match cli.command {
            Commands::Types(args) => assert_eq!(args.under.as_deref(), Some("planneritem")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn is_a_takes_two_references() {
        let cli = Cli::parse_from(["wt", "is-a", "bug", "planneritem"]);
        match cli.command {
            Commands::IsA(args) => {
                assert_eq!(args.reference, "bug");
                assert_eq!(args.ancestor, "planneritem");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn convert_defaults_to_stdin() {
        let cli = Cli::parse_from(["wt", "convert", "bug", "--to-model"]);
        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.file, PathBuf::from("-"));
                assert!(args.to_model);
                assert!(!args.item);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn convert_rejects_item_with_to_model() {
        let result = Cli::try_parse_from(["wt", "convert", "bug", "--to-model", "--item"]);
        assert!(result.is_err());
    }

    #[test]
    fn sanitize_requires_a_uuid() {
        assert!(Cli::try_parse_from(["wt", "sanitize", "not-a-uuid"]).is_err());
        let cli = Cli::parse_from(["wt", "sanitize", "26787039-b68f-4e28-8814-c2f93be1ef4e"]);
        assert!(matches!(cli.command, Commands::Sanitize(_)));
    }

    #[test]
    fn format_flag_parses_value_enum() {
        let cli = Cli::parse_from(["wt", "--format", "text", "check"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn patch_target_is_kebab_case() {
        let cli = Cli::parse_from(["wt", "patch", "link-type", "Bug blocker", "doc.json"]);
        match cli.command {
            Commands::Patch(args) => {
                assert_eq!(args.target, cmd::patch::PatchTarget::LinkType);
                assert_eq!(args.reference, "Bug blocker");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
