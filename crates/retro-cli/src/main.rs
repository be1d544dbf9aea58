#![forbid(unsafe_code)]

mod cmd;
mod output;
mod user;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use retro_core::config::{UserConfig, load_user_config};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "retro: a journal of roses, buds and thorns",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, FORMAT and the user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this user (skips env resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a retro journal",
        long_about = "Create .retro/ with a migrated store and default config in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a journal here\n    retro init\n\n    # Emit machine-readable output\n    retro init --json"
    )]
    Init,

    #[command(
        next_help_heading = "Retrospectives",
        about = "Record a new retrospective",
        long_about = "Create a retrospective, optionally as a child of another one.",
        after_help = "EXAMPLES:\n    # A trip\n    retro create --title \"Austin weekend\" --date 2024-03-08 --city Austin --state TX\n\n    # A day within it, with attendees\n    retro create --title \"Day one\" --parent 3f2a -a Ben -a Cleo\n\n    # Keep it private\n    retro create --title \"Therapy notes\" --private"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Retrospectives",
        about = "Search retrospectives",
        long_about = "List retrospectives visible to you, filtered by keywords, tags, attendee and location.",
        after_help = "EXAMPLES:\n    # Everything, children under their parents\n    retro list\n\n    # Keyword AND tag search\n    retro list -k \"tacos patio\" -t food\n\n    # By place\n    retro list -l \"Austin, TX\" --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Retrospectives",
        about = "Show one retrospective",
        long_about = "Show a retrospective with its roses, buds and thorns, folding in children's items by default.",
        after_help = "EXAMPLES:\n    # Show by prefix\n    retro show 3f2a\n\n    # Only this retrospective's own items\n    retro show 3f2a --no-merged\n\n    # With the full subtree\n    retro show 3f2a --tree"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Retrospectives",
        about = "Edit a retrospective's details",
        after_help = "EXAMPLES:\n    retro edit 3f2a --title \"Austin, again\" --private\n\n    retro edit 3f2a --clear-location"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Retrospectives",
        about = "Delete a retrospective",
        after_help = "EXAMPLES:\n    retro delete 3f2a --force"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Hierarchy",
        about = "Move a retrospective under another",
        after_help = "EXAMPLES:\n    # Nest a day under a trip\n    retro move 9b0d --parent 3f2a\n\n    # Make it top-level again\n    retro move 9b0d --parent none"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Hierarchy",
        about = "Print the path from the root to a retrospective",
        after_help = "EXAMPLES:\n    retro breadcrumb 9b0d"
    )]
    Breadcrumb(cmd::breadcrumb::BreadcrumbArgs),

    #[command(
        next_help_heading = "Items",
        about = "Add a rose, bud or thorn",
        after_help = "EXAMPLES:\n    retro add rose 3f2a \"Breakfast tacos on the patio\" -t food\n\n    retro add thorn 3f2a \"Traffic on I-35\""
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Items",
        about = "Tag an item",
        after_help = "EXAMPLES:\n    retro tag 9c1e food outdoors"
    )]
    Tag(cmd::tag::TagArgs),

    #[command(
        next_help_heading = "Items",
        about = "Comment on an item",
        after_help = "EXAMPLES:\n    retro comment 9c1e \"We should go back in spring\""
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(next_help_heading = "Items", about = "Attach, react to or comment on photos")]
    Photo(cmd::photo::PhotoArgs),

    #[command(
        next_help_heading = "Items",
        about = "List tags by usage",
        after_help = "EXAMPLES:\n    retro tags -n 10"
    )]
    Tags(cmd::tags::TagsArgs),

    #[command(
        next_help_heading = "People",
        about = "Tag attendees",
        after_help = "EXAMPLES:\n    retro attend 3f2a Ben Cleo\n\n    # Link a name to a user identity\n    retro attend 3f2a \"Ben R\" --user-ref ben"
    )]
    Attend(cmd::attend::AttendArgs),

    #[command(next_help_heading = "People", about = "Untag attendees")]
    Unattend(cmd::attend::UnattendArgs),

    #[command(
        next_help_heading = "People",
        about = "Show or clear your notifications",
        after_help = "EXAMPLES:\n    retro notifications --unread\n\n    retro notifications read-all"
    )]
    Notifications(cmd::notifications::NotificationsArgs),

    #[command(next_help_heading = "Collections", about = "Curate catalogues of saved items")]
    Catalogue(cmd::catalogue::CatalogueArgs),

    #[command(next_help_heading = "Collections", about = "Plan trips")]
    Trip(cmd::trip::TripArgs),

    #[command(
        next_help_heading = "Collections",
        about = "Collect retrospectives through a shared code"
    )]
    Space(cmd::space::SpaceArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    retro completions zsh > ~/.zfunc/_retro"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose || env::var("DEBUG").is_ok() {
        "retro=debug,info"
    } else {
        "retro=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("RETRO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, quiet)));

    let format = env::var("RETRO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

fn run(cli: &Cli, cwd: &Path, output: OutputMode, user: Option<String>) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init => return cmd::init::run_init(cwd, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            return cmd::completions::run_completions(args.shell, &mut command);
        }
        _ => {}
    }

    let mut state = cmd::open_state(cwd, user)?;
    let result = match &cli.command {
        Commands::Create(args) => cmd::create::run_create(args, &mut state, output),
        Commands::List(args) => cmd::list::run_list(args, &state, output),
        Commands::Show(args) => cmd::show::run_show(args, &state, output),
        Commands::Edit(args) => cmd::edit::run_edit(args, &state, output),
        Commands::Delete(args) => cmd::delete::run_delete(args, &state, output),
        Commands::Move(args) => cmd::move_cmd::run_move(args, &state, output),
        Commands::Breadcrumb(args) => cmd::breadcrumb::run_breadcrumb(args, &state, output),
        Commands::Add(args) => cmd::add::run_add(args, &mut state, output),
        Commands::Tag(args) => cmd::tag::run_tag(args, &state, output),
        Commands::Comment(args) => cmd::comment::run_comment(args, &state, output),
        Commands::Photo(args) => cmd::photo::run_photo(args, &state, output),
        Commands::Tags(args) => cmd::tags::run_tags(args, &state, output),
        Commands::Attend(args) => cmd::attend::run_attend(args, &state, output),
        Commands::Unattend(args) => cmd::attend::run_unattend(args, &state, output),
        Commands::Notifications(args) => {
            cmd::notifications::run_notifications(args, &state, output)
        }
        Commands::Catalogue(args) => cmd::catalogue::run_catalogue(args, &mut state, output),
        Commands::Trip(args) => cmd::trip::run_trip(args, &state, output),
        Commands::Space(args) => cmd::space::run_space(args, &mut state, output),
        Commands::Init | Commands::Completions(_) => Ok(()),
    };

    // The command's own error wins over a failure to close.
    match (result, state.sign_out()) {
        (Err(err), _) => Err(err),
        (Ok(()), closed) => closed.map_err(anyhow::Error::from),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let user_config = load_user_config().unwrap_or_else(|e| {
        warn!("ignoring unreadable user config: {e:#}");
        UserConfig::default()
    });
    let output = resolve_output_mode(cli.format, cli.json, user_config.output.as_deref());
    let user = user::resolve_user(cli.user.as_deref(), user_config.name.as_deref());
    debug!(?output, user = ?user, "resolved invocation");

    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            let error = CliError::new(format!("cannot read current directory: {e}"));
            let _ = render_error(output, &error);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &cwd, output, user) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("command failed: {err:?}");
            let _ = render_error(output, &CliError::from_anyhow(&err));
            ExitCode::FAILURE
        }
    }
}
