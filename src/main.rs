use clap::{ArgGroup, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use taskboard::commands::{
    AssignTarget, BoardOptions, cmd_assign, cmd_board, cmd_config_set, cmd_config_show, cmd_move,
    cmd_whoami,
};
use taskboard::types::{
    TicketId, TicketPriority, TicketStatus, UserId, VALID_PRIORITIES, VALID_STATUSES,
};

const LOG_ENV: &str = "TASKBOARD_LOG";

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Project board for the ticket tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a project's tickets as a three-column board
    #[command(visible_alias = "b")]
    Board {
        /// Project ID (default: default_project from config)
        #[arg(short, long)]
        project: Option<u64>,

        /// Only tickets with this status
        #[arg(short, long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Only tickets with this priority
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TicketPriority>,

        /// Only tickets assigned to this user ID
        #[arg(short, long)]
        assignee: Option<u64>,

        /// Case-insensitive text search over title and description
        #[arg(long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a ticket to another column
    #[command(visible_alias = "mv")]
    Move {
        /// Ticket ID
        ticket: TicketId,

        /// Destination column: todo, in_progress, done
        column: String,

        #[arg(short, long)]
        project: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Take, reassign or unassign a ticket
    #[command(group(ArgGroup::new("target").required(true).args(["user", "me", "unassign"])))]
    Assign {
        /// Ticket ID
        ticket: TicketId,

        #[arg(short, long)]
        project: Option<u64>,

        /// Assign to this user ID (admin only)
        #[arg(long)]
        user: Option<u64>,

        /// Assign to yourself (developers, unassigned tickets only)
        #[arg(long)]
        me: bool,

        /// Remove the assignee (admin only)
        #[arg(long)]
        unassign: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show the user the configured token belongs to
    Whoami {
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Set a configuration value
    Set {
        /// One of: server_url, token, default_project, request_timeout,
        /// connect_timeout, max_retries, retry_base_delay_ms
        key: String,

        value: String,

        #[arg(long)]
        json: bool,
    },
}

fn parse_status(s: &str) -> Result<TicketStatus, String> {
    s.parse().map_err(|_| {
        format!(
            "invalid status '{}'. Must be one of: {}",
            s,
            VALID_STATUSES.join(", ")
        )
    })
}

fn parse_priority(s: &str) -> Result<TicketPriority, String> {
    s.parse().map_err(|_| {
        format!(
            "invalid priority '{}'. Must be one of: {}",
            s,
            VALID_PRIORITIES.join(", ")
        )
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Board {
            project,
            status,
            priority,
            assignee,
            search,
            json,
        } => {
            let options = BoardOptions {
                project,
                status,
                priority,
                assignee: assignee.map(UserId::new),
                search,
            };
            cmd_board(options, json).await
        }
        Commands::Move {
            ticket,
            column,
            project,
            json,
        } => cmd_move(ticket, &column, project, json).await,
        Commands::Assign {
            ticket,
            project,
            user,
            me,
            unassign: _,
            json,
        } => {
            let target = match (user, me) {
                (Some(id), _) => AssignTarget::User(UserId::new(id)),
                (None, true) => AssignTarget::Me,
                (None, false) => AssignTarget::Unassign,
            };
            cmd_assign(ticket, target, project, json).await
        }
        Commands::Whoami { json } => cmd_whoami(json).await,
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => cmd_config_show(json),
            ConfigAction::Set { key, value, json } => cmd_config_set(&key, &value, json),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
