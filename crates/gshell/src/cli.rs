use clap::{Args, Parser, Subcommand};
use gshell_credentials::Backend;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gshell", version, about = "Manage the gShell credential store")]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Store backend (encrypted or plaintext)
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Store file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or convert the store file
    #[command(subcommand)]
    Store(StoreCommand),

    #[command(subcommand)]
    Domain(DomainCommand),

    #[command(subcommand)]
    DefaultDomain(DefaultDomainCommand),

    #[command(subcommand)]
    User(UserCommand),

    #[command(subcommand)]
    DefaultUser(DefaultUserCommand),

    /// OAuth2 client secrets
    #[command(subcommand)]
    Secrets(SecretsCommand),

    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// Where the store lives and what it holds
    Info,
    /// Copy the store into another backend
    Migrate {
        #[arg(long)]
        to: Backend,
        /// Destination file (default: the backend's file next to the current store)
        #[arg(long)]
        target: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainCommand {
    List,
    Show {
        name: String,
    },
    /// Add a domain, or replace an existing one keeping its users
    Set {
        name: String,
        #[arg(long)]
        default_user: Option<String>,
    },
    /// Remove a domain with all its users and tokens
    Remove {
        name: String,
    },
    RemoveAll {
        /// Confirm removal of every domain
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DefaultDomainCommand {
    Get,
    Set { name: String },
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List {
        #[arg(long)]
        domain: Option<String>,
    },
    Set {
        domain: String,
        user: String,
    },
    Remove {
        domain: String,
        user: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DefaultUserCommand {
    Get {
        #[arg(long)]
        domain: Option<String>,
    },
    Set {
        domain: String,
        user: String,
    },
    Clear {
        domain: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Fallback secrets used by every user without their own
    #[command(subcommand)]
    Default(DefaultSecretsCommand),

    /// Per-user override
    #[command(subcommand)]
    User(UserSecretsCommand),

    /// Show which secrets a call would use
    Resolve {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[arg(long)]
    pub client_id: String,

    #[arg(long, env = "GSHELL_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,
}

#[derive(Subcommand, Debug)]
pub enum DefaultSecretsCommand {
    Show,
    Set(SecretsArgs),
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum UserSecretsCommand {
    Show {
        domain: String,
        user: String,
    },
    Set {
        domain: String,
        user: String,
        #[command(flatten)]
        secrets: SecretsArgs,
    },
    Clear {
        domain: String,
        user: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Show a stored token with its secrets masked
    Show {
        domain: String,
        user: String,
        /// API as name:version, e.g. admin:directory_v1
        api: String,
    },
    Remove {
        domain: String,
        user: String,
        api: String,
    },
}
