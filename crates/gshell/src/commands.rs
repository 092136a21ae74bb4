use anyhow::{bail, Context, Result};
use gshell_credentials::common::settings_path;
use gshell_credentials::persistence::{self, CURRENT_SCHEMA_VERSION};
use gshell_credentials::{
    ClientSecrets, CredentialConsumer, CredentialError, Domain, DomainUser, StoreConfig,
};
use serde_json::json;

use crate::cli::{
    Cli, Command, DefaultDomainCommand, DefaultSecretsCommand, DefaultUserCommand, DomainCommand,
    SecretsArgs, SecretsCommand, StoreCommand, TokenCommand, UserCommand, UserSecretsCommand,
};
use crate::output::{print_json, DomainView, OutputFormat, SecretsView, TokenView, UserView};

pub fn run(cli: Cli) -> Result<()> {
    run_with(cli, StoreConfig::load()?)
}

/// Run against `base` (settings and environment) with the flags applied on top.
fn run_with(cli: Cli, base: StoreConfig) -> Result<()> {
    let config = store_config(&cli, base);
    let format = cli.format;

    match cli.command {
        Command::Store(cmd) => store(cmd, &config, format),
        Command::Domain(cmd) => domain(cmd, &mut open(&config)?, format),
        Command::DefaultDomain(cmd) => default_domain(cmd, &mut open(&config)?, format),
        Command::User(cmd) => user(cmd, &mut open(&config)?, format),
        Command::DefaultUser(cmd) => default_user(cmd, &mut open(&config)?, format),
        Command::Secrets(cmd) => secrets(cmd, &mut open(&config)?, format),
        Command::Token(cmd) => token(cmd, &mut open(&config)?, format),
    }
}

/// Settings and environment, then command-line flags.
fn store_config(cli: &Cli, mut config: StoreConfig) -> StoreConfig {
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }
    if let Some(path) = &cli.store {
        config = config.with_path(path);
    }
    config
}

fn open(config: &StoreConfig) -> Result<CredentialConsumer> {
    Ok(CredentialConsumer::open(config)?)
}

fn done(format: OutputFormat, message: String) -> Result<()> {
    if format.is_json() {
        print_json(&json!({ "status": "ok", "message": message }))
    } else {
        println!("{message}");
        Ok(())
    }
}

// ── store ───────────────────────────────────────────────────────────────────

fn store(cmd: StoreCommand, config: &StoreConfig, format: OutputFormat) -> Result<()> {
    match cmd {
        StoreCommand::Info => {
            let consumer = open(config)?;
            let tree = consumer.tree();
            let settings = settings_path()?;
            let info = json!({
                "settings": settings,
                "backend": config.backend.to_string(),
                "path": config.path,
                "exists": config.path.exists(),
                "schema_version": CURRENT_SCHEMA_VERSION,
                "autosave": config.autosave,
                "domains": tree.domains.len(),
                "users": tree.user_count(),
                "tokens": tree.token_count(),
                "default_domain": Some(consumer.get_default_domain()).filter(|d| !d.is_empty()),
                "default_client_secrets": consumer.default_client_secrets_exist(),
            });

            if format.is_json() {
                return print_json(&info);
            }
            println!("Store:    {}", consumer.persistence());
            println!("Backend:  {}", config.backend);
            println!("Settings: {}", settings.display());
            println!("Schema:   v{}", CURRENT_SCHEMA_VERSION);
            println!(
                "Contents: {} domains, {} users, {} tokens",
                tree.domains.len(),
                tree.user_count(),
                tree.token_count()
            );
            println!("Default domain: {}", or_unset(consumer.get_default_domain()));
            println!(
                "Default client secrets: {}",
                if consumer.default_client_secrets_exist() { "set" } else { "(unset)" }
            );
            Ok(())
        }
        StoreCommand::Migrate { to, target } => {
            let mut destination = config.clone().with_backend(to);
            if let Some(path) = target {
                destination = destination.with_path(path);
            }
            if destination.path == config.path {
                bail!(
                    "Destination {} is the current store; pass --target",
                    destination.path.display()
                );
            }

            let from = persistence::open_port(config)?;
            let into = persistence::open_port(&destination)?;
            let copied = persistence::copy_tree(from.as_ref(), into.as_ref())
                .with_context(|| format!("Failed to migrate {}", from.describe()))?;

            if copied {
                done(format, format!("Copied {} to {}", from.describe(), into.describe()))
            } else {
                done(format, format!("{} is empty; nothing to migrate", from.describe()))
            }
        }
    }
}

// ── domains ─────────────────────────────────────────────────────────────────

fn domain(cmd: DomainCommand, c: &mut CredentialConsumer, format: OutputFormat) -> Result<()> {
    match cmd {
        DomainCommand::List => {
            let domains: Vec<DomainView> =
                c.get_all_domains().into_iter().map(DomainView::from).collect();
            if format.is_json() {
                return print_json(&domains);
            }
            if domains.is_empty() {
                println!("No domains.");
            }
            let default = c.get_default_domain();
            for d in &domains {
                let marker = if d.name == default { " (default)" } else { "" };
                println!("{}{}  {} users", d.name, marker, d.users.len());
            }
            Ok(())
        }
        DomainCommand::Show { name } => {
            let d = c
                .get_domain(&name)
                .ok_or_else(|| CredentialError::DomainNotFound(name.clone()))?;
            let view = DomainView::from(d);
            if format.is_json() {
                return print_json(&view);
            }
            println!("Domain:       {}", view.name);
            println!("Default user: {}", view.default_user.as_deref().unwrap_or("(unset)"));
            for u in &view.users {
                print_user(u);
            }
            Ok(())
        }
        DomainCommand::Set { name, default_user } => {
            // replacing keeps the users already recorded
            let mut domain = c.get_domain(&name).cloned().unwrap_or_else(|| Domain::new(&name));
            if let Some(user) = default_user {
                domain.default_user = user;
            }
            c.set_domain(domain)?;
            done(format, format!("Set domain {name}"))
        }
        DomainCommand::Remove { name } => {
            c.remove_domain(&name)?;
            done(format, format!("Removed domain {name}"))
        }
        DomainCommand::RemoveAll { yes } => {
            if !yes {
                bail!("Refusing to remove every domain without --yes");
            }
            c.remove_all_domains()?;
            done(format, "Removed all domains".to_string())
        }
    }
}

fn default_domain(
    cmd: DefaultDomainCommand,
    c: &mut CredentialConsumer,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        DefaultDomainCommand::Get => {
            let name = c.get_default_domain();
            if format.is_json() {
                return print_json(&json!({ "default_domain": Some(name).filter(|n| !n.is_empty()) }));
            }
            println!("{}", or_unset(name));
            Ok(())
        }
        DefaultDomainCommand::Set { name } => {
            if !c.domain_exists(&name) {
                tracing::warn!("Default domain {} is not in the store yet", name);
            }
            c.set_default_domain(&name)?;
            done(format, format!("Default domain is now {name}"))
        }
        DefaultDomainCommand::Clear => {
            c.remove_default_domain()?;
            done(format, "Cleared the default domain".to_string())
        }
    }
}

// ── users ───────────────────────────────────────────────────────────────────

fn user(cmd: UserCommand, c: &mut CredentialConsumer, format: OutputFormat) -> Result<()> {
    match cmd {
        UserCommand::List { domain } => {
            let users = match &domain {
                Some(d) => c.get_all_users_in(d),
                None => c.get_all_users(),
            };
            let views: Vec<UserView> = users.into_iter().map(UserView::from).collect();
            if format.is_json() {
                return print_json(&views);
            }
            if views.is_empty() {
                println!("No users.");
            }
            views.iter().for_each(print_user);
            Ok(())
        }
        UserCommand::Set { domain, user } => {
            // keep tokens and secrets of an existing user
            let existing = c
                .get_user(&domain, &user)
                .cloned()
                .unwrap_or_else(|| DomainUser::new(&domain, &user));
            c.set_user(&domain, existing)?;
            done(format, format!("Set user {user}@{domain}"))
        }
        UserCommand::Remove { domain, user } => {
            c.remove_user(&domain, &user)?;
            done(format, format!("Removed user {user}@{domain}"))
        }
    }
}

fn default_user(
    cmd: DefaultUserCommand,
    c: &mut CredentialConsumer,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        DefaultUserCommand::Get { domain } => {
            let domain = c.resolve_domain(domain.as_deref())?;
            let user = c.get_default_user(&domain);
            if format.is_json() {
                return print_json(&json!({
                    "domain": domain,
                    "default_user": Some(user).filter(|u| !u.is_empty()),
                }));
            }
            println!("{}", or_unset(user));
            Ok(())
        }
        DefaultUserCommand::Set { domain, user } => {
            c.set_default_user(&domain, &user)?;
            done(format, format!("Default user of {domain} is now {user}"))
        }
        DefaultUserCommand::Clear { domain } => {
            c.remove_default_user(&domain)?;
            done(format, format!("Cleared the default user of {domain}"))
        }
    }
}

// ── secrets ─────────────────────────────────────────────────────────────────

fn secrets(cmd: SecretsCommand, c: &mut CredentialConsumer, format: OutputFormat) -> Result<()> {
    match cmd {
        SecretsCommand::Default(DefaultSecretsCommand::Show) => {
            show_secrets(c.get_default_client_secrets(), format)
        }
        SecretsCommand::Default(DefaultSecretsCommand::Set(args)) => {
            c.set_default_client_secrets(client_secrets(args))?;
            done(format, "Set the default client secrets".to_string())
        }
        SecretsCommand::Default(DefaultSecretsCommand::Clear) => {
            c.remove_default_client_secrets()?;
            done(format, "Cleared the default client secrets".to_string())
        }
        SecretsCommand::User(UserSecretsCommand::Show { domain, user }) => {
            show_secrets(c.get_client_secrets(&domain, &user), format)
        }
        SecretsCommand::User(UserSecretsCommand::Set {
            domain,
            user,
            secrets,
        }) => {
            c.set_client_secrets(&domain, &user, client_secrets(secrets))?;
            done(format, format!("Set client secrets for {user}@{domain}"))
        }
        SecretsCommand::User(UserSecretsCommand::Clear { domain, user }) => {
            c.remove_client_secrets(&domain, &user)?;
            done(format, format!("Cleared client secrets for {user}@{domain}"))
        }
        SecretsCommand::Resolve { domain, user } => {
            let target = c.resolve_target(domain.as_deref(), user.as_deref())?;
            let resolved = c.resolve_client_secrets(&target.domain, &target.user)?;
            let view = SecretsView::from(resolved.secrets);
            if format.is_json() {
                return print_json(&json!({
                    "target": target,
                    "source": resolved.source,
                    "secrets": view,
                }));
            }
            println!("{}@{}", target.user, target.domain);
            println!("  client_id:     {}", view.client_id);
            println!("  client_secret: {}", view.client_secret);
            println!("  source:        {:?}", resolved.source);
            Ok(())
        }
    }
}

fn client_secrets(args: SecretsArgs) -> ClientSecrets {
    ClientSecrets::new(args.client_id, args.client_secret)
}

fn show_secrets(secrets: Option<&ClientSecrets>, format: OutputFormat) -> Result<()> {
    let view = secrets.map(SecretsView::from);
    if format.is_json() {
        return print_json(&view);
    }
    match view {
        Some(v) => {
            println!("client_id:     {}", v.client_id);
            println!("client_secret: {}", v.client_secret);
        }
        None => println!("(unset)"),
    }
    Ok(())
}

// ── tokens ──────────────────────────────────────────────────────────────────

fn token(cmd: TokenCommand, c: &mut CredentialConsumer, format: OutputFormat) -> Result<()> {
    match cmd {
        TokenCommand::Show { domain, user, api } => {
            let info = c
                .get_token_info(&domain, &user, &api)
                .with_context(|| format!("No {api} token stored for {user}@{domain}"))?;
            let view = TokenView::new(&api, info);
            if format.is_json() {
                return print_json(&view);
            }
            println!("{} for {}@{}", view.api, user, domain);
            println!("  access_token:  {}", view.access_token);
            println!("  refresh_token: {}", if view.has_refresh_token { "yes" } else { "no" });
            println!("  issued:        {}", view.issued_utc);
            match view.expires_at {
                Some(at) if view.expired => println!("  expires:       {at} (expired)"),
                Some(at) => println!("  expires:       {at}"),
                None => println!("  expires:       never"),
            }
            println!("  scopes:        {}", view.scopes.join(" "));
            Ok(())
        }
        TokenCommand::Remove { domain, user, api } => {
            c.remove_token_and_scopes(&domain, &user, &api)?;
            done(format, format!("Removed {api} token for {user}@{domain}"))
        }
    }
}

fn print_user(u: &UserView) {
    let secrets = if u.has_client_secrets { ", own client secrets" } else { "" };
    println!("  {}@{}  {} tokens{}", u.user, u.domain, u.apis.len(), secrets);
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
