//! CLI command execution.
//!
//! Each command builds one client, loads the stored session, and only asks
//! for credentials when the session won't do.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::debug;

use compendium::client::CompendiumClient;
use compendium::config::ClientConfig;
use compendium::markup::fix_styles_with_base;
use compendium::models::{Credentials, SearchResultRow};
use compendium::session::SessionStore;

use super::args::{Cli, Commands};

/// Searches shorter than this are refused; the server returns everything.
const MIN_QUERY_LENGTH: usize = 2;

/// Credentials as given on the command line or in the environment.
#[derive(Debug, Default)]
struct CredentialArgs {
    email: Option<String>,
    password: Option<String>,
}

impl CredentialArgs {
    /// Fill in whatever is missing from `prompter`, or give up when there is
    /// no one to ask.
    fn resolve(self, prompter: Option<&dyn CredentialPrompt>) -> Result<Option<Credentials>> {
        let email = match (self.email, prompter) {
            (Some(email), _) => email,
            (None, Some(prompter)) => prompter.email()?,
            (None, None) => return Ok(None),
        };
        let password = match (self.password, prompter) {
            (Some(password), _) => password,
            (None, Some(prompter)) => prompter.password()?,
            (None, None) => return Ok(None),
        };
        Ok(Some(Credentials::new(email, password)))
    }
}

/// Source of credentials the user didn't pass up front.
trait CredentialPrompt {
    fn email(&self) -> Result<String>;
    fn password(&self) -> Result<String>;
}

/// Asks on the terminal. The password is read without echo.
struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn email(&self) -> Result<String> {
        eprint!("Email: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }

    fn password(&self) -> Result<String> {
        rpassword::prompt_password("Password: ").context("Failed to read password")
    }
}

/// Make sure the client has credentials before a login. Returns whether it
/// does.
fn provide_credentials(client: &mut CompendiumClient, args: CredentialArgs) -> Result<bool> {
    if client.has_credentials() {
        return Ok(true);
    }
    let prompter = io::stdin().is_terminal().then_some(&TerminalPrompt as &dyn CredentialPrompt);
    match args.resolve(prompter)? {
        Some(credentials) => {
            client.set_credentials(credentials);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Trim a search query and refuse ones that are too short.
fn validate_query(keywords: &[String]) -> Result<String> {
    let query = keywords.join(" ").trim().to_string();
    if query.chars().count() < MIN_QUERY_LENGTH {
        bail!("Search needs at least {MIN_QUERY_LENGTH} characters");
    }
    Ok(query)
}

/// Render rows as a fixed-width table.
fn render_rows(rows: &[SearchResultRow]) -> String {
    let mut out = format!(
        "{:>6}  {:>3}  {:<36} {:<14} {:<12} {}\n",
        "ID", "L", "Name", "Combat Role", "Group Role", "Source"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>6}  {:>3}  {:<36} {:<14} {:<12} {}\n",
            row.id, row.level, row.name, row.combat_role, row.group_role, row.source_book
        ));
    }
    out
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    let data_dir = config.data_dir();

    let mut client = CompendiumClient::new(config).context("Failed to create HTTP client")?;
    if let Some(dir) = &data_dir {
        client = client.with_store(SessionStore::open(dir));
    }
    if client.load_session() {
        debug!("using stored session");
    }

    let credentials = CredentialArgs {
        email: cli.email,
        password: cli.password,
    };

    match cli.command {
        Commands::Login => login(&mut client, credentials).await,
        Commands::Status => {
            status(&client);
            Ok(())
        }
        Commands::Monster { id, raw, out, open } => {
            monster(&mut client, credentials, id, raw, out, open, data_dir.as_deref()).await
        }
        Commands::Search { keywords } => search(&mut client, credentials, &keywords).await,
        Commands::Css { out } => {
            let css = client
                .combined_detail_css()
                .await
                .context("Failed to fetch stylesheets")?;
            write_output(out.as_deref(), &css)
        }
        Commands::Logout => {
            client.clear_session();
            println!("Logged out.");
            Ok(())
        }
    }
}

async fn login(client: &mut CompendiumClient, credentials: CredentialArgs) -> Result<()> {
    if !provide_credentials(client, credentials)? {
        bail!("Credentials required: pass --email and --password or set COMPENDIUM_EMAIL and COMPENDIUM_PASSWORD");
    }
    client.login().await.context("Login failed")?;

    let content_url = client.config().endpoints.content_url(1);
    if client.is_valid(&content_url) {
        println!("Logged in.");
    } else {
        println!("Login finished but the session is not valid yet; check your credentials.");
    }
    Ok(())
}

fn status(client: &CompendiumClient) {
    let endpoints = &client.config().endpoints;
    let Some(session) = client.session() else {
        println!("No session stored.");
        return;
    };

    let now = Utc::now();
    println!("Cookies:");
    for cookie in session.iter() {
        let expiry = match cookie.expires {
            Some(at) if at <= now => format!("expired {}", at.format("%Y-%m-%d %H:%M")),
            Some(at) => format!("expires {}", at.format("%Y-%m-%d %H:%M")),
            None => "session".to_string(),
        };
        println!("  {:<24} {:<24} {}", cookie.name, cookie.domain, expiry);
    }

    let verdict = |valid: bool| if valid { "valid" } else { "invalid" };
    println!(
        "Content: {}",
        verdict(client.is_valid(&endpoints.content_url(1)))
    );
    println!("Search:  {}", verdict(client.is_valid(&endpoints.search)));
}

async fn monster(
    client: &mut CompendiumClient,
    credentials: CredentialArgs,
    id: i32,
    raw: bool,
    out: Option<PathBuf>,
    open: bool,
    data_dir: Option<&Path>,
) -> Result<()> {
    let url = client.config().endpoints.content_url(id);
    if !client.is_valid(&url) {
        provide_credentials(client, credentials)?;
    }

    let html = client
        .fetch_by_id(id)
        .await
        .with_context(|| format!("Failed to fetch monster {id}"))?
        .text()
        .await?;
    let html = if raw {
        html
    } else {
        fix_styles_with_base(&html, &client.config().endpoints.styles_base)
    };

    if !open {
        return write_output(out.as_deref(), &html);
    }

    let path = match (out, data_dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => dir.join(format!("monster-{id}.html")),
        (None, None) => std::env::temp_dir().join(format!("monster-{id}.html")),
    };
    write_output(Some(&path), &html)?;
    open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(())
}

async fn search(
    client: &mut CompendiumClient,
    credentials: CredentialArgs,
    keywords: &[String],
) -> Result<()> {
    let query = validate_query(keywords)?;

    // Searching never logs in by itself, so log in here when we can.
    let search_url = client.config().endpoints.search.clone();
    if !client.is_valid(&search_url) && provide_credentials(client, credentials)? {
        client.ensure_session(&search_url).await.context("Login failed")?;
    }

    let rows = client
        .search_rows(&query)
        .await
        .with_context(|| format!("Search for '{query}' failed"))?;

    if rows.is_empty() {
        println!("No monsters found.");
    } else {
        print!("{}", render_rows(&rows));
    }
    Ok(())
}
