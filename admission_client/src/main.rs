//! Command-line client for the admission API.
//!
//! Keeps the session in a JSON file between runs, the way the web client
//! keeps it in browser storage.

use admission_client::{
    api_client::ApiClient,
    session::{AdminStatus, SessionManager},
    store::FileStore,
};
use anyhow::{Context, Result};
use pico_args::Arguments;
use std::io::{self, Write};
use std::sync::Arc;

const HELP: &str = "\
Talk to an admission API server

USAGE:
  admission_client [OPTIONS] <COMMAND>

COMMANDS:
  login                 Log in and store the session
  logout                Clear the stored session
  status                Show the stored session
  admin-check           Check admin access with the stored token
  announcements         List announcements with the stored token

OPTIONS:
  --server URL          Server URL  [default: http://localhost:8080]
  --session-file PATH   Session file  [default: .admission_session.json]
  --email EMAIL         Email for login
  --password PASS       Password for login

FLAGS:
  -h, --help            Print help information
";

struct Args {
    server_url: String,
    session_file: String,
    email: Option<String>,
    password: Option<String>,
    command: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .opt_value_from_str("--server")?
            .unwrap_or_else(|| "http://localhost:8080".to_string()),
        session_file: pargs
            .opt_value_from_str("--session-file")?
            .unwrap_or_else(|| ".admission_session.json".to_string()),
        email: pargs.opt_value_from_str("--email")?,
        password: pargs.opt_value_from_str("--password")?,
        command: pargs
            .free_from_str()
            .context("Missing command, see --help")?,
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let store = FileStore::open(&args.session_file)?;
    let session = SessionManager::new(ApiClient::new(args.server_url), Arc::new(store));

    match args.command.as_str() {
        "login" => {
            let email = match args.email {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = match args.password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };

            println!("Logging in as {}...", email);
            let pending = session
                .login(&email, &password)
                .await
                .context("Login failed")?;
            println!(
                "Login successful! Token valid for {} seconds.",
                pending.response.expires_in
            );
            print_admin_status(pending.admin_status().await);
        }
        "logout" => {
            session.logout().await?;
            println!("Logged out.");
        }
        "status" => match session.current_user() {
            Some(user) => {
                println!("Logged in as {} ({})", user.email, user.id);
                print_admin_status(session.admin_status());
            }
            None => println!("Not logged in."),
        },
        "admin-check" => {
            let status = session
                .api()
                .admin_check(session.token().as_deref())
                .await
                .context("Admin check failed")?;
            println!("Admin endpoint answered {}", status);
        }
        "announcements" => {
            let token = session.token().context("Not logged in")?;
            let announcements = session
                .api()
                .list_announcements(&token)
                .await
                .context("Failed to list announcements")?;

            if announcements.is_empty() {
                println!("No announcements.");
            }
            for announcement in announcements {
                println!(
                    "[{}] {}\n  {}",
                    announcement.publish_date, announcement.title, announcement.body
                );
            }
        }
        other => anyhow::bail!("Unknown command '{}', see --help", other),
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_admin_status(status: AdminStatus) {
    match status {
        AdminStatus::Admin => println!("Administrator: yes"),
        AdminStatus::NotAdmin => println!("Administrator: no"),
        AdminStatus::Unknown => println!("Administrator: unknown"),
    }
}
