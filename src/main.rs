//! Notes client - terminal client for the notes platform.
//!
//! Reads line commands from stdin, turns them into typed commands for the
//! dispatch layer, and prints rendered outcomes. Configuration comes from
//! the environment:
//!
//! - `NOTES_SERVER`: backend base address (default http://127.0.0.1:5000)
//! - `NOTES_PROFILE_DIR`: profile database directory (default .notes_client)
//! - `RUST_LOG`: tracing filter

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use notes_client::{
    render, AppState, Client, ClientConfig, Command, FormField, NoteField, Outcome, SERVER_ENV,
};

const HELP: &str = "\
Commands:
  login <email> <password>      authenticate
  logout                        end the session
  home | library                switch views
  category <key>                list notes in a category
  open <id>                     open a note (fresh fetch)
  search <query>                search suggestions (2+ characters)
  edit-title <id> <text>        live-edit: title region lost focus
  edit-content <id> <text>      live-edit: content region lost focus
  add                           open the note form (admin)
  edit <id>                     open the note form pre-filled (admin)
  set title|category|content <value>   fill a form field
  submit | cancel               submit or close the form
  delete                        delete the open note (asks to confirm)
  yes | no                      answer a pending confirmation
  stats                         admin dashboard
  passwd <current> <new> <confirm>     change password
  help | quit";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid {} value: {}", SERVER_ENV, err);
            std::process::exit(1);
        }
    };

    println!("Notes client — server {}", config.server);

    let state = AppState::new(&config).expect("Failed to initialize client");
    if let Some((user, _)) = state.session.restore() {
        println!("Restored session for {} ({})", user.email, user.role);
    }

    let mut client = Client::new(state);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "help" {
            println!("{}", HELP);
            continue;
        }

        let Some(command) = parse_command(line) else {
            println!("Unknown command (try 'help').");
            continue;
        };

        run(&mut client, command).await;

        if let Some(notice) = client.take_notice() {
            println!("{}", notice);
        }
    }
}

async fn run(client: &mut Client, command: Command) {
    match client.dispatch(command).await {
        Ok(outcome) => {
            let text = render::outcome(&outcome);
            if !text.is_empty() {
                println!("{}", text);
            }
            // Admins land on the dashboard straight after login.
            if let Outcome::LoggedIn(user) = &outcome {
                if user.role.is_admin() {
                    match client.dispatch(Command::ShowDashboard).await {
                        Ok(dash) => println!("{}", render::outcome(&dash)),
                        Err(err) => println!("Error: {}", err),
                    }
                }
            }
        }
        Err(err) => println!("Error: {}", err),
    }
}

// ============================================================================
// Command Parsing
// ============================================================================

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;

    match verb {
        "login" => {
            let email = parts.next()?.to_string();
            let password = parts.next()?.to_string();
            Some(Command::Login { email, password })
        }
        "logout" => Some(Command::Logout),
        "home" => Some(Command::ShowHome),
        "library" => Some(Command::ShowLibrary),
        "category" => Some(Command::OpenCategory {
            key: parts.next()?.to_string(),
        }),
        "open" => Some(Command::OpenNote {
            id: parts.next()?.parse().ok()?,
        }),
        "search" => Some(Command::Search {
            query: rest_of(line, "search"),
        }),
        "edit-title" | "edit-content" => {
            let id: u64 = parts.next()?.parse().ok()?;
            let value = parts.collect::<Vec<_>>().join(" ");
            let field = if verb == "edit-title" {
                NoteField::Title
            } else {
                NoteField::Content
            };
            Some(Command::Blur {
                note_id: id,
                field,
                value,
            })
        }
        "add" => Some(Command::OpenModal { note_id: None }),
        "edit" => Some(Command::OpenModal {
            note_id: Some(parts.next()?.parse().ok()?),
        }),
        "set" => {
            let field = match parts.next()? {
                "title" => FormField::Title,
                "category" => FormField::Category,
                "content" => FormField::Content,
                _ => return None,
            };
            let value = parts.collect::<Vec<_>>().join(" ");
            Some(Command::FormInput { field, value })
        }
        "submit" => Some(Command::SubmitModal),
        "cancel" => Some(Command::CloseModal),
        "delete" => Some(Command::RequestDelete),
        "yes" => Some(Command::ConfirmDelete { confirmed: true }),
        "no" => Some(Command::ConfirmDelete { confirmed: false }),
        "stats" => Some(Command::ShowDashboard),
        "passwd" => {
            let current = parts.next()?.to_string();
            let new = parts.next()?.to_string();
            let confirm = parts.next()?.to_string();
            Some(Command::ChangePassword {
                current,
                new,
                confirm,
            })
        }
        _ => None,
    }
}

/// Everything after the verb, whitespace preserved except the leading gap.
fn rest_of(line: &str, verb: &str) -> String {
    line[verb.len()..].trim_start().to_string()
}
