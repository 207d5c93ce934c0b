use gatehouse::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Go(String),
    Login { user: String, password: String },
    Logout,
    Can(String),
    WhoAmI,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = words.collect();

    match (verb, rest.as_slice()) {
        ("go", [path]) => Ok(Command::Go((*path).to_string())),
        ("login", [user, password]) => Ok(Command::Login {
            user: (*user).to_string(),
            password: (*password).to_string(),
        }),
        ("logout", []) => Ok(Command::Logout),
        ("can", [capability]) => Ok(Command::Can((*capability).to_string())),
        ("whoami", []) => Ok(Command::WhoAmI),
        ("help", []) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(format!("unrecognized command {line:?}, try `help`")),
    }
}

const HELP: &str = "\
commands:
  go <path>                 navigate, e.g. `go /invoice`
  login <user> <password>   log in and resume the preserved route
  logout                    end the session
  can <capability>          check a capability, e.g. `can can_delete_invoice`
  whoami                    show session, location and locale
  quit";

// ---------------------------------------------------------------------------
// Portal bootstrap
// ---------------------------------------------------------------------------

async fn run_command(ctx: &AppContext<HttpBackend>, command: Command) -> Result<(), GatehouseError> {
    match command {
        Command::Go(path) => {
            let outcome = ctx.navigate(&path)?;
            match outcome {
                NavigationOutcome::Arrived(location) => println!("at {location}"),
                NavigationOutcome::Redirected { requested, to } => {
                    println!("{requested} is guarded, redirected to {to}")
                }
            }
        }
        Command::Login { user, password } => {
            let outcome = ctx.login(&user, &password).await?;
            println!(
                "logged in as {}, now at {}",
                outcome.session.identity,
                outcome.navigation.location()
            );
            if let Some(locale) = ctx.bootstrap_locale().await {
                println!("locale: {locale}");
            }
        }
        Command::Logout => {
            if let Some(outcome) = ctx.logout().await? {
                println!("logged out, now at {}", outcome.location());
            } else {
                println!("logged out");
            }
        }
        Command::Can(name) => {
            let snapshot = ctx.permissions().snapshot();
            let answer = if ctx.can(&name) { "yes" } else { "no" };
            let note = if snapshot.is_loaded() { "" } else { " (permissions not loaded)" };
            println!("{name}: {answer}{note}");
        }
        Command::WhoAmI => {
            let session = ctx.session();
            match session.identity() {
                Some(identity) if session.is_logged_in() => println!("user: {identity}"),
                _ => println!("user: anonymous"),
            }
            let location = ctx.router().current().map(|l| l.href());
            println!("location: {}", location.as_deref().unwrap_or("-"));
            println!("locale: {}", ctx.locale().as_deref().unwrap_or("-"));
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    init_tracing(&config.log_filter);

    let evidence = std::env::var("GATEHOUSE_EVIDENCE").unwrap_or_default();
    let backend = HttpBackend::new(config.http())?.with_evidence(&evidence);
    tracing::info!(base_url = %config.base_url, "starting invoice portal");

    let ctx = AppContextBuilder::new()
        .config(config)
        .evidence(&evidence)
        .reloader(|| tracing::info!("session reset, cached views dropped"))
        .build(backend);
    ctx.start().await;

    let home = ctx.router().guard().table().home_route().path.clone();
    run_command(&ctx, Command::Go(home)).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(e) = run_command(&ctx, command).await {
                    println!("error: {e}");
                }
            }
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}
