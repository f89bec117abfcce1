//! `exeloka`: command-line front end for the Exeloka dashboard API.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config (`-f` path or `config/default.toml`)
//!   4. Init logger (`-v` flags win over the configured level)
//!   5. Build the client and restore any stored session
//!   6. Run one command, print client notices to stderr

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, NaiveDateTime};
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info};

use exeloka_client::api::models::{DocumentQuery, ListQuery, RecommendationQuery, SearchFilters};
use exeloka_client::client::{ApiClient, ClientEvent};
use exeloka_client::error::AppError;
use exeloka_client::{config, insight, logger};

struct Args {
    config: Option<String>,
    verbosity: u8,
    command: Option<String>,
    rest: Vec<String>,
}

fn parse_args() -> Result<Args, AppError> {
    let mut config = None;
    let mut verbosity = 0u8;
    let mut command = None;
    let mut rest = Vec::new();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-f" | "--config" => {
                config = Some(
                    iter.next()
                        .ok_or_else(|| AppError::Usage("-f needs a path".into()))?,
                );
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--" => {
                rest.extend(iter);
                break;
            }
            v if command.is_none() && v.len() > 1 && v.starts_with('-') && v[1..].chars().all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((v.len() - 1) as u8);
            }
            _ if command.is_none() => command = Some(arg),
            _ => rest.push(arg),
        }
    }

    Ok(Args { config, verbosity, command, rest })
}

fn print_help() {
    eprintln!("usage: exeloka [-f <config>] [-v...] <command> [args]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  login <email> <password>      sign in and store the session");
    eprintln!("  logout                        end the session");
    eprintln!("  whoami                        show the signed-in user");
    eprintln!("  projects                      list projects");
    eprintln!("  recommendations [--project N] list recommendations");
    eprintln!("  knowledge [query]             list sources, or search them");
    eprintln!("  documents                     list generated documents");
    eprintln!("  download <filename> [dir]     save a generated document");
    eprintln!("  analyze <project_type>        offline cultural insight table");
    #[cfg(feature = "legacy")]
    eprintln!("  legacy-projects [--mock]      list projects from the legacy API");
    eprintln!();
    eprintln!("flags:");
    eprintln!("  --config, -f <path>   config file (default: config/default.toml)");
    eprintln!("  -v, -vv, -vvv, -vvvv  warn / info / debug / trace logging");
    eprintln!("  --help, -h            print this help");
}

#[tokio::main]
async fn main() {
    let mut notices = Vec::new();
    if let Err(e) = run(&mut notices).await {
        if !already_reported(&e, &notices) {
            eprintln!("error: {e}");
        }
        process::exit(1);
    }
}

/// Notices printed during the run. Used to avoid printing the same failure
/// twice.
async fn run(notices: &mut Vec<String>) -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_args()?;
    let config = config::load(args.config.as_deref())?;

    match logger::level_for_verbosity(args.verbosity) {
        Some(level) => logger::init(level, true)?,
        None => logger::init(&config.log_level, false)?,
    }

    info!(
        base_url = %config.base_url,
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    let Some(command) = args.command.as_deref() else {
        print_help();
        return Err(AppError::Usage("missing command".into()));
    };

    // Offline commands need neither the client nor a session.
    if command == "analyze" {
        return analyze(&args.rest);
    }
    #[cfg(feature = "legacy")]
    if command == "legacy-projects" {
        return legacy_projects(&config, &args.rest).await;
    }

    let client = ApiClient::from_config(&config)?;
    let mut events = client.subscribe();

    let result = match client.restore().await {
        Ok(restored) => {
            debug!(signed_in = restored.is_some(), "session restored");
            dispatch(&client, command, &args.rest).await
        }
        Err(e) => Err(e.into()),
    };
    notices.extend(drain_notices(&mut events));
    result
}

async fn dispatch(client: &ApiClient, command: &str, rest: &[String]) -> Result<(), AppError> {
    match command {
        "login" => {
            let [email, password] = rest else {
                return Err(AppError::Usage("exeloka login <email> <password>".into()));
            };
            let user = client.auth().login(email, password).await?;
            println!("signed in as {} <{}>", user.display_name(), user.email);
        }
        "logout" => {
            client.auth().logout().await?;
            println!("signed out");
        }
        "whoami" => match client.session().current_user() {
            Some(user) => {
                println!("{} <{}>", user.display_name(), user.email);
                println!("  role: {}", user.role);
                if let Some(company) = &user.company_name {
                    println!("  organisation: {company}");
                }
            }
            None => println!("not signed in"),
        },
        "projects" => {
            let page = client.projects().list(&ListQuery::default()).await?;
            println!("projects ({}):", page.items.len());
            for p in &page.items {
                println!(
                    "  #{:<5} {:<40} {:<14} {}",
                    p.id,
                    p.title,
                    p.status.as_deref().unwrap_or("-"),
                    format_date(p.created_at.as_deref())
                );
            }
        }
        "recommendations" => {
            let project_id = match rest {
                [] => None,
                [flag, id] if flag == "--project" => Some(
                    id.parse::<i64>()
                        .map_err(|_| AppError::Usage(format!("bad project id '{id}'")))?,
                ),
                _ => return Err(AppError::Usage("exeloka recommendations [--project N]".into())),
            };
            let query = RecommendationQuery { project_id, ..RecommendationQuery::default() };
            let page = client.recommendations().list(&query).await?;
            println!("recommendations ({}):", page.items.len());
            for r in &page.items {
                println!(
                    "  #{:<5} {:<48} {:>5}  {}",
                    r.id,
                    r.title,
                    format_confidence(r.confidence_score),
                    format_date(r.created_at.as_deref())
                );
            }
        }
        "knowledge" => {
            if rest.is_empty() {
                let page = client.knowledge().sources(&Default::default()).await?;
                println!("knowledge sources ({}):", page.items.len());
                for s in &page.items {
                    println!("  #{:<5} {}", s.id, s.title);
                }
            } else {
                let query = rest.join(" ");
                let page = client.knowledge().search(&query, &SearchFilters::default()).await?;
                println!("matches for '{query}' ({}):", page.items.len());
                for hit in &page.items {
                    let score = hit
                        .relevance_score
                        .map(|s| format!("{s:.2}"))
                        .unwrap_or_else(|| "-".into());
                    println!("  #{:<5} {:<48} {score}", hit.id, hit.title);
                }
            }
        }
        "documents" => {
            let page = client.documents().list(&DocumentQuery::default()).await?;
            println!("documents ({}):", page.items.len());
            for d in &page.items {
                println!(
                    "  {:<48} {:<6} {}",
                    d.filename,
                    d.document_type.as_deref().unwrap_or("-"),
                    format_date(d.created_at.as_deref())
                );
            }
        }
        "download" => {
            let (filename, dir) = match rest {
                [name] => (name, PathBuf::from(".")),
                [name, dir] => (name, PathBuf::from(dir)),
                _ => return Err(AppError::Usage("exeloka download <filename> [dir]".into())),
            };
            let file = client.documents().download(filename).await?;
            let path = file.save_to(&dir).await?;
            println!("saved {} ({} bytes)", path.display(), file.bytes.len());
        }
        other => {
            return Err(AppError::Usage(format!(
                "unknown command: {other}\n  run 'exeloka --help' for usage"
            )));
        }
    }
    Ok(())
}

fn analyze(rest: &[String]) -> Result<(), AppError> {
    if rest.is_empty() {
        return Err(AppError::Usage("exeloka analyze <project_type>".into()));
    }
    let analysis = insight::analyze(&rest.join(" "));
    println!(
        "{} (confidence {}%, {})",
        analysis.category.as_str(),
        analysis.confidence_score,
        analysis.engine
    );
    for (heading, lines) in [
        ("key insights", analysis.key_insights),
        ("recommendations", analysis.recommendations),
        ("risks", analysis.potential_risks),
        ("cultural context", analysis.cultural_context),
        ("success metrics", analysis.success_metrics),
    ] {
        println!();
        println!("{heading}:");
        for line in lines {
            println!("  - {line}");
        }
    }
    Ok(())
}

#[cfg(feature = "legacy")]
async fn legacy_projects(config: &config::Config, rest: &[String]) -> Result<(), AppError> {
    use std::time::Duration;

    use exeloka_client::legacy::LegacyClient;

    let mut legacy = config.legacy.clone();
    match rest {
        [] => {}
        [flag] if flag == "--mock" => legacy.use_mock = true,
        _ => return Err(AppError::Usage("exeloka legacy-projects [--mock]".into())),
    }
    let client = LegacyClient::new(&legacy, Duration::from_secs(config.timeout_seconds))?;
    let projects = client.projects().await?;
    let items = projects.as_array().map(Vec::as_slice).unwrap_or_default();
    println!("legacy projects ({}):", items.len());
    for p in items {
        println!(
            "  #{:<5} {:<40} {}",
            p["id"],
            p["title"].as_str().unwrap_or("-"),
            p["status"].as_str().unwrap_or("-")
        );
    }
    Ok(())
}

/// Print pending client events and return the notice texts shown.
fn drain_notices(events: &mut Receiver<ClientEvent>) -> Vec<String> {
    let mut shown = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::Notice(message) => {
                eprintln!("! {message}");
                shown.push(message);
            }
            ClientEvent::LoginRequired => eprintln!("! session expired; run 'exeloka login'"),
            other => debug!(event = ?other, "client event"),
        }
    }
    shown
}

fn already_reported(err: &AppError, notices: &[String]) -> bool {
    match err {
        AppError::Api(api) => api.user_message().is_some_and(|m| notices.contains(&m)),
        _ => false,
    }
}

/// Backend scores are 0..1; shown as a whole percentage.
fn format_confidence(score: Option<f64>) -> String {
    match score {
        Some(c) => format!("{:.0}%", c * 100.0),
        None => "-".into(),
    }
}

/// `2024-01-15T10:30:00Z` or `2024-01-15 10:30:00` → `15 Jan 2024`.
fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "-".into();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d %b %Y").to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%d %b %Y").to_string();
        }
    }
    raw.to_string()
}
