use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bili_relations_rs::export::write_exports;
use bili_relations_rs::import::read_import;
use bili_relations_rs::login::{
    self, COOKIE_ENV, EnvCredentialSource, LOGIN_TIMEOUT, PromptCredentialSource,
};
use bili_relations_rs::{
    BulkEvent, BulkOperation, Error, RelationAction, RelationClient, RelationRecord, WreqTransport,
};

const PREVIEW_COUNT: usize = 10;

fn usage(program: &str) {
    eprintln!("Usage: {} [--config PATH] <command> [args]", program);
    eprintln!("Commands:");
    eprintln!("  login            paste browser cookies (or set {}) and write the config", COOKIE_ENV);
    eprintln!("  info             show the logged-in account");
    eprintln!("  stats            count followings and list the most recent ones");
    eprintln!("  export [DIR]     write raw and NewPipe exports of the following list");
    eprintln!("  unfollow-all     unfollow every account after confirmation");
    eprintln!("  import <FILE>    follow every account in an exported JSON file");
    eprintln!("  unfollow <ID>... unfollow the given accounts");
    eprintln!("  follow <ID>...   follow the given accounts");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bili_relations_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config_path = env::var("BILI_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if pos + 1 >= args.len() {
            usage(&program);
            std::process::exit(1);
        }
        config_path = PathBuf::from(args.remove(pos + 1));
        args.remove(pos);
    }

    let Some(command) = args.first().cloned() else {
        usage(&program);
        std::process::exit(1);
    };

    if command == "login" {
        return run_login(&config_path).await;
    }

    let client = match RelationClient::from_path(&config_path) {
        Ok(client) => client,
        Err(e @ Error::ConfigMissing { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("Run `{} login` first.", program);
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to initialize client")),
    };

    match command.as_str() {
        "info" => show_user(&client).await,
        "stats" => show_stats(&client).await,
        "export" => {
            let dir = args.get(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            export(&client, &dir).await
        }
        "unfollow-all" => {
            let operation = client
                .unfollow_all()
                .confirm(|count| confirm_on_stdin(RelationAction::Unfollow, count));
            run_bulk(operation).await
        }
        "import" => {
            let file = args.get(1).context("missing import file")?;
            let candidates = read_import(file)
                .with_context(|| format!("Failed to read import file {}", file))?;
            if candidates.is_empty() {
                bail!("{} contains no account ids", file);
            }
            let operation = client
                .bulk(RelationAction::Follow, candidates)
                .confirm(|count| confirm_on_stdin(RelationAction::Follow, count));
            run_bulk(operation).await
        }
        "unfollow" | "follow" => {
            let action = if command == "follow" {
                RelationAction::Follow
            } else {
                RelationAction::Unfollow
            };
            let ids = args[1..]
                .iter()
                .map(|arg| arg.parse::<u64>())
                .collect::<Result<Vec<_>, _>>()
                .context("account ids must be numbers")?;
            match ids.as_slice() {
                [] => bail!("missing account id"),
                [id] => {
                    if !client.mutate(*id, action).await {
                        bail!("{} {} failed", action, id);
                    }
                    println!("{} {}: ok", action, id);
                    Ok(())
                }
                _ => {
                    let candidates = ids
                        .iter()
                        .map(|&id| RelationRecord::new(id, id.to_string()))
                        .collect();
                    let operation = client
                        .bulk(action, candidates)
                        .confirm(move |count| confirm_on_stdin(action, count));
                    run_bulk(operation).await
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            usage(&program);
            std::process::exit(1);
        }
    }
}

async fn run_login(config_path: &Path) -> Result<()> {
    let config = if env::var(COOKIE_ENV).is_ok() {
        login::setup_config(&EnvCredentialSource::new(), config_path, LOGIN_TIMEOUT).await?
    } else {
        login::setup_config(&PromptCredentialSource, config_path, LOGIN_TIMEOUT).await?
    };
    let Some(config) = config else {
        bail!("login failed: SESSDATA and bili_jct cookies are required");
    };

    let client = RelationClient::new(config)?;
    let user = client
        .user_info()
        .await
        .context("credentials saved but the account check failed")?;
    println!("Logged in as {} (ID: {})", user.uname, user.mid);
    Ok(())
}

async fn show_user(client: &RelationClient) -> Result<()> {
    let user = client
        .user_info()
        .await
        .context("Login check failed; credentials may have expired")?;
    println!("User:  {}", user.uname);
    println!("ID:    {}", user.mid);
    println!("Coins: {}", user.money.unwrap_or(0.0));
    println!("Level: {}", user.level());
    Ok(())
}

async fn show_stats(client: &RelationClient) -> Result<()> {
    let following = client.list_all().await;
    if following.is_empty() {
        println!("No followings found");
        return Ok(());
    }

    println!("Following: {}", following.len());
    println!("Most recent:");
    for (i, user) in following.iter().take(PREVIEW_COUNT).enumerate() {
        println!("  {}. {} (ID: {})", i + 1, user.uname, user.mid);
    }
    if following.len() > PREVIEW_COUNT {
        println!("  ... and {} more", following.len() - PREVIEW_COUNT);
    }
    Ok(())
}

async fn export(client: &RelationClient, dir: &Path) -> Result<()> {
    let following = client.list_all().await;
    let paths = write_exports(dir, &following, chrono::Local::now())
        .with_context(|| format!("Failed to write export to {}", dir.display()))?;
    println!("Exported {} followings", following.len());
    println!("  raw:     {}", paths.raw.display());
    println!("  newpipe: {}", paths.newpipe.display());
    Ok(())
}

/// Ask on stdin until the answer is yes or no.
fn confirm_on_stdin(action: RelationAction, count: usize) -> bool {
    println!();
    println!("About to {} {} accounts. This cannot be undone.", action, count);
    let stdin = io::stdin();
    loop {
        print!("Continue? (yes/no): ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match line.trim().to_lowercase().as_str() {
            "yes" | "y" => return true,
            "no" | "n" => return false,
            _ => println!("Please answer 'yes' or 'no'"),
        }
    }
}

async fn run_bulk(operation: BulkOperation<'_, WreqTransport>) -> Result<()> {
    let outcome = operation
        .on_event(|event| {
            if let BulkEvent::Item {
                index,
                total,
                name,
                succeeded,
                ..
            } = event
            {
                let mark = if *succeeded { "ok" } else { "FAILED" };
                println!("[{}/{}] {} {}", index, total, name, mark);
            }
        })
        .run()
        .await;

    if outcome.cancelled {
        println!("Cancelled");
        return Ok(());
    }

    println!("Total:     {}", outcome.total);
    println!("Succeeded: {}", outcome.success);
    println!("Failed:    {}", outcome.failed);
    if outcome.failed > 0 {
        println!(
            "{} accounts could not be changed (network problems or API limits)",
            outcome.failed
        );
    }
    Ok(())
}
