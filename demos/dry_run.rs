use anyhow::Result;
use bili_relations_rs::{BulkEvent, BulkState, ClientConfig, RelationClient};

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let mut config = ClientConfig::load(&path)?;
    config.settings.dry_run = true;
    config.settings.dry_run_limit = 3;

    let client = RelationClient::new(config)?;
    let user = client.user_info().await?;
    println!("Account: {} (ID: {})", user.uname, user.mid);

    let outcome = client
        .unfollow_all()
        .confirm(|count| {
            println!("Would unfollow {} accounts", count);
            true
        })
        .on_event(|event| match event {
            BulkEvent::State(BulkState::Executing) => println!("Simulating..."),
            BulkEvent::Item {
                index, total, name, ..
            } => println!("  [{}/{}] {}", index, total, name),
            _ => {}
        })
        .run()
        .await;

    println!(
        "Dry run finished: {} simulated, {} failed",
        outcome.success, outcome.failed
    );
    Ok(())
}
