/// Example HTTP client for the relations server API
///
/// Run the server first (set `"test_mode": true` in config.json to keep it harmless):
/// ```bash
/// cargo run --bin server
/// ```
///
/// Then run this example:
/// ```bash
/// cargo run --example api_client
/// ```

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct BulkRequest {
    confirm_count: usize,
}

#[derive(Deserialize, Debug)]
struct HealthResponse {
    status: String,
    version: String,
    dry_run: bool,
}

#[derive(Deserialize, Debug)]
struct UserResponse {
    data: UserData,
}

#[derive(Deserialize, Debug)]
struct UserData {
    mid: u64,
    uname: String,
}

#[derive(Deserialize, Debug)]
struct FollowingResponse {
    count: usize,
    data: Vec<UserData>,
}

#[derive(Deserialize, Debug)]
struct BulkResponse {
    success: bool,
    data: BulkOutcome,
}

#[derive(Deserialize, Debug)]
struct BulkOutcome {
    total: usize,
    success: usize,
    failed: usize,
    dry_run: bool,
}

#[derive(Deserialize, Debug)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = reqwest::Client::new();

    println!("=== Relations HTTP API Client Demo ===\n");

    // 1. Health Check
    println!("1. Checking server health...");
    let health: HealthResponse = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Server status: {}", health.status);
    println!("   Version: {}", health.version);
    println!("   Dry run: {}\n", health.dry_run);

    // 2. Account
    println!("2. Checking the logged-in account...");
    let response = client.get(format!("{}/api/user", base_url)).send().await?;
    if response.status().is_success() {
        let user: UserResponse = response.json().await?;
        println!("   {} (ID: {})\n", user.data.uname, user.data.mid);
    } else {
        println!("   Error: {}\n", response.text().await?);
        return Ok(());
    }

    // 3. Following list
    println!("3. Fetching the following list...");
    let following: FollowingResponse = client
        .get(format!("{}/api/following", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Following {} accounts", following.count);
    for user in following.data.iter().take(5) {
        println!("   - {} ({})", user.uname, user.mid);
    }
    println!();

    // 4. Bulk unfollow, only against a dry-run server
    if health.dry_run {
        println!("4. Running bulk unfollow (dry run)...");
        let request = BulkRequest {
            confirm_count: following.count,
        };
        let result: BulkResponse = client
            .post(format!("{}/api/unfollow-all", base_url))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        if result.success {
            println!(
                "   total {}, succeeded {}, failed {} (dry run: {})\n",
                result.data.total, result.data.success, result.data.failed, result.data.dry_run
            );
        } else {
            // dry runs are capped, so the server asks for the capped count
            println!("   Declined: server expected {} accounts\n", result.data.total);
        }
    } else {
        println!("4. Skipping bulk unfollow: server is not in dry-run mode\n");
    }

    // 5. Get Metrics
    println!("5. Getting server metrics...");
    let metrics: MetricsResponse = client
        .get(format!("{}/api/metrics", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Total requests: {}", metrics.total_requests);
    println!("   Requests in flight: {}", metrics.requests_in_flight);
    println!("   Uptime: {} seconds\n", metrics.uptime_seconds);

    println!("=== Demo Complete ===");

    Ok(())
}
