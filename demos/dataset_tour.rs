//! Example walking through the main client operations.
//!
//! This example shows how to:
//! - Build a client from DATA_GOV_IN_* environment variables
//! - Summarize a dataset before fetching it
//! - Page through records
//! - Filter records by field value
//! - Watch the response cache absorb repeated reads
//!
//! Run with: `DATA_GOV_IN_API_KEY=<key> cargo run --example dataset_tour`

use datagovin::{Client, FetchParams};

// Current daily price of various commodities, the sample resource from the
// data.gov.in API documentation.
const RESOURCE: &str = "9ef84268-d588-465a-a308-a864a43d0070";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("datagovin=debug")
        .init();

    let client = Client::from_env()?;
    let info = client.server_info();
    println!("=== {} v{} ===", info.server, info.version);
    println!("API key configured: {}\n", info.api_key_configured);

    println!("=== Dataset Summary ===");
    let summary = client.get_dataset_summary(RESOURCE).await?;
    println!("Total records: {}", summary.total_records);
    println!("Fields ({}): {:?}\n", summary.field_count, summary.fields);

    println!("=== First Page ===");
    let page = client.paginate_dataset(RESOURCE, 1, 5).await?;
    println!(
        "Page {}/{} ({} records per page)",
        page.pagination.current_page, page.pagination.total_pages, page.pagination.page_size
    );
    for record in &page.records {
        println!("  {}", serde_json::to_string(record)?);
    }
    println!();

    println!("=== Client-side Filter ===");
    let filtered = client
        .filter_dataset(RESOURCE, "state", "Kerala", Some(50))
        .await?;
    println!(
        "{} of the first 50 records match {:?}\n",
        filtered.matched_records, filtered.filter
    );

    println!("=== Cache Behavior ===");
    // Both windows repeat fetches from above, so they come out of the cache.
    let _ = client
        .get_dataset(RESOURCE, &FetchParams::new().with_limit(5))
        .await?;
    let _ = client
        .get_dataset(RESOURCE, &FetchParams::new().with_limit(5))
        .await?;
    if let Some(stats) = client.cache_statistics().stats {
        println!(
            "{} entries, {} hits / {} misses ({} hit rate)",
            stats.size, stats.hits, stats.misses, stats.hit_rate
        );
    }

    Ok(())
}
