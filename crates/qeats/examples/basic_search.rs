//! Basic restaurant search
//!
//! This example demonstrates the fundamental operations:
//! - Creating a searcher over generated fixture data
//! - Listing nearby open restaurants at peak and off-peak times
//! - Free-text search in both execution modes

use chrono::NaiveTime;
use qeats::{ExecutionMode, RestaurantSearcher, SearchConfigBuilder, SearchResult};
use qeats_store::TestDataConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    qeats::init_logging(tracing::Level::INFO)?;

    let config = SearchConfigBuilder::new().max_results(10).build();
    let searcher = RestaurantSearcher::from_test_data(&TestDataConfig::sample(), config)?;
    println!("{}", searcher.info().summary());

    let (lat, lon) = (12.9, 77.6);
    let breakfast = NaiveTime::from_hms_opt(9, 0, 0).ok_or("invalid time")?;
    let afternoon = NaiveTime::from_hms_opt(16, 0, 0).ok_or("invalid time")?;

    println!("\nOpen nearby at {breakfast} ({} km):", searcher.radius_for(breakfast));
    print_results(&searcher.all_nearby(lat, lon, breakfast)?, 5);

    println!("\nOpen nearby at {afternoon} ({} km):", searcher.radius_for(afternoon));
    print_results(&searcher.all_nearby(lat, lon, afternoon)?, 5);

    for query in ["Spicy", "Dragon Bowl", "Coffee"] {
        println!("\nSearching for '{query}' at {afternoon}:");
        let results = searcher.by_search_text(lat, lon, afternoon, query)?;
        print_results(&results, 5);
    }

    println!("\nSequential search for 'Vegetarian':");
    let results =
        searcher.by_search_text_with_mode(lat, lon, afternoon, "Vegetarian", ExecutionMode::Sequential)?;
    print_results(&results, 5);

    println!("\nCache: {:?}", searcher.cache().stats());
    searcher.shutdown();
    Ok(())
}

fn print_results(results: &[SearchResult], limit: usize) {
    if results.is_empty() {
        println!("  (nothing open nearby)");
        return;
    }
    for (i, result) in results.iter().take(limit).enumerate() {
        println!(
            "  {}. {} [{}] at {} - {}",
            i + 1,
            result.name,
            result.restaurant_id,
            result.location,
            result.attributes.join(", ")
        );
    }

    if results.len() > limit {
        println!("  ... and {} more results", results.len() - limit);
    }
}
