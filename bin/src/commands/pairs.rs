//! Pairs command implementation.
//!
//! Lists catalog pairs with optional filtering.

use anyhow::Result;
use candlewick_lib::PairRegistry;

use crate::display::parse_category;

/// List catalog pairs with an optional category filter or search pattern.
pub(crate) fn list_pairs(category: Option<&str>, search: Option<&str>, all: bool) -> Result<()> {
    let registry = PairRegistry::global();

    let mut pairs: Vec<_> = match (category, search) {
        (Some(cat), _) => {
            let category = parse_category(cat)?;
            registry.by_category(category).collect()
        }
        (_, Some(pattern)) => registry.search(pattern),
        (None, None) => registry.all().collect(),
    };
    if !all {
        pairs.retain(|pair| pair.is_active());
    }
    pairs.sort_by(|a, b| a.symbol().cmp(b.symbol()));

    if pairs.is_empty() {
        println!("No pairs found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {:<10} {:>8} {:<8}",
        "SYMBOL", "NAME", "CATEGORY", "LEVERAGE", "STATUS"
    );
    println!("{}", "-".repeat(60));

    for pair in &pairs {
        println!(
            "{:<10} {:<20} {:<10} {:>7}x {:<8}",
            pair.symbol(),
            pair.display_name(),
            pair.category(),
            pair.max_leverage(),
            if pair.is_active() { "active" } else { "inactive" }
        );
    }

    println!("\nTotal: {} pairs", pairs.len());
    Ok(())
}
