use anyhow::Result;
use autolist_model::{Dealership, DealershipIndex, Listing, Page};
use autolist_summary::{
    catalog_kpis, detail_rows, format_price, headline, status_label, to_list, DetailRow,
};
use serde::Serialize;

use crate::OutputFormat;

/// Free-text sections shown below the detail table.
const LIST_SECTIONS: &[(&str, &str)] = &[
    ("Highlights", "highlights"),
    ("Equipment", "equipment"),
    ("Modifications", "modifications"),
    ("Known flaws", "known_flaws"),
    ("Service history", "service_history"),
];

#[derive(Serialize)]
struct ListingView<'a> {
    listing: &'a Listing,
    dealership: Option<&'a Dealership>,
    details: Vec<DetailRow>,
}

pub fn print_page(
    page: &Page<Listing>,
    dealerships: &DealershipIndex,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    let kpis = catalog_kpis(page);
    println!(
        "{} result{} | page {} of {} | avg price {}",
        kpis.total,
        if kpis.total == 1 { "" } else { "s" },
        page.page,
        page.page_count(),
        format_price(kpis.avg_price)
    );
    println!("---");

    if page.items.is_empty() {
        println!("No cars match your filters.");
        return Ok(());
    }

    let first = page.page.saturating_sub(1) * page.page_size;
    for (i, listing) in page.items.iter().enumerate() {
        println!("{}. {}", first + i + 1, headline(listing));
        let mut meta = vec![format!("id {}", listing.id)];
        if let Some(dealer) = dealerships.lookup(listing) {
            meta.push(format!("dealer {}", dealer.name));
        }
        if let Some(image) = listing.primary_image() {
            meta.push(image.to_string());
        }
        println!("   {}", meta.join(" | "));
    }
    Ok(())
}

pub fn print_listing(
    listing: &Listing,
    dealership: Option<&Dealership>,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        let view = ListingView {
            listing,
            dealership,
            details: detail_rows(listing),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", listing.title);
    if let Some(status) = &listing.status {
        println!("Status: {}", status_label(status));
    }
    if let Some(dealer) = dealership {
        println!("Dealer: {}", dealer.name);
    }
    println!("---");
    for row in detail_rows(listing) {
        println!("{:<14} {}", row.label, row.value);
    }
    for (title, key) in LIST_SECTIONS {
        let items = listing.extra.get(*key).map(to_list).unwrap_or_default();
        if items.is_empty() {
            continue;
        }
        println!("---");
        println!("{title}");
        for item in items {
            println!("  - {item}");
        }
    }
    if !listing.images.is_empty() {
        println!("---");
        println!("{} photo(s)", listing.images.len());
        for image in &listing.images {
            println!("  {image}");
        }
    }
    Ok(())
}

pub fn print_dealerships(dealerships: &[Dealership]) {
    for dealer in dealerships {
        match &dealer.logo_url {
            Some(logo) => println!("{}\t{}\t{}", dealer.id, dealer.name, logo),
            None => println!("{}\t{}", dealer.id, dealer.name),
        }
    }
    println!("Total: {} dealerships", dealerships.len());
}
