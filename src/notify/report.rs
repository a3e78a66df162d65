use std::fmt::Write;

use crate::diff::CatalogDiff;
use crate::models::{ProductListing, Snapshot};

const NEWLY_LISTED: &str = "Products that were added to the store:";
const BECAME_AVAILABLE: &str = "Products that became available for purchase:";
const BECAME_UNAVAILABLE: &str = "Products that are no longer available for purchase:";
const DELISTED: &str = "Products that were removed from the store:";
const PRICE_CHANGED: &str = "Products that had their price updated:";
const LISTED_UNAVAILABLE: &str = "Products listed but not available for purchase:";

/// Builds the change notification for one scan cycle.
///
/// Sections appear in a fixed order and only when non-empty; the full
/// listing of `current` is always appended.
pub fn format_report(diff: &CatalogDiff, current: &Snapshot, page_url: &str) -> String {
    let mut message = String::new();

    push_name_section(&mut message, NEWLY_LISTED, &diff.newly_listed);
    push_name_section(&mut message, BECAME_AVAILABLE, &diff.became_available);
    push_name_section(&mut message, BECAME_UNAVAILABLE, &diff.became_unavailable);
    push_name_section(&mut message, DELISTED, &diff.delisted);

    if !diff.price_changed.is_empty() {
        let _ = writeln!(message, "{}", PRICE_CHANGED);
        for (name, change) in &diff.price_changed {
            let _ = writeln!(
                message,
                " - {} Was: {} Now: {}",
                name, change.previous, change.current
            );
        }
        message.push('\n');
    }

    message.push_str(&format_current_listing(current, page_url));
    message
}

/// Available products first, then the listed but unavailable ones.
pub fn format_current_listing(snapshot: &Snapshot, page_url: &str) -> String {
    let mut message = format!("Products currently available for purchase at {}:\n", page_url);
    for (name, listing) in snapshot.available() {
        push_product(&mut message, name, listing);
    }

    let _ = write!(message, "\n{}\n", LISTED_UNAVAILABLE);
    for (name, listing) in snapshot.unavailable() {
        push_product(&mut message, name, listing);
    }

    message
}

fn push_name_section<'a>(
    message: &mut String,
    header: &str,
    names: impl IntoIterator<Item = &'a String>,
) {
    let mut names = names.into_iter().peekable();
    if names.peek().is_none() {
        return;
    }

    let _ = writeln!(message, "{}", header);
    for name in names {
        let _ = writeln!(message, " - {}", name);
    }
    message.push('\n');
}

fn push_product(message: &mut String, name: &str, listing: &ProductListing) {
    let _ = writeln!(message, " - {}", name);
    let _ = writeln!(message, "    Product Page: {}", listing.page_url);
    let _ = writeln!(message, "    Price: {}", listing.price);
}
