// Deterministic hard-constraint filter applied between retrieval and scoring.
use crate::listing::{IdealCriteria, Listing};

/// Keeps only listings that satisfy every hard constraint the ideal
/// states. Fields the ideal leaves empty constrain nothing.
pub fn filter_listings(listings: &[Listing], ideal: &IdealCriteria) -> Vec<Listing> {
    listings
        .iter()
        .filter(|l| matches_ideal(l, ideal))
        .cloned()
        .collect()
}

pub fn matches_ideal(listing: &Listing, ideal: &IdealCriteria) -> bool {
    within_budget(listing, ideal)
        && amenity_ok(ideal.pets_ok, listing.pets.as_deref())
        && amenity_ok(ideal.couples_ok, listing.couples.as_deref())
        && amenity_ok(ideal.bills_included, listing.bills_included.as_deref())
        && amenity_ok(ideal.parking, listing.parking.as_deref())
        && contains_ok(ideal.property_type.as_deref(), listing.property_type.as_deref())
        && contains_ok(ideal.furnishings.as_deref(), listing.furnishings.as_deref())
}

fn within_budget(listing: &Listing, ideal: &IdealCriteria) -> bool {
    if let Some(max) = ideal.max_rent {
        // Listings with an unknown or placeholder price cannot be
        // verified against a budget, so they are dropped.
        let affordable = listing
            .price
            .map(|p| p > 0 && p <= max)
            .unwrap_or(false);
        if !affordable {
            return false;
        }
    }
    if let Some(min) = ideal.min_rent {
        let above_floor = listing.price.map(|p| p >= min).unwrap_or(false);
        if !above_floor {
            return false;
        }
    }
    true
}

/// An amenity constrains only when the ideal demands it. A listing that
/// does not state the amenity fails a demanded constraint.
fn amenity_ok(required: Option<bool>, raw: Option<&str>) -> bool {
    match required {
        Some(true) => raw.map(is_affirmative).unwrap_or(false),
        _ => true,
    }
}

/// Fuzzy free-text match, case-insensitive substring containment. A
/// listing that does not state the field passes, as does an ideal that
/// does not constrain it.
fn contains_ok(wanted: Option<&str>, raw: Option<&str>) -> bool {
    match (wanted, raw) {
        (Some(needle), Some(hay)) if !needle.is_empty() && !hay.is_empty() => {
            hay.to_lowercase().contains(&needle.to_lowercase())
        }
        _ => true,
    }
}

pub fn is_affirmative(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "yes" | "y" | "true" | "1")
}
