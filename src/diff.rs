use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::Snapshot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceChange {
    pub previous: String,
    pub current: String,
}

/// Changes between two catalog snapshots.
///
/// The sets may overlap: a newly listed product is also reported as either
/// available or unavailable. A product whose availability did not change
/// is in neither availability set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogDiff {
    pub newly_listed: BTreeSet<String>,
    pub became_available: BTreeSet<String>,
    pub became_unavailable: BTreeSet<String>,
    pub delisted: BTreeSet<String>,
    pub price_changed: BTreeMap<String, PriceChange>,
}

impl CatalogDiff {
    pub fn compute(previous: &Snapshot, current: &Snapshot) -> Self {
        let mut diff = CatalogDiff::default();

        for (name, listing) in current.iter() {
            match previous.get(name) {
                None => {
                    diff.newly_listed.insert(name.clone());
                    if listing.available {
                        diff.became_available.insert(name.clone());
                    } else {
                        diff.became_unavailable.insert(name.clone());
                    }
                }
                Some(before) => {
                    if !before.available && listing.available {
                        diff.became_available.insert(name.clone());
                    } else if before.available && !listing.available {
                        diff.became_unavailable.insert(name.clone());
                    }

                    // Prices are display strings, compared verbatim
                    if before.price != listing.price {
                        diff.price_changed.insert(
                            name.clone(),
                            PriceChange {
                                previous: before.price.clone(),
                                current: listing.price.clone(),
                            },
                        );
                    }
                }
            }
        }

        diff.delisted = previous
            .names()
            .filter(|name| !current.contains(name))
            .cloned()
            .collect();

        diff
    }

    pub fn has_changes(&self) -> bool {
        !(self.newly_listed.is_empty()
            && self.became_available.is_empty()
            && self.became_unavailable.is_empty()
            && self.delisted.is_empty()
            && self.price_changed.is_empty())
    }
}
