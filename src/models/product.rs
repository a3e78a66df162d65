use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Attributes of one listed product, keyed by name in a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductListing {
    /// Display price exactly as shown on the page
    pub price: String,
    pub page_url: String,
    pub available: bool,
}

impl ProductListing {
    pub fn new(price: impl Into<String>, page_url: impl Into<String>, available: bool) -> Self {
        Self {
            price: price.into(),
            page_url: page_url.into(),
            available,
        }
    }
}

/// Row of the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub price: String,
    pub page_url: String,
    pub available: bool,
}

impl From<ProductRecord> for (String, ProductListing) {
    fn from(record: ProductRecord) -> Self {
        (
            record.name,
            ProductListing {
                price: record.price,
                page_url: record.page_url,
                available: record.available,
            },
        )
    }
}

/// The catalog as observed at one point in time.
///
/// Absence of a name means "not listed", which is distinct from a listing
/// with `available == false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Snapshot {
    products: BTreeMap<String, ProductListing>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unless the name is already present. Returns whether it was inserted.
    pub fn insert(&mut self, name: impl Into<String>, listing: ProductListing) -> bool {
        match self.products.entry(name.into()) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(listing);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProductListing> {
        self.products.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProductListing)> {
        self.products.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.products.keys()
    }

    pub fn available(&self) -> impl Iterator<Item = (&String, &ProductListing)> {
        self.products.iter().filter(|(_, listing)| listing.available)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = (&String, &ProductListing)> {
        self.products.iter().filter(|(_, listing)| !listing.available)
    }
}

impl FromIterator<(String, ProductListing)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, ProductListing)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (name, listing) in iter {
            snapshot.insert(name, listing);
        }
        snapshot
    }
}

impl FromIterator<ProductRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        iter.into_iter().map(<(String, ProductListing)>::from).collect()
    }
}
