//! # Product Catalog Boundary
//!
//! Lookup of known products by label, plus the one-shot seeding used to
//! populate a fresh store. Catalog management beyond this (editing, pricing
//! workflows) is out of scope; the engine only ever reads a snapshot.
//!
//! ## Hot Path vs Seeding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HOT PATH (every reading)        SEEDING (once, at install)            │
//! │  ─────────────────────────       ────────────────────────────          │
//! │  catalog snapshot ──► label      seed_catalog() ──► add_product ×6     │
//! │  lookup in scale-core filter                                            │
//! │                                                                         │
//! │  get_products() is best-effort: on failure it returns an EMPTY         │
//! │  sequence and never errors. The kiosk then runs on synthesized         │
//! │  products only, which is degraded but fully functional.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use scale_core::types::{slugify, Category, Product};

use crate::error::StoreResult;

// =============================================================================
// New Product
// =============================================================================

/// A product as submitted to the catalog, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub image_url: String,
    pub unit_price: f64,
    pub category: Category,
    pub confidence: Option<f64>,
}

impl NewProduct {
    /// Assigns the derived id (name slug) and produces the stored product.
    fn into_product(self) -> Product {
        Product {
            id: slugify(&self.name),
            name: self.name,
            image_url: self.image_url,
            unit_price: self.unit_price,
            category: self.category,
            confidence: self.confidence,
        }
    }
}

// =============================================================================
// Catalog Trait
// =============================================================================

/// External product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns all known products.
    ///
    /// Best-effort: an unreachable catalog yields an empty sequence, never an
    /// error. The reconciliation engine treats an empty catalog as "every
    /// label synthesizes".
    async fn get_products(&self) -> Vec<Product>;

    /// Adds a product, assigning its id. Used only during initial seeding,
    /// not on the reading hot path.
    async fn add_product(&self, new_product: NewProduct) -> StoreResult<Product>;
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// In-memory [`ProductCatalog`] used by tests and disconnected kiosks.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Mutex<Vec<Product>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with the standard produce seed.
    pub async fn seeded() -> Self {
        let catalog = Self::new();
        for new_product in seed_products() {
            // Seeding an in-memory catalog cannot fail.
            let _ = catalog.add_product(new_product).await;
        }
        catalog
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_products(&self) -> Vec<Product> {
        self.products.lock().await.clone()
    }

    async fn add_product(&self, new_product: NewProduct) -> StoreResult<Product> {
        let product = new_product.into_product();
        let mut products = self.products.lock().await;
        // Re-seeding the same name replaces the entry instead of duplicating.
        products.retain(|p| p.id != product.id);
        products.push(product.clone());
        Ok(product)
    }
}

// =============================================================================
// Seed Data
// =============================================================================

/// The standard produce assortment a fresh kiosk is seeded with.
pub fn seed_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Red Apple".to_string(),
            image_url: "https://images.unsplash.com/photo-1560806887-1e4cd0b6cbd6?w=400&h=400&fit=crop".to_string(),
            unit_price: 3.99,
            category: Category::Fruit,
            confidence: Some(0.95),
        },
        NewProduct {
            name: "Banana".to_string(),
            image_url: "https://images.unsplash.com/photo-1571771894821-ce9b6c11b08e?w=400&h=400&fit=crop".to_string(),
            unit_price: 2.49,
            category: Category::Fruit,
            confidence: Some(0.92),
        },
        NewProduct {
            name: "Orange".to_string(),
            image_url: "https://images.unsplash.com/photo-1547514701-42782101795e?w=400&h=400&fit=crop".to_string(),
            unit_price: 4.29,
            category: Category::Fruit,
            confidence: Some(0.88),
        },
        NewProduct {
            name: "Tomato".to_string(),
            image_url: "https://images.unsplash.com/photo-1546470427-e5380e2e9c95?w=400&h=400&fit=crop".to_string(),
            unit_price: 5.99,
            category: Category::Vegetable,
            confidence: Some(0.91),
        },
        NewProduct {
            name: "Carrot".to_string(),
            image_url: "https://images.unsplash.com/photo-1445282768818-728615cc910a?w=400&h=400&fit=crop".to_string(),
            unit_price: 2.99,
            category: Category::Vegetable,
            confidence: Some(0.94),
        },
        NewProduct {
            name: "Broccoli".to_string(),
            image_url: "https://images.unsplash.com/photo-1459411621453-7b03977f4bfc?w=400&h=400&fit=crop".to_string(),
            unit_price: 6.49,
            category: Category::Vegetable,
            confidence: Some(0.89),
        },
    ]
}

/// Pushes the seed assortment through `add_product`, returning how many
/// entries were stored. Failures are logged and counted, not fatal: a
/// half-seeded catalog still serves lookups.
pub async fn seed_catalog(catalog: &dyn ProductCatalog) -> usize {
    let mut stored = 0;
    for new_product in seed_products() {
        let name = new_product.name.clone();
        match catalog.add_product(new_product).await {
            Ok(product) => {
                info!(id = %product.id, name = %product.name, "seeded product");
                stored += 1;
            }
            Err(err) => {
                warn!(name = %name, error = %err, "failed to seed product");
            }
        }
    }
    stored
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_product_assigns_slug_id() {
        let catalog = InMemoryCatalog::new();
        let product = catalog
            .add_product(NewProduct {
                name: "Red Apple".to_string(),
                image_url: "https://example.com/a.jpg".to_string(),
                unit_price: 3.99,
                category: Category::Fruit,
                confidence: Some(0.95),
            })
            .await
            .unwrap();

        assert_eq!(product.id, "red-apple");
    }

    #[tokio::test]
    async fn test_reseeding_replaces_instead_of_duplicating() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(seed_catalog(&catalog).await, 6);
        assert_eq!(seed_catalog(&catalog).await, 6);
        assert_eq!(catalog.get_products().await.len(), 6);
    }

    #[tokio::test]
    async fn test_seeded_catalog_contents() {
        let catalog = InMemoryCatalog::seeded().await;
        let products = catalog.get_products().await;
        assert_eq!(products.len(), 6);

        let banana = products.iter().find(|p| p.id == "banana").unwrap();
        assert_eq!(banana.unit_price, 2.49);
        assert_eq!(banana.category, Category::Fruit);
        assert_eq!(banana.confidence, Some(0.92));

        let broccoli = products.iter().find(|p| p.id == "broccoli").unwrap();
        assert_eq!(broccoli.category, Category::Vegetable);
    }

    #[tokio::test]
    async fn test_empty_catalog_returns_empty_sequence() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get_products().await.is_empty());
    }
}
