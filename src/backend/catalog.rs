//! Static product catalog.

use crate::models::{Pagination, Product, ProductListQuery};

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Default for Catalog {
    fn default() -> Self {
        let product = |id: &str,
                       name: &str,
                       description: &str,
                       price: u32,
                       image: &str,
                       stock: u32,
                       category: &str| Product {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            image: format!("https://via.placeholder.com/300x300?text={image}"),
            stock,
            category: category.to_string(),
        };

        Self {
            products: vec![
                product(
                    "1",
                    "iPhone 15 Pro",
                    "Latest iPhone with the A17 Pro chip",
                    7999,
                    "iPhone+15+Pro",
                    50,
                    "phones",
                ),
                product(
                    "2",
                    "MacBook Pro 14\"",
                    "M3 chip, 14-inch Liquid Retina XDR display",
                    14999,
                    "MacBook+Pro",
                    30,
                    "computers",
                ),
                product(
                    "3",
                    "AirPods Pro",
                    "Active noise cancellation, spatial audio",
                    1899,
                    "AirPods+Pro",
                    100,
                    "audio",
                ),
                product(
                    "4",
                    "iPad Air",
                    "M2 chip, 10.9-inch Liquid Retina display",
                    4399,
                    "iPad+Air",
                    40,
                    "tablets",
                ),
                product(
                    "5",
                    "Apple Watch Series 9",
                    "45mm, GPS + Cellular",
                    3199,
                    "Apple+Watch",
                    60,
                    "watches",
                ),
            ],
        }
    }
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Filter by category, then cut one page.
    ///
    /// `page` and `limit` below 1 are treated as 1.
    pub fn list(&self, query: &ProductListQuery) -> (Vec<Product>, Pagination) {
        let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);

        let filtered: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| {
                query
                    .category
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .is_none_or(|c| p.category == c)
            })
            .collect();

        let total = filtered.len();
        let data = filtered
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect();

        (
            data,
            Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit),
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (data, pagination) = Catalog::default().list(&ProductListQuery::default());
        assert_eq!(data.len(), 5);
        assert_eq!(
            pagination,
            Pagination {
                page: 1,
                limit: 10,
                total: 5,
                total_pages: 1
            }
        );
    }

    #[test]
    fn test_paging() {
        let catalog = Catalog::default();
        let query = ProductListQuery {
            page: Some(3),
            limit: Some(2),
            ..Default::default()
        };
        let (data, pagination) = catalog.list(&query);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].id, "5");
        assert_eq!(pagination.total_pages, 3);

        let query = ProductListQuery {
            page: Some(9),
            limit: Some(2),
            ..Default::default()
        };
        assert!(catalog.list(&query).0.is_empty());
    }

    #[test]
    fn test_category_filter() {
        let query = ProductListQuery {
            category: Some("tablets".to_string()),
            ..Default::default()
        };
        let (data, pagination) = Catalog::default().list(&query);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name, "iPad Air");
        assert_eq!(pagination.total, 1);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let query = ProductListQuery {
            limit: Some(0),
            ..Default::default()
        };
        let (_, pagination) = Catalog::default().list(&query);
        assert_eq!(pagination.limit, 1);
        assert_eq!(pagination.total_pages, 5);
    }

    #[test]
    fn test_get() {
        let catalog = Catalog::default();
        assert_eq!(catalog.get("2").unwrap().price, 14999);
        assert!(catalog.get("42").is_none());
    }
}
