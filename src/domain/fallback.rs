//! Built-in catalog served when the store has nothing to show.
//!
//! A fresh deployment (or one whose database is unreachable) still renders a
//! plausible storefront instead of empty shelves. Identifiers are fixed so
//! clients can key on them between requests.

use time::OffsetDateTime;
use uuid::Uuid;

use super::entities::{CollectionRecord, ProductRecord, RecordRef, TestimonialRecord};

const DEFAULT_CURRENCY: &str = "IDR";

struct FallbackCollection {
    id: u128,
    slug: &'static str,
    name: &'static str,
    description: &'static str,
}

struct FallbackProduct {
    id: u128,
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    collection: usize,
    images: &'static [&'static str],
}

struct FallbackTestimonial {
    id: u128,
    author_name: &'static str,
    quote: &'static str,
    rating: i16,
}

const COLLECTIONS: &[FallbackCollection] = &[
    FallbackCollection {
        id: 0x6f1d_0000_0000_4000_8000_0000_0000_0001,
        slug: "hand-bouquets",
        name: "Hand Bouquets",
        description: "Wrapped seasonal stems, ready to hand over.",
    },
    FallbackCollection {
        id: 0x6f1d_0000_0000_4000_8000_0000_0000_0002,
        slug: "flower-boxes",
        name: "Flower Boxes",
        description: "Arrangements set in keepsake boxes.",
    },
    FallbackCollection {
        id: 0x6f1d_0000_0000_4000_8000_0000_0000_0003,
        slug: "gift-hampers",
        name: "Gift Hampers",
        description: "Flowers paired with treats for every occasion.",
    },
];

const PRODUCTS: &[FallbackProduct] = &[
    FallbackProduct {
        id: 0x6f1d_0000_0000_4000_8000_0000_0001_0001,
        slug: "blush-rose-bouquet",
        name: "Blush Rose Bouquet",
        description: "Twelve blush roses with eucalyptus.",
        price_cents: 45_000_000,
        collection: 0,
        images: &[
            "/uploads/fallback/blush-rose-bouquet-1.jpg",
            "/uploads/fallback/blush-rose-bouquet-2.jpg",
        ],
    },
    FallbackProduct {
        id: 0x6f1d_0000_0000_4000_8000_0000_0001_0002,
        slug: "sunflower-morning",
        name: "Sunflower Morning",
        description: "Sunflowers and chamomile in kraft wrap.",
        price_cents: 35_000_000,
        collection: 0,
        images: &["/uploads/fallback/sunflower-morning-1.jpg"],
    },
    FallbackProduct {
        id: 0x6f1d_0000_0000_4000_8000_0000_0001_0003,
        slug: "velvet-red-box",
        name: "Velvet Red Box",
        description: "Red roses arranged in a round velvet box.",
        price_cents: 65_000_000,
        collection: 1,
        images: &[
            "/uploads/fallback/velvet-red-box-1.jpg",
            "/uploads/fallback/velvet-red-box-2.jpg",
        ],
    },
    FallbackProduct {
        id: 0x6f1d_0000_0000_4000_8000_0000_0001_0004,
        slug: "celebration-hamper",
        name: "Celebration Hamper",
        description: "Mixed bouquet, chocolates and a greeting card.",
        price_cents: 85_000_000,
        collection: 2,
        images: &["/uploads/fallback/celebration-hamper-1.jpg"],
    },
];

const TESTIMONIALS: &[FallbackTestimonial] = &[
    FallbackTestimonial {
        id: 0x6f1d_0000_0000_4000_8000_0002_0000_0001,
        author_name: "Rina",
        quote: "The bouquet arrived fresh and exactly on time.",
        rating: 5,
    },
    FallbackTestimonial {
        id: 0x6f1d_0000_0000_4000_8000_0002_0000_0002,
        author_name: "Dimas",
        quote: "Ordering over WhatsApp took two minutes.",
        rating: 5,
    },
];

fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

pub fn collections() -> Vec<CollectionRecord> {
    COLLECTIONS
        .iter()
        .enumerate()
        .map(|(index, item)| CollectionRecord {
            id: Uuid::from_u128(item.id),
            slug: item.slug.to_string(),
            name: item.name.to_string(),
            description: Some(item.description.to_string()),
            image_url: None,
            visible: true,
            sort_order: index as i32,
            created_at: epoch(),
            updated_at: epoch(),
        })
        .collect()
}

pub fn products() -> Vec<ProductRecord> {
    PRODUCTS
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let collection = &COLLECTIONS[item.collection];
            ProductRecord {
                id: Uuid::from_u128(item.id),
                slug: item.slug.to_string(),
                name: item.name.to_string(),
                description: Some(item.description.to_string()),
                price_cents: item.price_cents,
                compare_at_price_cents: None,
                currency: DEFAULT_CURRENCY.to_string(),
                images: item.images.iter().map(|url| url.to_string()).collect(),
                collection: Some(RecordRef {
                    id: Uuid::from_u128(collection.id),
                    slug: collection.slug.to_string(),
                    name: collection.name.to_string(),
                }),
                in_stock: true,
                visible: true,
                sort_order: index as i32,
                created_at: epoch(),
                updated_at: epoch(),
            }
        })
        .collect()
}

/// Fallback products in the collection with the given slug.
pub fn products_in_collection(slug: &str) -> Vec<ProductRecord> {
    products()
        .into_iter()
        .filter(|product| {
            product
                .collection
                .as_ref()
                .is_some_and(|collection| collection.slug == slug)
        })
        .collect()
}

pub fn testimonials() -> Vec<TestimonialRecord> {
    TESTIMONIALS
        .iter()
        .enumerate()
        .map(|(index, item)| TestimonialRecord {
            id: Uuid::from_u128(item.id),
            author_name: item.author_name.to_string(),
            author_title: None,
            quote: item.quote.to_string(),
            rating: item.rating,
            avatar_url: None,
            visible: true,
            sort_order: index as i32,
            created_at: epoch(),
            updated_at: epoch(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_fallback_product_points_at_a_fallback_collection() {
        let collection_ids: HashSet<_> = collections().into_iter().map(|c| c.id).collect();
        for product in products() {
            let collection = product.collection.expect("fallback products are grouped");
            assert!(collection_ids.contains(&collection.id), "{}", product.slug);
            assert!(!product.images.is_empty());
        }
    }

    #[test]
    fn fallback_slugs_are_unique() {
        let slugs: HashSet<_> = products().into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs.len(), PRODUCTS.len());
    }

    #[test]
    fn products_in_collection_filters_by_slug() {
        let bouquets = products_in_collection("hand-bouquets");
        assert_eq!(bouquets.len(), 2);
        assert!(products_in_collection("unknown").is_empty());
    }
}
