//! Built-in datasets used when no authoritative data has ever been loaded.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use crate::catalog::{IN_STOCK, blog_fields, product_fields};
use crate::{Entity, EntityId};

/// Storefront name used in seeded copy.
pub const STORE_NAME: &str = "Larder Organics";

fn seed_epoch() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default()
}

struct SeedProduct {
	id: &'static str,
	title: &'static str,
	category: &'static str,
	price: i64,
	weight: &'static str,
	stock: i64,
	description: &'static str,
	ingredients: &'static str,
	benefits: &'static str,
	images: &'static [&'static str],
	featured: bool,
}

const PRODUCTS: &[SeedProduct] = &[
	SeedProduct {
		id: "P1",
		title: "A2 Desi Cow Ghee",
		category: "Ghee",
		price: 1500,
		weight: "500ml",
		stock: 50,
		description: "Pure A2 chemical-free hand-churned ghee from free-grazing Hallikar cows. Made using the traditional Bilona method.",
		ingredients: "A2 Cow Milk Butter",
		benefits: "Boosts immunity, improves digestion, good for skin, balances Vata and Pitta doshas.",
		images: &["https://ueirorganic.com/cdn/shop/files/a2desicowghee.jpg?v=1697902974"],
		featured: true,
	},
	SeedProduct {
		id: "P2",
		title: "Wild Forest Honey",
		category: "Honey",
		price: 850,
		weight: "500g",
		stock: 100,
		description: "Raw, unprocessed honey collected from deep forests. Rich in antioxidants and enzymes.",
		ingredients: "100% Raw Honey",
		benefits: "Natural sweetener, soothes coughs, boosts energy, promotes wound healing.",
		images: &["https://cpimg.tistatic.com/10619973/b/4/Wild-Forest-Honey..jpg"],
		featured: true,
	},
	SeedProduct {
		id: "P3",
		title: "Cold Pressed Coconut Oil",
		category: "Oil",
		price: 450,
		weight: "1L",
		stock: 80,
		description: "Extracted from fresh coconut milk using cold press technology to retain vital nutrients and aroma.",
		ingredients: "100% Coconut Oil",
		benefits: "Great for cooking, hair care, and skin moisturizing. High in healthy fatty acids.",
		images: &["https://images.unsplash.com/photo-1596526131083-e8c633c948d2?w=800&q=80"],
		featured: false,
	},
	SeedProduct {
		id: "P4",
		title: "Organic Palm Jaggery",
		category: "Sweeteners",
		price: 300,
		weight: "1kg",
		stock: 150,
		description: "Natural sweetener made from the sap of palm trees. A healthy alternative to white sugar.",
		ingredients: "Palm Sap",
		benefits: "Rich in iron and minerals, aids digestion, cleanses the respiratory tract.",
		images: &[],
		featured: false,
	},
	SeedProduct {
		id: "P5",
		title: "Wood Pressed Groundnut Oil",
		category: "Oil",
		price: 380,
		weight: "1L",
		stock: 60,
		description: "Traditional wood pressed groundnut oil with rich aroma and nutty flavor.",
		ingredients: "Groundnuts",
		benefits: "Heart-healthy, high smoke point for frying, rich in Vitamin E.",
		images: &[],
		featured: true,
	},
	SeedProduct {
		id: "P6",
		title: "Turmeric Powder",
		category: "Spices",
		price: 250,
		weight: "250g",
		stock: 200,
		description: "High curcumin content turmeric powder sourced from organic farms.",
		ingredients: "Turmeric",
		benefits: "Potent anti-inflammatory and antioxidant properties.",
		images: &[],
		featured: false,
	},
];

/// Default product catalog, ascending by creation time.
pub fn products() -> Vec<Entity> {
	use product_fields::*;
	PRODUCTS
		.iter()
		.enumerate()
		.map(|(n, p)| {
			Entity::new(p.id, seed_epoch() + Duration::minutes(n as i64))
				.with(TITLE, p.title)
				.with(CATEGORY, p.category)
				.with(PRICE, p.price)
				.with(WEIGHT, p.weight)
				.with(STOCK, p.stock)
				.with(DESCRIPTION, p.description)
				.with(INGREDIENTS, p.ingredients)
				.with(BENEFITS, p.benefits)
				.with(IMAGES, p.images.iter().map(|s| s.to_string()).collect::<Vec<_>>())
				.with(FEATURED, p.featured)
				.with(STATUS, IN_STOCK)
		})
		.collect()
}

/// Default blog articles, ascending by creation time.
pub fn blogs() -> Vec<Entity> {
	use blog_fields::*;
	let first = Utc.with_ymd_and_hms(2023, 10, 20, 10, 0, 0).single().unwrap_or_default();
	let second = Utc.with_ymd_and_hms(2023, 10, 25, 11, 30, 0).single().unwrap_or_default();
	vec![
		Entity::new(EntityId::Int(1), first)
			.with(TITLE, "The Benefits of Bilona Ghee in Your Daily Diet")
			.with(
				EXCERPT,
				"Discover why traditional Bilona method ghee is superior to ordinary ghee and how it can improve your health.",
			)
			.with(
				CONTENT,
				"The traditional Bilona method of making ghee involves churning curd to get butter and then boiling it. This process preserves the essential nutrients and provides several health benefits, including improved digestion and boosted immunity.",
			)
			.with(AUTHOR, format!("{STORE_NAME} Team"))
			.with(CATEGORY, "Organic Ghee")
			.with(IMAGE, "https://ueirorganic.com/cdn/shop/files/a2desicowghee.jpg?v=1697902974")
			.with(PUBLISHED_AT, first),
		Entity::new(EntityId::Int(2), second)
			.with(TITLE, "Raw Honey vs. Processed Honey: What You Need to Know")
			.with(
				EXCERPT,
				"Learn the differences between raw, unprocessed honey and the commercial varieties found in most stores.",
			)
			.with(
				CONTENT,
				"Raw honey is collected straight from the extractor; it is totally unheated, unpasteurized, and unprocessed. This ensures all the natural enzymes and antioxidants remain intact.",
			)
			.with(AUTHOR, "Organic Expert")
			.with(CATEGORY, "Natural Honey")
			.with(IMAGE, "https://cpimg.tistatic.com/10619973/b/4/Wild-Forest-Honey..jpg")
			.with(PUBLISHED_AT, second),
	]
}

/// Editable page copy, grouped by page.
pub fn site_content() -> Value {
	json!({
		"global": {
			"siteName": STORE_NAME,
			"contactPhone": "+910000000000",
			"contactEmail": "hello@larder.example",
			"address": format!("{STORE_NAME}, Karnataka"),
			"footerAbout": "Your trusted source for pure, certified organic products."
		},
		"home": {
			"heroTitle": STORE_NAME,
			"heroSubtitle": "Wholesome Organic Goodness, Straight From Nature.",
			"whyChooseTitle": format!("Why Choose {STORE_NAME}?")
		},
		"about": {
			"title": format!("About {STORE_NAME}"),
			"features": ["100% Organic Certified", "Sustainable Farming", "No Preservatives", "Premium Quality"],
			"values": [
				{ "name": "Purity", "description": "Absolutely no compromise on quality or ingredients." },
				{ "name": "Health", "description": "Products that nourish your body and soul." }
			]
		},
		"contact": {
			"title": "Get in Touch",
			"hours": "9:00 AM - 7:00 PM (Daily)"
		},
		"pages": {
			"home": [
				{ "id": "hero", "component": "HeroSection" },
				{ "id": "products", "component": "ProductGridSection" },
				{ "id": "features", "component": "WhyChooseUs" },
				{ "id": "map", "component": "MapSection" }
			]
		}
	})
}

/// Page images, `section -> slot -> url`. Empty urls fall back to styling.
pub fn page_images() -> BTreeMap<String, BTreeMap<String, String>> {
	let sections: [(&str, &[(&str, &str)]); 3] = [
		("home", &[("heroBackground", "")]),
		(
			"location",
			&[
				("heroImage", "https://images.unsplash.com/photo-1658214039954-932c22eebc13"),
				("mapImage", "https://images.unsplash.com/photo-1624727945121-0e92bbc66a50"),
			],
		),
		("about", &[("mainImage", "https://images.unsplash.com/photo-1590301157890-4810ed352733")]),
	];
	sections
		.into_iter()
		.map(|(section, slots)| {
			let slots = slots.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
			(section.to_string(), slots)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Collection;

	#[test]
	fn seeds_are_non_empty_and_ordered() {
		for seed in [products(), blogs()] {
			assert!(!seed.is_empty());
			let collection = Collection::from_entities(seed.clone());
			let ids: Vec<_> = collection.ids().cloned().collect();
			let expected: Vec<_> = seed.into_iter().map(|e| e.id).collect();
			assert_eq!(ids, expected);
		}
	}

	#[test]
	fn page_images_cover_known_sections() {
		let images = page_images();
		assert_eq!(images["location"].len(), 2);
		assert_eq!(images["home"]["heroBackground"], "");
	}
}
