use once_cell::sync::Lazy;

use crate::models::{BodyType, ClothingCategory, ClothingItem, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOption {
    pub id: &'static str,
    pub label: &'static str,
    pub image_url: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyTypeOption {
    pub body_type: BodyType,
    pub label: &'static str,
    pub image_url: &'static str,
}

pub const DEFAULT_STYLE_PROMPT: &str = "Casual and modern, for a stroll around the city";

fn catalog_item(
    id: u64,
    name: &str,
    category: ClothingCategory,
    image_url: &str,
    brand: Option<&str>,
    price: Option<f64>,
) -> ClothingItem {
    ClothingItem {
        id: ItemId(id),
        name: name.to_string(),
        category,
        image_url: image_url.to_string(),
        brand: brand.map(str::to_string),
        price,
    }
}

static WARDROBE_ITEMS: Lazy<Vec<ClothingItem>> = Lazy::new(|| {
    vec![
        catalog_item(
            1,
            "White Linen Shirt",
            ClothingCategory::Upper,
            "https://images.unsplash.com/photo-1620799140408-edc6d58d53f3?auto=format&fit=crop&w=500&q=80",
            None,
            None,
        ),
        catalog_item(
            2,
            "Straight Leg Jeans",
            ClothingCategory::Lower,
            "https://images.unsplash.com/photo-1604176354204-9268737828e4?auto=format&fit=crop&w=500&q=80",
            None,
            None,
        ),
        catalog_item(
            3,
            "Basic White Sneakers",
            ClothingCategory::Shoes,
            "https://images.unsplash.com/photo-1595950653106-6c9ebd614d3a?auto=format&fit=crop&w=500&q=80",
            None,
            None,
        ),
        catalog_item(
            4,
            "Caramel Leather Bag",
            ClothingCategory::Accessory,
            "https://images.unsplash.com/photo-1590739241128-4e9e557297e6?auto=format&fit=crop&w=500&q=80",
            None,
            None,
        ),
        catalog_item(
            5,
            "Floral Midi Dress",
            ClothingCategory::Fullbody,
            "https://images.unsplash.com/photo-1594633312681-425c7b97ccd1?auto=format&fit=crop&w=500&q=80",
            None,
            None,
        ),
    ]
});

static SHOPPING_ITEMS: Lazy<Vec<ClothingItem>> = Lazy::new(|| {
    vec![
        catalog_item(
            101,
            "Black Leather Jacket",
            ClothingCategory::Upper,
            "https://images.unsplash.com/photo-1551028719-00167b16eac5?auto=format&fit=crop&w=500&q=80",
            Some("Fashion Brand"),
            Some(349.90),
        ),
        catalog_item(
            102,
            "Pink Pleated Skirt",
            ClothingCategory::Lower,
            "https://images.unsplash.com/photo-1594642709197-2834b1d6484e?auto=format&fit=crop&w=500&q=80",
            Some("Chic Boutique"),
            Some(189.90),
        ),
        catalog_item(
            103,
            "Black Combat Boots",
            ClothingCategory::Shoes,
            "https://images.unsplash.com/photo-1608256246200-53e6358c1d3c?auto=format&fit=crop&w=500&q=80",
            Some("Urban Feet"),
            Some(299.90),
        ),
        catalog_item(
            104,
            "Cat Eye Sunglasses",
            ClothingCategory::Accessory,
            "https://images.unsplash.com/photo-1577804457365-d541a74e50d0?auto=format&fit=crop&w=500&q=80",
            Some("Sunnies Co."),
            Some(120.00),
        ),
    ]
});

pub const PERSONAL_STYLE_OPTIONS: [StyleOption; 6] = [
    StyleOption {
        id: "casual",
        label: "Casual",
        image_url: "https://images.unsplash.com/photo-1495121605344-a9217699314c?auto=format&fit=crop&w=500&q=80",
    },
    StyleOption {
        id: "elegant",
        label: "Elegant",
        image_url: "https://images.unsplash.com/photo-1594641641933-7c0308c9a1d1?auto=format&fit=crop&w=500&q=80",
    },
    StyleOption {
        id: "creative",
        label: "Creative",
        image_url: "https://images.unsplash.com/photo-1574254848-36085a5a1538?auto=format&fit=crop&w=500&q=80",
    },
    StyleOption {
        id: "dramatic",
        label: "Dramatic",
        image_url: "https://images.unsplash.com/photo-1617114912953-e998818f2766?auto=format&fit=crop&w=500&q=80",
    },
    StyleOption {
        id: "romantic",
        label: "Romantic",
        image_url: "https://images.unsplash.com/photo-1525598912003-662742432076?auto=format&fit=crop&w=500&q=80",
    },
    StyleOption {
        id: "classic",
        label: "Classic",
        image_url: "https://images.unsplash.com/photo-1622396637389-623106526a57?auto=format&fit=crop&w=500&q=80",
    },
];

pub const BODY_TYPE_OPTIONS: [BodyTypeOption; 5] = [
    BodyTypeOption {
        body_type: BodyType::Rectangle,
        label: "Rectangle",
        image_url: "https://storage.googleapis.com/gemini-ui-params/estylist/body-rectangle.png",
    },
    BodyTypeOption {
        body_type: BodyType::Triangle,
        label: "Triangle",
        image_url: "https://storage.googleapis.com/gemini-ui-params/estylist/body-triangle.png",
    },
    BodyTypeOption {
        body_type: BodyType::InvertedTriangle,
        label: "Inverted",
        image_url: "https://storage.googleapis.com/gemini-ui-params/estylist/body-inverted-triangle.png",
    },
    BodyTypeOption {
        body_type: BodyType::Hourglass,
        label: "Hourglass",
        image_url: "https://storage.googleapis.com/gemini-ui-params/estylist/body-hourglass.png",
    },
    BodyTypeOption {
        body_type: BodyType::Oval,
        label: "Oval",
        image_url: "https://storage.googleapis.com/gemini-ui-params/estylist/body-oval.png",
    },
];

/// Items a new session's wardrobe starts with.
pub fn wardrobe_items() -> Vec<ClothingItem> {
    WARDROBE_ITEMS.clone()
}

pub fn shopping_items() -> &'static [ClothingItem] {
    &SHOPPING_ITEMS
}

pub fn find_shopping_item(id: ItemId) -> Option<&'static ClothingItem> {
    SHOPPING_ITEMS.iter().find(|item| item.id == id)
}

pub fn is_personal_style(id: &str) -> bool {
    PERSONAL_STYLE_OPTIONS.iter().any(|option| option.id == id)
}

/// Highest id used by any static catalog; user-created items are numbered above it.
pub fn max_catalog_id() -> ItemId {
    WARDROBE_ITEMS
        .iter()
        .chain(SHOPPING_ITEMS.iter())
        .map(|item| item.id)
        .max()
        .unwrap_or(ItemId(0))
}
