use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClothingCategory {
    Upper,
    Lower,
    Shoes,
    Accessory,
    Fullbody,
}

impl ClothingCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "upper" => Some(ClothingCategory::Upper),
            "lower" => Some(ClothingCategory::Lower),
            "shoes" => Some(ClothingCategory::Shoes),
            "accessory" => Some(ClothingCategory::Accessory),
            "fullbody" => Some(ClothingCategory::Fullbody),
            _ => None,
        }
    }

    /// Tag used on the wire and inside prompts.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClothingCategory::Upper => "upper",
            ClothingCategory::Lower => "lower",
            ClothingCategory::Shoes => "shoes",
            ClothingCategory::Accessory => "accessory",
            ClothingCategory::Fullbody => "fullbody",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ClothingCategory::Upper => "Tops",
            ClothingCategory::Lower => "Bottoms",
            ClothingCategory::Shoes => "Shoes",
            ClothingCategory::Accessory => "Accessories",
            ClothingCategory::Fullbody => "Full Body",
        }
    }
}

/// A garment from the wardrobe or the shopping catalog.
///
/// `name` doubles as the key the planner uses to reference the item, so it
/// is compared by exact string equality when plans are mapped back to items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: ItemId,
    pub name: String,
    pub category: ClothingCategory,
    /// Remote URL or `data:<mime>;base64,<payload>` URI.
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// A wardrobe item as submitted by the user, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClothingItem {
    pub name: String,
    pub category: ClothingCategory,
    pub image_url: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl NewClothingItem {
    pub fn new(name: impl Into<String>, category: ClothingCategory, image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            image_url: image_url.into(),
            brand: None,
            price: None,
        }
    }

    pub fn into_item(self, id: ItemId) -> ClothingItem {
        ClothingItem {
            id,
            name: self.name,
            category: self.category,
            image_url: self.image_url,
            brand: self.brand,
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyType {
    Rectangle,
    Triangle,
    InvertedTriangle,
    Hourglass,
    Oval,
}

impl BodyType {
    pub const ALL: [BodyType; 5] = [
        BodyType::Rectangle,
        BodyType::Triangle,
        BodyType::InvertedTriangle,
        BodyType::Hourglass,
        BodyType::Oval,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
        BodyType::ALL
            .into_iter()
            .find(|body_type| body_type.as_str() == normalized)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BodyType::Rectangle => "rectangle",
            BodyType::Triangle => "triangle",
            BodyType::InvertedTriangle => "inverted-triangle",
            BodyType::Hourglass => "hourglass",
            BodyType::Oval => "oval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementField {
    Bust,
    Waist,
    Hips,
    ArmLength,
    LegLength,
    Height,
}

impl MeasurementField {
    pub const ALL: [MeasurementField; 6] = [
        MeasurementField::Bust,
        MeasurementField::Waist,
        MeasurementField::Hips,
        MeasurementField::ArmLength,
        MeasurementField::LegLength,
        MeasurementField::Height,
    ];

    /// JSON key shared by the analysis response and the serialized profile.
    pub const fn key(self) -> &'static str {
        match self {
            MeasurementField::Bust => "bust",
            MeasurementField::Waist => "waist",
            MeasurementField::Hips => "hips",
            MeasurementField::ArmLength => "armLength",
            MeasurementField::LegLength => "legLength",
            MeasurementField::Height => "height",
        }
    }
}

/// Body measurements in centimetres, kept as strings so they bind straight
/// into an editable form. Unknown values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Measurements {
    pub bust: String,
    pub waist: String,
    pub hips: String,
    pub arm_length: String,
    pub leg_length: String,
    pub height: String,
}

impl Measurements {
    pub fn get(&self, field: MeasurementField) -> &str {
        match field {
            MeasurementField::Bust => &self.bust,
            MeasurementField::Waist => &self.waist,
            MeasurementField::Hips => &self.hips,
            MeasurementField::ArmLength => &self.arm_length,
            MeasurementField::LegLength => &self.leg_length,
            MeasurementField::Height => &self.height,
        }
    }

    pub fn set(&mut self, field: MeasurementField, value: impl Into<String>) {
        let slot = match field {
            MeasurementField::Bust => &mut self.bust,
            MeasurementField::Waist => &mut self.waist,
            MeasurementField::Hips => &mut self.hips,
            MeasurementField::ArmLength => &mut self.arm_length,
            MeasurementField::LegLength => &mut self.leg_length,
            MeasurementField::Height => &mut self.height,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub base_image: Option<String>,
    pub personal_style: Option<String>,
    pub body_type: Option<BodyType>,
    pub measurements: Option<Measurements>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLook {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_type_parsing_tolerates_case_and_separators() {
        assert_eq!(BodyType::parse("Hourglass"), Some(BodyType::Hourglass));
        assert_eq!(
            BodyType::parse(" inverted_triangle "),
            Some(BodyType::InvertedTriangle)
        );
        assert_eq!(BodyType::parse("pear"), None);
    }

    #[test]
    fn measurements_serialize_with_camel_case_keys() {
        let mut measurements = Measurements::default();
        measurements.set(MeasurementField::ArmLength, "60");
        let value = serde_json::to_value(&measurements).unwrap();
        assert_eq!(value["armLength"], "60");
        assert_eq!(value["legLength"], "");
        assert_eq!(measurements.get(MeasurementField::ArmLength), "60");
    }

    #[test]
    fn clothing_item_uses_wire_names() {
        let item = NewClothingItem::new("Linen Shirt", ClothingCategory::Upper, "data:image/png;base64,AAAA")
            .into_item(ItemId(7));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["category"], "upper");
        assert_eq!(value["imageUrl"], "data:image/png;base64,AAAA");
        assert!(value.get("brand").is_none());
    }
}
