use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::media::{ImageSource, InlineImage};
use crate::models::{ClothingItem, GeneratedLook};
use crate::stylist::backend::{select_image, ReferenceImage, StylistBackend, SynthesisRequest};
use crate::stylist::error::StylistError;

/// Number of looks requested from the planner; extra plans are ignored.
pub const LOOK_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookPlan {
    pub name: String,
    pub description: String,
    pub items_used: Vec<String>,
}

impl LookPlan {
    fn uses(&self, item: &ClothingItem) -> bool {
        self.items_used.iter().any(|name| *name == item.name)
    }
}

pub fn build_planning_prompt(items: &[ClothingItem], style: &str) -> String {
    let item_lines = items
        .iter()
        .map(|item| format!("- {} (category: {})", item.name, item.category.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a personal stylist. Using the clothing items below and the desired style, create {count} unique looks.\n\
         For each look, give a creative name, a one-sentence description and the EXACT names of the items it uses.\n\n\
         Available items:\n{item_lines}\n\n\
         Desired style: \"{style}\"\n\n\
         Your answer MUST be a JSON object with a single key \"looks\" holding an array of {count} objects.\n\
         Each object must have the keys \"name\" (string), \"description\" (string) and \"itemsUsed\" \
         (array of strings copied exactly from the item names above).",
        count = LOOK_COUNT,
    )
}

fn build_synthesis_prompt(plan: &LookPlan) -> String {
    format!(
        "Generate a photorealistic image of the person in the first image wearing a complete outfit.\n\
         The outfit is made of these items: {items}. Their images follow the person's photo.\n\
         The look is: \"{name} - {description}\".\n\
         Use a neutral background or a setting that matches the style.\n\
         Keep the person's identity and face exactly as in the original photo. Show the full body.",
        items = plan.items_used.join(", "),
        name = plan.name,
        description = plan.description,
    )
}

pub fn parse_look_plans(raw: &str) -> Result<Vec<LookPlan>, StylistError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| StylistError::Planning(format!("response is not valid JSON: {err}")))?;

    let looks = value
        .get("looks")
        .ok_or_else(|| StylistError::Planning("response has no \"looks\" key".to_string()))?;
    let entries = looks
        .as_array()
        .ok_or_else(|| StylistError::Planning("\"looks\" is not an array".to_string()))?;
    if entries.is_empty() {
        return Err(StylistError::Planning("\"looks\" is empty".to_string()));
    }

    let mut plans = Vec::with_capacity(entries.len().min(LOOK_COUNT));
    for (index, entry) in entries.iter().take(LOOK_COUNT).enumerate() {
        let plan: LookPlan = serde_json::from_value(entry.clone()).map_err(|err| {
            StylistError::Planning(format!("look {} is malformed: {err}", index + 1))
        })?;
        if plan.name.trim().is_empty() || plan.description.trim().is_empty() {
            return Err(StylistError::Planning(format!(
                "look {} is missing a name or description",
                index + 1
            )));
        }
        plans.push(plan);
    }

    Ok(plans)
}

/// Items referenced by at least one plan, in their original order.
pub fn relevant_items<'a>(items: &'a [ClothingItem], plans: &[LookPlan]) -> Vec<&'a ClothingItem> {
    let referenced: HashSet<&str> = plans
        .iter()
        .flat_map(|plan| plan.items_used.iter().map(String::as_str))
        .collect();
    items
        .iter()
        .filter(|item| referenced.contains(item.name.as_str()))
        .collect()
}

/// Plans and synthesizes looks. Plans whose synthesis returns no image are
/// dropped; any backend failure aborts the whole call.
pub async fn generate_looks(
    backend: &dyn StylistBackend,
    user_image: &str,
    items: &[ClothingItem],
    style: &str,
) -> Result<Vec<GeneratedLook>, StylistError> {
    let subject =
        InlineImage::from_data_uri(user_image).map_err(|source| StylistError::InvalidImage {
            subject: "your photo".to_string(),
            source,
        })?;

    let prompt = build_planning_prompt(items, style);
    let raw_plans = backend.plan_looks(&prompt).await?;
    let plans = parse_look_plans(&raw_plans).map_err(|err| {
        warn!("Look planning response was rejected: {}", err);
        err
    })?;

    let mut references = Vec::new();
    for item in relevant_items(items, &plans) {
        let source =
            ImageSource::parse(&item.image_url).map_err(|source| StylistError::InvalidImage {
                subject: item.name.clone(),
                source,
            })?;
        references.push((item, source));
    }
    info!(
        plans = plans.len(),
        candidate_items = items.len(),
        referenced_items = references.len(),
        "Look plans ready"
    );

    let mut looks = Vec::with_capacity(plans.len());
    for (index, plan) in plans.iter().enumerate() {
        let request = SynthesisRequest {
            prompt: build_synthesis_prompt(plan),
            subject: subject.clone(),
            references: references
                .iter()
                .filter(|(item, _)| plan.uses(item))
                .map(|(item, source)| ReferenceImage {
                    item_name: item.name.clone(),
                    source: source.clone(),
                })
                .collect(),
        };

        let response = backend.synthesize_image(&request).await?;
        match select_image(&response) {
            Some(image) => looks.push(GeneratedLook {
                name: plan.name.clone(),
                description: plan.description.clone(),
                image_url: image.to_data_uri(),
            }),
            None => debug!(plan = index + 1, "Synthesis returned no image; skipping look"),
        }
    }

    if looks.is_empty() {
        return Err(StylistError::NoLooksGenerated);
    }
    Ok(looks)
}
