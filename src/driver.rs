use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing::info;

use crate::catalog;
use crate::llm::media::InlineImage;
use crate::models::{ClothingCategory, GeneratedLook, ItemId, NewClothingItem, UserProfile};
use crate::session::FittingRoom;
use crate::stylist::StylistBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    pub photo: PathBuf,
    pub item_ids: Vec<ItemId>,
    pub uploads: Vec<(ClothingCategory, PathBuf)>,
    pub style: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeArgs {
    pub photo: PathBuf,
}

async fn read_image_file(path: &Path) -> Result<InlineImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let image = InlineImage::from_bytes(&bytes, "application/octet-stream");
    if !image.is_image() {
        return Err(anyhow!(
            "{} is not a supported image (detected {})",
            path.display(),
            image.mime_type
        ));
    }
    Ok(image)
}

fn item_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Uploaded item".to_string())
}

fn slugify(value: &str) -> String {
    let slug = value
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "look".to_string()
    } else {
        slug
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "bin",
    }
}

async fn write_look(output_dir: &Path, index: usize, look: &GeneratedLook) -> Result<PathBuf> {
    let image = InlineImage::from_data_uri(&look.image_url)
        .map_err(|err| anyhow!("Look '{}' has an unreadable image: {}", look.name, err))?;
    let bytes = image.decode()?;
    let path = output_dir.join(format!(
        "look-{}-{}.{}",
        index + 1,
        slugify(&look.name),
        extension_for_mime(&image.mime_type)
    ));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub async fn run_generate(backend: &dyn StylistBackend, args: GenerateArgs) -> Result<Vec<PathBuf>> {
    let room = FittingRoom::new();
    let photo = read_image_file(&args.photo).await?;
    room.save_profile(UserProfile {
        base_image: Some(photo.to_data_uri()),
        ..UserProfile::default()
    });

    for id in &args.item_ids {
        let item = room
            .find_item(*id)
            .ok_or_else(|| anyhow!("No catalog item with id {}", id))?;
        if !room.is_selected(item.id) {
            room.toggle_selection(&item);
        }
    }
    for (category, path) in &args.uploads {
        let image = read_image_file(path).await?;
        let item = room
            .add_item(NewClothingItem::new(
                item_name_from_path(path),
                *category,
                image.to_data_uri(),
            ))
            .map_err(|err| anyhow!(err.user_message()))?;
        room.toggle_selection(&item);
    }

    let looks = match room.generate_looks(backend, &args.style).await {
        Ok(looks) => looks,
        Err(err) => {
            let message = room.last_error().unwrap_or_else(|| err.user_message());
            return Err(anyhow!("{} ({})", message, err));
        }
    };

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let mut written = Vec::with_capacity(looks.len());
    for (index, look) in looks.iter().enumerate() {
        let path = write_look(&args.output_dir, index, look).await?;
        println!("{}. {} - {}\n   {}", index + 1, look.name, look.description, path.display());
        written.push(path);
    }
    info!(looks = written.len(), output = %args.output_dir.display(), "Looks written");
    Ok(written)
}

pub async fn run_analyze(backend: &dyn StylistBackend, args: AnalyzeArgs) -> Result<()> {
    let room = FittingRoom::new();
    let photo = read_image_file(&args.photo).await?;
    let mut draft = room.edit_profile();
    let analysis = draft
        .capture_photo(backend, photo.to_data_uri())
        .await
        .map_err(|err| anyhow!("{} ({})", err.user_message(), err))?;
    room.save_profile(draft.into_profile());

    let output = json!({
        "bodyType": analysis.body_type,
        "measurements": analysis.measurements,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn catalog_listing() -> String {
    let room = FittingRoom::new();
    let mut lines = vec!["Wardrobe:".to_string()];
    for item in room.wardrobe() {
        lines.push(format!("  {:>4}  {:<28} {}", item.id.0, item.name, item.category.label()));
    }
    lines.push("Shopping:".to_string());
    for item in catalog::shopping_items() {
        let price = item
            .price
            .map(|price| format!("{price:.2}"))
            .unwrap_or_default();
        lines.push(format!(
            "  {:>4}  {:<28} {:<12} {:<14} {}",
            item.id.0,
            item.name,
            item.category.label(),
            item.brand.as_deref().unwrap_or(""),
            price
        ));
    }
    lines.push("Personal styles:".to_string());
    for option in catalog::PERSONAL_STYLE_OPTIONS.iter() {
        lines.push(format!("  {:<10} {}", option.id, option.label));
    }
    lines.push("Body types:".to_string());
    for option in catalog::BODY_TYPE_OPTIONS.iter() {
        lines.push(format!("  {:<18} {}", option.body_type.as_str(), option.label));
    }
    lines.join("\n")
}

pub fn print_catalog() {
    println!("{}", catalog_listing());
}
