use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::catalog;
use crate::llm::media::{ImageSource, MediaError};
use crate::models::{
    BodyType, ClothingItem, GeneratedLook, ItemId, MeasurementField, Measurements,
    NewClothingItem, UserProfile,
};
use crate::stylist::{self, ProfileAnalysis, StylistBackend, StylistError};
use crate::utils::timing::{complete_operation_timer, start_operation_timer};

/// Input problems caught before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a profile photo is required")]
    MissingBaseImage,
    #[error("no clothing item is selected")]
    EmptySelection,
    #[error("the style description is empty")]
    EmptyStyle,
    #[error("the item name is empty")]
    EmptyItemName,
    #[error("the item has no image")]
    MissingItemImage,
    #[error("the item image is unusable: {0}")]
    InvalidItemImage(#[source] MediaError),
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::MissingBaseImage => "Please add a profile photo first.".to_string(),
            ValidationError::EmptySelection => "Select at least one clothing item.".to_string(),
            ValidationError::EmptyStyle => "Describe the style you want for your look.".to_string(),
            ValidationError::EmptyItemName | ValidationError::MissingItemImage => {
                "Please fill in every field and add an image.".to_string()
            }
            ValidationError::InvalidItemImage(_) => {
                "The item image could not be read. Please choose another file.".to_string()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a generation is already in progress")]
    Busy,
    #[error(transparent)]
    Stylist(#[from] StylistError),
}

impl RoomError {
    pub fn user_message(&self) -> String {
        match self {
            RoomError::Validation(err) => err.user_message(),
            RoomError::Busy => "Your looks are still being generated.".to_string(),
            RoomError::Stylist(err) => err.user_message(),
        }
    }
}

#[derive(Debug)]
struct RoomState {
    wardrobe: Vec<ClothingItem>,
    selection: Vec<ClothingItem>,
    profile: UserProfile,
    looks: Vec<GeneratedLook>,
    busy: bool,
    last_error: Option<String>,
    next_id: u64,
}

impl RoomState {
    fn fresh_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn is_selected(&self, id: ItemId) -> bool {
        self.selection.iter().any(|item| item.id == id)
    }

    fn generation_inputs(&self, style: &str) -> Result<(String, Vec<ClothingItem>), ValidationError> {
        let base_image = self
            .profile
            .base_image
            .as_ref()
            .filter(|image| !image.trim().is_empty())
            .ok_or(ValidationError::MissingBaseImage)?;
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        if style.trim().is_empty() {
            return Err(ValidationError::EmptyStyle);
        }
        Ok((base_image.clone(), self.selection.clone()))
    }
}

/// Clears the busy flag even if the generation future is dropped mid-call.
struct BusyGuard<'a> {
    state: &'a Mutex<RoomState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().busy = false;
    }
}

/// In-memory state of one fitting-room session.
#[derive(Clone)]
pub struct FittingRoom {
    state: Arc<Mutex<RoomState>>,
}

impl Default for FittingRoom {
    fn default() -> Self {
        Self::new()
    }
}

impl FittingRoom {
    pub fn new() -> Self {
        Self::with_wardrobe(catalog::wardrobe_items())
    }

    pub fn with_wardrobe(wardrobe: Vec<ClothingItem>) -> Self {
        let highest = wardrobe
            .iter()
            .map(|item| item.id)
            .chain(std::iter::once(catalog::max_catalog_id()))
            .max()
            .unwrap_or(ItemId(0));
        FittingRoom {
            state: Arc::new(Mutex::new(RoomState {
                wardrobe,
                selection: Vec::new(),
                profile: UserProfile::default(),
                looks: Vec::new(),
                busy: false,
                last_error: None,
                next_id: highest.0 + 1,
            })),
        }
    }

    pub fn wardrobe(&self) -> Vec<ClothingItem> {
        self.state.lock().wardrobe.clone()
    }

    /// Looks an id up in the wardrobe first, then in the shopping catalog.
    pub fn find_item(&self, id: ItemId) -> Option<ClothingItem> {
        let state = self.state.lock();
        state
            .wardrobe
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .or_else(|| catalog::find_shopping_item(id).cloned())
    }

    pub fn selection(&self) -> Vec<ClothingItem> {
        self.state.lock().selection.clone()
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.state.lock().is_selected(id)
    }

    /// Selects the item if absent, deselects it otherwise. Returns whether it
    /// is selected afterwards.
    pub fn toggle_selection(&self, item: &ClothingItem) -> bool {
        let mut state = self.state.lock();
        if state.is_selected(item.id) {
            state.selection.retain(|selected| selected.id != item.id);
            false
        } else {
            state.selection.push(item.clone());
            true
        }
    }

    pub fn add_item(&self, item: NewClothingItem) -> Result<ClothingItem, ValidationError> {
        if item.name.trim().is_empty() {
            return Err(ValidationError::EmptyItemName);
        }
        if item.image_url.trim().is_empty() {
            return Err(ValidationError::MissingItemImage);
        }
        ImageSource::parse(&item.image_url).map_err(ValidationError::InvalidItemImage)?;

        let mut state = self.state.lock();
        let id = state.fresh_id();
        let item = item.into_item(id);
        state.wardrobe.push(item.clone());
        info!(item_id = %id, name = %item.name, "Wardrobe item added");
        Ok(item)
    }

    /// Removes the item from the wardrobe and the selection in one step.
    pub fn remove_item(&self, id: ItemId) -> Option<ClothingItem> {
        let mut state = self.state.lock();
        let position = state.wardrobe.iter().position(|item| item.id == id)?;
        let removed = state.wardrobe.remove(position);
        state.selection.retain(|item| item.id != id);
        Some(removed)
    }

    pub fn profile(&self) -> UserProfile {
        self.state.lock().profile.clone()
    }

    /// A session without a base photo should prompt for the profile first.
    pub fn needs_profile(&self) -> bool {
        self.state.lock().profile.base_image.is_none()
    }

    pub fn edit_profile(&self) -> ProfileDraft {
        ProfileDraft::new(self.profile())
    }

    /// The profile editor may only be dismissed once a photo has been saved.
    pub fn can_close_profile_editor(&self) -> bool {
        !self.needs_profile()
    }

    pub fn save_profile(&self, profile: UserProfile) {
        self.state.lock().profile = profile;
    }

    pub fn looks(&self) -> Vec<GeneratedLook> {
        self.state.lock().looks.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Generates looks for the current photo and selection. The previous
    /// batch is discarded as soon as a valid request starts.
    pub async fn generate_looks(
        &self,
        backend: &dyn StylistBackend,
        style: &str,
    ) -> Result<Vec<GeneratedLook>, RoomError> {
        let (user_image, items) = {
            let mut state = self.state.lock();
            if state.busy {
                return Err(RoomError::Busy);
            }
            let inputs = match state.generation_inputs(style) {
                Ok(inputs) => inputs,
                Err(err) => {
                    state.last_error = Some(err.user_message());
                    return Err(err.into());
                }
            };
            state.busy = true;
            state.last_error = None;
            state.looks.clear();
            inputs
        };
        let guard = BusyGuard { state: &self.state };

        let mut timer = start_operation_timer(
            "generate_looks",
            Some(format!("items={} style_chars={}", items.len(), style.trim().chars().count())),
        );
        let result = stylist::generate_looks(backend, &user_image, &items, style.trim()).await;

        {
            let mut state = self.state.lock();
            match &result {
                Ok(looks) => {
                    state.looks = looks.clone();
                    complete_operation_timer(&mut timer, "success", Some(format!("looks={}", looks.len())));
                }
                Err(err) => {
                    error!("Look generation failed: {}", err);
                    state.last_error = Some(err.user_message());
                    complete_operation_timer(&mut timer, "error", Some(err.to_string()));
                }
            }
        }
        drop(guard);

        result.map_err(RoomError::from)
    }
}

/// Working copy of the profile while the user edits it.
#[derive(Debug, Clone)]
pub struct ProfileDraft {
    profile: UserProfile,
    analysis_error: Option<String>,
}

impl ProfileDraft {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            analysis_error: None,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn analysis_error(&self) -> Option<&str> {
        self.analysis_error.as_deref()
    }

    pub fn select_personal_style(&mut self, id: &str) -> bool {
        if !catalog::is_personal_style(id) {
            warn!("Ignoring unknown personal style '{}'", id);
            return false;
        }
        self.profile.personal_style = Some(id.to_string());
        true
    }

    pub fn select_body_type(&mut self, body_type: BodyType) {
        self.profile.body_type = Some(body_type);
    }

    pub fn set_measurement(&mut self, field: MeasurementField, value: impl Into<String>) {
        self.profile
            .measurements
            .get_or_insert_with(Measurements::default)
            .set(field, value);
    }

    /// Stores the new photo and runs the body analysis on it. Body type and
    /// measurements are only overwritten when the analysis succeeds.
    pub async fn capture_photo(
        &mut self,
        backend: &dyn StylistBackend,
        image: String,
    ) -> Result<ProfileAnalysis, StylistError> {
        self.profile.base_image = Some(image.clone());
        self.analysis_error = None;

        let mut timer = start_operation_timer("analyze_profile", None);
        let result = stylist::analyze_profile(backend, &image).await;
        match &result {
            Ok(analysis) => {
                self.profile.body_type = Some(analysis.body_type);
                self.profile.measurements = Some(analysis.measurements.clone());
                complete_operation_timer(&mut timer, "success", Some(analysis.body_type.as_str().to_string()));
            }
            Err(err) => {
                warn!("Profile analysis failed: {}", err);
                self.analysis_error = Some(err.user_message());
                complete_operation_timer(&mut timer, "error", Some(err.to_string()));
            }
        }
        result
    }

    pub fn into_profile(self) -> UserProfile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::llm::media::InlineImage;
    use crate::models::ClothingCategory;
    use crate::stylist::mock::{MockBackend, MockSynthesis};
    use crate::stylist::{SynthesisRequest, SynthesisResponse};

    const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";
    const SHIRT_IMAGE: &str = "data:image/png;base64,c2hpcnQ=";

    fn room_with_photo() -> FittingRoom {
        let room = FittingRoom::new();
        room.save_profile(UserProfile {
            base_image: Some(PHOTO.to_string()),
            ..UserProfile::default()
        });
        room
    }

    fn single_look_backend(item_name: &str) -> MockBackend {
        MockBackend::new()
            .with_plan_response(
                serde_json::json!({
                    "looks": [{ "name": "Easy Sunday", "description": "Relaxed and light.", "itemsUsed": [item_name] }]
                })
                .to_string(),
            )
            .with_synthesis(MockSynthesis::image("image/png", "bG9vaw=="))
    }

    #[test]
    fn double_toggle_restores_the_selection() {
        let room = FittingRoom::new();
        let wardrobe = room.wardrobe();
        let (shirt, jeans) = (&wardrobe[0], &wardrobe[1]);

        assert!(room.toggle_selection(shirt));
        assert!(room.toggle_selection(jeans));
        assert!(!room.toggle_selection(shirt));
        assert!(room.toggle_selection(shirt));

        let mut ids: Vec<ItemId> = room.selection().iter().map(|item| item.id).collect();
        ids.sort();
        assert_eq!(ids, vec![shirt.id, jeans.id]);

        room.toggle_selection(jeans);
        room.toggle_selection(shirt);
        assert!(room.selection().is_empty());
    }

    #[test]
    fn added_items_get_fresh_ids_above_the_catalog() {
        let room = FittingRoom::new();
        let first = room
            .add_item(NewClothingItem::new("Striped Tee", ClothingCategory::Upper, SHIRT_IMAGE))
            .unwrap();
        let second = room
            .add_item(NewClothingItem::new("Denim Skirt", ClothingCategory::Lower, SHIRT_IMAGE))
            .unwrap();

        assert!(first.id > catalog::max_catalog_id());
        assert_ne!(first.id, second.id);
        assert_eq!(room.wardrobe().last().map(|item| item.id), Some(second.id));
        assert_eq!(room.find_item(first.id).map(|item| item.name), Some("Striped Tee".to_string()));
    }

    #[test]
    fn add_item_validates_name_and_image() {
        let room = FittingRoom::new();
        let before = room.wardrobe().len();

        assert_eq!(
            room.add_item(NewClothingItem::new("  ", ClothingCategory::Upper, SHIRT_IMAGE)),
            Err(ValidationError::EmptyItemName)
        );
        assert_eq!(
            room.add_item(NewClothingItem::new("Tee", ClothingCategory::Upper, "")),
            Err(ValidationError::MissingItemImage)
        );
        assert!(matches!(
            room.add_item(NewClothingItem::new("Tee", ClothingCategory::Upper, "C:\\tee.png")),
            Err(ValidationError::InvalidItemImage(_))
        ));
        assert_eq!(room.wardrobe().len(), before);
    }

    #[test]
    fn removing_an_item_also_deselects_it() {
        let room = FittingRoom::new();
        let item = room
            .add_item(NewClothingItem::new("Wool Scarf", ClothingCategory::Accessory, SHIRT_IMAGE))
            .unwrap();
        room.toggle_selection(&item);
        assert!(room.is_selected(item.id));

        let removed = room.remove_item(item.id).unwrap();

        assert_eq!(removed.id, item.id);
        assert!(!room.is_selected(item.id));
        assert!(room.wardrobe().iter().all(|entry| entry.id != item.id));
        assert!(room.remove_item(item.id).is_none());
    }

    #[test]
    fn shopping_items_are_selectable() {
        let room = FittingRoom::new();
        let jacket = room.find_item(ItemId(101)).unwrap();
        assert!(room.toggle_selection(&jacket));
        assert!(room.is_selected(ItemId(101)));
    }

    #[tokio::test]
    async fn generation_requires_photo_selection_and_style() {
        let backend = MockBackend::new();

        let room = FittingRoom::new();
        let shirt = room.wardrobe()[0].clone();
        room.toggle_selection(&shirt);
        assert!(room.needs_profile());
        assert!(matches!(
            room.generate_looks(&backend, "Casual").await,
            Err(RoomError::Validation(ValidationError::MissingBaseImage))
        ));
        assert_eq!(room.last_error().as_deref(), Some("Please add a profile photo first."));

        let room = room_with_photo();
        assert!(matches!(
            room.generate_looks(&backend, "Casual").await,
            Err(RoomError::Validation(ValidationError::EmptySelection))
        ));

        room.toggle_selection(&shirt);
        assert!(matches!(
            room.generate_looks(&backend, "   ").await,
            Err(RoomError::Validation(ValidationError::EmptyStyle))
        ));

        assert!(backend.calls().is_empty());
        assert!(!room.is_busy());
    }

    #[tokio::test]
    async fn successful_generation_stores_the_looks() {
        let room = room_with_photo();
        let shirt = room.wardrobe()[0].clone();
        room.toggle_selection(&shirt);
        let backend = MockBackend::new()
            .with_plan_response(
                serde_json::json!({
                    "looks": [{ "name": "Linen Day", "description": "Fresh linen for the heat.", "itemsUsed": [shirt.name] }]
                })
                .to_string(),
            )
            .with_synthesis(MockSynthesis::image("image/png", "bG9vaw=="));

        let looks = room.generate_looks(&backend, "Summer in Lisbon").await.unwrap();

        assert_eq!(looks.len(), 1);
        assert_eq!(room.looks(), looks);
        assert!(room.last_error().is_none());
        assert!(!room.is_busy());
        assert!(backend.calls().iter().any(|call| matches!(
            call,
            crate::stylist::mock::MockCall::Plan { prompt } if prompt.contains("\"Summer in Lisbon\"")
        )));
    }

    #[tokio::test]
    async fn failed_generation_discards_previous_looks_and_keeps_state() {
        let room = room_with_photo();
        let shirt = room.wardrobe()[0].clone();
        room.toggle_selection(&shirt);
        room.generate_looks(&single_look_backend(&shirt.name), "Casual")
            .await
            .unwrap();
        assert_eq!(room.looks().len(), 1);
        let wardrobe_before = room.wardrobe();
        let profile_before = room.profile();

        let failing = MockBackend::new().with_plan_response(r#"{"looks": []}"#);
        let result = room.generate_looks(&failing, "Casual").await;

        assert!(matches!(result, Err(RoomError::Stylist(StylistError::Planning(_)))));
        assert!(room.looks().is_empty());
        assert_eq!(
            room.last_error().as_deref(),
            Some("Could not create the look descriptions. The stylist returned an invalid answer.")
        );
        assert_eq!(room.wardrobe(), wardrobe_before);
        assert_eq!(room.profile(), profile_before);
        assert!(room.is_selected(shirt.id));
        assert!(!room.is_busy());
    }

    struct GatedBackend {
        gate: Arc<Notify>,
        inner: MockBackend,
    }

    #[async_trait]
    impl StylistBackend for GatedBackend {
        async fn plan_looks(&self, prompt: &str) -> Result<String> {
            self.gate.notified().await;
            self.inner.plan_looks(prompt).await
        }

        async fn synthesize_image(&self, request: &SynthesisRequest) -> Result<SynthesisResponse> {
            self.inner.synthesize_image(request).await
        }

        async fn analyze_image(&self, prompt: &str, image: &InlineImage) -> Result<String> {
            self.inner.analyze_image(prompt, image).await
        }
    }

    #[tokio::test]
    async fn concurrent_generation_is_rejected_while_busy() {
        let room = room_with_photo();
        let shirt = room.wardrobe()[0].clone();
        room.toggle_selection(&shirt);
        let gate = Arc::new(Notify::new());
        let backend = GatedBackend {
            gate: gate.clone(),
            inner: single_look_backend(&shirt.name),
        };

        let (first, second, _) = tokio::join!(
            room.generate_looks(&backend, "Casual"),
            room.generate_looks(&backend, "Casual"),
            async {
                gate.notify_one();
            }
        );

        assert_eq!(first.unwrap().len(), 1);
        assert!(matches!(second, Err(RoomError::Busy)));
        assert_eq!(backend.inner.plan_calls(), 1);
        assert!(!room.is_busy());
    }

    #[tokio::test]
    async fn captured_photo_fills_in_the_analysis() {
        let room = FittingRoom::new();
        let backend = MockBackend::new().with_analysis_response(
            r#"{"bodyType": "triangle", "measurements": {"bust": 86, "waist": 68, "hips": 100, "armLength": 56, "legLength": 98, "height": 165}}"#,
        );
        let mut draft = room.edit_profile();

        let analysis = draft.capture_photo(&backend, PHOTO.to_string()).await.unwrap();

        assert_eq!(analysis.body_type, BodyType::Triangle);
        assert_eq!(draft.profile().base_image.as_deref(), Some(PHOTO));
        assert_eq!(draft.profile().body_type, Some(BodyType::Triangle));
        assert_eq!(
            draft.profile().measurements.as_ref().map(|m| m.hips.as_str()),
            Some("100")
        );
        assert!(!room.can_close_profile_editor());

        room.save_profile(draft.into_profile());
        assert!(room.can_close_profile_editor());
        assert_eq!(room.profile().body_type, Some(BodyType::Triangle));
    }

    #[tokio::test]
    async fn failed_analysis_keeps_previous_body_data() {
        let mut draft = ProfileDraft::new(UserProfile::default());
        draft.select_body_type(BodyType::Oval);
        draft.set_measurement(MeasurementField::Height, "170");
        let backend = MockBackend::new().with_analysis_response("I think it is an hourglass");

        let result = draft.capture_photo(&backend, PHOTO.to_string()).await;

        assert!(matches!(result, Err(StylistError::Analysis(_))));
        assert_eq!(draft.profile().body_type, Some(BodyType::Oval));
        let measurements = draft.profile().measurements.clone().unwrap();
        assert_eq!(measurements.height, "170");
        assert_eq!(measurements.bust, "");
        assert_eq!(draft.profile().base_image.as_deref(), Some(PHOTO));
        assert_eq!(
            draft.analysis_error(),
            Some("Image analysis failed. Make sure the photo is full-body and well lit.")
        );
    }

    #[test]
    fn draft_edits_are_kept_until_saved() {
        let room = room_with_photo();
        let mut draft = room.edit_profile();

        assert!(draft.select_personal_style("elegant"));
        assert!(!draft.select_personal_style("goth"));
        draft.set_measurement(MeasurementField::Waist, "71");

        assert_eq!(room.profile().personal_style, None);
        room.save_profile(draft.into_profile());
        let saved = room.profile();
        assert_eq!(saved.personal_style.as_deref(), Some("elegant"));
        assert_eq!(saved.measurements.map(|m| m.waist), Some("71".to_string()));
        assert_eq!(saved.base_image.as_deref(), Some(PHOTO));
    }
}
