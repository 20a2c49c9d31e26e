use crate::llm::media::MediaError;

#[derive(Debug, thiserror::Error)]
pub enum StylistError {
    #[error("look planning failed: {0}")]
    Planning(String),
    #[error("none of the planned looks produced an image")]
    NoLooksGenerated,
    #[error("profile analysis failed: {0}")]
    Analysis(String),
    #[error("invalid image for {subject}: {source}")]
    InvalidImage {
        subject: String,
        #[source]
        source: MediaError,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StylistError {
    pub fn user_message(&self) -> String {
        match self {
            StylistError::Planning(_) => {
                "Could not create the look descriptions. The stylist returned an invalid answer."
                    .to_string()
            }
            StylistError::NoLooksGenerated => {
                "Could not generate images for the looks. Please try again.".to_string()
            }
            StylistError::Analysis(_) => {
                "Image analysis failed. Make sure the photo is full-body and well lit.".to_string()
            }
            StylistError::InvalidImage { subject, .. } => {
                format!("The image for {subject} could not be read. Please upload it again.")
            }
            StylistError::Backend(_) => {
                "Something went wrong while contacting the styling service. Please try again."
                    .to_string()
            }
        }
    }
}
