use serde_json::{Map, Value};
use tracing::warn;

use crate::llm::media::InlineImage;
use crate::models::{BodyType, MeasurementField, Measurements};
use crate::stylist::backend::StylistBackend;
use crate::stylist::error::StylistError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileAnalysis {
    pub body_type: BodyType,
    pub measurements: Measurements,
}

pub fn build_analysis_prompt() -> String {
    let body_types = BodyType::ALL
        .iter()
        .map(|body_type| format!("'{}'", body_type.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let measurement_shape = MeasurementField::ALL
        .iter()
        .map(|field| format!("\"{}\": <number>", field.key()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the full-body photo provided and estimate the person's body type and body measurements in centimetres.\n\
         For the body type, choose ONE of: {body_types}.\n\
         For the measurements, give numeric estimates for bust, waist, hips, arm length (shoulder to wrist), \
         leg length (hip to ankle) and total height.\n\n\
         Your answer MUST be a JSON object with this exact shape:\n\
         {{ \"bodyType\": \"...\", \"measurements\": {{ {measurement_shape} }} }}\n\
         Do not include any explanation, markdown or text outside the JSON object."
    )
}

fn measurement_text(field: MeasurementField, value: Option<&Value>) -> Result<String, StylistError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(Value::Number(number)) => {
            if let Some(integer) = number.as_i64() {
                return Ok(integer.to_string());
            }
            match number.as_f64() {
                Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                    Ok(format!("{}", float as i64))
                }
                Some(float) => Ok(float.to_string()),
                None => Ok(number.to_string()),
            }
        }
        Some(other) => Err(StylistError::Analysis(format!(
            "measurement \"{}\" has unexpected value {}",
            field.key(),
            other
        ))),
    }
}

fn parse_measurements(object: &Map<String, Value>) -> Result<Measurements, StylistError> {
    let mut measurements = Measurements::default();
    for field in MeasurementField::ALL {
        measurements.set(field, measurement_text(field, object.get(field.key()))?);
    }
    Ok(measurements)
}

pub fn parse_profile_analysis(raw: &str) -> Result<ProfileAnalysis, StylistError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| StylistError::Analysis(format!("response is not valid JSON: {err}")))?;

    let body_type = value
        .get("bodyType")
        .and_then(Value::as_str)
        .ok_or_else(|| StylistError::Analysis("\"bodyType\" is missing".to_string()))?;
    let body_type = BodyType::parse(body_type).ok_or_else(|| {
        StylistError::Analysis(format!("\"{body_type}\" is not a known body type"))
    })?;

    let measurements = value
        .get("measurements")
        .and_then(Value::as_object)
        .ok_or_else(|| StylistError::Analysis("\"measurements\" is not an object".to_string()))?;

    Ok(ProfileAnalysis {
        body_type,
        measurements: parse_measurements(measurements)?,
    })
}

/// Estimates body type and measurements from a single data-URI photo.
pub async fn analyze_profile(
    backend: &dyn StylistBackend,
    user_image: &str,
) -> Result<ProfileAnalysis, StylistError> {
    let image =
        InlineImage::from_data_uri(user_image).map_err(|source| StylistError::InvalidImage {
            subject: "your photo".to_string(),
            source,
        })?;

    let raw = backend.analyze_image(&build_analysis_prompt(), &image).await?;
    parse_profile_analysis(&raw).map_err(|err| {
        warn!("Profile analysis response was rejected: {}", err);
        err
    })
}
