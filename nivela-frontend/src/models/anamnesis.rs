use super::client::non_empty;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Hair and health history of a client. One row per client in
/// `client_anamnesis`, keyed by `client_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Anamnesis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub client_id: String,
    pub user_id: String,

    // Hair history
    pub natural_color: Option<String>,
    pub has_coloration: Option<bool>,
    pub coloration_details: Option<String>,
    pub has_highlights: Option<bool>,
    pub highlights_details: Option<String>,
    pub texture: Option<String>,
    pub density: Option<String>,
    pub elasticity: Option<String>,
    pub porosity: Option<String>,
    pub scalp_condition: Option<String>,
    pub previous_straightening: Option<String>,
    #[serde(deserialize_with = "blank_date")]
    pub last_straightening_date: Option<NaiveDate>,
    pub other_chemicals: Option<String>,
    pub hair_routine: Option<String>,

    // Goals
    pub main_complaint: Option<String>,
    pub desired_result: Option<String>,

    // Health
    pub allergies: Option<String>,
    pub medication: Option<String>,
    pub is_pregnant_or_lactating: Option<bool>,

    // Professional assessment
    pub strand_test_result: Option<String>,
    pub professional_observations: Option<String>,
    pub recommended_procedure: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Anamnesis {
    /// Prepare for an upsert: bind ownership, blank text fields become absent
    /// and server-managed timestamps are left to the database.
    pub fn for_save(self, client_id: &str, user_id: &str) -> Self {
        Self {
            id: self.id,
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            natural_color: non_empty(self.natural_color),
            has_coloration: self.has_coloration,
            coloration_details: non_empty(self.coloration_details),
            has_highlights: self.has_highlights,
            highlights_details: non_empty(self.highlights_details),
            texture: non_empty(self.texture),
            density: non_empty(self.density),
            elasticity: non_empty(self.elasticity),
            porosity: non_empty(self.porosity),
            scalp_condition: non_empty(self.scalp_condition),
            previous_straightening: non_empty(self.previous_straightening),
            last_straightening_date: self.last_straightening_date,
            other_chemicals: non_empty(self.other_chemicals),
            hair_routine: non_empty(self.hair_routine),
            main_complaint: non_empty(self.main_complaint),
            desired_result: non_empty(self.desired_result),
            allergies: non_empty(self.allergies),
            medication: non_empty(self.medication),
            is_pregnant_or_lactating: self.is_pregnant_or_lactating,
            strand_test_result: non_empty(self.strand_test_result),
            professional_observations: non_empty(self.professional_observations),
            recommended_procedure: non_empty(self.recommended_procedure),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Date inputs submit an empty string when left blank.
fn blank_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
