//! Core data models for the archives transfer service.
//!
//! Two families of types live here: the inbound submission payload posted by
//! the transfer form (camelCase JSON, loosely typed vocabulary ids), and the
//! persisted entities read back from the database.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// USER TYPES
// =============================================================================

/// A submitter or admin account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub affiliation: String,
    pub email: String,
    pub phone: String,
    pub verified: bool,
    #[serde(rename = "token")]
    pub verify_token: String,
    #[serde(skip)]
    pub admin: bool,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The client-editable portion of a user: what the form posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub affiliation: String,
    pub email: String,
    pub phone: String,
}

impl UserProfile {
    /// Every profile field is required for account creation.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("title", &self.title),
            ("affiliation", &self.affiliation),
            ("email", &self.email),
            ("phone", &self.phone),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "All fields are required; missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Phone number with all whitespace removed.
    pub fn normalized_phone(&self) -> String {
        normalize_phone(&self.phone)
    }
}

/// Strip every whitespace character from a phone number.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

// =============================================================================
// CONTROLLED VOCABULARY
// =============================================================================

/// One entry of a controlled vocabulary table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VocabEntry {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_only: Option<bool>,
}

/// The closed set of vocabulary tables. Table names never come from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabTable {
    Genres,
    RecordTypes,
    TransferMethods,
    MediaCarriers,
}

impl VocabTable {
    pub fn table_name(self) -> &'static str {
        match self {
            VocabTable::Genres => "genres",
            VocabTable::RecordTypes => "record_types",
            VocabTable::TransferMethods => "transfer_methods",
            VocabTable::MediaCarriers => "media_carriers",
        }
    }
}

/// Discriminator stored in the shared `accession_record_types` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Digital,
    Physical,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferKind::Digital => "digital",
            TransferKind::Physical => "physical",
        }
    }
}

// =============================================================================
// SUBMISSION PAYLOAD (inbound)
// =============================================================================

/// The accession graph as posted by the transfer form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionPayload {
    /// Submission token obtained from `/api/identifier`.
    pub identifier: String,
    pub user: UserProfile,
    pub summary: Option<String>,
    pub activities: String,
    pub creator: String,
    #[serde(rename = "selectedGenres", deserialize_with = "deserialize_vocab_ids")]
    pub genres: Vec<i32>,
    pub accession_type: String,
    pub digital_transfer: bool,
    pub digital: Option<DigitalTransfer>,
    pub physical_transfer: bool,
    pub physical: Option<PhysicalTransfer>,
}

/// Digital half of a submission.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DigitalTransfer {
    #[serde(rename = "uploadID")]
    pub upload_id: String,
    pub description: String,
    pub date_range: String,
    #[serde(rename = "selectedTypes", deserialize_with = "deserialize_vocab_ids")]
    pub record_types: Vec<i32>,
    #[serde(rename = "uploadedFiles")]
    pub files: Vec<String>,
    pub total_size_bytes: i64,
}

/// Physical half of a submission.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalTransfer {
    pub date_range: String,
    pub box_info: String,
    #[serde(rename = "selectedTypes", deserialize_with = "deserialize_vocab_ids")]
    pub record_types: Vec<i32>,
    #[serde(rename = "transferMethod", deserialize_with = "deserialize_optional_vocab_id")]
    pub transfer_method_id: Option<i32>,
    pub has_digital: bool,
    #[serde(rename = "techInfo")]
    pub tech_description: String,
    #[serde(deserialize_with = "deserialize_vocab_ids")]
    pub media_carriers: Vec<i32>,
    pub media_count: String,
    pub has_software: bool,
    pub inventory: Vec<InventoryItem>,
}

/// One row of a physical transfer's box inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryItem {
    #[serde(rename = "boxNum")]
    pub box_number: String,
    pub record_group: String,
    pub title: String,
    pub description: String,
    pub dates: String,
}

/// A payload that passed validation and is ready to be committed.
#[derive(Debug, Clone)]
pub struct Submission {
    pub identifier: String,
    pub user: UserProfile,
    pub summary: String,
    pub activities: String,
    pub creator: String,
    pub genres: Vec<i32>,
    pub accession_type: String,
    pub digital: Option<DigitalTransfer>,
    pub physical: Option<PhysicalTransfer>,
}

impl Submission {
    /// Token naming the pending upload directory of the digital half.
    pub fn upload_token(&self) -> Option<&str> {
        self.digital.as_ref().map(|d| {
            if d.upload_id.trim().is_empty() {
                self.identifier.as_str()
            } else {
                d.upload_id.as_str()
            }
        })
    }
}

impl SubmissionPayload {
    /// Check the payload and turn it into a [`Submission`].
    ///
    /// `summary` is mandatory. The submitter profile must be complete, at
    /// least one transfer kind must be selected, and a selected kind needs
    /// its sub-record. A sub-record whose flag is off is dropped.
    pub fn validate(self) -> Result<Submission> {
        let summary = match self.summary {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Err(Error::Validation("summary is required".to_string())),
        };
        if self.user.email.trim().is_empty() {
            return Err(Error::Validation("user email is required".to_string()));
        }
        self.user.validate()?;
        if !self.digital_transfer && !self.physical_transfer {
            return Err(Error::Validation(
                "a digital or physical transfer must be selected".to_string(),
            ));
        }

        let digital = if self.digital_transfer {
            Some(self.digital.ok_or_else(|| {
                Error::Validation("digitalTransfer is set but digital details are missing".into())
            })?)
        } else {
            None
        };
        let physical = if self.physical_transfer {
            Some(self.physical.ok_or_else(|| {
                Error::Validation(
                    "physicalTransfer is set but physical details are missing".into(),
                )
            })?)
        } else {
            None
        };

        if let Some(d) = &digital {
            if d.upload_id.trim().is_empty() && self.identifier.trim().is_empty() {
                return Err(Error::Validation(
                    "digital transfer requires an upload identifier".to_string(),
                ));
            }
        }

        let accession_type = if self.accession_type.trim().is_empty() {
            match (digital.is_some(), physical.is_some()) {
                (true, true) => "both",
                (true, false) => "digital",
                _ => "physical",
            }
            .to_string()
        } else {
            self.accession_type
        };

        Ok(Submission {
            identifier: self.identifier,
            user: self.user,
            summary,
            activities: self.activities,
            creator: self.creator,
            genres: self.genres,
            accession_type,
            digital,
            physical,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VocabIdRepr {
    Number(i64),
    Text(String),
}

impl VocabIdRepr {
    fn into_id<E: de::Error>(self) -> std::result::Result<Option<i32>, E> {
        match self {
            VocabIdRepr::Number(n) => i32::try_from(n)
                .map(Some)
                .map_err(|_| E::custom(format!("vocabulary id {} out of range", n))),
            VocabIdRepr::Text(s) if s.trim().is_empty() => Ok(None),
            VocabIdRepr::Text(s) => s
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid vocabulary id '{}'", s))),
        }
    }
}

/// Accept a list of vocabulary ids given as JSON numbers or numeric strings.
fn deserialize_vocab_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<VocabIdRepr>> = Option::deserialize(deserializer)?;
    let mut ids = Vec::new();
    for repr in raw.unwrap_or_default() {
        if let Some(id) = repr.into_id::<D::Error>()? {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Accept a single optional vocabulary id; `""`, `0` and `null` mean unset.
fn deserialize_optional_vocab_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<VocabIdRepr> = Option::deserialize(deserializer)?;
    match raw {
        Some(repr) => Ok(repr.into_id::<D::Error>()?.filter(|id| *id != 0)),
        None => Ok(None),
    }
}

// =============================================================================
// COMMITTED / READ-BACK TYPES
// =============================================================================

/// Outcome of a successful commit transaction.
#[derive(Debug, Clone)]
pub struct CommittedSubmission {
    pub accession_id: i32,
    pub identifier: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub digital_accession_id: Option<i32>,
    pub physical_accession_id: Option<i32>,
    /// Association or inventory rows that were skipped.
    pub advisory_failures: usize,
}

/// Full accession graph with vocabulary names resolved.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessionDetail {
    pub id: i32,
    pub identifier: String,
    pub user: User,
    pub summary: String,
    pub activities: String,
    pub creator: String,
    pub genres: Vec<String>,
    pub accession_type: String,
    pub created_at: DateTime<Utc>,
    pub digital_transfer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital: Option<DigitalDetail>,
    pub physical_transfer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<PhysicalDetail>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DigitalDetail {
    pub id: i32,
    #[serde(rename = "uploadID")]
    pub upload_id: String,
    pub description: String,
    pub date_range: String,
    #[serde(rename = "selectedTypes")]
    pub record_types: Vec<String>,
    #[serde(rename = "uploadedFiles")]
    pub files: Vec<String>,
    pub total_size_bytes: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDetail {
    pub id: i32,
    pub date_range: String,
    pub box_info: String,
    #[serde(rename = "selectedTypes")]
    pub record_types: Vec<String>,
    #[serde(rename = "transferMethod")]
    pub transfer_method_id: Option<i32>,
    #[serde(rename = "transferMethodName")]
    pub transfer_method: String,
    pub has_digital: bool,
    #[serde(rename = "techInfo")]
    pub tech_description: String,
    pub media_carriers: Vec<String>,
    pub media_count: String,
    pub has_software: bool,
    pub inventory: Vec<InventoryItem>,
}

/// One row of the admin accession listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessionRow {
    pub id: i32,
    #[serde(rename = "accessionID")]
    pub identifier: String,
    pub submitter: String,
    pub description: String,
    #[serde(rename = "type")]
    pub accession_type: String,
    pub genres: String,
    pub digital: bool,
    pub physical: bool,
    pub submitted_at: DateTime<Utc>,
}

/// A page of the admin accession listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessionPage {
    pub total: i64,
    pub filtered_total: i64,
    pub page: i64,
    pub page_size: i64,
    pub accessions: Vec<AccessionRow>,
}

/// Filter for the admin accession listing.
#[derive(Debug, Clone, Default)]
pub struct AccessionListRequest {
    /// 1-based page number.
    pub page: i64,
    /// Free-text filter over descriptions, names and date ranges.
    pub query: Option<String>,
    /// Genre name filter.
    pub genre: Option<String>,
}

/// Staff note attached to an accession.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i32,
    pub title: String,
    pub note: String,
    #[serde(rename = "userID")]
    pub user_id: i32,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// Body of a new note.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewNote {
    pub title: String,
    pub note: String,
}
