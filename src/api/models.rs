//! Wire types for the dashboard REST API.
//!
//! Response types are lenient: optional fields default, unknown fields are
//! kept in `extra` where callers may want them. Request types skip `None`
//! fields when serialising.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::session::User;

/// Array, JSON-encoded array string, or null.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(items)) => items,
            _ => vec![Value::String(s)],
        },
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect())
}

/// Number or numeric string (MySQL DECIMAL columns arrive as strings).
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ── auth ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub company_name: String,
}

/// `data` of a login or register response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub user: User,
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

// ── projects ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cultural_context: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub objectives: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub priority_areas: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Create / update payload. Update sends only the fields that are set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objectives: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_areas: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stakeholders: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_details: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplates {
    pub system_instruction: String,
    pub user_prompt: String,
    #[serde(default)]
    pub recommended_usage: Value,
}

// ── recommendations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Quick,
    Enhanced,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateRecommendation {
    pub project_id: i64,
    pub analysis_type: AnalysisType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_areas: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specific_concerns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_user_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default)]
    pub cultural_considerations: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub analysis_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationOutcome {
    NotImplemented,
    Failed,
    Partial,
    Successful,
    Exceeded,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Feedback {
    /// 1 to 5.
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_success: Option<ImplementationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons_learned: Option<String>,
}

// ── documents ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Xlsx,
    Pptx,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Pptx => "pptx",
        }
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(DocumentFormat::Docx),
            "xlsx" => Ok(DocumentFormat::Xlsx),
            "pptx" => Ok(DocumentFormat::Pptx),
            other => Err(format!("unknown document format '{other}' (docx|xlsx|pptx)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentRequest {
    pub recommendation_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_sections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_branding: Option<Value>,
}

/// Result of a generate call; fetch the bytes with
/// [`DocumentsApi::download`](super::documents::DocumentsApi::download).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedDocument {
    #[serde(default)]
    pub document_id: Option<i64>,
    pub filename: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    #[serde(default)]
    pub recommendation_id: Option<i64>,
    #[serde(default)]
    pub document_type: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub download_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub document_type: Option<DocumentFormat>,
    pub recommendation_id: Option<i64>,
}

// ── knowledge ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Document,
    Audio,
    Video,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRequest {
    pub title: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeEntry {
    pub title: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance_score: Option<f64>,
}

/// Attached file for [`KnowledgeApi::upload`](super::knowledge::KnowledgeApi::upload).
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddedEntry {
    pub id: i64,
    #[serde(default)]
    pub wisdom_entry_id: Option<i64>,
    #[serde(default)]
    pub processing_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeSource {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub wisdom_count: Option<u64>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub cultural_context: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub source_type: Option<SourceType>,
    pub importance_level: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub source_type: Option<SourceType>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Url => "url",
            SourceType::Document => "document",
            SourceType::Audio => "audio",
            SourceType::Video => "video",
            SourceType::Text => "text",
        }
    }
}
