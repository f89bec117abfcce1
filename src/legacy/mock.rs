//! In-process fixture responder for the legacy `*.php` API.
//!
//! Routes are matched on `(path, method, action)`; anything else is an
//! [`ApiError::UnimplementedMockRoute`]. Reads never depend on the clock, so
//! the same request always gets the same answer. Writes (add, update,
//! delete, upload) mutate the fixture set for the life of the router.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use reqwest::{Method, Url};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::client::{ApiError, Body};

/// Knowledge listing page size.
pub const KNOWLEDGE_PAGE_SIZE: usize = 10;

const MIN_PASSWORD_LEN: usize = 6;
const TAKEN_EMAIL: &str = "test@example.com";
/// Timestamp of the sample recommendation served for unknown ids.
const SAMPLE_CREATED_AT: &str = "2024-01-21T08:00:00Z";

struct Fixtures {
    projects: Vec<Value>,
    recommendations: Vec<Value>,
    knowledge: Vec<Value>,
}

pub struct MockRouter {
    fixtures: Mutex<Fixtures>,
}

impl Default for MockRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed endpoint: path plus decoded query pairs.
struct Target {
    path: String,
    query: Vec<(String, String)>,
}

impl Target {
    fn parse(endpoint: &str) -> Option<Self> {
        let base = Url::parse("http://mock.invalid/").ok()?;
        let url = base.join(endpoint.trim_start_matches('/')).ok()?;
        Some(Self {
            path: url.path().to_string(),
            query: url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect(),
        })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn id(&self) -> Option<i64> {
        self.param("id").and_then(|v| v.trim().parse().ok())
    }
}

fn rejected(message: &str) -> ApiError {
    ApiError::Rejected { message: message.to_string() }
}

fn field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl MockRouter {
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(Fixtures {
                projects: seed_projects(),
                recommendations: seed_recommendations(),
                knowledge: seed_knowledge(),
            }),
        }
    }

    fn fixtures(&self) -> MutexGuard<'_, Fixtures> {
        self.fixtures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer `method endpoint` from fixtures.
    pub fn route(&self, endpoint: &str, method: &Method, body: &Body) -> Result<Value, ApiError> {
        let unimplemented = || {
            error!(%endpoint, %method, "mock endpoint not implemented");
            ApiError::UnimplementedMockRoute {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
            }
        };
        let Some(target) = Target::parse(endpoint) else {
            return Err(unimplemented());
        };
        let json = match body {
            Body::Json(v) => v.clone(),
            _ => Value::Null,
        };
        let action = field(&json, "action");
        debug!(path = %target.path, %method, ?action, "mock route");

        match (target.path.as_str(), method.as_str(), action) {
            ("/auth.php", "POST", Some("login")) => login(&json),
            ("/auth.php", "POST", Some("register")) => register(&json),
            ("/auth.php", "POST", Some("logout")) => {
                Ok(json!({ "success": true, "message": "Logged out successfully" }))
            }

            ("/projects.php", "GET", _) => match target.id() {
                Some(id) => self.project(id),
                None => Ok(Value::Array(self.fixtures().projects.clone())),
            },

            ("/recommendations.php", "GET", _) => match target.id() {
                Some(id) => Ok(self.recommendation(id)),
                None => Ok(self.recommendations(target.param("project"))),
            },

            ("/knowledge.php", "GET", _) => match target.id() {
                Some(id) => self.knowledge_item(id),
                None => Ok(self.knowledge_page(&target)),
            },
            ("/knowledge.php", "POST", Some("extract")) => Ok(extract(&json)),
            ("/knowledge.php", "POST", _) => match body {
                Body::Multipart(form) => self.upload(form),
                Body::Json(data) => Ok(self.add_knowledge(data)),
                Body::Empty => Err(rejected("Title is required")),
            },
            ("/knowledge.php", "PUT", _) => match target.id() {
                Some(id) => self.update_knowledge(id, &json),
                None => Err(unimplemented()),
            },
            ("/knowledge.php", "DELETE", _) => match target.id() {
                Some(id) => self.delete_knowledge(id),
                None => Err(unimplemented()),
            },

            _ => Err(unimplemented()),
        }
    }

    fn project(&self, id: i64) -> Result<Value, ApiError> {
        let fixtures = self.fixtures();
        let mut project = fixtures
            .projects
            .iter()
            .find(|p| p["id"] == id)
            .cloned()
            .ok_or_else(|| rejected("Project not found"))?;
        let recommendations: Vec<Value> = fixtures
            .recommendations
            .iter()
            .filter(|r| r["project_id"] == id)
            .cloned()
            .collect();
        project["recommendations"] = Value::Array(recommendations);
        Ok(project)
    }

    fn recommendations(&self, project: Option<&str>) -> Value {
        let project = project.and_then(|p| p.parse::<i64>().ok());
        let items = self
            .fixtures()
            .recommendations
            .iter()
            .filter(|r| project.is_none_or(|id| r["project_id"] == id))
            .cloned()
            .collect();
        Value::Array(items)
    }

    /// Unknown ids get a generated sample rather than an error.
    fn recommendation(&self, id: i64) -> Value {
        self.fixtures()
            .recommendations
            .iter()
            .find(|r| r["id"] == id)
            .cloned()
            .unwrap_or_else(|| sample_recommendation(id))
    }

    fn knowledge_page(&self, target: &Target) -> Value {
        let page = target
            .param("page")
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let kind = target.param("type").filter(|t| !t.is_empty());
        let search = target
            .param("search")
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let fixtures = self.fixtures();
        let matching: Vec<&Value> = fixtures
            .knowledge
            .iter()
            .filter(|item| kind.is_none_or(|k| item["type"] == k))
            .filter(|item| search.as_deref().is_none_or(|s| knowledge_matches(item, s)))
            .collect();

        let total = matching.len();
        let items: Vec<Value> = matching
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(KNOWLEDGE_PAGE_SIZE))
            .take(KNOWLEDGE_PAGE_SIZE)
            .cloned()
            .collect();

        json!({
            "data": items,
            "pagination": {
                "current_page": page,
                "total_pages": total.div_ceil(KNOWLEDGE_PAGE_SIZE),
                "total_items": total,
                "items_per_page": KNOWLEDGE_PAGE_SIZE,
            }
        })
    }

    fn knowledge_item(&self, id: i64) -> Result<Value, ApiError> {
        self.fixtures()
            .knowledge
            .iter()
            .find(|k| k["id"] == id)
            .cloned()
            .ok_or_else(|| rejected("Knowledge item not found"))
    }

    fn next_knowledge_id(fixtures: &Fixtures) -> i64 {
        fixtures
            .knowledge
            .iter()
            .filter_map(|k| k["id"].as_i64())
            .max()
            .unwrap_or(0)
            + 1
    }

    fn add_knowledge(&self, data: &Value) -> Value {
        let mut fixtures = self.fixtures();
        let stamp = now();
        let item = json!({
            "id": Self::next_knowledge_id(&fixtures),
            "title": field(data, "title").unwrap_or_default(),
            "type": field(data, "type").unwrap_or("document"),
            "source": field(data, "source").unwrap_or("manual"),
            "content": field(data, "content").unwrap_or_default(),
            "tags": data.get("tags").cloned().unwrap_or_else(|| json!([])),
            "created_at": stamp,
            "updated_at": stamp,
        });
        fixtures.knowledge.insert(0, item.clone());
        json!({ "success": true, "message": "Knowledge added successfully", "data": item })
    }

    fn update_knowledge(&self, id: i64, data: &Value) -> Result<Value, ApiError> {
        let mut fixtures = self.fixtures();
        let item = fixtures
            .knowledge
            .iter_mut()
            .find(|k| k["id"] == id)
            .ok_or_else(|| rejected("Knowledge item not found"))?;
        if let (Some(target), Some(changes)) = (item.as_object_mut(), data.as_object()) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
            target.insert("updated_at".into(), Value::String(now()));
        }
        let updated = item.clone();
        Ok(json!({ "success": true, "message": "Knowledge updated successfully", "data": updated }))
    }

    fn delete_knowledge(&self, id: i64) -> Result<Value, ApiError> {
        let mut fixtures = self.fixtures();
        let before = fixtures.knowledge.len();
        fixtures.knowledge.retain(|k| k["id"] != id);
        if fixtures.knowledge.len() == before {
            return Err(rejected("Knowledge item not found"));
        }
        Ok(json!({ "success": true, "message": "Knowledge deleted successfully" }))
    }

    fn upload(&self, form: &crate::client::MultipartForm) -> Result<Value, ApiError> {
        let (filename, mime, bytes) = form.file_part("file").ok_or_else(|| rejected("No file uploaded"))?;
        let metadata: Value = form
            .text_value("metadata")
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or_else(|| json!({}));
        let tags = metadata
            .get("tags")
            .cloned()
            .unwrap_or_else(|| json!(["uploaded", "document"]));

        let mut fixtures = self.fixtures();
        let stamp = now();
        let item = json!({
            "id": Self::next_knowledge_id(&fixtures),
            "title": filename,
            "type": "document",
            "source": "upload",
            "content": format!(
                "Extracted content from {filename}. This would contain the actual document content after processing."
            ),
            "tags": tags,
            "file_name": filename,
            "file_size": bytes.len(),
            "file_type": mime.unwrap_or_default(),
            "created_at": stamp,
            "updated_at": stamp,
        });
        fixtures.knowledge.insert(0, item.clone());
        Ok(json!({
            "success": true,
            "message": "Document uploaded and processed successfully",
            "data": item,
        }))
    }
}

fn knowledge_matches(item: &Value, needle: &str) -> bool {
    let text = |key: &str| {
        item[key]
            .as_str()
            .is_some_and(|s| s.to_lowercase().contains(needle))
    };
    let tag = item["tags"].as_array().is_some_and(|tags| {
        tags.iter()
            .filter_map(Value::as_str)
            .any(|t| t.to_lowercase().contains(needle))
    });
    text("title") || text("content") || tag
}

fn login(body: &Value) -> Result<Value, ApiError> {
    let email = field(body, "email").unwrap_or_default().trim();
    let password = field(body, "password").unwrap_or_default();
    if email.is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(rejected("Invalid email or password"));
    }
    let local = email.split('@').next().unwrap_or(email);
    let mut chars = local.chars();
    let full_name: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Ok(json!({
        "success": true,
        "message": "Login successful",
        "user": {
            "id": 1,
            "email": email,
            "full_name": full_name,
            "organization": "Demo Organization",
            "role": "user",
            "created_at": now(),
        },
        "token": format!("mock-jwt-token-{}", Utc::now().timestamp_millis()),
    }))
}

fn register(body: &Value) -> Result<Value, ApiError> {
    let email = field(body, "email").unwrap_or_default();
    let password = field(body, "password").unwrap_or_default();
    let full_name = field(body, "full_name").unwrap_or_default();
    if email.is_empty() || password.is_empty() || full_name.is_empty() {
        return Err(rejected("Email, password, and full name are required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(rejected("Password must be at least 6 characters long"));
    }
    if email == TAKEN_EMAIL {
        return Err(rejected("Email already registered"));
    }
    let millis = Utc::now().timestamp_millis();
    Ok(json!({
        "success": true,
        "message": "Registration successful! Welcome to Exeloka.",
        "user": {
            "id": millis,
            "email": email,
            "full_name": full_name,
            "organization": field(body, "organization").unwrap_or_default(),
            "role": "user",
            "created_at": now(),
            "verified": false,
        },
        "token": format!("mock-jwt-token-{millis}"),
    }))
}

fn extract(body: &Value) -> Value {
    let kind = field(body, "type").unwrap_or("auto");
    let method = match kind {
        "pdf" => "PyMuPDF",
        "image" => "Tesseract OCR",
        "url" => "BeautifulSoup",
        _ => "Auto-detected",
    };
    json!({
        "success": true,
        "data": {
            "source": body.get("source").cloned().unwrap_or(Value::Null),
            "type": kind,
            "content": "This is extracted content from the provided source. In a real implementation, this would contain the actual extracted text from PDFs, images (OCR), or web pages.",
            "metadata": {
                "extraction_method": method,
                "confidence": 0.95,
                "language": "Indonesian/English",
                "extracted_at": now(),
            }
        }
    })
}

// ── fixtures ──────────────────────────────────────────────────────────────────

fn seed_projects() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "title": "Cultural Heritage Preservation",
            "description": "Preserving traditional crafts and cultural practices in rural communities",
            "project_type": "Cultural Preservation",
            "cultural_context": "Indonesian traditional arts",
            "status": "active",
            "objectives": ["Preserve traditional knowledge", "Train young artisans", "Document practices"],
            "stakeholders": ["Local artisans", "Community elders", "Cultural department"],
            "priority_areas": ["Traditional crafts", "Oral traditions", "Cultural documentation"],
            "recommendation_count": 5,
            "avg_confidence": 0.85,
            "created_at": "2024-01-15T10:30:00Z"
        }),
        json!({
            "id": 2,
            "title": "Community Engagement Initiative",
            "description": "Building bridges between different cultural groups in urban areas",
            "project_type": "Community Engagement",
            "cultural_context": "Multi-ethnic urban community",
            "status": "planning",
            "objectives": ["Foster intercultural dialogue", "Create shared spaces", "Reduce tensions"],
            "stakeholders": ["Community leaders", "Local government", "Residents"],
            "priority_areas": ["Dialogue facilitation", "Cultural exchange", "Community building"],
            "recommendation_count": 3,
            "avg_confidence": 0.72,
            "created_at": "2024-01-20T14:15:00Z"
        }),
    ]
}

fn seed_recommendations() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "project_id": 1,
            "title": "Traditional Craft Workshop Program",
            "description": "Establish regular workshops to teach traditional crafts to younger generations",
            "project_title": "Cultural Heritage Preservation",
            "project_type": "Cultural Preservation",
            "analysis_type": "enhanced",
            "confidence_score": 0.88,
            "key_insights": ["High interest from youth", "Available skilled artisans", "Strong cultural significance"],
            "recommendations": ["Weekly workshop sessions", "Master-apprentice program", "Documentation project"],
            "potential_risks": ["Funding sustainability", "Artisan availability", "Interest maintenance"],
            "cultural_context": ["Respects traditional methods", "Involves community elders", "Preserves authenticity"],
            "success_metrics": ["Number of participants", "Skills acquired", "Cultural knowledge retention"],
            "status": "pending",
            "created_at": "2024-01-16T09:00:00Z"
        }),
        json!({
            "id": 2,
            "project_id": 2,
            "title": "Community Dialogue Facilitation",
            "description": "Create structured dialogue sessions to bridge cultural gaps between different community groups",
            "project_title": "Community Engagement Initiative",
            "project_type": "Community Engagement",
            "analysis_type": "quick",
            "confidence_score": 0.75,
            "key_insights": ["Existing trust deficits between groups", "Neutral venues increase participation", "Shared activities build connections"],
            "recommendations": ["Monthly dialogue circles", "Cultural exchange events", "Shared community projects"],
            "potential_risks": ["Initial reluctance to participate", "Historical tensions surfacing", "Facilitator bias"],
            "cultural_context": ["Respects all cultural perspectives", "Uses culturally appropriate communication styles", "Involves respected community leaders"],
            "success_metrics": ["Participation rates", "Trust survey scores", "Joint project outcomes"],
            "status": "active",
            "created_at": "2024-01-20T16:30:00Z"
        }),
    ]
}

fn seed_knowledge() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "title": "Cultural Sensitivity Guidelines",
            "type": "document",
            "source": "Internal research",
            "content": "Comprehensive guide for cultural sensitivity in community projects",
            "tags": ["guidelines", "cultural-sensitivity", "best-practices"],
            "created_at": "2024-01-10T08:00:00Z"
        }),
        json!({
            "id": 2,
            "title": "Indonesian Cultural Practices",
            "type": "research",
            "source": "Academic paper",
            "content": "Research on traditional Indonesian cultural practices and their modern relevance",
            "tags": ["indonesia", "traditions", "research"],
            "created_at": "2024-01-12T16:30:00Z"
        }),
    ]
}

fn sample_recommendation(id: i64) -> Value {
    json!({
        "id": id,
        "project_id": 1,
        "title": "Enhanced Cultural Workshop Program",
        "description": "Develop a comprehensive cultural workshop program that combines traditional knowledge transfer with modern engagement techniques to preserve cultural heritage while making it accessible to younger generations.",
        "project_title": "Cultural Heritage Preservation",
        "project_type": "Cultural Preservation",
        "analysis_type": "enhanced",
        "confidence_score": 0.92,
        "key_insights": [
            "Strong community support for cultural preservation initiatives",
            "High youth interest when approached through modern engagement methods",
            "Available network of skilled traditional practitioners",
            "Successful similar programs in neighboring regions provide proven framework"
        ],
        "recommendations": [
            "Establish weekly hands-on workshops with master craftspeople",
            "Create digital documentation of traditional techniques",
            "Develop mentorship program pairing elders with youth",
            "Organize community showcases to celebrate achievements",
            "Partner with local schools for curriculum integration"
        ],
        "potential_risks": [
            "Participant dropout due to competing modern activities",
            "Difficulty finding adequate venue space for workshops",
            "Seasonal availability of traditional materials",
            "Generational communication barriers between mentors and participants"
        ],
        "cultural_context": [
            "Respects traditional master-apprentice learning systems",
            "Incorporates culturally appropriate teaching methods",
            "Maintains authenticity while allowing for adaptation",
            "Engages community elders as wisdom keepers"
        ],
        "success_metrics": [
            "Number of active participants retained after 3 months",
            "Traditional skills successfully demonstrated by participants",
            "Community engagement levels at showcase events",
            "Documentation quality and completeness",
            "Integration success with educational institutions"
        ],
        "status": "pending",
        "created_at": SAMPLE_CREATED_AT
    })
}
