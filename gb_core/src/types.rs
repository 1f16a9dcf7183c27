//! Wire and tree types for grading rubrics.
//!
//! Field names follow the backend's snake_case JSON. Optional fields that are
//! absent on the wire stay absent when serialized back.

use serde::{Deserialize, Serialize};

/// Records addressed by an opaque string identifier.
pub trait Identified {
    fn uuid(&self) -> &str;
}

/// Entity levels of the rubric tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Rubric,
    Criterion,
    ScoringLevel
}

impl EntityKind {
    /// Human-readable label used in notifications.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Rubric => "rubric",
            Self::Criterion => "criterion",
            Self::ScoringLevel => "scoring level"
        }
    }
}

/// Top-level grading rubric owned by an instructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_passing_score: Option<f64>,

    /// Owner identifier the rubric collection is filtered by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_uuid: Option<String>
}

impl Rubric {
    #[must_use]
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Default::default()
        }
    }
}

impl Identified for Rubric {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// A criterion belonging to one rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub uuid: String,

    /// Owning rubric. Missing on the wire deserializes to an empty string,
    /// which never matches a rubric during assembly.
    #[serde(default)]
    pub rubric_uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>
}

impl Criterion {
    #[must_use]
    pub fn new(uuid: impl Into<String>, rubric_uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            rubric_uuid: rubric_uuid.into(),
            ..Default::default()
        }
    }
}

impl Identified for Criterion {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// A performance level within a criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringLevel {
    pub uuid: String,

    #[serde(default)]
    pub criteria_uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_expectation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display string such as "5 points" or "8-10". Not parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_passing: Option<bool>
}

impl ScoringLevel {
    #[must_use]
    pub fn new(uuid: impl Into<String>, criteria_uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            criteria_uuid: criteria_uuid.into(),
            ..Default::default()
        }
    }
}

impl Identified for ScoringLevel {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// Fields submitted when creating or updating a rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubricInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_passing_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_uuid: Option<String>
}

/// Fields submitted when creating or updating a criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>
}

/// Fields submitted when creating or updating a scoring level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringLevelInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_expectation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_passing: Option<bool>
}

/// Page coordinates sent as `page` and `size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32
}

impl PageRequest {
    #[must_use]
    pub fn first(size: u32) -> Self {
        Self { page: 0, size }
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            size: self.size
        }
    }
}

/// Pagination metadata attached to list envelopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default, alias = "pageNumber")]
    pub page_number: u32,

    #[serde(default, alias = "pageSize")]
    pub page_size: u32,

    #[serde(default, alias = "totalElements")]
    pub total_elements: u64,

    #[serde(default, alias = "totalPages")]
    pub total_pages: u32,

    #[serde(default, alias = "hasNext", skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,

    #[serde(default, alias = "hasPrevious", skip_serializing_if = "Option::is_none")]
    pub has_previous: Option<bool>
}

impl PageMetadata {
    /// Whether another page follows this one.
    ///
    /// An explicit `has_next` wins; otherwise the page number is compared
    /// against `total_pages`.
    #[must_use]
    pub fn has_more(&self) -> bool {
        match self.has_next {
            Some(has_next) => has_next,
            None => self.page_number + 1 < self.total_pages
        }
    }
}

/// List envelope: a `content` array plus optional pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>
}

impl<T> Page<T> {
    /// A page with no metadata, treated as the last one.
    #[must_use]
    pub fn single(content: Vec<T>) -> Self {
        Self {
            content,
            metadata: None
        }
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.metadata.as_ref().is_some_and(PageMetadata::has_more)
    }
}

/// Mutation envelope. `message` is shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default)]
    pub message: String
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn with_data(data: T, message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            data: Some(data),
            message: message.into()
        }
    }

    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            data: None,
            message: message.into()
        }
    }
}

/// Response for mutations whose payload is not inspected (deletes).
pub type MessageResponse = ApiResponse<serde_json::Value>;

/// A criterion with its scoring levels attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionNode {
    #[serde(flatten)]
    pub criterion: Criterion,

    #[serde(default)]
    pub scoring: Vec<ScoringLevel>
}

/// A rubric with its criteria and their scoring levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricTree {
    pub rubric: Rubric,

    #[serde(default)]
    pub criteria: Vec<CriterionNode>
}

impl RubricTree {
    #[must_use]
    pub fn criterion(&self, criteria_uuid: &str) -> Option<&CriterionNode> {
        self.criteria
            .iter()
            .find(|node| node.criterion.uuid == criteria_uuid)
    }

    /// Total scoring levels across all criteria.
    #[must_use]
    pub fn scoring_count(&self) -> usize {
        self.criteria.iter().map(|node| node.scoring.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_omits_absent_fields() {
        let rubric = Rubric::new("r1");
        let json = serde_json::to_value(&rubric).unwrap();
        assert_eq!(json, serde_json::json!({"uuid": "r1"}));
    }

    #[test]
    fn test_criterion_node_flattens_criterion() {
        let node = CriterionNode {
            criterion: Criterion::new("c1", "r1"),
            scoring: vec![ScoringLevel {
                score_range: Some("5 points".to_string()),
                ..ScoringLevel::new("s1", "c1")
            }]
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uuid": "c1",
                "rubric_uuid": "r1",
                "scoring": [{"uuid": "s1", "criteria_uuid": "c1", "score_range": "5 points"}]
            })
        );
    }

    #[test]
    fn test_page_metadata_has_more() {
        let explicit = PageMetadata {
            has_next: Some(false),
            total_pages: 10,
            ..Default::default()
        };
        assert!(!explicit.has_more());

        let derived = PageMetadata {
            page_number: 0,
            total_pages: 2,
            ..Default::default()
        };
        assert!(derived.has_more());

        let last = PageMetadata {
            page_number: 1,
            total_pages: 2,
            ..Default::default()
        };
        assert!(!last.has_more());
    }

    #[test]
    fn test_page_without_metadata_is_last() {
        let page: Page<Rubric> = serde_json::from_str(r#"{"content": [{"uuid": "r1"}]}"#).unwrap();
        assert_eq!(page.content.len(), 1);
        assert!(!page.has_more());
    }

    #[test]
    fn test_page_metadata_accepts_camel_case() {
        let page: Page<Rubric> = serde_json::from_str(
            r#"{"content": [], "metadata": {"pageNumber": 0, "totalPages": 3, "hasNext": true}}"#
        )
        .unwrap();
        assert!(page.has_more());
    }

    #[test]
    fn test_api_response_message_defaults_empty() {
        let response: MessageResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.message.is_empty());
        assert!(response.data.is_none());
    }

    #[test]
    fn test_entity_kind_display_and_label() {
        assert_eq!(EntityKind::ScoringLevel.to_string(), "scoring_level");
        assert_eq!(EntityKind::ScoringLevel.label(), "scoring level");
        assert_eq!(
            "criterion".parse::<EntityKind>().unwrap(),
            EntityKind::Criterion
        );
    }
}
