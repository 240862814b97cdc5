//! Per-Stage Payload Schemas
//!
//! Explicit structs for the JSON documents stages 1-4 produce. Every field
//! carries `#[serde(default)]`, so a partially-filled response still
//! deserializes with the remaining fields set to the `Unknown` sentinel.
//! The fallback payload is simply `Default::default()`: a fully-populated
//! skeleton that keeps later prompt builders shape-stable no matter how
//! badly an earlier stage's output parsed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::pipeline::UNKNOWN;

fn unknown() -> String {
    UNKNOWN.to_string()
}

// =============================================================================
// Stage 1: Basic Information
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage1Payload {
    pub basic_info: BasicInfo,
    pub structure: ProjectStructure,
    pub tech_stack: TechStack,
    pub ai_ml_indicators: AiMlIndicators,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown")]
    pub description: String,
    #[serde(default = "unknown")]
    pub purpose: String,
    #[serde(default = "unknown")]
    pub language: String,
    #[serde(default = "unknown")]
    pub license: String,
    #[serde(default = "unknown")]
    pub created: String,
    #[serde(default = "unknown")]
    pub updated: String,
    pub contributors: Vec<String>,
    pub stats: RepoStats,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            name: unknown(),
            description: unknown(),
            purpose: unknown(),
            language: unknown(),
            license: unknown(),
            created: unknown(),
            updated: unknown(),
            contributors: Vec::new(),
            stats: RepoStats::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoStats {
    pub stars: u64,
    pub forks: u64,
    pub issues: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectStructure {
    pub directories: Vec<String>,
    pub key_files: Vec<String>,
    pub config_files: Vec<String>,
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechStack {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub dependencies: Vec<String>,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiMlIndicators {
    pub ml_libraries: Vec<String>,
    pub ai_apis: Vec<String>,
    pub data_tools: Vec<String>,
    pub model_files: Vec<String>,
}

// =============================================================================
// Stage 2: Deep Code Analysis
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage2Payload {
    pub core_logic: CoreLogic,
    pub ai_ml_details: AiMlDetails,
    pub architecture: Architecture,
    pub quality_assessment: QualityAssessment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreLogic {
    pub main_algorithms: Vec<String>,
    #[serde(default = "unknown")]
    pub data_flow: String,
    pub design_patterns: Vec<String>,
}

impl Default for CoreLogic {
    fn default() -> Self {
        Self {
            main_algorithms: Vec::new(),
            data_flow: unknown(),
            design_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiMlDetails {
    pub model_types: Vec<String>,
    #[serde(default = "unknown")]
    pub training_process: String,
    #[serde(default = "unknown")]
    pub inference_method: String,
    #[serde(default = "unknown")]
    pub data_preprocessing: String,
    #[serde(default = "unknown")]
    pub performance_optimization: String,
}

impl Default for AiMlDetails {
    fn default() -> Self {
        Self {
            model_types: Vec::new(),
            training_process: unknown(),
            inference_method: unknown(),
            data_preprocessing: unknown(),
            performance_optimization: unknown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Architecture {
    #[serde(default = "unknown")]
    pub system_design: String,
    pub module_dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default = "unknown")]
    pub api_design: String,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            system_design: unknown(),
            module_dependencies: BTreeMap::new(),
            api_design: unknown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityAssessment {
    #[serde(default = "unknown")]
    pub code_quality: String,
    #[serde(default = "unknown")]
    pub test_coverage: String,
    #[serde(default = "unknown")]
    pub error_handling: String,
    #[serde(default = "unknown")]
    pub maintainability: String,
}

impl Default for QualityAssessment {
    fn default() -> Self {
        Self {
            code_quality: unknown(),
            test_coverage: unknown(),
            error_handling: unknown(),
            maintainability: unknown(),
        }
    }
}

// =============================================================================
// Stage 3: Consistency Check
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage3Payload {
    pub consistency_check: ConsistencyCheck,
    pub supplemental_info: SupplementalInfo,
    pub ai_usecase_assessment: UsecaseAssessment,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyCheck {
    pub inconsistencies: Vec<String>,
    pub verified_facts: Vec<String>,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplementalInfo {
    pub additional_features: Vec<String>,
    pub missing_tech_stack: Vec<String>,
    pub important_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsecaseAssessment {
    #[serde(default = "unknown")]
    pub ai_integration_level: String,
    pub innovation_score: f64,
    #[serde(default = "unknown")]
    pub technical_complexity: String,
    #[serde(default = "unknown")]
    pub practical_value: String,
}

impl Default for UsecaseAssessment {
    fn default() -> Self {
        Self {
            ai_integration_level: unknown(),
            innovation_score: 0.0,
            technical_complexity: unknown(),
            practical_value: unknown(),
        }
    }
}

// =============================================================================
// Stage 4: Deep Insights
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage4Payload {
    pub challenges_and_issues: ChallengesAndIssues,
    pub usecase_value: UsecaseValue,
    pub future_prospects: FutureProspects,
    pub educational_value: EducationalValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengesAndIssues {
    pub technical_constraints: Vec<String>,
    pub design_problems: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsecaseValue {
    #[serde(default = "unknown")]
    pub market_position: String,
    pub differentiation: Vec<String>,
    pub real_world_applications: Vec<String>,
    pub target_users: Vec<String>,
}

impl Default for UsecaseValue {
    fn default() -> Self {
        Self {
            market_position: unknown(),
            differentiation: Vec::new(),
            real_world_applications: Vec::new(),
            target_users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FutureProspects {
    #[serde(default = "unknown")]
    pub scalability: String,
    #[serde(default = "unknown")]
    pub extensibility: String,
    #[serde(default = "unknown")]
    pub tech_evolution_readiness: String,
    pub potential_features: Vec<String>,
}

impl Default for FutureProspects {
    fn default() -> Self {
        Self {
            scalability: unknown(),
            extensibility: unknown(),
            tech_evolution_readiness: unknown(),
            potential_features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationalValue {
    #[serde(default = "unknown")]
    pub learning_value: String,
    pub best_practices: Vec<String>,
    pub anti_patterns: Vec<String>,
    #[serde(default = "unknown")]
    pub skill_level_required: String,
}

impl Default for EducationalValue {
    fn default() -> Self {
        Self {
            learning_value: unknown(),
            best_practices: Vec::new(),
            anti_patterns: Vec::new(),
            skill_level_required: unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_fully_populated() {
        let fallback = Stage1Payload::default();
        assert_eq!(fallback.basic_info.name, UNKNOWN);
        assert_eq!(fallback.basic_info.license, UNKNOWN);
        assert_eq!(fallback.basic_info.stats.stars, 0);
    }

    #[test]
    fn test_fallback_serializes_with_every_key() {
        let value = serde_json::to_value(Stage2Payload::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("core_logic"));
        assert!(obj.contains_key("ai_ml_details"));
        assert!(obj.contains_key("architecture"));
        assert!(obj.contains_key("quality_assessment"));
        assert_eq!(value["quality_assessment"]["code_quality"], UNKNOWN);
    }

    #[test]
    fn test_partial_json_fills_missing_fields_with_sentinel() {
        let payload: Stage1Payload = serde_json::from_str(
            r#"{"basic_info": {"name": "dossier", "contributors": ["alice"]}}"#,
        )
        .unwrap();
        assert_eq!(payload.basic_info.name, "dossier");
        assert_eq!(payload.basic_info.contributors, vec!["alice"]);
        assert_eq!(payload.basic_info.description, UNKNOWN);
        assert!(payload.tech_stack.languages.is_empty());
    }

    #[test]
    fn test_unexpected_keys_are_ignored() {
        let payload: Stage3Payload = serde_json::from_str(
            r#"{"consistency_check": {"confidence_score": 0.9, "extra": true}}"#,
        )
        .unwrap();
        assert!((payload.consistency_check.confidence_score - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stage4_round_trip() {
        let payload = Stage4Payload {
            usecase_value: UsecaseValue {
                market_position: "niche tooling".to_string(),
                target_users: vec!["researchers".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let text = serde_json::to_string(&payload).unwrap();
        let back: Stage4Payload = serde_json::from_str(&text).unwrap();
        assert_eq!(back.usecase_value.market_position, "niche tooling");
        assert_eq!(back.educational_value.learning_value, UNKNOWN);
    }
}
