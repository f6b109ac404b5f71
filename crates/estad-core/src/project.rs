use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptive::DescriptiveStats;
use crate::variable::Variable;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub education_level: EducationLevel,
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, education_level: EducationLevel, analysis_type: AnalysisType) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            name,
            education_level,
            analysis_type,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Primario,
    Secundario,
    Superior,
}

impl EducationLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primario => "Primaria",
            Self::Secundario => "Secundaria",
            Self::Superior => "Superior",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primario => write!(f, "primario"),
            Self::Secundario => write!(f, "secundario"),
            Self::Superior => write!(f, "superior"),
        }
    }
}

impl std::str::FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primario" | "primaria" | "primary" => Ok(Self::Primario),
            "secundario" | "secundaria" | "secondary" => Ok(Self::Secundario),
            "superior" | "terciario" | "tertiary" => Ok(Self::Superior),
            _ => Err(format!("invalid education level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Univariado,
    Bivariado,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Univariado => write!(f, "univariado"),
            Self::Bivariado => write!(f, "bivariado"),
        }
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "univariado" | "univariate" => Ok(Self::Univariado),
            "bivariado" | "bivariate" => Ok(Self::Bivariado),
            _ => Err(format!("invalid analysis type: {s}")),
        }
    }
}

/// Partial update applied by `Repository::update_project`.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub analysis_type: Option<AnalysisType>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.education_level.is_none()
            && self.analysis_type.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub project_id: String,
    pub variables: Vec<Variable>,
    /// Where the data came from: `manual` or the imported file name.
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(project_id: String, variables: Vec<Variable>, source: String) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            project_id,
            variables,
            source,
            created_at: Utc::now(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Saved result of a descriptive computation over one variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatisticRecord {
    pub id: String,
    pub project_id: String,
    pub dataset_id: String,
    pub variable: String,
    pub stats: DescriptiveStats,
    pub created_at: DateTime<Utc>,
}

impl StatisticRecord {
    pub fn new(project_id: String, dataset_id: String, variable: String, stats: DescriptiveStats) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            project_id,
            dataset_id,
            variable,
            stats,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub education_level: EducationLevel,
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        project_id: String,
        content: String,
        education_level: EducationLevel,
        generated_by: String,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            project_id,
            content,
            education_level,
            generated_by,
            created_at: Utc::now(),
        }
    }
}

/// Backup document; absent collections are left untouched on import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasets: Option<Vec<Dataset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<StatisticRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<Report>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("Primaria".parse::<EducationLevel>().unwrap(), EducationLevel::Primario);
        assert_eq!("terciario".parse::<EducationLevel>().unwrap(), EducationLevel::Superior);
        assert!("kinder".parse::<EducationLevel>().is_err());
        assert_eq!(EducationLevel::Secundario.to_string(), "secundario");
    }

    #[test]
    fn test_project_json_uses_camel_case() {
        let project = Project::new("Mascotas".into(), EducationLevel::Primario, AnalysisType::Univariado);
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["educationLevel"], "primario");
        assert_eq!(json["analysisType"], "univariado");
        assert!(json["createdAt"].is_string());
        assert_eq!(project.id.len(), 26);
    }

    #[test]
    fn test_snapshot_omits_missing_collections() {
        let snapshot = Snapshot {
            projects: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"projects":[]}"#);

        let back: Snapshot = serde_json::from_str(r#"{"reports":[]}"#).unwrap();
        assert!(back.projects.is_none());
        assert_eq!(back.reports, Some(vec![]));
    }

    #[test]
    fn test_update_is_empty() {
        assert!(ProjectUpdate::default().is_empty());
        let update = ProjectUpdate {
            name: Some("x".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
