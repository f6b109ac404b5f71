//! Built-in classroom datasets for trying the tool without typing data.

use tracing::debug;

use crate::error::EstadResult;
use crate::kv::KeyValueStore;
use crate::project::{AnalysisType, Dataset, EducationLevel, Project};
use crate::repository::Repository;
use crate::value::Value;
use crate::variable::{Variable, VariableKind};

/// Source tag of datasets created from a sample.
pub const SAMPLE_SOURCE: &str = "example";

#[derive(Debug, Clone, PartialEq)]
pub struct SampleDataset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub education_level: EducationLevel,
    pub analysis_type: AnalysisType,
    pub variables: Vec<Variable>,
}

impl SampleDataset {
    pub fn project(&self) -> Project {
        let mut project = Project::new(
            self.name.to_string(),
            self.education_level,
            self.analysis_type,
        );
        project.description = self.description.to_string();
        project
    }

    /// Creates a project holding this sample as its only dataset. Returns the
    /// project and dataset ids.
    pub fn install<S: KeyValueStore>(
        &self,
        repo: &Repository<S>,
    ) -> EstadResult<(String, String)> {
        let project_id = repo.create_project(self.project())?;
        let dataset_id = repo.create_dataset(Dataset::new(
            project_id.clone(),
            self.variables.clone(),
            SAMPLE_SOURCE.into(),
        ))?;
        debug!(sample = self.id, project_id, "sample installed");
        Ok((project_id, dataset_id))
    }
}

fn texts(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

fn numbers(items: &[f64]) -> Vec<Value> {
    items.iter().copied().map(Value::Number).collect()
}

/// Every sample, optionally restricted to one education level.
pub fn samples(level: Option<EducationLevel>) -> Vec<SampleDataset> {
    let all = vec![
        SampleDataset {
            id: "mundial",
            name: "Mundial 2026: Selecciones Favoritas",
            description: "Encuesta sobre selecciones favoritas para ganar el Mundial 2026",
            education_level: EducationLevel::Secundario,
            analysis_type: AnalysisType::Univariado,
            variables: vec![Variable::new(
                "seleccion",
                VariableKind::Nominal,
                texts(&[
                    "Argentina", "Brasil", "Francia", "España", "Alemania", "Argentina",
                    "Brasil", "Argentina", "Francia", "Argentina", "España", "Argentina",
                    "Brasil", "Argentina", "Alemania", "Argentina", "Francia", "Brasil",
                    "Argentina", "España",
                ]),
            )],
        },
        SampleDataset {
            id: "edades",
            name: "Edades de Estudiantes",
            description: "Análisis de edades de estudiantes de secundaria",
            education_level: EducationLevel::Secundario,
            analysis_type: AnalysisType::Univariado,
            variables: vec![Variable::new(
                "edad",
                VariableKind::Discrete,
                numbers(&[
                    13.0, 14.0, 13.0, 15.0, 14.0, 16.0, 13.0, 14.0, 15.0, 14.0, 13.0, 16.0, 14.0,
                    15.0, 13.0, 14.0, 17.0, 14.0, 15.0, 14.0, 13.0, 15.0, 14.0, 16.0, 15.0,
                ]),
            )],
        },
        SampleDataset {
            id: "horas-estudio",
            name: "Horas de Estudio vs Calificaciones",
            description: "Relación entre horas de estudio semanal y promedio de calificaciones",
            education_level: EducationLevel::Secundario,
            analysis_type: AnalysisType::Bivariado,
            variables: vec![
                Variable::new(
                    "horas_estudio",
                    VariableKind::Continuous,
                    numbers(&[
                        2.5, 4.0, 3.5, 5.0, 2.0, 6.0, 3.0, 4.5, 5.5, 3.5, 4.0, 6.5, 2.5, 5.0, 4.5,
                        3.0, 5.5, 4.0, 6.0, 3.5,
                    ]),
                ),
                Variable::new(
                    "promedio",
                    VariableKind::Continuous,
                    numbers(&[
                        6.5, 7.8, 7.2, 8.5, 6.0, 9.0, 7.0, 8.0, 8.8, 7.5, 7.8, 9.2, 6.8, 8.5, 8.2,
                        7.3, 8.7, 7.9, 9.1, 7.6,
                    ]),
                ),
            ],
        },
        SampleDataset {
            id: "animales",
            name: "Animales Favoritos de la Clase",
            description: "Encuesta sobre animales favoritos",
            education_level: EducationLevel::Primario,
            analysis_type: AnalysisType::Univariado,
            variables: vec![
                Variable::new(
                    "animal",
                    VariableKind::Nominal,
                    texts(&["Perros", "Gatos", "Conejos", "Pájaros", "Peces"]),
                ),
                Variable::new(
                    "cantidad",
                    VariableKind::Discrete,
                    numbers(&[15.0, 10.0, 8.0, 5.0, 3.0]),
                ),
            ],
        },
    ];

    match level {
        Some(level) => all
            .into_iter()
            .filter(|s| s.education_level == level)
            .collect(),
        None => all,
    }
}

pub fn find_sample(id: &str) -> Option<SampleDataset> {
    samples(None).into_iter().find(|s| s.id == id)
}
