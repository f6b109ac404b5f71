//! Collection-level CRUD for projects, datasets, statistics and reports.
//!
//! Each collection is a JSON array stored under its own key, so the layout
//! matches what a browser `localStorage` backup contains.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EstadError, EstadResult};
use crate::kv::KeyValueStore;
use crate::project::{
    Dataset, EducationLevel, Project, ProjectUpdate, Report, Snapshot, StatisticRecord,
};

pub const PROJECTS_KEY: &str = "estadisticamente_projects";
pub const DATASETS_KEY: &str = "estadisticamente_datasets";
pub const STATISTICS_KEY: &str = "estadisticamente_statistics";
pub const REPORTS_KEY: &str = "estadisticamente_reports";

const ALL_KEYS: [&str; 4] = [PROJECTS_KEY, DATASETS_KEY, STATISTICS_KEY, REPORTS_KEY];

pub struct Repository<S> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    /// Read path: an unreadable collection is logged and reads as empty.
    fn load<T: DeserializeOwned>(&self, key: &str) -> EstadResult<Vec<T>> {
        match self.load_strict(key) {
            Err(EstadError::Serialization(e)) => {
                warn!(key, error = %e, "unreadable collection, treating as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Write path: an unreadable collection is an error, so it is never
    /// saved over.
    fn load_strict<T: DeserializeOwned>(&self, key: &str) -> EstadResult<Vec<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> EstadResult<()> {
        let raw = serde_json::to_string(items)?;
        self.store.set(key, &raw)
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(&self, project: Project) -> EstadResult<String> {
        let mut projects: Vec<Project> = self.load_strict(PROJECTS_KEY)?;
        let id = project.id.clone();
        projects.push(project);
        self.save(PROJECTS_KEY, &projects)?;
        debug!(id, "project created");
        Ok(id)
    }

    /// Projects in creation order, optionally restricted to one level.
    pub fn list_projects(&self, level: Option<EducationLevel>) -> EstadResult<Vec<Project>> {
        let projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        Ok(match level {
            Some(level) => projects
                .into_iter()
                .filter(|p| p.education_level == level)
                .collect(),
            None => projects,
        })
    }

    pub fn get_project(&self, id: &str) -> EstadResult<Option<Project>> {
        let projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        Ok(projects.into_iter().find(|p| p.id == id))
    }

    pub fn update_project(&self, id: &str, update: ProjectUpdate) -> EstadResult<Project> {
        let mut projects: Vec<Project> = self.load_strict(PROJECTS_KEY)?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EstadError::NotFound(id.to_string()))?;

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        if let Some(level) = update.education_level {
            project.education_level = level;
        }
        if let Some(kind) = update.analysis_type {
            project.analysis_type = kind;
        }
        project.updated_at = Utc::now();

        let updated = project.clone();
        self.save(PROJECTS_KEY, &projects)?;
        Ok(updated)
    }

    /// Removes the project together with its datasets, statistics and reports.
    pub fn delete_project(&self, id: &str) -> EstadResult<()> {
        let mut projects: Vec<Project> = self.load_strict(PROJECTS_KEY)?;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Err(EstadError::NotFound(id.to_string()));
        }
        self.save(PROJECTS_KEY, &projects)?;

        let datasets = self.delete_datasets_by_project(id)?;
        let statistics = self.delete_statistics_by_project(id)?;
        let reports = self.delete_reports_by_project(id)?;
        debug!(id, datasets, statistics, reports, "project deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Datasets
    // -----------------------------------------------------------------------

    pub fn create_dataset(&self, dataset: Dataset) -> EstadResult<String> {
        let mut datasets: Vec<Dataset> = self.load_strict(DATASETS_KEY)?;
        let id = dataset.id.clone();
        datasets.push(dataset);
        self.save(DATASETS_KEY, &datasets)?;
        Ok(id)
    }

    pub fn list_datasets(&self, project_id: &str) -> EstadResult<Vec<Dataset>> {
        let datasets: Vec<Dataset> = self.load(DATASETS_KEY)?;
        Ok(datasets
            .into_iter()
            .filter(|d| d.project_id == project_id)
            .collect())
    }

    /// Most recently added dataset of a project.
    pub fn latest_dataset(&self, project_id: &str) -> EstadResult<Option<Dataset>> {
        Ok(self.list_datasets(project_id)?.pop())
    }

    pub fn update_dataset(&self, dataset: &Dataset) -> EstadResult<()> {
        let mut datasets: Vec<Dataset> = self.load_strict(DATASETS_KEY)?;
        let slot = datasets
            .iter_mut()
            .find(|d| d.id == dataset.id)
            .ok_or_else(|| EstadError::NotFound(dataset.id.clone()))?;
        *slot = dataset.clone();
        self.save(DATASETS_KEY, &datasets)
    }

    pub fn delete_datasets_by_project(&self, project_id: &str) -> EstadResult<usize> {
        self.remove_where(DATASETS_KEY, |d: &Dataset| d.project_id == project_id)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Appends a record. Summaries with overflowed measures are rejected
    /// because they cannot be written back as JSON numbers.
    pub fn save_statistics(&self, record: StatisticRecord) -> EstadResult<String> {
        if let Some(summary) = &record.stats.numeric {
            if !summary.is_finite() {
                return Err(EstadError::InvalidInput(format!(
                    "statistics for '{}' overflow the numeric range",
                    record.variable
                )));
            }
        }
        let mut records: Vec<StatisticRecord> = self.load_strict(STATISTICS_KEY)?;
        let id = record.id.clone();
        records.push(record);
        self.save(STATISTICS_KEY, &records)?;
        Ok(id)
    }

    pub fn list_statistics(&self, project_id: &str) -> EstadResult<Vec<StatisticRecord>> {
        let records: Vec<StatisticRecord> = self.load(STATISTICS_KEY)?;
        Ok(records
            .into_iter()
            .filter(|r| r.project_id == project_id)
            .collect())
    }

    pub fn delete_statistics_by_project(&self, project_id: &str) -> EstadResult<usize> {
        self.remove_where(STATISTICS_KEY, |r: &StatisticRecord| {
            r.project_id == project_id
        })
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Stores the report as the project's only report.
    pub fn save_report(&self, report: Report) -> EstadResult<String> {
        let mut reports: Vec<Report> = self.load_strict(REPORTS_KEY)?;
        reports.retain(|r| r.project_id != report.project_id);
        let id = report.id.clone();
        reports.push(report);
        self.save(REPORTS_KEY, &reports)?;
        Ok(id)
    }

    pub fn latest_report(&self, project_id: &str) -> EstadResult<Option<Report>> {
        let reports: Vec<Report> = self.load(REPORTS_KEY)?;
        Ok(reports
            .into_iter()
            .filter(|r| r.project_id == project_id)
            .max_by_key(|r| r.created_at))
    }

    pub fn delete_reports_by_project(&self, project_id: &str) -> EstadResult<usize> {
        self.remove_where(REPORTS_KEY, |r: &Report| r.project_id == project_id)
    }

    // -----------------------------------------------------------------------
    // Backup
    // -----------------------------------------------------------------------

    pub fn export_snapshot(&self) -> EstadResult<Snapshot> {
        Ok(Snapshot {
            projects: Some(self.load_strict(PROJECTS_KEY)?),
            datasets: Some(self.load_strict(DATASETS_KEY)?),
            statistics: Some(self.load_strict(STATISTICS_KEY)?),
            reports: Some(self.load_strict(REPORTS_KEY)?),
            exported_at: Some(Utc::now()),
        })
    }

    /// Replaces each collection present in the snapshot; the others are kept.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> EstadResult<usize> {
        let mut replaced = 0;
        if let Some(projects) = &snapshot.projects {
            self.save(PROJECTS_KEY, projects)?;
            replaced += 1;
        }
        if let Some(datasets) = &snapshot.datasets {
            self.save(DATASETS_KEY, datasets)?;
            replaced += 1;
        }
        if let Some(statistics) = &snapshot.statistics {
            self.save(STATISTICS_KEY, statistics)?;
            replaced += 1;
        }
        if let Some(reports) = &snapshot.reports {
            self.save(REPORTS_KEY, reports)?;
            replaced += 1;
        }
        Ok(replaced)
    }

    pub fn clear_all(&self) -> EstadResult<()> {
        for key in ALL_KEYS {
            self.store.delete(key)?;
        }
        Ok(())
    }

    fn remove_where<T, F>(&self, key: &str, pred: F) -> EstadResult<usize>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut items: Vec<T> = self.load_strict(key)?;
        let before = items.len();
        items.retain(|item| !pred(item));
        let removed = before - items.len();
        if removed > 0 {
            self.save(key, &items)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptive::compute;
    use crate::kv::MemoryKvStore;
    use crate::project::AnalysisType;
    use crate::value::Value;
    use crate::variable::{Variable, VariableKind};

    fn repo() -> Repository<MemoryKvStore> {
        Repository::new(MemoryKvStore::new())
    }

    fn make_project(name: &str, level: EducationLevel) -> Project {
        Project::new(name.into(), level, AnalysisType::Univariado)
    }

    fn make_dataset(project_id: &str) -> Dataset {
        let values = vec![Value::from(1), Value::from(2), Value::from(2)];
        Dataset::new(
            project_id.into(),
            vec![Variable::new("x", VariableKind::Discrete, values)],
            "manual".into(),
        )
    }

    #[test]
    fn test_create_and_get_project() {
        let repo = repo();
        let id = repo
            .create_project(make_project("Mascotas", EducationLevel::Primario))
            .unwrap();
        let project = repo.get_project(&id).unwrap().unwrap();
        assert_eq!(project.name, "Mascotas");
        assert!(repo.get_project("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_projects_by_level() {
        let repo = repo();
        repo.create_project(make_project("a", EducationLevel::Primario))
            .unwrap();
        repo.create_project(make_project("b", EducationLevel::Superior))
            .unwrap();
        assert_eq!(repo.list_projects(None).unwrap().len(), 2);
        let superior = repo.list_projects(Some(EducationLevel::Superior)).unwrap();
        assert_eq!(superior.len(), 1);
        assert_eq!(superior[0].name, "b");
    }

    #[test]
    fn test_update_project_bumps_timestamp() {
        let repo = repo();
        let project = make_project("old", EducationLevel::Secundario);
        let created = project.updated_at;
        let id = repo.create_project(project).unwrap();

        let updated = repo
            .update_project(
                &id,
                ProjectUpdate {
                    name: Some("new".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "new");
        assert!(updated.updated_at >= created);
        assert_eq!(repo.get_project(&id).unwrap().unwrap().name, "new");
    }

    #[test]
    fn test_update_missing_project_is_not_found() {
        let repo = repo();
        let err = repo
            .update_project("nope", ProjectUpdate::default())
            .unwrap_err();
        assert!(matches!(err, EstadError::NotFound(_)));
    }

    #[test]
    fn test_delete_project_cascades() {
        let repo = repo();
        let keep = repo
            .create_project(make_project("keep", EducationLevel::Primario))
            .unwrap();
        let gone = repo
            .create_project(make_project("gone", EducationLevel::Primario))
            .unwrap();

        for id in [&keep, &gone] {
            let dataset = make_dataset(id);
            let stats = compute(&dataset.variables[0].values);
            repo.save_statistics(StatisticRecord::new(
                id.to_string(),
                dataset.id.clone(),
                "x".into(),
                stats,
            ))
            .unwrap();
            repo.create_dataset(dataset).unwrap();
            repo.save_report(Report::new(
                id.to_string(),
                "# r".into(),
                EducationLevel::Primario,
                "local".into(),
            ))
            .unwrap();
        }

        repo.delete_project(&gone).unwrap();
        assert!(repo.get_project(&gone).unwrap().is_none());
        assert!(repo.list_datasets(&gone).unwrap().is_empty());
        assert!(repo.list_statistics(&gone).unwrap().is_empty());
        assert!(repo.latest_report(&gone).unwrap().is_none());

        assert_eq!(repo.list_datasets(&keep).unwrap().len(), 1);
        assert_eq!(repo.list_statistics(&keep).unwrap().len(), 1);
        assert!(repo.latest_report(&keep).unwrap().is_some());

        assert!(matches!(
            repo.delete_project(&gone),
            Err(EstadError::NotFound(_))
        ));
    }

    #[test]
    fn test_datasets_by_project() {
        let repo = repo();
        repo.create_dataset(make_dataset("p1")).unwrap();
        repo.create_dataset(make_dataset("p1")).unwrap();
        let last = make_dataset("p1");
        let last_id = repo.create_dataset(last).unwrap();
        repo.create_dataset(make_dataset("p2")).unwrap();

        assert_eq!(repo.list_datasets("p1").unwrap().len(), 3);
        assert_eq!(repo.latest_dataset("p1").unwrap().unwrap().id, last_id);
        assert_eq!(repo.delete_datasets_by_project("p1").unwrap(), 3);
        assert_eq!(repo.delete_datasets_by_project("p1").unwrap(), 0);
        assert_eq!(repo.list_datasets("p2").unwrap().len(), 1);
    }

    #[test]
    fn test_update_dataset_replaces_variables() {
        let repo = repo();
        let mut dataset = make_dataset("p1");
        repo.create_dataset(dataset.clone()).unwrap();
        dataset.variables.push(Variable::inferred("y", vec![Value::from(9)]));
        repo.update_dataset(&dataset).unwrap();
        let stored = repo.latest_dataset("p1").unwrap().unwrap();
        assert_eq!(stored.variables.len(), 2);

        let stray = make_dataset("p1");
        assert!(matches!(
            repo.update_dataset(&stray),
            Err(EstadError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_report_overwrites_previous() {
        let repo = repo();
        repo.save_report(Report::new(
            "p1".into(),
            "first".into(),
            EducationLevel::Secundario,
            "local".into(),
        ))
        .unwrap();
        repo.save_report(Report::new(
            "p1".into(),
            "second".into(),
            EducationLevel::Secundario,
            "remote".into(),
        ))
        .unwrap();
        repo.save_report(Report::new(
            "p2".into(),
            "other".into(),
            EducationLevel::Secundario,
            "local".into(),
        ))
        .unwrap();

        assert_eq!(repo.latest_report("p1").unwrap().unwrap().content, "second");
        assert_eq!(repo.delete_reports_by_project("p1").unwrap(), 1);
        assert!(repo.latest_report("p2").unwrap().is_some());
    }

    #[test]
    fn test_corrupt_collection_reads_as_empty_but_is_not_overwritten() {
        let repo = repo();
        repo.store().set(PROJECTS_KEY, "{not json").unwrap();
        assert!(repo.list_projects(None).unwrap().is_empty());

        let err = repo
            .create_project(make_project("a", EducationLevel::Primario))
            .unwrap_err();
        assert!(matches!(err, EstadError::Serialization(_)));
        assert!(matches!(
            repo.delete_project("any"),
            Err(EstadError::Serialization(_))
        ));
        assert!(matches!(
            repo.export_snapshot(),
            Err(EstadError::Serialization(_))
        ));
        assert_eq!(
            repo.store().get(PROJECTS_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_overflowing_statistics_are_rejected_and_others_survive() {
        let repo = repo();
        let kept = StatisticRecord::new(
            "p1".into(),
            "d1".into(),
            "x".into(),
            compute(&[Value::from(1), Value::from(2)]),
        );
        repo.save_statistics(kept).unwrap();

        let spread = compute(&[Value::Number(-1e308), Value::Number(1e308)]);
        let err = repo
            .save_statistics(StatisticRecord::new(
                "p2".into(),
                "d2".into(),
                "x".into(),
                spread,
            ))
            .unwrap_err();
        assert!(matches!(err, EstadError::InvalidInput(_)));

        let huge = compute(&[Value::Number(1e308), Value::Number(1e308)]);
        repo.save_statistics(StatisticRecord::new(
            "p3".into(),
            "d3".into(),
            "x".into(),
            huge,
        ))
        .unwrap();

        assert_eq!(repo.list_statistics("p1").unwrap().len(), 1);
        assert!(repo.list_statistics("p2").unwrap().is_empty());
        let stored = repo.list_statistics("p3").unwrap();
        assert_eq!(stored[0].stats.mean(), Some(1e308));
    }

    #[test]
    fn test_snapshot_roundtrip_between_stores() {
        let source = repo();
        let id = source
            .create_project(make_project("a", EducationLevel::Primario))
            .unwrap();
        source.create_dataset(make_dataset(&id)).unwrap();
        let snapshot = source.export_snapshot().unwrap();
        assert!(snapshot.exported_at.is_some());

        let target = repo();
        assert_eq!(target.import_snapshot(&snapshot).unwrap(), 4);
        assert_eq!(target.list_projects(None).unwrap()[0].id, id);
        assert_eq!(target.list_datasets(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_partial_import_keeps_other_collections() {
        let repo = repo();
        repo.create_project(make_project("a", EducationLevel::Primario))
            .unwrap();
        repo.create_dataset(make_dataset("p1")).unwrap();

        let snapshot = Snapshot {
            datasets: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(repo.import_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(repo.list_projects(None).unwrap().len(), 1);
        assert!(repo.list_datasets("p1").unwrap().is_empty());
    }

    #[test]
    fn test_clear_all_removes_every_key() {
        let repo = repo();
        repo.create_project(make_project("a", EducationLevel::Primario))
            .unwrap();
        repo.create_dataset(make_dataset("p1")).unwrap();
        repo.store().set("unrelated", "x").unwrap();

        repo.clear_all().unwrap();
        assert_eq!(repo.store().list().unwrap(), ["unrelated"]);
        assert!(repo.list_projects(None).unwrap().is_empty());
    }
}
