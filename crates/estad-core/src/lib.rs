pub mod descriptive;
pub mod error;
pub mod frequency;
pub mod inference;
pub mod kv;
pub mod project;
pub mod report;
pub mod repository;
pub mod samples;
pub mod value;
pub mod variable;

pub use descriptive::{DescriptiveStats, Mode, NumericSummary};
pub use error::{EstadError, EstadResult};
pub use frequency::{BinCount, ClassInterval, FrequencyRow, FrequencyTable, TableKind};
pub use inference::{
    ConfidenceInterval, Correlation, CorrelationStrength, DistributionShape, HypothesisTest,
    Regression,
};
pub use kv::{KeyValueStore, MemoryKvStore};
pub use project::{
    AnalysisType, Dataset, EducationLevel, Project, ProjectUpdate, Report, Snapshot,
    StatisticRecord,
};
pub use report::{ComposedReport, DatasetSummary, ReportGenerator, ReportSource, VariableSummary};
pub use repository::Repository;
pub use samples::{find_sample, samples, SampleDataset};
pub use value::Value;
pub use variable::{Variable, VariableKind};
