//! Markdown reports over a project's data.
//!
//! A report is first requested from a [`ReportGenerator`] (the remote LLM
//! service); when that fails or is unavailable the same content is composed
//! locally, so a report is always produced.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptive::{compute, DescriptiveStats, Mode};
use crate::error::{EstadError, EstadResult};
use crate::frequency::{build_grouped, build_simple, BinCount, FrequencyTable, TableKind};
use crate::project::{Dataset, Project};
use crate::variable::{Variable, VariableKind};

/// Produces report text for a project, typically through a remote service.
pub trait ReportGenerator {
    fn generate(&self, project: &Project, summary: &DatasetSummary) -> EstadResult<String>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub table: FrequencyTable,
    pub stats: DescriptiveStats,
}

impl VariableSummary {
    /// Continuous variables are grouped with `grouping` when they have
    /// enough numeric values; everything else gets a simple table.
    pub fn from_variable(variable: &Variable, grouping: BinCount) -> Self {
        let table = match variable.kind {
            VariableKind::Continuous => build_grouped(&variable.values, grouping)
                .unwrap_or_else(|_| build_simple(&variable.values)),
            _ => build_simple(&variable.values),
        };
        Self {
            name: variable.name.clone(),
            kind: variable.kind,
            table,
            stats: compute(&variable.values),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub dataset_id: String,
    pub source: String,
    pub variables: Vec<VariableSummary>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset, grouping: BinCount) -> Self {
        Self {
            dataset_id: dataset.id.clone(),
            source: dataset.source.clone(),
            variables: dataset
                .variables
                .iter()
                .map(|v| VariableSummary::from_variable(v, grouping))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Remote,
    Local,
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposedReport {
    pub content: String,
    pub source: ReportSource,
    /// Informational message shown when the local fallback was used.
    pub notice: Option<String>,
}

pub const LOCAL_FALLBACK_NOTICE: &str = "Reporte generado localmente (sin IA)";

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Local report for a single variable.
pub fn compose(
    project: &Project,
    variable: &str,
    table: &FrequencyTable,
    stats: &DescriptiveStats,
) -> String {
    let mut out = header(project);
    write_variable(&mut out, variable, table, stats);
    out.push_str(FOOTER);
    out
}

/// Local report covering every variable of a dataset.
pub fn compose_dataset(project: &Project, summary: &DatasetSummary) -> String {
    let mut out = header(project);
    if summary.variables.is_empty() {
        out.push_str("El conjunto de datos no tiene variables cargadas.\n\n");
    }
    for var in &summary.variables {
        write_variable(&mut out, &var.name, &var.table, &var.stats);
    }
    out.push_str(FOOTER);
    out
}

/// Tries the generator first and falls back to the local composer on any
/// failure, including an empty answer.
pub fn compose_with_ai(
    generator: Option<&dyn ReportGenerator>,
    project: &Project,
    summary: &DatasetSummary,
) -> ComposedReport {
    if let Some(generator) = generator {
        match generator.generate(project, summary).map(|text| strip_questions(&text)) {
            Ok(content) if !content.is_empty() => {
                debug!(project = %project.id, "remote report generated");
                return ComposedReport {
                    content,
                    source: ReportSource::Remote,
                    notice: None,
                };
            }
            Ok(_) => {
                let err = EstadError::Remote("empty report".into());
                warn!(project = %project.id, error = %err, "falling back to local report");
            }
            Err(e) => {
                warn!(project = %project.id, error = %e, "falling back to local report");
            }
        }
    }

    ComposedReport {
        content: compose_dataset(project, summary),
        source: ReportSource::Local,
        notice: Some(LOCAL_FALLBACK_NOTICE.to_string()),
    }
}

/// Removes questions from generated text: `¿...?` spans are dropped, stray
/// question marks become periods, and whitespace runs are tidied.
pub fn strip_questions(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '¿' => match chars[i + 1..].iter().position(|&c| c == '?') {
                Some(offset) => {
                    out.push(' ');
                    i += offset + 2;
                }
                None => {
                    out.push('¿');
                    i += 1;
                }
            },
            '?' => {
                while i < chars.len() && chars[i] == '?' {
                    i += 1;
                }
                out.push('.');
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    collapse_whitespace(&out).trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' if matches!(chars.peek(), Some(' ' | '\t')) => {
                while matches!(chars.peek(), Some(' ' | '\t')) {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => {
                let mut run = 1;
                while chars.peek() == Some(&'\n') {
                    chars.next();
                    run += 1;
                }
                out.push_str(if run >= 2 { "\n\n" } else { "\n" });
            }
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

const FOOTER: &str = "---\n*Reporte generado localmente*\n";

fn header(project: &Project) -> String {
    let mut out = format!("# Reporte Estadístico: {}\n\n", project.name);
    let _ = writeln!(out, "**Nivel:** {}", project.education_level.label());
    let _ = writeln!(out, "**Tipo de análisis:** {}", project.analysis_type);
    if !project.description.is_empty() {
        let _ = writeln!(out, "**Descripción:** {}", project.description);
    }
    out.push('\n');
    out
}

fn write_variable(out: &mut String, name: &str, table: &FrequencyTable, stats: &DescriptiveStats) {
    let _ = writeln!(out, "## Variable: {name}\n");

    if !table.is_empty() {
        write_table(out, table);
        out.push('\n');
    }

    let _ = writeln!(out, "- **N:** {}", stats.n);
    let _ = writeln!(out, "- **Moda:** {}", stats.mode);
    if let Some(num) = &stats.numeric {
        let _ = writeln!(out, "- **Media:** {:.2}", num.mean);
        let _ = writeln!(out, "- **Mediana:** {:.2}", num.median);
        let _ = writeln!(out, "- **Mínimo:** {}", num.min);
        let _ = writeln!(out, "- **Máximo:** {}", num.max);
        let _ = writeln!(out, "- **Rango:** {:.2}", num.range);
        let _ = writeln!(out, "- **Varianza:** {:.2}", num.variance_population);
        let _ = writeln!(out, "- **Desviación estándar:** {:.2}", num.std_dev_population);
        if let Some(cv) = num.coefficient_of_variation {
            let _ = writeln!(out, "- **Coeficiente de variación:** {cv:.2}%");
        }
        let [q1, q2, q3] = num.quartiles;
        let _ = writeln!(out, "- **Cuartiles:** Q1 = {q1:.2}, Q2 = {q2:.2}, Q3 = {q3:.2}");
    }
    out.push('\n');

    let _ = writeln!(out, "{}\n", interpretation(name, table, stats));
}

fn write_table(out: &mut String, table: &FrequencyTable) {
    match table.kind {
        TableKind::Simple => {
            out.push_str("| Valor | fi | fr | % | Fi | Fr |\n|---|---|---|---|---|---|\n");
            for row in &table.rows {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.4} | {:.1}% | {} | {:.4} |",
                    row.value,
                    row.absolute_freq,
                    row.relative_freq,
                    row.percent,
                    row.cumulative_absolute,
                    row.cumulative_relative
                );
            }
        }
        TableKind::Grouped => {
            out.push_str("| Intervalo | xi | fi | fr | % | Fi |\n|---|---|---|---|---|---|\n");
            for row in &table.rows {
                let mark = row.class.map(|c| c.class_mark).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "| {} | {:.2} | {} | {:.4} | {:.1}% | {} |",
                    row.value,
                    mark,
                    row.absolute_freq,
                    row.relative_freq,
                    row.percent,
                    row.cumulative_absolute
                );
            }
        }
    }
}

/// Two or three sentences naming the mode and, for numeric data, the mean.
fn interpretation(name: &str, table: &FrequencyTable, stats: &DescriptiveStats) -> String {
    if stats.is_empty() {
        return format!("La variable {name} no tiene datos cargados.");
    }

    let modal = table.modal_rows();
    let mut text = format!("La variable {name} tiene {} observaciones.", stats.n);
    match &stats.mode {
        Mode::Values(values) if values.len() == 1 => {
            let share = match (table.kind, modal.as_slice()) {
                (TableKind::Simple, [row]) => {
                    format!(", con {} casos ({:.1}%)", row.absolute_freq, row.percent)
                }
                _ => String::new(),
            };
            let _ = write!(text, " El valor más frecuente (moda) es {}{share}.", values[0]);
        }
        Mode::Values(values) => {
            let _ = write!(text, " La distribución es multimodal: {}.", values.join(", "));
        }
        Mode::NoMode => text.push_str(" No hay moda porque todos los valores son distintos."),
        Mode::NoData => {}
    }
    if let (TableKind::Grouped, [row]) = (table.kind, modal.as_slice()) {
        let _ = write!(
            text,
            " La clase modal es {}, con {} casos ({:.1}%).",
            row.value, row.absolute_freq, row.percent
        );
    }
    if let Some(num) = &stats.numeric {
        let _ = write!(
            text,
            " La media es {:.2} y la mediana {:.2}, con valores entre {} y {}.",
            num.mean, num.median, num.min, num.max
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{AnalysisType, EducationLevel};
    use crate::value::Value;

    struct FixedGenerator(EstadResult<String>);

    impl ReportGenerator for FixedGenerator {
        fn generate(&self, _: &Project, _: &DatasetSummary) -> EstadResult<String> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(EstadError::Remote(e.to_string())),
            }
        }
    }

    fn project() -> Project {
        Project::new("Mascotas".into(), EducationLevel::Primario, AnalysisType::Univariado)
    }

    fn pets() -> Variable {
        let values = ["Perro", "Gato", "Perro", "Conejo", "Perro"]
            .into_iter()
            .map(Value::from)
            .collect();
        Variable::new("mascota", VariableKind::Nominal, values)
    }

    fn summary(variables: Vec<Variable>) -> DatasetSummary {
        let dataset = Dataset::new("p".into(), variables, "manual".into());
        DatasetSummary::from_dataset(&dataset, BinCount::Sturges)
    }

    #[test]
    fn test_compose_single_variable() {
        let var = pets();
        let table = build_simple(&var.values);
        let stats = compute(&var.values);
        let md = compose(&project(), &var.name, &table, &stats);

        assert!(md.starts_with("# Reporte Estadístico: Mascotas\n"));
        assert!(md.contains("## Variable: mascota"));
        assert!(md.contains("| Perro | 3 | 0.6000 | 60.0% | 5 | 1.0000 |"));
        assert!(md.contains("moda) es Perro, con 3 casos (60.0%)"));
        assert!(!md.contains("La media"));
        assert!(md.trim_end().ends_with("*Reporte generado localmente*"));
    }

    #[test]
    fn test_compose_numeric_mentions_mean() {
        let values: Vec<Value> = [2, 4, 4, 4, 5, 5, 7, 9].into_iter().map(Value::from).collect();
        let var = Variable::new("nota", VariableKind::Discrete, values);
        let md = compose_dataset(&project(), &summary(vec![var]));
        assert!(md.contains("La media es 5.00"));
        assert!(md.contains("- **Varianza:** 4.00"));
        assert!(md.contains("moda) es 4"));
    }

    #[test]
    fn test_continuous_variable_is_grouped() {
        let values: Vec<Value> = (1..=10).map(Value::from).collect();
        let var = Variable::new("altura", VariableKind::Continuous, values);
        let s = summary(vec![var]);
        assert_eq!(s.variables[0].table.kind, TableKind::Grouped);
        let md = compose_dataset(&project(), &s);
        assert!(md.contains("| Intervalo | xi |"));
        assert!(md.contains("No hay moda"));
    }

    #[test]
    fn test_grouped_report_names_modal_class() {
        let values: Vec<Value> = [1, 2, 2, 3, 3, 3, 10].into_iter().map(Value::from).collect();
        let var = Variable::new("goles", VariableKind::Continuous, values);
        let md = compose_dataset(&project(), &summary(vec![var]));
        assert!(md.contains("moda) es 3."));
        assert!(md.contains("La clase modal es [1.00 - 3.25), con 6 casos (85.7%)."));

        let even: Vec<Value> = (1..=10).map(Value::from).collect();
        let var = Variable::new("altura", VariableKind::Continuous, even);
        let md = compose_dataset(&project(), &summary(vec![var]));
        assert!(!md.contains("clase modal"));
    }

    #[test]
    fn test_single_continuous_value_falls_back_to_simple() {
        let var = Variable::new("x", VariableKind::Continuous, vec![Value::from(3)]);
        assert_eq!(summary(vec![var]).variables[0].table.kind, TableKind::Simple);
    }

    #[test]
    fn test_empty_variable_is_reported() {
        let var = Variable::new("vacía", VariableKind::Nominal, vec![]);
        let md = compose_dataset(&project(), &summary(vec![var]));
        assert!(md.contains("no tiene datos cargados"));
    }

    #[test]
    fn test_remote_report_is_used_and_cleaned() {
        let gen = FixedGenerator(Ok("Hola. ¿Querés saber más? Los datos son claros??".into()));
        let report = compose_with_ai(Some(&gen), &project(), &summary(vec![pets()]));
        assert_eq!(report.source, ReportSource::Remote);
        assert_eq!(report.content, "Hola. Los datos son claros.");
        assert!(report.notice.is_none());
    }

    #[test]
    fn test_remote_failure_falls_back_to_local() {
        let gen = FixedGenerator(Err(EstadError::Remote("timeout".into())));
        let report = compose_with_ai(Some(&gen), &project(), &summary(vec![pets()]));
        assert_eq!(report.source, ReportSource::Local);
        assert_eq!(report.notice.as_deref(), Some(LOCAL_FALLBACK_NOTICE));
        assert!(report.content.contains("## Variable: mascota"));
    }

    #[test]
    fn test_empty_remote_report_falls_back() {
        let gen = FixedGenerator(Ok("¿Todo esto?".into()));
        let report = compose_with_ai(Some(&gen), &project(), &summary(vec![pets()]));
        assert_eq!(report.source, ReportSource::Local);
    }

    #[test]
    fn test_no_generator_is_local() {
        let report = compose_with_ai(None, &project(), &summary(vec![pets()]));
        assert_eq!(report.source, ReportSource::Local);
        assert_eq!(report.source.to_string(), "local");
    }

    #[test]
    fn test_strip_questions() {
        assert_eq!(strip_questions("  ¿Qué es la media?  Es un promedio.  "), "Es un promedio.");
        assert_eq!(strip_questions("Listo?!"), "Listo.!");
        assert_eq!(strip_questions("a\t\t b"), "a b");
        assert_eq!(strip_questions("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(strip_questions("a\n\nb"), "a\n\nb");
        assert_eq!(strip_questions("¿sin cierre"), "¿sin cierre");
        assert_eq!(strip_questions(""), "");
    }

    #[test]
    fn test_summary_serializes_for_remote() {
        let json = serde_json::to_value(summary(vec![pets()])).unwrap();
        assert_eq!(json["variables"][0]["name"], "mascota");
        assert_eq!(json["variables"][0]["type"], "nominal");
        assert_eq!(json["variables"][0]["table"]["rows"][0]["absoluteFreq"], 1);
    }
}
