//! Blocking HTTP clients for the report service and the tutor chat.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use estad_core::report::{strip_questions, DatasetSummary, ReportGenerator};
use estad_core::{EducationLevel, EstadError, EstadResult, Project};

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Maps a ureq failure to `EstadError::Remote`, keeping the server's
/// `{error}` message when it sent one.
fn remote_error(e: ureq::Error) -> EstadError {
    match e {
        ureq::Error::Status(code, resp) => {
            let detail = resp
                .into_json::<ErrorBody>()
                .map(|b| b.error)
                .unwrap_or_else(|_| "no details".into());
            EstadError::Remote(format!("HTTP {code}: {detail}"))
        }
        ureq::Error::Transport(t) => EstadError::Remote(t.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Report generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ReportBody {
    report: Option<String>,
}

pub struct HttpReportGenerator {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpReportGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            endpoint: format!("{}/api/reports/generate", base_url.trim_end_matches('/')),
        }
    }
}

impl ReportGenerator for HttpReportGenerator {
    fn generate(&self, project: &Project, summary: &DatasetSummary) -> EstadResult<String> {
        let level = project.education_level.to_string();
        let body = json!({
            "projectId": project.id,
            "educationLevel": level,
            "data": summary,
        });
        let resp = self
            .agent
            .post(&self.endpoint)
            .query("project_id", &project.id)
            .query("education_level", &level)
            .send_json(body)
            .map_err(remote_error)?;
        let parsed: ReportBody = resp
            .into_json()
            .map_err(|e| EstadError::Remote(format!("invalid response: {e}")))?;
        parsed
            .report
            .ok_or_else(|| EstadError::Remote("response has no report".into()))
    }
}

// ---------------------------------------------------------------------------
// Tutor chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatBody {
    reply: String,
}

pub struct TutorClient {
    agent: ureq::Agent,
    url: String,
}

impl TutorClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            url: url.to_string(),
        }
    }

    pub fn ask(&self, question: &str, level: EducationLevel) -> EstadResult<String> {
        if question.trim().is_empty() {
            return Err(EstadError::InvalidInput("question is empty".into()));
        }
        let resp = self
            .agent
            .post(&self.url)
            .send_json(json!({
                "userInput": question,
                "educationLevel": level.to_string(),
            }))
            .map_err(remote_error)?;
        let body: ChatBody = resp
            .into_json()
            .map_err(|e| EstadError::Remote(format!("invalid response: {e}")))?;
        Ok(strip_questions(&body.reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let gen = HttpReportGenerator::new("http://localhost:8001/", Duration::from_secs(1));
        assert_eq!(gen.endpoint, "http://localhost:8001/api/reports/generate");
    }

    #[test]
    fn test_empty_question_is_rejected_before_network() {
        let client = TutorClient::new("http://127.0.0.1:9/chat", Duration::from_millis(10));
        assert!(matches!(
            client.ask("   ", EducationLevel::Primario),
            Err(EstadError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_response_bodies_parse() {
        let report: ReportBody = serde_json::from_str(r##"{"report":"# R"}"##).unwrap();
        assert_eq!(report.report.as_deref(), Some("# R"));
        let missing: ReportBody = serde_json::from_str("{}").unwrap();
        assert!(missing.report.is_none());
        let err: ErrorBody = serde_json::from_str(r#"{"error":"userInput requerido"}"#).unwrap();
        assert_eq!(err.error, "userInput requerido");
    }
}
