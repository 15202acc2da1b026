//! Batch research over many questions

use super::{engine::ResearchEngine, types::ResearchResult};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Outcome category of one batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Ok,
    /// Finished, but with no information or a failed synthesis
    Degraded,
    /// Rejected before research started
    Error,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchStatus::Ok => "OK",
            BatchStatus::Degraded => "DEGRADED",
            BatchStatus::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub question: String,
    pub category: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResearchResult>,
}

impl ResearchEngine {
    /// Research each question in order. An error on one question is recorded
    /// in its item and the batch moves on.
    pub async fn research_batch(
        &self,
        questions: &[String],
        num_queries: usize,
        results_per_query: usize,
    ) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(questions.len());

        for question in questions {
            let item = match self.research(question, num_queries, results_per_query).await {
                Ok(result) => BatchItem {
                    question: question.clone(),
                    category: if result.is_degraded() {
                        BatchStatus::Degraded
                    } else {
                        BatchStatus::Ok
                    },
                    error: None,
                    result: Some(result),
                },
                Err(e) => {
                    warn!("Batch item '{}' failed", question);
                    e.log();
                    BatchItem {
                        question: question.clone(),
                        category: BatchStatus::Error,
                        error: Some(e.to_string()),
                        result: None,
                    }
                }
            };
            items.push(item);
        }

        items
    }
}

/// Questions from a batch file: one per line, `#` starts a comment line
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions() {
        let text = "# climate\nWhat is the Paris Agreement?\n\n  How do heat pumps work?  \n";
        assert_eq!(
            parse_questions(text),
            vec!["What is the Paris Agreement?", "How do heat pumps work?"]
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(BatchStatus::Ok.to_string(), "OK");
        assert_eq!(BatchStatus::Degraded.to_string(), "DEGRADED");
        assert_eq!(
            serde_json::to_string(&BatchStatus::Error).unwrap(),
            "\"ERROR\""
        );
    }
}
