use std::fmt::Write as FmtWrite;

use console::style;
use serde::Serialize;

use crate::models::{OutputFormat, QuerySession};
use crate::services::{IndexReport, format_source_pages};

/// Every method returns complete lines, trailing newline included.
pub trait Formatter {
    fn format_answer(&self, session: &QuerySession, show_sources: bool) -> String;
    fn format_index_report(&self, report: &IndexReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub ollama_url: String,
    pub ollama_connected: bool,
    pub embedding_model: String,
    pub embedding_model_available: bool,
    pub llm_model: String,
    pub llm_model_available: bool,
    pub vector_store_driver: String,
    pub vector_store_location: String,
    pub vector_store_connected: bool,
    pub collection: String,
    /// `None` when the collection does not exist yet.
    pub points: Option<u64>,
}

fn mark(ok: bool) -> String {
    if ok {
        style("[OK]").green().to_string()
    } else {
        style("[MISSING]").red().to_string()
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, session: &QuerySession, show_sources: bool) -> String {
        let mut output = String::new();
        writeln!(output, "{}", session.answer).unwrap();
        if show_sources {
            let pages = session.source_pages();
            if !pages.is_empty() {
                writeln!(output, "{}", style(format_source_pages(&pages)).dim()).unwrap();
            }
        }
        output
    }

    fn format_index_report(&self, report: &IndexReport) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "✅ Indexed {} segments from {} pages into {}",
            report.segments_indexed,
            report.pages,
            style(&report.collection).bold()
        )
        .unwrap();
        writeln!(
            output,
            "   Collection now holds {} points ({}ms)",
            report.points_in_collection, report.duration_ms
        )
        .unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let ollama = if status.ollama_connected {
            style("[CONNECTED]").green()
        } else {
            style("[DISCONNECTED]").red()
        };
        writeln!(output, "Ollama:        {} ({})", status.ollama_url, ollama).unwrap();
        if status.ollama_connected {
            writeln!(
                output,
                "  Embedding:   {} {}",
                status.embedding_model,
                mark(status.embedding_model_available)
            )
            .unwrap();
            writeln!(
                output,
                "  LLM:         {} {}",
                status.llm_model,
                mark(status.llm_model_available)
            )
            .unwrap();
        }
        writeln!(output).unwrap();

        let store = if status.vector_store_connected {
            style("[CONNECTED]").green()
        } else {
            style("[DISCONNECTED]").red()
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, store
        )
        .unwrap();
        writeln!(output, "  Location:    {}", status.vector_store_location).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        if status.vector_store_connected {
            match status.points {
                Some(points) => writeln!(output, "  Points:      {}", points).unwrap(),
                None => writeln!(output, "  Points:      (not created yet)").unwrap(),
            }
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}\n", style("Error:").red().bold(), error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut rendered = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        rendered.push('\n');
        rendered
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, session: &QuerySession, show_sources: bool) -> String {
        let mut json = serde_json::json!({
            "question": session.question,
            "answer": session.answer,
            "duration_ms": session.duration_ms,
        });
        if show_sources {
            json["pages"] = serde_json::json!(session.source_pages());
            json["segments"] = serde_json::json!(
                session
                    .retrieved
                    .iter()
                    .map(|hit| serde_json::json!({
                        "id": hit.segment.id,
                        "page": hit.segment.metadata.page,
                        "score": hit.score,
                    }))
                    .collect::<Vec<_>>()
            );
        }
        self.render(&json)
    }

    fn format_index_report(&self, report: &IndexReport) -> String {
        self.render(&serde_json::json!(report))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "ollama": {
                "url": status.ollama_url,
                "connected": status.ollama_connected,
                "embedding_model": status.embedding_model,
                "embedding_model_available": status.embedding_model_available,
                "llm_model": status.llm_model,
                "llm_model_available": status.llm_model_available,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "location": status.vector_store_location,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "points": status.points,
            }
        });
        self.render(&json)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RetrievedSegment, Segment, SegmentMetadata};

    fn session() -> QuerySession {
        let hit = |id: &str, page| RetrievedSegment {
            segment: Segment {
                id: id.to_string(),
                content: "text".to_string(),
                metadata: SegmentMetadata {
                    source: "a.pdf".to_string(),
                    page,
                },
            },
            score: 0.9,
        };
        QuerySession {
            question: "What?".to_string(),
            retrieved: vec![hit("doc_1", 3), hit("doc_4", 5), hit("doc_2", 3)],
            answer: "This.".to_string(),
            duration_ms: 12,
        }
    }

    fn status(connected: bool) -> StatusInfo {
        StatusInfo {
            ollama_url: "http://localhost:11434".to_string(),
            ollama_connected: connected,
            embedding_model: "nomic-embed-text".to_string(),
            embedding_model_available: connected,
            llm_model: "gemma2:2b".to_string(),
            llm_model_available: false,
            vector_store_driver: "qdrant".to_string(),
            vector_store_location: "http://localhost:6334".to_string(),
            vector_store_connected: connected,
            collection: "pdf_collection".to_string(),
            points: connected.then_some(42),
        }
    }

    #[test]
    fn test_text_answer_with_sources() {
        let output = TextFormatter.format_answer(&session(), true);
        assert!(output.starts_with("This.\n"));
        assert!(output.contains("Sources: p.3, p.5"));
        assert!(!TextFormatter.format_answer(&session(), false).contains("Sources"));
    }

    #[test]
    fn test_json_answer() {
        let output = JsonFormatter::new(false).format_answer(&session(), true);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["answer"], "This.");
        assert_eq!(parsed["pages"], serde_json::json!([3, 5]));
        assert_eq!(parsed["segments"][0]["id"], "doc_1");
    }

    #[test]
    fn test_json_index_report() {
        let report = IndexReport {
            collection: "pdf_collection".to_string(),
            pages: 2,
            segments_indexed: 7,
            points_in_collection: 7,
            duration_ms: 100,
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_index_report(&report)).unwrap();
        assert_eq!(parsed["segments_indexed"], 7);
        assert!(TextFormatter.format_index_report(&report).contains("7 segments"));
    }

    #[test]
    fn test_status_formats() {
        let text = TextFormatter.format_status(&status(true));
        assert!(text.contains("Points:      42"));
        assert!(text.contains("gemma2:2b"));

        let text = TextFormatter.format_status(&status(false));
        assert!(!text.contains("Points:"));

        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format_status(&status(false)))
                .unwrap();
        assert_eq!(parsed["vector_store"]["connected"], false);
        assert!(parsed["vector_store"]["points"].is_null());
    }

    #[test]
    fn test_messages() {
        assert_eq!(TextFormatter.format_message("done"), "done\n");
        assert_eq!(
            JsonFormatter::new(false).format_error("boom"),
            "{\"error\":\"boom\"}\n"
        );
        assert_eq!(
            JsonFormatter::new(false).format_message("done"),
            "{\"message\":\"done\"}\n"
        );
    }

    #[test]
    fn test_json_output_ends_with_newline() {
        let report = IndexReport::default();
        for pretty in [false, true] {
            let json = JsonFormatter::new(pretty);
            assert!(json.format_answer(&session(), true).ends_with("}\n"));
            assert!(json.format_index_report(&report).ends_with("}\n"));
            assert!(json.format_status(&status(true)).ends_with("}\n"));
        }
    }
}
