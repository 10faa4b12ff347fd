//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use std::fmt::Write;

use serde::Serialize;

use crate::model::Agent;
use crate::reasoning::ChatResponse;
use crate::store::StoreStats;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// Newline-delimited JSON (NDJSON) for streaming.
    Ndjson,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" | "stream" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Returns true if this format is a streaming format.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Ndjson)
    }
}

/// Formats engine-wide status.
#[must_use]
pub fn format_status(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            output.push_str("Mexar Engine Status\n");
            output.push_str("====================\n\n");
            let _ = writeln!(output, "  Agents:        {}", stats.agent_count);
            let _ = writeln!(output, "  Chunks:        {}", stats.chunk_count);
            let _ = writeln!(output, "  Active jobs:   {}", stats.active_job_count);
            let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(stats),
    }
}

/// Formats a list of agents.
#[must_use]
pub fn format_agent_list(agents: &[Agent], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if agents.is_empty() {
                return "No agents found.\n".to_string();
            }
            let mut output = String::new();
            output.push_str("Agents:\n");
            let _ = writeln!(output, "{:<6} {:<20} {:<10} {:<12} Domain", "ID", "Name", "Status", "Chunks");
            output.push_str(&"-".repeat(70));
            output.push('\n');
            for agent in agents {
                let id = agent.id.map_or_else(|| "-".to_string(), |i| i.to_string());
                let _ = writeln!(
                    output,
                    "{:<6} {:<20} {:<10} {:<12} {}",
                    id,
                    truncate(&agent.name, 20),
                    agent.status.as_str(),
                    agent.chunk_count,
                    agent.domain
                );
            }
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(&agents),
    }
}

/// Formats one agent's details.
#[must_use]
pub fn format_agent(agent: &Agent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Agent: {}", agent.name);
            let _ = writeln!(output, "  ID:            {}", agent.id.unwrap_or(0));
            let _ = writeln!(output, "  Tenant:        {}", agent.tenant_id);
            let _ = writeln!(output, "  Status:        {}", agent.status);
            let _ = writeln!(output, "  Domain:        {}", agent.domain);
            let _ = writeln!(output, "  Keywords:      {}", agent.domain_keywords.join(", "));
            let _ = writeln!(output, "  Chunks:        {}", agent.chunk_count);
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(agent),
    }
}

/// Formats a query response.
#[must_use]
pub fn format_chat_response(response: &ChatResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "{}", response.answer);
            let _ = writeln!(output, "\n(confidence: {:.2}, in domain: {})", response.confidence, response.in_domain);
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            #[derive(Serialize)]
            struct ChatResponseView<'a> {
                answer: &'a str,
                confidence: f64,
                in_domain: bool,
            }
            format_json(&ChatResponseView {
                answer: &response.answer,
                confidence: response.confidence,
                in_domain: response.in_domain,
            })
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats an error for output.
///
/// When format is JSON, returns a structured error object keyed by the
/// error's stable [`crate::Error::code`]. When format is Text, returns the
/// error message string.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "success": false,
                "error": {
                    "code": error.code(),
                    "message": error.to_string(),
                }
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s[..max_len].to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("unknown"), OutputFormat::Text);
    }

    #[test]
    fn test_output_format_ndjson() {
        assert_eq!(OutputFormat::parse("ndjson"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("jsonl"), OutputFormat::Ndjson);
        assert!(OutputFormat::Ndjson.is_streaming());
        assert!(!OutputFormat::Text.is_streaming());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
    }

    #[test]
    fn test_format_agent_list_empty() {
        let agents: Vec<Agent> = vec![];
        let text = format_agent_list(&agents, OutputFormat::Text);
        assert!(text.contains("No agents found"));

        let json = format_agent_list(&agents, OutputFormat::Json);
        assert!(json.contains("[]"));
    }

    #[test]
    fn test_format_agent_list_with_data() {
        let mut agent = Agent::new("tenant-1", "chef", "prompt");
        agent.id = Some(1);
        let agents = vec![agent];
        let text = format_agent_list(&agents, OutputFormat::Text);
        assert!(text.contains("chef"));

        let json = format_agent_list(&agents, OutputFormat::Json);
        assert!(json.contains("\"name\""));
    }

    #[test]
    fn test_format_status() {
        let stats = StoreStats { agent_count: 2, chunk_count: 10, active_job_count: 1, schema_version: 1 };
        let text = format_status(&stats, OutputFormat::Text);
        assert!(text.contains("Agents:        2"));
        let json = format_status(&stats, OutputFormat::Json);
        assert!(json.contains("\"agent_count\": 2"));
    }

    #[test]
    fn test_format_error_json_includes_code() {
        let error = crate::Error::NotFound { name: "chef".to_string() };
        let json = format_error(&error, OutputFormat::Json);
        assert!(json.contains("\"code\": \"not_found\""));
    }
}
