//! CLI command implementations: wires each subcommand to the engine's
//! compilation and reasoning orchestrators.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use crate::cli::output::{format_agent, format_agent_list, format_chat_response, format_status, OutputFormat};
use crate::cli::parser::{Cli, Commands};
use crate::compilation::{CompilationOrchestrator, SourceFile};
use crate::config::EngineConfig;
use crate::embedding::create_embedder;
use crate::error::{Error, Result};
use crate::jobs::JobRegistry;
use crate::llm::create_llm_provider;
use crate::parsing::{DocumentParser, NullDocxTextExtractor, NullPdfTextExtractor};
use crate::reasoning::{AgentCache, ChatResponse, ReasoningOrchestrator};
use crate::registry::AgentRegistry;
use crate::reranker::create_reranker;
use crate::store::{SqliteStore, Store};

/// Executes the parsed CLI invocation, returning the rendered output.
///
/// # Errors
///
/// Returns an error if the store cannot be opened/initialized, or if the
/// requested operation fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = EngineConfig::load()?;
    let store = SqliteStore::open(cli.get_db_path(), config.pool_size)?;
    store.init()?;

    match &cli.command {
        Commands::Init => Ok("Database initialized.\n".to_string()),
        Commands::Status => Ok(format_status(&store.stats()?, format)),
        Commands::CreateAgent { name, tenant, prompt } => cmd_create_agent(&store, tenant, name, prompt.as_deref(), format),
        Commands::ListAgents { tenant } => Ok(format_agent_list(&AgentRegistry::new(&store).list(tenant)?, format)),
        Commands::ShowAgent { name, tenant } => cmd_show_agent(&store, tenant, name, format),
        Commands::DeleteAgent { name, tenant, yes } => cmd_delete_agent(&store, tenant, name, *yes),
        Commands::Compile { name, tenant, files } => cmd_compile(&store, &config, tenant, name, files),
        Commands::Query { name, tenant, question } => cmd_query(&store, &config, tenant, name, question, format),
    }
}

fn cmd_create_agent(store: &SqliteStore, tenant: &str, name: &str, prompt: Option<&str>, format: OutputFormat) -> Result<String> {
    let prompt = resolve_prompt(prompt)?;
    let agent = AgentRegistry::new(store).create(tenant, name, &prompt)?;
    Ok(format_agent(&agent, format))
}

fn cmd_show_agent(store: &SqliteStore, tenant: &str, name: &str, format: OutputFormat) -> Result<String> {
    let agent = AgentRegistry::new(store).get(tenant, name)?.ok_or_else(|| Error::NotFound { name: name.to_string() })?;
    Ok(format_agent(&agent, format))
}

fn cmd_delete_agent(store: &SqliteStore, tenant: &str, name: &str, yes: bool) -> Result<String> {
    if !yes {
        return Err(Error::InvalidState { message: format!("refusing to delete agent '{name}' without --yes") });
    }
    AgentRegistry::new(store).delete(tenant, name)?;
    Ok(format!("Agent '{name}' deleted.\n"))
}

fn resolve_prompt(prompt: Option<&str>) -> Result<String> {
    match prompt {
        Some(p) => Ok(p.to_string()),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| Error::InvalidState { message: format!("failed to read system prompt from stdin: {e}") })?;
            Ok(buf)
        }
    }
}

fn cmd_compile(store: &SqliteStore, config: &EngineConfig, tenant: &str, name: &str, files: &[PathBuf]) -> Result<String> {
    let embedder = create_embedder()?;
    let llm = create_llm_provider(std::env::var("MEXAR_LLM_API_KEY").ok(), None, config.llm_chat_timeout_secs, config.llm_json_timeout_secs);
    let parser = DocumentParser::new(Box::new(NullPdfTextExtractor), Box::new(NullDocxTextExtractor));
    let job_registry = JobRegistry::new();

    let agent_registry = AgentRegistry::new(store);
    let agent = agent_registry.get(tenant, name)?.ok_or_else(|| Error::NotFound { name: name.to_string() })?;
    let agent_id = agent.id.ok_or_else(|| Error::InvalidState { message: "agent has no assigned id".to_string() })?;

    let sources = read_source_files(files)?;
    let (lease, job_id) = job_registry.start_compilation(store, agent_id, name)?;
    let orchestrator = CompilationOrchestrator::new(store, embedder.as_ref(), llm.as_ref(), config, &parser, &job_registry);
    orchestrator.compile(lease, agent_id, job_id, &agent.system_prompt, &sources)?;
    Ok(format!("Compilation of '{name}' completed.\n"))
}

fn read_source_files(files: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path).map_err(|e| Error::InvalidState { message: format!("failed to read '{}': {e}", path.display()) })?;
        let file_name = file_name_of(path);
        sources.push(SourceFile { file_name, bytes });
    }
    Ok(sources)
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string())
}

fn cmd_query(store: &SqliteStore, config: &EngineConfig, tenant: &str, name: &str, question: &str, format: OutputFormat) -> Result<String> {
    let embedder = create_embedder()?;
    let llm = create_llm_provider(std::env::var("MEXAR_LLM_API_KEY").ok(), None, config.llm_chat_timeout_secs, config.llm_json_timeout_secs);
    let reranker = create_reranker();
    let cache = AgentCache::new();

    let orchestrator =
        ReasoningOrchestrator { store, embedder: embedder.as_ref(), llm: llm.as_ref(), reranker: reranker.as_ref(), config, cache: &cache };
    let response: ChatResponse = orchestrator.reason(tenant, name, question, None)?;
    Ok(format_chat_response(&response, format))
}
