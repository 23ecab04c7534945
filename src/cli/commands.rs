//! Command implementations for the Halberd CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::cli::args::*;
use crate::cli::output::output_result;
use crate::config::CompilerConfig;
use crate::dsl::QueryCompiler;
use crate::error::{HalberdError, Result};
use crate::fulltext::{
    ContainerConfiguration, FulltextQueryBuilder, QueryText, RelevanceConfig, Spellchecker,
    StopwordSpellchecker, SynonymRewriter, expand_query_text,
};
use crate::mapping::Mapping;
use crate::query::Query;
use crate::request::{RequestCompiler, ResolvedRequest, SearchRequest};

/// Execute a CLI command.
pub fn execute_command(args: HalberdArgs) -> Result<()> {
    match &args.command {
        Command::Compile(compile_args) => {
            let document = compile_request_file(compile_args)?;
            output_result("Compiled request", &document, &args)
        }
        Command::Resolve(resolve_args) => {
            let fragments = resolve_request_file(resolve_args)?;
            output_result("Resolved fragments", &fragments, &args)
        }
        Command::Fulltext(fulltext_args) => {
            let query = compile_fulltext(fulltext_args)?;
            output_result("Fulltext query", &query, &args)
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        HalberdError::config(format!("failed to read {}: {e}", path.display()))
    })
}

/// Load a request file and merge the parameters file over its parameters.
pub fn load_request(request_file: &Path, params_file: Option<&Path>) -> Result<SearchRequest> {
    let mut request = SearchRequest::from_json_str(&read_file(request_file)?)?;
    if let Some(params_file) = params_file {
        let overrides: Map<String, Value> = serde_json::from_str(&read_file(params_file)?)?;
        debug!("merging {} parameters from {}", overrides.len(), params_file.display());
        for (name, value) in overrides {
            request.parameters.set(name, value);
        }
    }
    Ok(request)
}

/// Load the container the fulltext options describe.
pub fn load_container(options: &FulltextOptions) -> Result<ContainerConfiguration> {
    let mapping_file = options
        .mapping
        .as_deref()
        .ok_or_else(|| HalberdError::config("a mapping file is required for fulltext queries"))?;
    let mapping = Mapping::from_json_str(&read_file(mapping_file)?)?;
    let relevance = match &options.relevance {
        Some(path) => RelevanceConfig::from_json_str(&read_file(path)?)?,
        None => RelevanceConfig::default(),
    };
    Ok(ContainerConfiguration::new(
        options.container.clone(),
        Arc::new(mapping),
        relevance,
    ))
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    match path {
        Some(path) => CompilerConfig::from_json_str(&read_file(path)?),
        None => Ok(CompilerConfig::default()),
    }
}

fn load_synonyms(path: &Path) -> Result<SynonymRewriter> {
    let groups: Vec<Vec<String>> = serde_json::from_str(&read_file(path)?)?;
    Ok(groups
        .into_iter()
        .fold(SynonymRewriter::new(), |rewriter, group| rewriter.synonym_group(group)))
}

/// Assemble the fulltext query for `text`.
pub fn build_fulltext_query(options: &FulltextOptions, text: &str) -> Result<Query> {
    let container = load_container(options)?;
    let config = load_config(options.config.as_deref())?;

    let query_text = match &options.synonyms {
        Some(path) => expand_query_text(&load_synonyms(path)?, text),
        None => QueryText::from(text),
    };
    let spelling_type = options
        .spelling
        .unwrap_or_else(|| StopwordSpellchecker::new().spelling_type(text));
    info!("assembling fulltext query for {text:?} as {spelling_type}");

    FulltextQueryBuilder::new(config).create(&container, &query_text, spelling_type, options.boost)
}

/// Compile the request file, injecting the fulltext query when text is given.
pub fn compile_request_file(args: &CompileArgs) -> Result<Value> {
    let mut request = load_request(&args.request_file, args.params.as_deref())?;
    if let Some(text) = &args.text {
        request = request.with_query(build_fulltext_query(&args.fulltext, text)?);
    }
    RequestCompiler::new().compile_request(&request)
}

/// Bind and dereference the request file.
pub fn resolve_request_file(args: &ResolveArgs) -> Result<Value> {
    let request = load_request(&args.request_file, args.params.as_deref())?;
    let resolved = ResolvedRequest::resolve(&request.fragments, &request.parameters);
    Ok(serde_json::to_value(resolved.fragments().clone().into_store())?)
}

/// Assemble and compile the fulltext query.
pub fn compile_fulltext(args: &FulltextArgs) -> Result<Value> {
    let query = build_fulltext_query(&args.options(), &args.text)?;
    QueryCompiler::new().compile(&query)
}
