//! Command line argument parsing for the Halberd CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::fulltext::SpellingType;

/// Halberd - compiles declarative search requests into backend query DSL
#[derive(Parser, Debug, Clone)]
#[command(name = "halberd")]
#[command(about = "Compiles declarative search requests into backend query DSL")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HalberdArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "json", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HalberdArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compile a search request into a wire document
    Compile(CompileArgs),

    /// Bind and dereference a request, printing the resolved fragments
    Resolve(ResolveArgs),

    /// Assemble and compile a fulltext query
    Fulltext(FulltextArgs),
}

/// Where fulltext queries search and how they score.
#[derive(Args, Debug, Clone, Default)]
pub struct FulltextOptions {
    /// Field mapping file (JSON)
    #[arg(long, value_name = "MAPPING_FILE")]
    pub mapping: Option<PathBuf>,

    /// Relevance configuration file (JSON)
    #[arg(long, value_name = "RELEVANCE_FILE")]
    pub relevance: Option<PathBuf>,

    /// Compiler configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Synonym groups file (JSON list of word lists)
    #[arg(long, value_name = "SYNONYMS_FILE")]
    pub synonyms: Option<PathBuf>,

    /// Spelling classification; detected from stop words when omitted
    #[arg(long)]
    pub spelling: Option<SpellingType>,

    /// Boost of the assembled query
    #[arg(long, default_value = "1.0")]
    pub boost: f64,

    /// Search container name
    #[arg(long, default_value = "default")]
    pub container: String,
}

/// Arguments for compiling a request
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Request file: fragments, parameters and paging (JSON)
    #[arg(value_name = "REQUEST_FILE")]
    pub request_file: PathBuf,

    /// Parameters file (JSON object), merged over the request's parameters
    #[arg(long, value_name = "PARAMS_FILE")]
    pub params: Option<PathBuf>,

    /// Fulltext query injected into the root query (requires --mapping)
    #[arg(long, requires = "mapping")]
    pub text: Option<String>,

    #[command(flatten)]
    pub fulltext: FulltextOptions,
}

/// Arguments for resolving a request
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Request file (JSON)
    #[arg(value_name = "REQUEST_FILE")]
    pub request_file: PathBuf,

    /// Parameters file (JSON object), merged over the request's parameters
    #[arg(long, value_name = "PARAMS_FILE")]
    pub params: Option<PathBuf>,
}

/// Arguments for assembling a fulltext query
#[derive(Args, Debug, Clone)]
pub struct FulltextArgs {
    /// Field mapping file (JSON)
    #[arg(value_name = "MAPPING_FILE")]
    pub mapping_file: PathBuf,

    /// Query text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Relevance configuration file (JSON)
    #[arg(long, value_name = "RELEVANCE_FILE")]
    pub relevance: Option<PathBuf>,

    /// Compiler configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Synonym groups file (JSON list of word lists)
    #[arg(long, value_name = "SYNONYMS_FILE")]
    pub synonyms: Option<PathBuf>,

    /// Spelling classification; detected from stop words when omitted
    #[arg(long)]
    pub spelling: Option<SpellingType>,

    /// Boost of the assembled query
    #[arg(long, default_value = "1.0")]
    pub boost: f64,

    /// Search container name
    #[arg(long, default_value = "default")]
    pub container: String,
}

impl FulltextArgs {
    /// The same settings as [`FulltextOptions`].
    pub fn options(&self) -> FulltextOptions {
        FulltextOptions {
            mapping: Some(self.mapping_file.clone()),
            relevance: self.relevance.clone(),
            config: self.config.clone(),
            synonyms: self.synonyms.clone(),
            spelling: self.spelling,
            boost: self.boost,
            container: self.container.clone(),
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable key: value output
    Human,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_compile_command() {
        let args = HalberdArgs::try_parse_from([
            "halberd",
            "compile",
            "request.json",
            "--params",
            "params.json",
            "--pretty",
        ])
        .unwrap();

        assert!(args.pretty);
        if let Command::Compile(compile_args) = args.command {
            assert_eq!(compile_args.request_file, PathBuf::from("request.json"));
            assert_eq!(compile_args.params, Some(PathBuf::from("params.json")));
            assert!(compile_args.text.is_none());
        } else {
            panic!("Expected Compile command");
        }
    }

    #[test]
    fn test_compile_text_requires_mapping() {
        let result =
            HalberdArgs::try_parse_from(["halberd", "compile", "request.json", "--text", "shoes"]);
        assert!(result.is_err());

        let args = HalberdArgs::try_parse_from([
            "halberd",
            "compile",
            "request.json",
            "--text",
            "shoes",
            "--mapping",
            "mapping.json",
        ])
        .unwrap();
        let Command::Compile(compile_args) = args.command else {
            panic!("Expected Compile command");
        };
        assert_eq!(compile_args.text.as_deref(), Some("shoes"));
        assert_eq!(compile_args.fulltext.boost, 1.0);
    }

    #[test]
    fn test_fulltext_command() {
        let args = HalberdArgs::try_parse_from([
            "halberd",
            "fulltext",
            "mapping.json",
            "red shoes",
            "--spelling",
            "most_fuzzy",
            "--boost",
            "2.5",
        ])
        .unwrap();

        if let Command::Fulltext(fulltext_args) = args.command {
            assert_eq!(fulltext_args.mapping_file, PathBuf::from("mapping.json"));
            assert_eq!(fulltext_args.text, "red shoes");
            assert_eq!(fulltext_args.spelling, Some(SpellingType::MostFuzzy));
            assert_eq!(fulltext_args.boost, 2.5);
            assert_eq!(fulltext_args.container, "default");
        } else {
            panic!("Expected Fulltext command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = HalberdArgs::try_parse_from(["halberd", "resolve", "r.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = HalberdArgs::try_parse_from(["halberd", "-vv", "resolve", "r.json"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = HalberdArgs::try_parse_from(["halberd", "--quiet", "resolve", "r.json"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            HalberdArgs::try_parse_from(["halberd", "--format", "yaml", "resolve", "r.json"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Yaml);
    }
}
