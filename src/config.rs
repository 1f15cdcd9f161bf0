//! Configuration handling for the SQL assistant.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::error::{AssistantError, AssistantResult};
use crate::format::OutputFormat;
use crate::models::ConnectionParams;
use crate::models::connection::{
    DEFAULT_PG_DATABASE, DEFAULT_PG_HOST, DEFAULT_PG_PORT, DEFAULT_PG_USER,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
/// Placeholder accepted by local OpenAI-compatible servers such as Ollama.
pub const DEFAULT_API_KEY: &str = "ollama";
pub const DEFAULT_OLLAMA_HOST: &str = crate::llm::ollama::DEFAULT_OLLAMA_HOST;
pub const DEFAULT_DIALECT: &str = "PostgreSQL";
pub const DEFAULT_N_RESULTS: usize = 10;
pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 14000;
pub const DEFAULT_STORE_PATH: &str = "sql-assistant.db";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8084;

/// Chat backend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API
    #[default]
    Openai,
    /// Native Ollama generation API
    Ollama,
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Openai => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Settings of the assistant itself: model, backend, retrieval and store.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub model: String,
    pub temperature: f32,
    pub backend: LlmBackend,
    pub base_url: String,
    /// Contains sensitive data - never log
    pub api_key: String,
    pub ollama_host: String,
    /// When unset, the local hashing embedder is used.
    pub embedding_model: Option<String>,
    pub dialect: String,
    pub n_results: usize,
    pub max_prompt_tokens: usize,
    /// File path of the training store, or `:memory:`.
    pub store_path: String,
}

impl AssistantConfig {
    /// Fails only when no model identifier is present.
    pub fn validate(&self) -> AssistantResult<()> {
        if self.model.trim().is_empty() {
            return Err(AssistantError::config(
                "a model identifier is required (e.g. --model llama3)",
            ));
        }
        Ok(())
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            backend: LlmBackend::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            embedding_model: None,
            dialect: DEFAULT_DIALECT.to_string(),
            n_results: DEFAULT_N_RESULTS,
            max_prompt_tokens: DEFAULT_MAX_PROMPT_TOKENS,
            store_path: DEFAULT_STORE_PATH.to_string(),
        }
    }
}

/// Training inputs accepted by the `train` subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct TrainArgs {
    /// Extract the public schema from the database and train on it
    #[arg(long)]
    pub schema: bool,

    /// DDL text describing table structure
    #[arg(long)]
    pub ddl: Option<String>,

    /// Example question (requires --sql)
    #[arg(long, requires = "sql")]
    pub question: Option<String>,

    /// Example SQL; without --question the question is inferred by the model
    #[arg(long)]
    pub sql: Option<String>,

    /// Free-text documentation
    #[arg(long)]
    pub documentation: Option<String>,

    /// JSON file holding an array of {question, sql, ddl, documentation} objects
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl TrainArgs {
    pub fn is_empty(&self) -> bool {
        !self.schema
            && self.ddl.is_none()
            && self.question.is_none()
            && self.sql.is_none()
            && self.documentation.is_none()
            && self.file.is_none()
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the public schema as "<table>: <column> (<type>)" lines
    Schema,
    /// Add training data to the store
    Train(TrainArgs),
    /// List stored training data
    TrainingData,
    /// Remove a training entry by id
    RemoveTraining {
        /// Entry id as shown by training-data
        id: String,
    },
    /// Generate SQL for a question without running it
    GenerateSql {
        question: String,
    },
    /// Generate SQL for a question, run it and print the rows
    Ask {
        question: String,
        /// Only print the generated SQL
        #[arg(long)]
        no_run: bool,
        /// Start the web application afterwards
        #[arg(long)]
        serve: bool,
    },
    /// Run SQL verbatim and print the rows
    RunSql {
        sql: String,
    },
    /// Start the web application
    Serve,
}

/// Configuration for the SQL assistant.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-assistant",
    about = "Natural-language-to-SQL assistant for PostgreSQL",
    version,
    author
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// PostgreSQL URL; overrides the --db-* options
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// PostgreSQL host
    #[arg(long, default_value = DEFAULT_PG_HOST, env = "PGHOST")]
    pub db_host: String,

    /// PostgreSQL port
    #[arg(long, default_value_t = DEFAULT_PG_PORT, env = "PGPORT")]
    pub db_port: u16,

    /// PostgreSQL database name
    #[arg(long, default_value = DEFAULT_PG_DATABASE, env = "PGDATABASE")]
    pub db_name: String,

    /// PostgreSQL user
    #[arg(long, default_value = DEFAULT_PG_USER, env = "PGUSER")]
    pub db_user: String,

    /// PostgreSQL password
    #[arg(long, default_value = "", env = "PGPASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// Chat backend protocol
    #[arg(long, value_enum, default_value = "openai", env = "ASSISTANT_BACKEND")]
    pub backend: LlmBackend,

    /// Model identifier
    #[arg(short, long, default_value = DEFAULT_MODEL, env = "ASSISTANT_MODEL")]
    pub model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, env = "ASSISTANT_TEMPERATURE")]
    pub temperature: f32,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "OPENAI_BASE_URL")]
    pub base_url: String,

    /// API key for the OpenAI-compatible API
    #[arg(
        long,
        default_value = DEFAULT_API_KEY,
        env = "OPENAI_API_KEY",
        hide_env_values = true
    )]
    pub api_key: String,

    /// Ollama server for the native backend
    #[arg(long, default_value = DEFAULT_OLLAMA_HOST, env = "OLLAMA_HOST")]
    pub ollama_host: String,

    /// Embedding model served by the OpenAI-compatible API (default: local hashing)
    #[arg(long, env = "ASSISTANT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// SQL dialect named in prompts
    #[arg(long, default_value = DEFAULT_DIALECT)]
    pub dialect: String,

    /// Training store file (":memory:" for a throwaway store)
    #[arg(long, default_value = DEFAULT_STORE_PATH, env = "ASSISTANT_STORE")]
    pub store: String,

    /// Similar entries retrieved per kind
    #[arg(long, default_value_t = DEFAULT_N_RESULTS)]
    pub n_results: usize,

    /// Prompt budget in estimated tokens
    #[arg(long, default_value_t = DEFAULT_MAX_PROMPT_TOKENS)]
    pub max_prompt_tokens: usize,

    /// Row output format
    #[arg(short, long, value_enum, default_value = "tuples")]
    pub format: OutputFormat,

    /// Web application host
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "ASSISTANT_HTTP_HOST")]
    pub http_host: String,

    /// Web application port
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "ASSISTANT_HTTP_PORT")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "ASSISTANT_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "ASSISTANT_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Connection parameters: the URL when given, otherwise the --db-* options.
    pub fn connection_params(&self) -> AssistantResult<ConnectionParams> {
        match &self.database_url {
            Some(url) => ConnectionParams::from_url(url)
                .map_err(|e| AssistantError::config(format!("--database-url: {}", e))),
            None => Ok(ConnectionParams::new(
                &self.db_host,
                &self.db_name,
                &self.db_user,
                &self.db_password,
                self.db_port,
            )),
        }
    }

    pub fn assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            backend: self.backend,
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            ollama_host: self.ollama_host.clone(),
            embedding_model: self
                .embedding_model
                .clone()
                .filter(|m| !m.trim().is_empty()),
            dialect: self.dialect.clone(),
            n_results: self.n_results,
            max_prompt_tokens: self.max_prompt_tokens,
            store_path: self.store.clone(),
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
