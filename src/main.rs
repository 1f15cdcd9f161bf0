//! SQL Assistant - Main entry point.
//!
//! Command-line front end and web application host for the natural-language
//! to SQL assistant.

use sql_assistant::assistant::{Assistant, is_sql_valid};
use sql_assistant::config::{Command, Config, TrainArgs};
use sql_assistant::error::{AssistantError, AssistantResult};
use sql_assistant::format::{format_result, format_training_data};
use sql_assistant::models::TrainRequest;
use sql_assistant::web::WebServer;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries SQL and rows only.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    init_tracing(&config);

    info!("Starting SQL Assistant v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AssistantResult<()> {
    let params = config.connection_params()?;
    let assistant = Assistant::from_config(config.assistant_config())
        .await?
        .with_connection(params);

    match &config.command {
        Command::Schema => println!("{}", assistant.schema().await?),
        Command::Train(args) => train(&assistant, args).await?,
        Command::TrainingData => {
            let entries = assistant.training_data().await?;
            println!("{}", format_training_data(&entries));
        }
        Command::RemoveTraining { id } => {
            if assistant.remove_training_data(id).await? {
                println!("Removed {}", id);
            } else {
                println!("No training entry with id {}", id);
            }
        }
        Command::GenerateSql { question } => {
            let sql = assistant.generate_sql(question).await?;
            if !is_sql_valid(&sql) {
                warn!("Generated text is not a read-only query");
            }
            println!("{}", sql);
        }
        Command::Ask {
            question,
            no_run,
            serve: then_serve,
        } => {
            let outcome = assistant.ask(question, !no_run).await?;
            println!("Generated SQL:\n{}", outcome.sql);
            if let Some(result) = &outcome.result {
                println!("{}", format_result(result, config.format));
            }
            if let Some(message) = &outcome.error {
                println!("Error running SQL: {}", message);
            }
            if *then_serve {
                serve(assistant, &config).await?;
                return Ok(());
            }
        }
        Command::RunSql { sql } => match assistant.run_sql(sql).await {
            Ok(result) => println!("{}", format_result(&result, config.format)),
            Err(e) => println!("Error running SQL: {}", e),
        },
        Command::Serve => {
            serve(assistant, &config).await?;
            return Ok(());
        }
    }

    assistant.store().close().await;
    Ok(())
}

async fn serve(assistant: Assistant, config: &Config) -> AssistantResult<()> {
    let server = WebServer::new(Arc::new(assistant), &config.http_host, config.http_port);
    server.run().await
}

async fn train(assistant: &Assistant, args: &TrainArgs) -> AssistantResult<()> {
    if args.is_empty() {
        return Err(AssistantError::invalid_input(
            "Nothing to train on: pass --schema, --ddl, --sql, --documentation or --file",
        ));
    }

    if args.schema {
        let id = assistant.train_schema().await?;
        println!("Trained schema: {}", id);
    }

    if let Some(path) = &args.file {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AssistantError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let requests: Vec<TrainRequest> = serde_json::from_str(&text).map_err(|e| {
            AssistantError::invalid_input(format!("Invalid training file {}: {}", path.display(), e))
        })?;
        info!(count = requests.len(), path = %path.display(), "Training from file");
        for request in requests {
            train_request(assistant, request).await?;
        }
    }

    let inline = TrainRequest {
        question: args.question.clone(),
        sql: args.sql.clone(),
        ddl: args.ddl.clone(),
        documentation: args.documentation.clone(),
    };
    if inline != TrainRequest::default() {
        train_request(assistant, inline).await?;
    }

    Ok(())
}

/// Train every record a request resolves to.
async fn train_request(assistant: &Assistant, request: TrainRequest) -> AssistantResult<()> {
    let records = request
        .into_records()
        .map_err(AssistantError::invalid_input)?;
    for record in records {
        let id = assistant.train(record).await?;
        println!("Trained: {}", id);
    }
    Ok(())
}
