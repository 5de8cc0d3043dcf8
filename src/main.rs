use anyhow::Context;
use clap::Parser;

use bulkpost::adapters::gate::PromptGate;
use bulkpost::adapters::http::HttpSubmitter;
use bulkpost::adapters::store::{read_failed_artifact, ArtifactStore};
use bulkpost::core::outcome::failed_indexes;
use bulkpost::utils::logger;
use bulkpost::{
    plan_full, plan_retry, ApiConfig, BatchResult, BatchSubmitter, CliArgs, ResultLog, Schema,
    SubmitOptions, Validator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logger::init_cli_logger(args.verbose);

    let code = run(args).await?;
    std::process::exit(code);
}

async fn run(args: CliArgs) -> anyhow::Result<i32> {
    tracing::info!(rules = %args.rules.display(), "loading validation rules");
    let schema = Schema::load(&args.rules).context("loading validation rules")?;
    tracing::info!(fields = schema.len(), "rules loaded");

    tracing::info!(input = %args.input.display(), "reading CSV");
    let records = bulkpost::ingest::read_csv(&args.input).context("reading input CSV")?;
    tracing::info!(rows = records.len(), "CSV loaded");

    let validator = Validator::new(&schema);
    let report = validator.validate(&records);
    println!("{}", report.render());
    if !report.is_valid() {
        tracing::error!(
            errors = report.errors.len(),
            "validation failed, conversion aborted"
        );
        return Ok(1);
    }

    let structured = bulkpost::transform_all(&records, &schema).context("converting records")?;
    let store = ArtifactStore::new(&args.output);
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("records");
    let validated_path = store
        .write_validated(stem, &structured)
        .context("writing validated records")?;
    tracing::info!(
        path = %validated_path.display(),
        records = structured.len(),
        "validated records written"
    );

    if !args.send_api {
        tracing::info!("run again with --send-api to submit the records");
        return Ok(0);
    }

    let api = ApiConfig::from_env(args.env_file.as_deref()).context("loading API configuration")?;
    let working_set = if let Some(indexes) = &args.retry_indexes {
        tracing::info!(count = indexes.len(), "retry mode: explicit indexes");
        plan_retry(&structured, indexes)
    } else if let Some(path) = &args.retry_failed {
        let failed = read_failed_artifact(path).context("reading failed-outcome artifact")?;
        let indexes = failed_indexes(&failed);
        tracing::info!(
            count = indexes.len(),
            path = %path.display(),
            "retry mode: failed artifact"
        );
        plan_retry(&structured, &indexes)
    } else {
        plan_full(&structured)
    };

    let transport = HttpSubmitter::new(&api).context("building HTTP client")?;
    let submitter = BatchSubmitter::new(
        transport,
        PromptGate,
        SubmitOptions {
            workers: api.workers,
            delay: api.rate_limit,
        },
    );
    let result = submitter.send_batch(working_set).await;
    print_batch_summary(&result);

    let log = ResultLog::from_result(&result);
    let (success_path, failed_path) = store
        .write_outcomes(&log)
        .context("writing outcome artifacts")?;
    if let Some(path) = &success_path {
        tracing::info!(path = %path.display(), "successful outcomes written");
    }
    if let Some(path) = &failed_path {
        tracing::info!(path = %path.display(), "failed outcomes written");
        println!(
            "To retry the failed records: bulkpost {} --send-api --retry-failed {}",
            args.input.display(),
            path.display()
        );
    }

    Ok(if log.is_clean() { 0 } else { 1 })
}

fn print_batch_summary(result: &BatchResult) {
    use bulkpost::domain::model::BatchDisposition;

    let bar = "=".repeat(80);
    println!("{bar}");
    match (result.disposition, result.summary.failed) {
        (BatchDisposition::Aborted, _) => println!("❌ BATCH CANCELLED AT TEST GATE"),
        (BatchDisposition::Completed, 0) => println!("✅ BATCH COMPLETE - ALL SUCCESSFUL"),
        (BatchDisposition::Completed, _) => println!("⚠️  BATCH COMPLETE - SOME FAILURES"),
    }
    println!("{bar}");
    println!("Total records: {}", result.summary.total);
    println!(
        "Successful:    {} ({:.1}%)",
        result.summary.successful,
        result.summary.success_rate()
    );
    println!(
        "Failed:        {} ({:.1}%)",
        result.summary.failed,
        result.summary.failure_rate()
    );
    println!(
        "Duration:      {:.2}s ({:.1} requests/min)",
        result.duration.as_secs_f64(),
        result.requests_per_minute()
    );
    println!("{bar}");
}
