use clap::Parser;
use hopqa_translate::app::builder::build_pipeline;
use hopqa_translate::config::toml_config::{SinkConfig, SourceConfig};
use hopqa_translate::utils::error::ErrorSeverity;
use hopqa_translate::utils::{logger, validation::Validate};
use hopqa_translate::{CheckpointManager, CliConfig, EtlEngine, LocalStorage, TomlConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting hopqa-translate");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ Could not build pipeline: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let mut engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report) => {
            tracing::info!(
                "✅ Translated {} records ({} this run, resumed from {}), {} fields kept original text",
                report.total_records,
                report.translated_this_run,
                report.resumed_from,
                report.fallback_fields
            );
            println!("✅ Translation completed successfully!");
            println!("📁 Published to: {}", report.location);
            println!(
                "⏱️ Duration: {}s",
                (report.finished_at - report.started_at).num_seconds()
            );
        }
        Err(e) => {
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 依錯誤嚴重程度決定退出碼，失敗一律非零
            let exit_code = match e.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &CliConfig) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    println!("  Source: {}", config.source_dataset());
    println!(
        "  Translation: {} → {} ({})",
        config.translation.source_language,
        config.translation.target_language,
        config.translation.endpoint
    );
    println!(
        "  Retries: {} (delay {}ms, rate limit {}ms)",
        config.retry.max_retries, config.retry.retry_delay_ms, config.retry.rate_limit_delay_ms
    );
    println!(
        "  Checkpoints: every {} records in {}",
        config.checkpoint.interval, config.checkpoint.dir
    );
    println!("  Target: {}", config.sink.repo_name());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Data Source Analysis:");
    match &config.source {
        SourceConfig::Hub {
            repo_id, filename, ..
        } => {
            println!("  Hub dataset: {}", repo_id);
            println!("  File: {}", filename);
            println!(
                "  Token: {}",
                if config.token().is_some() { "configured" } else { "none" }
            );
        }
        SourceConfig::File { path } => println!("  Local file: {}", path),
    }

    // 斷點分析
    println!();
    println!("💾 Checkpoint Analysis:");
    let checkpoints = CheckpointManager::new(LocalStorage::new("."), config.checkpoint.dir.as_str());
    match checkpoints.load().await? {
        Some(checkpoint) => println!(
            "  Latest readable checkpoint: record {} (run will resume there)",
            checkpoint.index()
        ),
        None => println!("  No readable checkpoints found (run will start from record 0)"),
    }

    println!();
    println!("📦 Output Configuration:");
    match &config.sink {
        SinkConfig::Hub {
            repo_name, private, ..
        } => {
            println!("  Hub repository: {}", repo_name);
            println!("  Visibility: {}", if *private { "private" } else { "public" });
        }
        SinkConfig::Local {
            output_path,
            repo_name,
            ..
        } => println!("  Local directory: {}/{}", output_path, repo_name),
    }

    println!();
    println!("✅ Dry run completed - configuration is valid");
    Ok(())
}
