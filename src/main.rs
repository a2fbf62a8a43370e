use anyhow::Context;
use clap::Parser;
use form_filler::cli::commands::{RunOptions, cmd_map, cmd_run};
use form_filler::cli::config::{Cli, Commands, init_logging, load_config};
use form_filler::runner::task::FormStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    let mut config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Run {
            csv,
            data,
            output,
            concurrency,
            timeout,
            captcha_api,
            dry_run,
            show_browser,
            limit,
            emit_json,
            driver_script,
        } => {
            // CLI > config > defaults
            if let Some(n) = concurrency {
                config.run.concurrency = n;
            }
            if let Some(secs) = timeout {
                config.run.timeout_secs = secs;
            }
            if let Some(provider) = captcha_api {
                config.run.captcha = provider;
            }
            config.run.dry_run |= dry_run;

            let options = RunOptions {
                csv,
                data,
                output,
                limit,
                emit_json,
                driver_script,
                show_browser,
            };
            let results = cmd_run(&options, &config)
                .await
                .with_context(|| format!("run over {} failed", options.csv.display()))?;
            let all_failed = !results.is_empty()
                && results
                    .iter()
                    .all(|r| matches!(r.status, FormStatus::Error | FormStatus::Timeout));
            if all_failed {
                std::process::exit(1);
            }
        }
        Commands::Map { html, url, data, scope } => {
            cmd_map(html.as_deref(), url.as_deref(), &data, scope.as_deref(), &config)
                .await
                .context("map failed")?;
        }
    }

    Ok(())
}
