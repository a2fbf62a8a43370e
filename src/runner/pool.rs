use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::browser::driver::DriverFactory;
use crate::cli::config::AppContext;
use crate::error::FillerError;
use crate::runner::filler::fill_form;
use crate::runner::task::{FormResult, FormStatus, FormTask};

/// Receives each result as soon as its task finishes.
pub trait ResultSink: Send {
    fn record(&mut self, result: &FormResult) -> Result<(), FillerError>;
}

impl ResultSink for Vec<FormResult> {
    fn record(&mut self, result: &FormResult) -> Result<(), FillerError> {
        self.push(result.clone());
        Ok(())
    }
}

/// Open a driver, fill one form, always close the driver.
pub async fn run_task(ctx: &AppContext, factory: &dyn DriverFactory, task: &FormTask) -> FormResult {
    let mut driver = match factory.open().await {
        Ok(driver) => driver,
        Err(e) => {
            warn!(url = %task.form_url, error = %e, "browser context could not be opened");
            let status = if e.is_timeout() {
                FormStatus::Timeout
            } else {
                FormStatus::Error
            };
            return FormResult::new(task, status, e.to_string(), Vec::new());
        }
    };
    let result = fill_form(ctx, driver.as_mut(), task).await;
    if let Err(e) = driver.close().await {
        warn!(error = %e, "browser context did not close cleanly");
    }
    result
}

/// Process `tasks` with at most `ctx.settings.concurrency` in flight.
///
/// Each task gets its own browser context. Once `cancel` turns true no new
/// task starts; tasks already running finish normally and the rest are
/// recorded as cancelled. Returns one result per task, in task order.
pub async fn run_pool(
    tasks: Vec<FormTask>,
    ctx: Arc<AppContext>,
    factory: Arc<dyn DriverFactory>,
    mut cancel: watch::Receiver<bool>,
    sink: &mut dyn ResultSink,
) -> Vec<FormResult> {
    let concurrency = ctx.settings.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut pending: BTreeMap<usize, FormTask> = BTreeMap::new();
    let mut results: BTreeMap<usize, FormResult> = BTreeMap::new();
    let mut running = JoinSet::new();

    info!(tasks = tasks.len(), concurrency, "run started");

    let mut watching = true;
    let mut queue = tasks.into_iter();
    for task in queue.by_ref() {
        if *cancel.borrow() {
            record(sink, &mut results, FormResult::cancelled(&task));
            break;
        }

        let permit = loop {
            tokio::select! {
                permit = semaphore.clone().acquire_owned() => break permit.ok(),
                changed = cancel.changed(), if watching => match changed {
                    // Sender gone: nobody can cancel any more.
                    Err(_) => watching = false,
                    Ok(()) if *cancel.borrow() => break None,
                    Ok(()) => {}
                },
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    collect(joined, &mut pending, &mut results, sink);
                }
            }
        };
        let Some(permit) = permit else {
            record(sink, &mut results, FormResult::cancelled(&task));
            break;
        };

        pending.insert(task.index, task.clone());
        let ctx = ctx.clone();
        let factory = factory.clone();
        running.spawn(async move {
            let _permit = permit;
            let result = run_task(&ctx, factory.as_ref(), &task).await;
            (task.index, result)
        });
    }

    for task in queue {
        record(sink, &mut results, FormResult::cancelled(&task));
    }

    while let Some(joined) = running.join_next().await {
        collect(joined, &mut pending, &mut results, sink);
    }

    // A panicked task still owes a result.
    for (_, task) in std::mem::take(&mut pending) {
        record(
            sink,
            &mut results,
            FormResult::new(&task, FormStatus::Error, "task aborted", Vec::new()),
        );
    }

    info!(results = results.len(), "run finished");
    results.into_values().collect()
}

fn collect(
    joined: Result<(usize, FormResult), tokio::task::JoinError>,
    pending: &mut BTreeMap<usize, FormTask>,
    results: &mut BTreeMap<usize, FormResult>,
    sink: &mut dyn ResultSink,
) {
    match joined {
        Ok((index, result)) => {
            pending.remove(&index);
            record(sink, results, result);
        }
        Err(e) => warn!(error = %e, "form task panicked"),
    }
}

fn record(sink: &mut dyn ResultSink, results: &mut BTreeMap<usize, FormResult>, result: FormResult) {
    if let Err(e) = sink.record(&result) {
        warn!(url = %result.form_url, error = %e, "result could not be persisted");
    }
    results.insert(result.index, result);
}
