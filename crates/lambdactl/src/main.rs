use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use eyre::WrapErr;
use lambdactl_reconciler::schedule::{self, RunSummary};
use lambdactl_reconciler::{
    AwsLambdaApi, Disposition, FileStatusStore, ReconcilerConfig, ReferenceResolver, Registry, StatusStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod manifest;
mod references;

use references::StoreReferences;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var_os("LAMBDACTL_CONFIG").map(PathBuf::from));
    let config = ReconcilerConfig::load(config_path.as_deref()).wrap_err("failed to load config")?;
    tracing::info!(
        config = ?config_path,
        manifest_dir = %config.manifest_dir.display(),
        status_dir = %config.status_dir.display(),
        region = ?config.region,
        max_passes = config.max_passes,
        "starting reconcile run"
    );

    let store: Arc<dyn StatusStore> = Arc::new(FileStatusStore::new(&config.status_dir));
    let loaded = manifest::load(&config.manifest_dir, store.as_ref()).await?;
    if loaded.declared.is_empty() {
        tracing::warn!("no Lambda objects declared, nothing to do");
        return Ok(());
    }

    let api = Arc::new(AwsLambdaApi::from_env(config.region.as_deref()).await);
    let resolver = ReferenceResolver::new(Arc::new(StoreReferences::new(store.clone(), &loaded.others)));
    let registry = Registry::new(api, resolver, store, config.timing.clone());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after the current call");
                cancel.cancel();
            }
        }
    });

    let summary = schedule::run(&registry, loaded.declared, config.max_passes, &cancel)
        .await
        .wrap_err("reconcile run failed")?;
    report(&summary);

    if summary.settled.iter().any(|r| r.disposition == Disposition::Terminal) {
        eyre::bail!("one or more objects are in a terminal state");
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    for r in summary.settled.iter().chain(&summary.unsettled) {
        tracing::info!(
            kind = %r.kind,
            namespace = %r.namespace,
            name = %r.name,
            disposition = ?r.disposition,
            deleted = r.deleted,
            "object outcome"
        );
    }
    tracing::info!(
        passes = summary.passes,
        settled = summary.settled.len(),
        unsettled = summary.unsettled.len(),
        "reconcile run finished"
    );
}
