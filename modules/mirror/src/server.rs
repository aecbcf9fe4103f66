use crate::Mirror;
use apollo_common::config::Intervals;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinSet, time::MissedTickBehavior};

/// Run the four workers on their configured intervals until the process is
/// stopped. Every worker ticks once immediately on startup.
pub async fn run(mirror: Mirror, intervals: Intervals) -> anyhow::Result<()> {
    let mirror = Arc::new(mirror);
    let mut tasks = JoinSet::new();

    {
        let mirror = mirror.clone();
        let period = Duration::from_secs(intervals.poll_secs);
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                log::debug!("polling upstream for new CVEs");
                mirror.poll_upstream_cves().await;
            }
        });
    }

    {
        let mirror = mirror.clone();
        let period = Duration::from_secs(intervals.scan_secs);
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                log::debug!("scanning upstream errata");
                mirror.scan_upstream_errata().await;
            }
        });
    }

    {
        let mirror = mirror.clone();
        let period = Duration::from_secs(intervals.refresh_secs);
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                log::debug!("refreshing cve state");
                mirror.refresh_cve_state().await;
            }
        });
    }

    {
        let mirror = mirror.clone();
        let period = Duration::from_secs(intervals.match_secs);
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                log::debug!("matching downstream builds");
                mirror.match_downstream_builds().await;
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result?;
    }

    Ok(())
}
