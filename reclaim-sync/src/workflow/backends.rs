//! Back-end fetches shared by reconciliation runs and recalculation jobs

use crate::models::{DiskSpaceRecord, FolderSpace, RootFolderRecord};
use crate::scoring::folder_space;
use crate::services::{ArrError, Sources};
use futures::future::join_all;
use reclaim_common::events::EventBus;

/// Folder space from every enabled back-end, deduplicated by path
///
/// Failed requests are logged and reported under `component`; an instance that
/// fails both contributes nothing.
pub async fn collect_folder_space(
    sources: &Sources,
    events: &EventBus,
    component: &str,
) -> Vec<FolderSpace> {
    let series = sources.series_backends.iter().map(|backend| async move {
        let (roots, disks) = futures::join!(backend.root_folders(), backend.disk_space());
        instance_space(
            backend.name(),
            roots,
            disks,
            backend.selected_folders(),
            events,
            component,
        )
    });
    let movies = sources.movie_backends.iter().map(|backend| async move {
        let (roots, disks) = futures::join!(backend.root_folders(), backend.disk_space());
        instance_space(
            backend.name(),
            roots,
            disks,
            backend.selected_folders(),
            events,
            component,
        )
    });

    let (series, movies) = futures::join!(join_all(series), join_all(movies));
    folder_space::dedupe_by_path(series.into_iter().chain(movies).flatten().collect())
}

fn instance_space(
    instance: &str,
    roots: Result<Vec<RootFolderRecord>, ArrError>,
    disks: Result<Vec<DiskSpaceRecord>, ArrError>,
    selected: &[String],
    events: &EventBus,
    component: &str,
) -> Vec<FolderSpace> {
    let roots = roots.unwrap_or_else(|e| {
        warn_backend(events, component, instance, "root folders", &e.to_string());
        Vec::new()
    });
    let disks = disks.unwrap_or_else(|e| {
        warn_backend(events, component, instance, "disk space", &e.to_string());
        Vec::new()
    });
    folder_space::instance_folders(&roots, &disks, selected)
}

/// Log a failed back-end request and surface it as a warning event
pub fn warn_backend(events: &EventBus, component: &str, instance: &str, what: &str, error: &str) {
    tracing::warn!(instance = %instance, error = %error, "Failed to fetch {}", what);
    events.warning(
        component,
        format!("{}: failed to fetch {}: {}", instance, what, error),
    );
}
