//! Map an item's parent folder to the remaining space of its root folder

use crate::models::backend::BYTES_PER_GB;
use crate::models::{DiskSpaceRecord, FolderSpace, RootFolderRecord};
use std::collections::HashSet;

/// Folder space reported by one back-end instance
///
/// Root folders are preferred: free space comes from the folder itself and
/// total space from the folder when reported, otherwise from the disk whose
/// path equals or contains it. An instance with no root folders falls back to
/// its disk-space records. A non-empty `selected` keeps only those paths.
pub fn instance_folders(
    roots: &[RootFolderRecord],
    disks: &[DiskSpaceRecord],
    selected: &[String],
) -> Vec<FolderSpace> {
    let spaces: Vec<FolderSpace> = if roots.is_empty() {
        disks.iter().filter_map(FolderSpace::from_record).collect()
    } else {
        roots
            .iter()
            .filter_map(|root| root_folder_space(root, disks))
            .collect()
    };

    if selected.is_empty() {
        return spaces;
    }
    spaces
        .into_iter()
        .filter(|space| {
            let path = trim_separators(&space.path);
            selected
                .iter()
                .any(|wanted| trim_separators(wanted.trim()) == path)
        })
        .collect()
}

fn root_folder_space(root: &RootFolderRecord, disks: &[DiskSpaceRecord]) -> Option<FolderSpace> {
    let path = root.path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
    let folder = trim_separators(path);

    let disk = disks
        .iter()
        .filter_map(|disk| {
            let disk_path = trim_separators(disk.path.as_deref()?.trim());
            (!disk_path.is_empty() && folder.starts_with(disk_path)).then_some((disk_path.len(), disk))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, disk)| disk);

    let total = root
        .total_space
        .filter(|total| *total > 0)
        .or_else(|| disk.and_then(|d| d.total_space))
        .unwrap_or(0);

    Some(FolderSpace {
        path: path.to_string(),
        label: disk.and_then(|d| d.label.clone()).unwrap_or_default(),
        total_space_gb: total as f64 / BYTES_PER_GB,
        free_space_gb: root.free_space.unwrap_or(0) as f64 / BYTES_PER_GB,
    })
}

/// Drop repeated paths (several instances often report the same mounts)
pub fn dedupe_by_path(spaces: Vec<FolderSpace>) -> Vec<FolderSpace> {
    let mut seen = HashSet::new();
    spaces
        .into_iter()
        .filter(|space| seen.insert(space.path.clone()))
        .collect()
}

fn trim_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        &path[..path.len().min(1)]
    } else {
        trimmed
    }
}

/// Remaining percent (2 decimals) of the folder containing `parent_folder`
///
/// A folder matches when the parent starts with its path or the other way round;
/// among matches the longest path wins. None when nothing matches or the
/// matching folder reports zero total space.
pub fn remaining_percent(parent_folder: &str, spaces: &[FolderSpace]) -> Option<f64> {
    let parent = trim_separators(parent_folder.trim());
    if parent.is_empty() {
        return None;
    }

    let space = spaces
        .iter()
        .filter(|space| {
            let path = trim_separators(space.path.trim());
            !path.is_empty() && (parent.starts_with(path) || path.starts_with(parent))
        })
        .max_by_key(|space| space.path.len())?;

    if !space.total_space_gb.is_finite() || space.total_space_gb <= 0.0 {
        return None;
    }

    let percent = space.free_space_gb / space.total_space_gb * 100.0;
    Some((percent * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(path: &str, total: f64, free: f64) -> FolderSpace {
        FolderSpace {
            path: path.to_string(),
            label: String::new(),
            total_space_gb: total,
            free_space_gb: free,
        }
    }

    #[test]
    fn test_matching_folder_percent() {
        let spaces = vec![space("/media/movies", 1000.0, 200.0)];
        assert_eq!(remaining_percent("/media/movies/x", &spaces), Some(20.0));
    }

    #[test]
    fn test_unmatched_and_zero_total() {
        let spaces = vec![space("/media/movies", 1000.0, 200.0), space("/tv", 0.0, 0.0)];
        assert_eq!(remaining_percent("/srv/other", &spaces), None);
        assert_eq!(remaining_percent("/tv/show", &spaces), None);
        assert_eq!(remaining_percent("", &spaces), None);
    }

    #[test]
    fn test_most_specific_folder_wins_over_root() {
        let spaces = vec![space("/", 100.0, 90.0), space("/media/tv", 300.0, 100.0)];
        assert_eq!(remaining_percent("/media/tv", &spaces), Some(33.33));
    }

    #[test]
    fn test_parent_above_entry_path_matches() {
        let spaces = vec![space("/media/movies/", 1000.0, 250.0)];
        assert_eq!(remaining_percent("/media", &spaces), Some(25.0));
    }

    const GIB: i64 = 1024 * 1024 * 1024;

    fn root(path: &str, free_gib: i64, total_gib: Option<i64>) -> RootFolderRecord {
        RootFolderRecord {
            path: Some(path.to_string()),
            free_space: Some(free_gib * GIB),
            total_space: total_gib.map(|t| t * GIB),
        }
    }

    fn disk(path: &str, total_gib: i64, free_gib: i64) -> DiskSpaceRecord {
        DiskSpaceRecord {
            path: Some(path.to_string()),
            label: Some(format!("disk {}", path)),
            free_space: Some(free_gib * GIB),
            total_space: Some(total_gib * GIB),
        }
    }

    #[test]
    fn test_root_folder_total_from_containing_disk() {
        let disks = vec![disk("/", 50, 10), disk("/media", 1000, 300)];
        let spaces = instance_folders(&[root("/media/tv/", 250, None)], &disks, &[]);

        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].path, "/media/tv/");
        assert_eq!(spaces[0].label, "disk /media");
        assert_eq!(spaces[0].free_space_gb, 250.0);
        assert_eq!(spaces[0].total_space_gb, 1000.0);
        assert_eq!(remaining_percent("/media/tv/Fargo", &spaces), Some(25.0));
    }

    #[test]
    fn test_root_folder_own_total_wins() {
        let disks = vec![disk("/media", 1000, 300)];
        let spaces = instance_folders(&[root("/media/movies", 40, Some(200))], &disks, &[]);
        assert_eq!(spaces[0].total_space_gb, 200.0);
        assert_eq!(remaining_percent("/media/movies/Heat", &spaces), Some(20.0));
    }

    #[test]
    fn test_no_root_folders_falls_back_to_disks() {
        let spaces = instance_folders(&[], &[disk("/media", 1000, 300)], &[]);
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].free_space_gb, 300.0);
    }

    #[test]
    fn test_selected_folders_filter() {
        let roots = vec![root("/media/tv/", 10, Some(100)), root("/media/anime", 5, Some(100))];
        let selected = vec!["/media/tv".to_string()];
        let spaces = instance_folders(&roots, &[], &selected);

        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].path, "/media/tv/");
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let deduped = dedupe_by_path(vec![
            space("/a", 1.0, 1.0),
            space("/a", 2.0, 2.0),
            space("/b", 3.0, 3.0),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].total_space_gb, 1.0);
    }
}
