//! Game-file discovery: walks the configured data directory once at
//! startup looking for solvable game definitions.

use std::fs;
use std::path::{Path, PathBuf};

const TRAJ_MARKER: &str = "traj_data.json";
const GAME_DEFINITION: &str = "game.tw-pddl";
const EXCLUDED_FRAGMENTS: [&str; 2] = ["movable", "Sliced"];

/// Walk `data_dir` and return the absolute paths of every game file
/// found in a directory that carries a trajectory marker, is marked
/// solvable, and does not fall under an excluded path fragment.
pub fn discover_game_files(data_dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    walk(data_dir, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, found: &mut Vec<String>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut subdirs = Vec::new();
    let mut has_traj_marker = false;
    let mut game_file: Option<PathBuf> = None;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(TRAJ_MARKER) => has_traj_marker = true,
            Some(GAME_DEFINITION) => game_file = Some(path.clone()),
            _ => {}
        }
    }

    if has_traj_marker {
        if let Some(game_path) = &game_file {
            let path_str = game_path.to_string_lossy();
            let excluded = EXCLUDED_FRAGMENTS.iter().any(|frag| path_str.contains(frag));
            if !excluded && is_solvable(game_path) {
                found.push(path_str.into_owned());
            }
        }
    }

    for sub in subdirs {
        walk(&sub, found);
    }
}

/// The `solvable` flag lives in the game-definition file itself, not the
/// trajectory marker. A missing field, or an unreadable/unparseable game
/// file, is treated as unsolvable: the reference discovery pass only
/// admits games explicitly marked solvable.
fn is_solvable(game_path: &Path) -> bool {
    fs::read_to_string(game_path)
        .ok()
        .and_then(|contents| serde_json::from_str::<serde_json::Value>(&contents).ok())
        .and_then(|value| value.get("solvable").and_then(|s| s.as_bool()))
        .unwrap_or(false)
}
