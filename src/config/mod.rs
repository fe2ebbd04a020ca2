pub mod job;
pub mod merged;
pub mod preset;
pub mod settings;

use settings::Settings;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAMES: [&str; 2] = ["settings.yaml", "settings.yml"];

/// ジョブファイルと同じディレクトリにある設定ファイルのパスを返す。
fn find_settings_file(job_file_path: &Path) -> Option<PathBuf> {
    let dir = match job_file_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    SETTINGS_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// ジョブファイルに対応する設定を読み込む。
///
/// `settings.yaml`（または `settings.yml`）が無ければデフォルト設定。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    match find_settings_file(job_file_path) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Settings::from_file(&path)
        }
        None => Ok(Settings::default()),
    }
}
