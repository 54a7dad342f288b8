//! Installs a `<plugin_id>-<version>.zip` package into
//! `<tools_root>/<plugin_id>/<version>/` and repoints the `current` symlink
//! at it.

use crate::error::LoaderError;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Parses `<plugin_id>-<version>.zip` from a file name. The plugin id may
/// itself contain hyphens (it's commonly a reverse-DNS string), so the
/// version is taken as the trailing `-`-delimited segment.
pub fn parse_package_filename(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(".zip")?;
    let (plugin_id, version) = stem.rsplit_once('-')?;
    if plugin_id.is_empty() || version.is_empty() {
        return None;
    }
    Some((plugin_id.to_string(), version.to_string()))
}

/// Extracts `zip_path` into `<tools_root>/<plugin_id>/<version>/`, requiring
/// exactly one dynamic library inside, then repoints `<tools_root>/<plugin_id>/current`
/// at the new version directory. Returns the install directory.
pub fn install_package(
    zip_path: &Path,
    tools_root: &Path,
    plugin_id: &str,
    version: &str,
) -> Result<PathBuf, LoaderError> {
    let install_dir = tools_root.join(plugin_id).join(version);
    std::fs::create_dir_all(&install_dir)?;

    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = install_dir.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        std::fs::write(&out_path, contents)?;
    }

    // Enforce "exactly one dylib" at install time, not just at load time,
    // so a bad package is rejected before it ever becomes `current`.
    crate::loader::find_single_library(&install_dir)?;

    let current_link = tools_root.join(plugin_id).join("current");
    let _ = std::fs::remove_file(&current_link);
    #[cfg(unix)]
    std::os::unix::fs::symlink(version, &current_link)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(version, &current_link)?;

    Ok(install_dir)
}

/// Removes a plugin's entire install tree (`<tools_root>/<plugin_id>/`).
/// The caller is responsible for unloading the plugin first.
pub fn uninstall_package(tools_root: &Path, plugin_id: &str) -> std::io::Result<()> {
    let dir = tools_root.join(plugin_id);
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}
