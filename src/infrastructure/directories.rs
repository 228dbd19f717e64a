use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

/// Browsers start native hosts with an arbitrary working directory, so a
/// relative logs dir is anchored next to the executable.
pub fn ensure_logs_dir(cfg: &DirectoryConfig) -> Result<PathBuf> {
    let anchor = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let dir = resolve(&cfg.logs_dir, anchor.as_deref());
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}

fn resolve(raw: &str, anchor: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(raw);
    match anchor {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_dirs_are_anchored() {
        let anchored = resolve("logs", Some(Path::new("/opt/phish-gate")));
        assert_eq!(anchored, PathBuf::from("/opt/phish-gate/logs"));
    }

    #[test]
    fn absolute_dirs_are_kept() {
        let kept = resolve("/var/log/phish-gate", Some(Path::new("/opt/phish-gate")));
        assert_eq!(kept, PathBuf::from("/var/log/phish-gate"));
        assert_eq!(resolve("logs", None), PathBuf::from("logs"));
    }
}
