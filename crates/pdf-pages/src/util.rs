use std::path::Path;
use std::process::{Command, ExitStatus};
use std::thread::JoinHandle;

/// Open `path` in the platform file manager. Failures are logged, not returned.
pub fn open_in_file_manager(path: &Path) -> bool {
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    let mut command = Command::new(program);
    command.arg(path);
    match spawn_reaped(command) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to open {}: {}", path.display(), e);
            false
        }
    }
}

/// Create the parent directory of `path` if it is missing
pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

/// Start `command` and wait for it on a detached thread so the child is
/// reaped without blocking the caller
pub(crate) fn spawn_reaped(mut command: Command) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;
    Ok(std::thread::spawn(move || {
        let status = child.wait();
        match &status {
            Ok(status) if !status.success() => log::debug!("{command:?} exited with {status}"),
            Err(e) => log::warn!("Failed to wait for {command:?}: {e}"),
            Ok(_) => {}
        }
        status
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_spawned_child_is_reaped() {
        let status = spawn_reaped(Command::new("true")).unwrap().join().unwrap().unwrap();
        assert!(status.success());

        let status = spawn_reaped(Command::new("false")).unwrap().join().unwrap().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        assert!(spawn_reaped(Command::new("definitely-not-a-program-4a1f")).is_err());
    }

    #[test]
    fn test_ensure_parent_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a").join("b").join("out.png");
        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
        ensure_parent_dir(Path::new("bare.png")).unwrap();
    }
}
