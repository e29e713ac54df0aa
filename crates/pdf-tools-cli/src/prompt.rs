use std::io::{BufRead, Write};
use std::path::Path;

/// Ask on the terminal whether `path` may be overwritten. Anything but a
/// yes, including a closed stdin, declines.
pub fn ask_overwrite(path: &Path) -> bool {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{} already exists. Overwrite? [y/N] ", path.display());
    let _ = stderr.flush();
    drop(stderr);

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_yes(&answer),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
