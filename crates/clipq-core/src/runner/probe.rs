//! PATH probe for required external commands.

use std::env;
use std::path::{Path, PathBuf};

use super::RunnerError;

/// Locates a program on PATH. A name containing a path separator is
/// checked directly instead.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

/// Resolves a required command, failing fast with a named
/// missing-dependency error before anything is spawned.
pub fn require(program: &str) -> Result<PathBuf, RunnerError> {
    find_in_path(program).ok_or_else(|| RunnerError::MissingDependency(program.to_string()))
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_named() {
        let err = require("clipq-test-no-such-binary").unwrap_err();
        match err {
            RunnerError::MissingDependency(name) => {
                assert_eq!(name, "clipq-test-no-such-binary")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn finds_sh_on_path() {
        // /bin/sh exists on any unix we target.
        assert!(find_in_path("sh").is_some());
    }
}
