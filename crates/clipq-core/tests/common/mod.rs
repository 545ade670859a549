//! Shared helpers: stub downloader scripts standing in for yt-dlp.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clipq_core::resolve::ResolvedClip;

/// Emits two template progress lines quickly, then succeeds.
pub const QUICK_SUCCESS: &str = "#!/bin/sh
echo \"clipq:status=downloading percent=50.0 downloaded=5 total=10 total_est=NA speed=1024 eta=1\"
echo \"clipq:status=downloading percent=100.0 downloaded=10 total=10 total_est=NA speed=2048 eta=0\"
exit 0
";

/// Succeeds after a short busy period, long enough to observe Running.
pub const SLOW_SUCCESS: &str = "#!/bin/sh
echo \"clipq:status=downloading percent=10.0 downloaded=1 total=10 total_est=NA speed=512 eta=3\"
sleep 0.3
echo \"clipq:status=downloading percent=100.0 downloaded=10 total=10 total_est=NA speed=512 eta=0\"
exit 0
";

/// Prints an error on stderr and exits non-zero. The sleep keeps the error
/// line strictly after the noise so it is always the last line observed.
pub const FAILS: &str = "#!/bin/sh
echo \"progress hidden in noise\"
sleep 0.2
echo \"ERROR: unable to download video\" 1>&2
exit 3
";

/// Ignores SIGTERM, forcing the timeout-then-kill path.
pub const IGNORES_TERM: &str = "#!/bin/sh
trap '' TERM
echo \"clipq:status=downloading percent=1.0 speed=NA eta=NA\"
sleep 30
";

/// Closes both pipes early and lingers, ignoring SIGTERM: exercises stop
/// requests that arrive after output has ended but before the exit.
pub const CLOSES_PIPES_AND_LINGERS: &str = "#!/bin/sh
trap '' TERM
echo \"clipq:status=downloading percent=1.0 speed=NA eta=NA\"
exec 1>&- 2>&-
sleep 30
";

/// Writes an executable stub script into `dir`.
pub fn stub_downloader(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }
    path
}

/// A resolved clip with a distinct output name.
pub fn clip(name: &str) -> ResolvedClip {
    ResolvedClip {
        tag: Some(name.to_string()),
        video_id: "AAA".to_string(),
        start_url: "https://youtu.be/AAA?t=10".to_string(),
        start_secs: 10,
        end_secs: 40,
        cut_start: 5,
        cut_end: 45,
        output_name: name.to_string(),
        line: 1,
    }
}
