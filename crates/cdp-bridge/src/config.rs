use std::env;
use std::path::PathBuf;

use which::which;

/// Launch settings for the bridged Chromium process.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Chromium binary. An empty path lets the launcher pick its own.
    pub executable: PathBuf,
    /// Profile directory, created on launch. Relative paths resolve against
    /// the working directory.
    pub user_data_dir: PathBuf,
    /// The target site renders differently headless, so the default is a
    /// visible window.
    pub headless: bool,
    /// Initial window size, applied headful and headless alike.
    pub window: (u32, u32),
    /// Per-command response deadline.
    pub command_deadline_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            executable: default_chrome_path(),
            user_data_dir: PathBuf::from("./.iol-autofill-profile"),
            headless: false,
            window: (1920, 1080),
            command_deadline_ms: 30_000,
        }
    }
}

fn default_chrome_path() -> PathBuf {
    detect_chrome_executable().unwrap_or_default()
}

/// Locates a Chrome or Chromium binary: `IOL_AUTOFILL_CHROME` first, then
/// `PATH`, then the usual per-OS install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("IOL_AUTOFILL_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    for candidate in os_specific_chrome_paths() {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(root) = env::var(key) {
                let root = root.trim();
                if !root.is_empty() {
                    let root = PathBuf::from(root);
                    paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                    paths.push(root.join("Chromium/Application/chrome.exe"));
                    paths.push(root.join("Microsoft/Edge/Application/msedge.exe"));
                }
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        Vec::new()
    }
}
