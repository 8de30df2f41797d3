//! Compile-time build metadata exposed to CLI surfaces.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("RUNWATCH_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("RUNWATCH_BUILD_TIMESTAMP");

/// Help trailer block that surfaces build metadata in `runwatch --help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build metadata:\n  commit: ",
    env!("RUNWATCH_BUILD_GIT_HASH"),
    "\n  built: ",
    env!("RUNWATCH_BUILD_TIMESTAMP")
);

/// Render the one-line header shown when a watch session starts.
pub fn startup_metadata_line() -> String {
    format!("v{VERSION} ({GIT_COMMIT}, built {BUILD_TIMESTAMP})")
}

/// Version block used by `runwatch --version`; clap prefixes the binary name.
pub const CLI_LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("RUNWATCH_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("RUNWATCH_BUILD_TIMESTAMP")
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_metadata_line_contains_all_fields() {
        let text = startup_metadata_line();
        assert!(text.starts_with('v'));
        assert!(text.contains(GIT_COMMIT));
        assert!(text.contains(BUILD_TIMESTAMP));
    }

    #[test]
    fn cli_version_text_includes_expected_lines() {
        let text = CLI_LONG_VERSION;
        assert!(text.starts_with(VERSION));
        assert!(text.contains("commit:"));
        assert!(text.contains("built:"));
    }
}
