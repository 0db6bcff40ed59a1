//! `dai config`

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::cli::ConfigArgs;
use crate::config::Config;

/// Splits `KEY=VALUE`; the value may itself contain `=`
pub fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim(), value.trim()))
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))
}

/// Applies `--set` pairs to the file at `path` (not the environment-merged
/// config, so env secrets are never persisted), then handles `--path` and
/// `--list`.
pub fn run<W: Write>(args: &ConfigArgs, config: &Config, path: &Path, out: &mut W) -> Result<u8> {
    let mut effective = config.clone();

    if !args.set.is_empty() {
        let mut stored = Config::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        for raw in &args.set {
            let (key, value) = parse_assignment(raw)?;
            stored.set(key, value)?;
            effective.set(key, value)?;
            writeln!(out, "Set {key}")?;
        }
        stored
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if args.path {
        writeln!(out, "{}", path.display())?;
    }

    if args.list || (args.set.is_empty() && !args.path) {
        let entries = effective.entries();
        let width = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in entries {
            writeln!(out, "{key:width$}  {value}")?;
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("concurrency=4", ("concurrency", "4"))]
    #[case("registryUrl=https://r.example.com/?a=b", ("registryUrl", "https://r.example.com/?a=b"))]
    #[case(" logLevel = debug ", ("logLevel", "debug"))]
    #[case("githubToken=", ("githubToken", ""))]
    fn parse_assignment_splits_on_first_equals(#[case] raw: &str, #[case] expected: (&str, &str)) {
        assert_eq!(parse_assignment(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("concurrency")]
    #[case("=4")]
    fn parse_assignment_rejects_malformed(#[case] raw: &str) {
        assert!(parse_assignment(raw).is_err());
    }

    #[test]
    fn set_persists_and_list_masks_secrets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dai").join("config.json");
        let args = ConfigArgs {
            list: true,
            path: false,
            set: vec![
                "concurrency=3".to_string(),
                "githubToken=ghp_abcdefghijklmnop".to_string(),
            ],
        };

        let mut out = Vec::new();
        run(&args, &Config::default(), &path, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Set concurrency"));
        assert!(out.contains("ghp...nop"));
        assert!(!out.contains("ghp_abcdefghijklmnop"));

        let stored = Config::load(&path).unwrap();
        assert_eq!(stored.concurrency, 3);
        assert_eq!(stored.github_token.as_deref(), Some("ghp_abcdefghijklmnop"));
    }

    #[test]
    fn set_rejects_unknown_key_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let args = ConfigArgs {
            list: false,
            path: false,
            set: vec!["colour=blue".to_string()],
        };

        let mut out = Vec::new();
        assert!(run(&args, &Config::default(), &path, &mut out).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn path_only_prints_location() {
        let args = ConfigArgs {
            list: false,
            path: true,
            set: vec![],
        };

        let mut out = Vec::new();
        run(&args, &Config::default(), Path::new("/tmp/dai/config.json"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/tmp/dai/config.json\n");
    }
}
