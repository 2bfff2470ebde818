//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub const ADMIN_PASSWORD: &str = "open-studio";

/// A freshly initialized site in a temp directory.
pub struct TestSite {
    _dir: TempDir,
    pub root: PathBuf,
}

impl TestSite {
    /// Run `studio init` with an admin password and the given extra args.
    pub fn init(extra: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join("site");
        let site = Self { _dir: dir, root };
        let mut args = vec!["init", "--admin-password", ADMIN_PASSWORD, "--cost", "4"];
        args.extend_from_slice(extra);
        let output = site.run(&args);
        assert!(
            output.status.success(),
            "init failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        site
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.path(relative)).expect("read json file");
        serde_json::from_str(&text).expect("parse json file")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_studio"));
        command
            .arg("--site")
            .arg(&self.root)
            .env_remove("BREVO_API_KEY")
            .env_remove("SENDINBLUE_API_KEY")
            .env_remove("RECAPTCHA_SECRET_KEY")
            .env_remove("STUDIO_SITE")
            .env("STUDIO_LOG", "warn");
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("run studio")
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn studio");
        child
            .stdin
            .take()
            .expect("child stdin")
            .write_all(stdin.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for studio")
    }
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
