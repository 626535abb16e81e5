#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use crudkit::{CliArgs, CommandOutput, execute};
use tempfile::{TempDir, tempdir};
use walkdir::WalkDir;

pub const PRODUCTS_SCHEMA: &str = r#"
title:
  type: string
  meta:
    required: true
    maxLength: 120
price:
  type: decimal
  meta:
    precision: 10
    scale: 2
    area: sidebar
description:
  type: text
  meta:
    translatable: true
"#;

pub const POSTS_SCHEMA: &str = r#"
headline:
  type: string
  meta:
    required: true
body:
  type: text
"#;

/// Throwaway project directory with helpers to drive the CLI against it.
pub struct TestProject {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).expect("read file")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Runs `crudkit --project <root> <args...>`.
    pub fn run(&self, args: &[&str]) -> anyhow::Result<CommandOutput> {
        let root = self.root.to_str().expect("utf-8 temp path");
        let mut argv = vec!["crudkit", "--project", root];
        argv.extend_from_slice(args);
        let cli = CliArgs::try_parse_from(argv)?;
        execute(&cli)
    }

    pub fn run_ok(&self, args: &[&str]) -> CommandOutput {
        self.run(args).expect("command succeeds")
    }

    /// Every file under the project with its contents, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/");
                let contents = std::fs::read(entry.path()).expect("read snapshot file");
                (relative, contents)
            })
            .collect()
    }

    /// Relative paths of every directory under the project.
    pub fn directories(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    /// Files that `generate` wrote under `layers/`.
    pub fn generated_files(&self) -> Vec<String> {
        self.snapshot()
            .into_keys()
            .filter(|path| path.starts_with("layers/"))
            .collect()
    }
}

pub fn json(output: &CommandOutput) -> serde_json::Value {
    serde_json::from_str(&output.report).expect("json report")
}
