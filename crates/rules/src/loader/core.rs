//! Core [`RuleLoader`]: reads rule sources, validates every definition and
//! compiles the result into a [`RuleSet`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glyco_core::FactSchema;
use tracing::{debug, info, warn};

use crate::rule::Rule;
use crate::ruleset::RuleSet;
use crate::schema::{RuleEnvelope, RuleKind, API_VERSION};
use crate::validation::fuzzy::fuzzy_match;
use crate::validation::{compile_definition, ValidationReport};

use super::error::{LoadResult, LoadStatus, Result, RuleLoadError};

/// Where rule definitions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// Recursive scan of `*.yml` / `*.yaml`; dotfiles skipped.
    Dir(PathBuf),
    File(PathBuf),
    /// Inline YAML text.
    Yaml(String),
}

impl RuleSource {
    /// Human-readable label for logs.
    pub fn describe(&self) -> String {
        match self {
            RuleSource::Dir(p) | RuleSource::File(p) => p.display().to_string(),
            RuleSource::Yaml(_) => "<inline>".to_string(),
        }
    }
}

/// Loads and validates rule definitions against a [`FactSchema`].
///
/// Every file and every definition is checked before anything fails, so one
/// load reports all problems at once.
#[derive(Debug, Clone)]
pub struct RuleLoader {
    schema: FactSchema,
    /// Non-kebab-case ids are errors instead of warnings.
    strict_ids: bool,
}

/// A compiled rule and the source it came from.
struct Compiled {
    rule: Rule,
    origin: String,
}

impl RuleLoader {
    pub fn new(schema: FactSchema) -> Self {
        Self {
            schema,
            strict_ids: false,
        }
    }

    pub fn strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }

    pub fn schema(&self) -> &FactSchema {
        &self.schema
    }

    /// Load a source into a rule set. All fatal problems are aggregated into
    /// one error; warnings are logged.
    pub fn load(&self, source: &RuleSource) -> Result<RuleSet> {
        let (mut report, compiled) = self.run(source);

        for w in &report.warnings {
            warn!(path = %w.path, "{}", w.message);
        }
        if !report.is_valid() {
            warn!(
                source = %source.describe(),
                errors = report.errors.len(),
                "rule source failed validation"
            );
            RuleLoadError::from_many(std::mem::take(&mut report.errors))?;
        }

        let set = RuleSet::new(compiled.into_iter().map(|c| c.rule).collect())?;
        info!(
            source = %source.describe(),
            rules = set.len(),
            files = report.files_loaded(),
            fingerprint = %set.fingerprint(),
            "loaded rule set"
        );
        Ok(set)
    }

    /// Validate a source without building a rule set. Never fails; every
    /// problem is in the returned report.
    pub fn validate(&self, source: &RuleSource) -> ValidationReport {
        self.run(source).0
    }

    fn run(&self, source: &RuleSource) -> (ValidationReport, Vec<Compiled>) {
        let mut report = ValidationReport::default();
        let mut compiled = Vec::new();

        match source {
            RuleSource::Dir(dir) => {
                let mut paths = Vec::new();
                if let Err(e) = self.scan_dir_recursive(dir, &mut paths, &mut report) {
                    report.errors.push(e);
                }
                // Directory order is platform-dependent.
                paths.sort();
                for path in paths {
                    self.load_file(&path, &mut report, &mut compiled);
                }
            }
            RuleSource::File(path) => self.load_file(path, &mut report, &mut compiled),
            RuleSource::Yaml(text) => {
                let status = self.load_text("<inline>", text, &mut report, &mut compiled);
                report.files.push(LoadResult {
                    path: PathBuf::from("<inline>"),
                    status,
                });
            }
        }

        check_duplicates(&mut compiled, &mut report);
        (report, compiled)
    }

    /// Recursively collect YAML rule files under `dir`.
    fn scan_dir_recursive(
        &self,
        dir: &Path,
        paths: &mut Vec<PathBuf>,
        report: &mut ValidationReport,
    ) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|source| RuleLoadError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            // file_type() does not follow symlinks.
            let file_type = entry.file_type()?;

            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if !file_type.is_dir() {
                        report.files.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if file_type.is_dir() {
                self.scan_dir_recursive(&path, paths, report)?;
                continue;
            }

            // Symlinked files are loaded; symlinked directories are never followed.
            if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "not following symlinked directory");
                report.files.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "symlinked directory".to_string(),
                    },
                });
                continue;
            }

            if is_yaml(&path) {
                paths.push(path);
            } else {
                report.files.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
            }
        }
        Ok(())
    }

    fn load_file(&self, path: &Path, report: &mut ValidationReport, compiled: &mut Vec<Compiled>) {
        let status = match fs::read_to_string(path) {
            Ok(contents) => {
                let origin = path.display().to_string();
                self.load_text(&origin, &contents, report, compiled)
            }
            Err(source) => {
                let error = RuleLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                let status = LoadStatus::Failed {
                    error: error.to_string(),
                };
                report.errors.push(error);
                status
            }
        };
        if let LoadStatus::Failed { error } = &status {
            warn!(path = %path.display(), error = %error, "failed to load rule file");
        }
        report.files.push(LoadResult {
            path: path.to_path_buf(),
            status,
        });
    }

    /// Parse one YAML document via two-pass deserialization and compile its
    /// definitions.
    ///
    /// First pass: deserialize as [`RuleEnvelope`] to read the header.
    /// Second pass: deserialize into the kind-specific type.
    fn load_text(
        &self,
        origin: &str,
        contents: &str,
        report: &mut ValidationReport,
        compiled: &mut Vec<Compiled>,
    ) -> LoadStatus {
        let errors_before = report.errors.len();
        let fail = |report: &mut ValidationReport, error: RuleLoadError| {
            let status = LoadStatus::Failed {
                error: error.to_string(),
            };
            report.errors.push(error);
            status
        };

        let envelope: RuleEnvelope = match serde_yaml::from_str(contents) {
            Ok(env) => env,
            Err(source) => {
                return fail(
                    report,
                    RuleLoadError::Parse {
                        origin: origin.to_string(),
                        source,
                    },
                )
            }
        };

        if envelope.api_version != API_VERSION {
            return fail(
                report,
                RuleLoadError::UnsupportedApiVersion {
                    origin: origin.to_string(),
                    found: envelope.api_version.clone(),
                },
            );
        }
        if envelope.rule_kind().is_err() {
            return fail(
                report,
                RuleLoadError::UnknownKind {
                    origin: origin.to_string(),
                    kind: envelope.kind.clone(),
                    suggestion: fuzzy_match(&envelope.kind, RuleKind::ALL).map(str::to_string),
                },
            );
        }

        let doc = match envelope.parse_full() {
            Ok(doc) => doc,
            Err(source) => {
                return fail(
                    report,
                    RuleLoadError::Parse {
                        origin: origin.to_string(),
                        source,
                    },
                )
            }
        };

        let mut rule_ids = Vec::new();
        for def in doc.definitions() {
            let rule = compile_definition(&def, origin, &self.schema, self.strict_ids, report);
            match rule {
                Some(rule) if def.enabled => {
                    debug!(rule_id = %rule.id, origin = %origin, "compiled rule");
                    rule_ids.push(rule.id.clone());
                    compiled.push(Compiled {
                        rule,
                        origin: origin.to_string(),
                    });
                }
                Some(rule) => debug!(rule_id = %rule.id, origin = %origin, "rule disabled"),
                None => {}
            }
        }

        let new_errors = report.errors.len() - errors_before;
        if new_errors > 0 {
            LoadStatus::Failed {
                error: format!("{new_errors} invalid rule definition(s) in {} '{}'", doc.kind(), doc.metadata().id),
            }
        } else {
            info!(id = %doc.metadata().id, kind = %doc.kind(), origin = %origin, rules = rule_ids.len(), "loaded rule document");
            LoadStatus::Loaded { rule_ids }
        }
    }
}

/// Report every id defined more than once, keeping the first definition.
fn check_duplicates(compiled: &mut Vec<Compiled>, report: &mut ValidationReport) {
    let mut first_seen: HashMap<String, String> = HashMap::new();
    compiled.retain(|c| match first_seen.get(&c.rule.id) {
        Some(first) => {
            report.errors.push(RuleLoadError::DuplicateId {
                id: c.rule.id.clone(),
                first: first.clone(),
                second: c.origin.clone(),
            });
            false
        }
        None => {
            first_seen.insert(c.rule.id.clone(), c.origin.clone());
            true
        }
    });
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

pub(super) fn is_rule_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    is_yaml(path) && !hidden
}
