use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use glyco_core::ValidationError;
use glyco_rules::{Evaluation, LoadStatus, RuleLoadError, RuleSet, ValidationReport};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const OK: Color = Color::Green;
    const WARNING: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Cyan;
}

/// Human-readable output. Results go to stdout, problems to stderr.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    pub fn print_report(&self, report: &ValidationReport) -> Result<()> {
        let mut stdout = io::stdout();
        for file in &report.files {
            let (color, label, detail) = match &file.status {
                LoadStatus::Loaded { rule_ids } => (Colors::OK, "ok  ", format!("{} rule(s)", rule_ids.len())),
                LoadStatus::Skipped { reason } => (Colors::DIM, "skip", reason.clone()),
                LoadStatus::Failed { error } => (Colors::ERROR, "FAIL", error.clone()),
            };
            execute!(
                stdout,
                SetForegroundColor(color),
                Print(format!("[{label}] ")),
                ResetColor,
                Print(format!("{} ", file.path.display())),
                SetForegroundColor(Colors::DIM),
                Print(format!("{detail}\n")),
                ResetColor,
            )?;
        }

        for warning in &report.warnings {
            self.print_warning(&format!("{}: {}", warning.path, warning.message))?;
        }
        for error in report.error_list() {
            self.print_error(&error.to_string())?;
        }

        let color = if report.is_valid() { Colors::OK } else { Colors::ERROR };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!(
                "{} rule(s) checked in {} file(s): {} error(s), {} warning(s)\n",
                report.rules_checked,
                report.files_loaded(),
                report.error_list().len(),
                report.warnings.len()
            )),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_load_error(&self, err: &RuleLoadError) -> Result<()> {
        for e in err.errors() {
            self.print_error(&e.to_string())?;
        }
        Ok(())
    }

    pub fn print_validation_error(&self, label: &str, err: &ValidationError) -> Result<()> {
        self.print_error(&format!("{label}: invalid patient record"))?;
        for problem in err.problems() {
            self.print_error(&format!("  {problem}"))?;
        }
        Ok(())
    }

    /// Rules in evaluation order: priority, id, category, action.
    pub fn print_rules(&self, rules: &RuleSet) -> Result<()> {
        let mut stdout = io::stdout();
        let id_width = rules.iter().map(|r| r.id.len()).max().unwrap_or(2);
        let cat_width = rules.iter().map(|r| r.category.len()).max().unwrap_or(8);
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("{:>8}  {:id_width$}  {:cat_width$}  ACTION\n", "PRIORITY", "ID", "CATEGORY")),
            ResetColor,
        )?;
        for rule in rules.iter() {
            let marker = if rule.fallback { " (fallback)" } else { "" };
            writeln!(
                stdout,
                "{:>8}  {:id_width$}  {:cat_width$}  {}{marker}",
                rule.priority, rule.id, rule.category, rule.action
            )?;
        }
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{} rule(s), fingerprint {}\n", rules.len(), rules.fingerprint())),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_evaluation(&self, label: &str, eval: &Evaluation) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("== {label}\n")),
            ResetColor,
            Print(glyco_rules::explain_evaluation(eval)),
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_warning(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::WARNING),
            Print(format!("warning: {msg}\n")),
            ResetColor,
        )?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::ERROR),
            Print(format!("error: {msg}\n")),
            ResetColor,
        )?;
        Ok(())
    }
}
