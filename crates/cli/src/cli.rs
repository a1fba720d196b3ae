use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rule-based treatment recommendations for adults with type 2 diabetes.
///
/// Rules are read from YAML files under the rules directory; patient records
/// are JSON objects keyed by field name or survey column name.
#[derive(Parser, Debug)]
#[command(name = "glyco", version, about = "Rule-based diabetes treatment recommendations")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check rule files and report every error and warning
    Validate(RulesArgs),

    /// Evaluate one or more patient records against the rule set
    Evaluate(EvaluateArgs),

    /// List the loaded rules in evaluation order
    Rules(RulesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    /// Rules directory (default: GLYCO_RULES_DIR, then data/rules)
    #[arg(long, value_name = "DIR")]
    pub rules: Option<PathBuf>,

    /// Reject rule ids that are not kebab-case
    #[arg(long)]
    pub strict_ids: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Patient record file, or `-` for stdin. Several JSON objects may
    /// follow one another; each is evaluated in turn.
    #[arg(long, value_name = "FILE|-")]
    pub patient: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "GLYCO_FORMAT")]
    pub format: OutputFormat,

    /// Reload the rules directory when its files change between records
    #[arg(long)]
    pub watch: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
