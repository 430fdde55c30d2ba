use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Arguments left for clap plus the `rc.` overrides pulled out of them.
#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "harmony",
    version,
    about = "Neighborhood Harmony: report civic issues, organize volunteer events, earn points",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (-q warn, -qq error).
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override one setting, e.g. `--rc rewards.report=40`.
    #[arg(
        long = "rc",
        value_name = "KEY=VALUE",
        value_parser = parse_override,
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<(String, String)>,

    /// harmonyrc file to read instead of `$HARMONYRC` or `~/.harmonyrc`.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

/// Splits `key=value` or `key:value`. The first separator wins, so values may
/// contain either character.
pub fn parse_override(s: &str) -> anyhow::Result<(String, String)> {
    let sep = s
        .find(['=', ':'])
        .ok_or_else(|| anyhow!("expected KEY=VALUE or KEY:VALUE, got: {s}"))?;
    let key = s[..sep].trim();
    if key.is_empty() {
        return Err(anyhow!("override has an empty key: {s}"));
    }
    Ok((key.to_string(), s[sep + 1..].trim().to_string()))
}

fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// takes precedence over the -v/-q counts.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = default_log_level(verbose, quiet);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log filter {level}: {e}"))?,
    };

    let stderr_is_tty = std::io::stderr().is_terminal();
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_ansi(stderr_is_tty)
        .try_init()
    {
        debug!(error = %err, "tracing already initialised");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` tokens out of the argument
/// list. The binary name stays first.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut out = PreprocessedArgs {
        cleaned_args: Vec::with_capacity(raw.len()),
        rc_overrides: Vec::new(),
    };

    for (idx, arg) in raw.iter().enumerate() {
        let rc = (idx > 0)
            .then(|| arg.to_str())
            .flatten()
            .and_then(|s| s.strip_prefix("rc."));
        match rc.map(parse_override) {
            Some(Ok((key, value))) => {
                debug!(key = %key, value = %value, "captured positional rc override");
                out.rc_overrides.push((key, value));
            }
            Some(Err(err)) => return Err(err.context(format!("bad override {arg:?}"))),
            None => out.cleaned_args.push(arg.clone()),
        }
    }

    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        Self::from_tokens(cfg, tokens)
    }

    /// Resolves the first token to a command name, expanding unique prefixes.
    pub fn from_tokens(cfg: &Config, tokens: Vec<String>) -> anyhow::Result<Self> {
        let mut tokens = tokens.into_iter();
        let Some(first) = tokens.next() else {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "dashboard".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                args: vec![],
            });
        };

        let known = crate::commands::known_command_names();
        let command = crate::commands::expand_command_abbrev(&first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first} (try 'help')"))?;
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            args: tokens.collect(),
        })
    }
}

/// Splits one shell line on whitespace. Double quotes group words and `\"`
/// escapes a quote inside them.
pub fn tokenize_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(anyhow!("unterminated quote in: {line}"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{Invocation, default_log_level, parse_override, preprocess_args, tokenize_line};
    use crate::config::Config;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenizer_respects_quotes() {
        assert_eq!(
            tokenize_line(r#"report "Broken swing" addr:"12 Oak Ave" pri:high"#).unwrap(),
            strings(&["report", "Broken swing", "addr:12 Oak Ave", "pri:high"])
        );
        assert_eq!(
            tokenize_line(r#"comment issue-1 "say \"hi\"""#).unwrap(),
            strings(&["comment", "issue-1", "say \"hi\""])
        );
        assert_eq!(tokenize_line("  ").unwrap(), Vec::<String>::new());
        assert_eq!(tokenize_line(r#"desc:"""#).unwrap(), strings(&["desc:"]));
        assert!(tokenize_line(r#"report "oops"#).is_err());
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let raw: Vec<OsString> = ["harmony", "rc.color=off", "issues", "rc.rewards.report:10"]
            .iter()
            .map(OsString::from)
            .collect();
        let pre = preprocess_args(&raw).unwrap();
        assert_eq!(pre.cleaned_args.len(), 2);
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("color".to_string(), "off".to_string()),
                ("rewards.report".to_string(), "10".to_string()),
            ]
        );

        let bad: Vec<OsString> = ["harmony", "rc.color"].iter().map(OsString::from).collect();
        assert!(preprocess_args(&bad).is_err());
    }

    #[test]
    fn override_splits_on_first_separator() {
        assert_eq!(
            parse_override("seed.location=C:/data/seed.json").unwrap(),
            ("seed.location".to_string(), "C:/data/seed.json".to_string())
        );
        assert_eq!(
            parse_override("color: off").unwrap(),
            ("color".to_string(), "off".to_string())
        );
        assert!(parse_override("=on").is_err());
        assert!(parse_override("color").is_err());
    }

    #[test]
    fn log_level_from_counts() {
        assert_eq!(default_log_level(0, 0), "warn");
        assert_eq!(default_log_level(1, 0), "info");
        assert_eq!(default_log_level(2, 0), "debug");
        assert_eq!(default_log_level(5, 0), "trace");
        assert_eq!(default_log_level(3, 1), "warn");
        assert_eq!(default_log_level(0, 2), "error");
    }

    #[test]
    fn invocation_defaults_and_abbreviations() {
        let cfg = Config::default();
        let inv = Invocation::from_tokens(&cfg, vec![]).unwrap();
        assert_eq!(inv.command, "dashboard");

        let inv = Invocation::from_tokens(&cfg, strings(&["lead"])).unwrap();
        assert_eq!(inv.command, "leaderboard");

        let inv = Invocation::from_tokens(&cfg, strings(&["issue", "issue-1"])).unwrap();
        assert_eq!(inv.command, "issue");
        assert_eq!(inv.args, strings(&["issue-1"]));

        assert!(Invocation::from_tokens(&cfg, strings(&["ev"])).is_err());
        assert!(Invocation::from_tokens(&cfg, strings(&["frobnicate"])).is_err());
    }
}
