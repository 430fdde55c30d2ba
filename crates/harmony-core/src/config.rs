use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::state::Rewards;

const RC_ENV_VAR: &str = "HARMONYRC";
const RC_FILE_NAME: &str =
  ".harmonyrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("default.command", "dashboard"),
      ("color", "on"),
      ("rewards.report", "25"),
      ("rewards.organize", "50"),
      ("rewards.attend", "30"),
      ("rewards.resolved", "100"),
      ("latency.submit_ms", "0"),
      ("latency.login_ms", "0")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading harmonyrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no harmonyrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(key, v))
      .transpose()
  }

  pub fn get_u32(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u32>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u32>().with_context(
          || {
            format!(
              "invalid value for {key}: \
               {v:?} (expected a \
               non-negative integer)"
            )
          }
        )
      })
      .transpose()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// Point amounts, falling back to the
  /// defaults for absent keys.
  pub fn rewards(
    &self
  ) -> anyhow::Result<Rewards> {
    let defaults = Rewards::default();
    Ok(Rewards {
      report:   self
        .get_u32("rewards.report")?
        .unwrap_or(defaults.report),
      organize: self
        .get_u32("rewards.organize")?
        .unwrap_or(defaults.organize),
      attend:   self
        .get_u32("rewards.attend")?
        .unwrap_or(defaults.attend),
      resolved: self
        .get_u32("rewards.resolved")?
        .unwrap_or(defaults.resolved)
    })
  }

  pub fn seed_location(
    &self
  ) -> Option<PathBuf> {
    self
      .get("seed.location")
      .filter(|v| !v.trim().is_empty())
      .map(|v| {
        expand_tilde(Path::new(v.trim()))
      })
  }

  pub fn submit_latency(
    &self
  ) -> anyhow::Result<Duration> {
    self.latency("latency.submit_ms")
  }

  pub fn login_latency(
    &self
  ) -> anyhow::Result<Duration> {
    self.latency("latency.login_ms")
  }

  fn latency(
    &self,
    key: &str
  ) -> anyhow::Result<Duration> {
    Ok(Duration::from_millis(
      self
        .get_u32(key)?
        .map(u64::from)
        .unwrap_or(0)
    ))
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(canonical_or_raw(&path));

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          canonical_or_raw(
            &resolve_include_path(
              &base_dir,
              include_rest.trim()
            )?
          );
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&include_path)
        {
          return Err(anyhow!(
            "include cycle at {}:{}: \
             {} is already loaded",
            path.display(),
            line_num + 1,
            include_path.display()
          ));
        }

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping harmonyrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

/// One key per file regardless of
/// `..` or symlinks in the spelling.
fn canonical_or_raw(
  path: &Path
) -> PathBuf {
  fs::canonicalize(path)
    .unwrap_or_else(|_| {
      path.to_path_buf()
    })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  key: &str,
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => Err(anyhow!(
      "invalid value for {key}: \
       {other:?} (expected on/off)"
    ))
  }
}
