//! Run configuration.
//!
//! Values come from three layers, highest first: command-line flags, a
//! `docstamp.toml` file, built-in defaults. Relative paths are taken relative
//! to the working directory, like the scripts this tool grew out of.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::clock::{Precision, Zone, SGT_LABEL, SGT_OFFSET_SECS};
use crate::error::{Result, StampError};
use crate::template::{Escape, Preset, Template};

pub const DEFAULT_CONFIG_FILE: &str = "docstamp.toml";
pub const DEFAULT_OUTPUT: &str = "overrides/timestamp.txt";

/// One layer of settings. Every field is optional so layers can be stacked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    pub output: Option<PathBuf>,
    pub preset: Option<Preset>,
    pub template: Option<String>,
    pub escape: Option<Escape>,
    pub seconds: Option<bool>,
    pub strict: Option<bool>,
    pub repo: Option<PathBuf>,
    pub timezone: Option<TimezoneLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimezoneLayer {
    pub label: Option<String>,
    pub offset_minutes: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: PathBuf,
    pub template: Template,
    pub zone: Zone,
    pub precision: Precision,
    /// Directory the repository is discovered from
    pub repo: PathBuf,
    /// Fail instead of writing empty commit fields
    pub strict: bool,
}

impl Layer {
    pub fn from_toml(src: &str) -> Result<Self> {
        toml::from_str(src).map_err(|e| StampError::Config(e.to_string()))
    }

    /// Read the config file. An explicit path must exist; the default one is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.is_file() {
                    tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                p
            }
        };
        let src = fs::read_to_string(&path).map_err(|e| {
            StampError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&src).map_err(|e| match e {
            StampError::Config(msg) => StampError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}

impl Config {
    /// Merge `cli` over `file` over defaults and validate the result.
    pub fn resolve(cli: Layer, file: Layer) -> Result<Self> {
        let source = template_source(&cli)
            .or_else(|| template_source(&file))
            .unwrap_or_else(|| Preset::default().source().to_string());
        let escape = cli.escape.or(file.escape).unwrap_or_default();
        let template = Template::parse(&source, escape)?;

        let tz = cli.timezone.or(file.timezone).unwrap_or_default();
        let zone = Zone::from_minutes(
            tz.offset_minutes.unwrap_or(SGT_OFFSET_SECS / 60),
            tz.label.unwrap_or_else(|| SGT_LABEL.to_string()),
        )?;

        let precision = if cli.seconds.or(file.seconds).unwrap_or(false) {
            Precision::Seconds
        } else {
            Precision::Minutes
        };

        let output = cli
            .output
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        if output.as_os_str().is_empty() {
            return Err(StampError::Config("output path must not be empty".into()));
        }

        Ok(Self {
            output,
            template,
            zone,
            precision,
            repo: cli.repo.or(file.repo).unwrap_or_else(|| PathBuf::from(".")),
            strict: cli.strict.or(file.strict).unwrap_or(false),
        })
    }
}

/// A custom template beats a preset within the same layer.
fn template_source(layer: &Layer) -> Option<String> {
    match (&layer.template, layer.preset) {
        (Some(t), _) => Some(t.clone()),
        (None, Some(p)) => Some(p.source().to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TimestampRecord;

    fn sample() -> TimestampRecord {
        TimestampRecord {
            current_time: "NOW".into(),
            commit_hash: "abc1234".into(),
            commit_message: "a < b".into(),
            commit_time: Some("THEN".into()),
        }
    }

    #[test]
    fn defaults_reproduce_plain_variant() {
        let cfg = Config::resolve(Layer::default(), Layer::default()).unwrap();
        assert_eq!(cfg.output, PathBuf::from("overrides/timestamp.txt"));
        assert_eq!(cfg.zone, Zone::sgt());
        assert_eq!(cfg.precision, Precision::Minutes);
        assert_eq!(cfg.repo, PathBuf::from("."));
        assert!(!cfg.strict);
        assert_eq!(cfg.template.render(&sample()), "Last updated: NOW (abc1234 - a < b)");
    }

    #[test]
    fn file_layer_is_parsed() {
        let file = Layer::from_toml(
            r#"
output = "../overrides/timestamp.txt"
preset = "footer"
seconds = true
strict = true
repo = ".."

[timezone]
label = "UTC"
offset_minutes = 0
"#,
        )
        .unwrap();
        let cfg = Config::resolve(Layer::default(), file).unwrap();
        assert_eq!(cfg.output, PathBuf::from("../overrides/timestamp.txt"));
        assert_eq!(cfg.precision, Precision::Seconds);
        assert!(cfg.strict);
        assert_eq!(cfg.repo, PathBuf::from(".."));
        assert_eq!(cfg.zone, Zone::from_minutes(0, "UTC").unwrap());
        // values go in verbatim unless escaping is asked for
        assert_eq!(
            cfg.template.render(&sample()),
            "Last updated: NOW<br>Commit: a < b<br>Time: THEN"
        );
    }

    #[test]
    fn cli_overrides_file() {
        let file = Layer::from_toml("preset = \"html\"\noutput = \"a.txt\"\nseconds = true").unwrap();
        let cli = Layer {
            preset: Some(Preset::Plain),
            output: Some(PathBuf::from("b.txt")),
            seconds: Some(false),
            ..Layer::default()
        };
        let cfg = Config::resolve(cli, file).unwrap();
        assert_eq!(cfg.output, PathBuf::from("b.txt"));
        assert_eq!(cfg.precision, Precision::Minutes);
        assert!(cfg.template.render(&sample()).starts_with("Last updated: NOW ("));
    }

    #[test]
    fn cli_preset_beats_file_template() {
        let file = Layer::from_toml("template = \"{now}\"").unwrap();
        let cli = Layer {
            preset: Some(Preset::Footer),
            ..Layer::default()
        };
        let cfg = Config::resolve(cli, file).unwrap();
        assert!(cfg.template.render(&sample()).contains("<br>Commit:"));
    }

    #[test]
    fn custom_template_with_explicit_escape() {
        let file = Layer::from_toml("template = \"<i>{subject}</i>\"\nescape = \"html\"").unwrap();
        let cfg = Config::resolve(Layer::default(), file).unwrap();
        assert_eq!(cfg.template.render(&sample()), "<i>a &lt; b</i>");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Layer::from_toml("outptu = \"x\"").unwrap_err();
        assert!(matches!(err, StampError::Config(_)));
    }

    #[test]
    fn bad_template_fails_resolution() {
        let file = Layer::from_toml("template = \"{author}\"").unwrap();
        let err = Config::resolve(Layer::default(), file).unwrap_err();
        assert!(matches!(err, StampError::UnknownField { .. }), "{:?}", err);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Layer::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"), "{}", err);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "preset = \"fancy\"\n").unwrap();
        let err = Layer::load(Some(&path)).unwrap_err();
        assert!(matches!(err, StampError::Config(_)), "{:?}", err);
        assert!(err.to_string().contains("broken.toml"), "{}", err);
    }

    #[test]
    fn html_escape_is_opt_in_for_presets() {
        let file = Layer::from_toml("preset = \"footer\"\nescape = \"html\"").unwrap();
        let cfg = Config::resolve(Layer::default(), file).unwrap();
        assert_eq!(
            cfg.template.render(&sample()),
            "Last updated: NOW<br>Commit: a &lt; b<br>Time: THEN"
        );
    }

    #[test]
    fn explicit_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp.toml");
        fs::write(&path, "preset = \"html\"\n").unwrap();
        let layer = Layer::load(Some(&path)).unwrap();
        assert_eq!(layer.preset, Some(Preset::Html));
    }
}
