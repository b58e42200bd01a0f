#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::command::{DEFAULT_FFMPEG_BIN, DEFAULT_YTDLP_BIN, ToolNames};
use crate::details::DEFAULT_DETAILS_ENDPOINT;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENDPOINT_KEY: &str = "CLIPLINE_ENDPOINT";
pub const TIMEOUT_KEY: &str = "CLIPLINE_TIMEOUT_SECS";
pub const YTDLP_BIN_KEY: &str = "CLIPLINE_YTDLP_BIN";
pub const FFMPEG_BIN_KEY: &str = "CLIPLINE_FFMPEG_BIN";

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub details_endpoint: String,
    pub request_timeout: Duration,
    pub tools: ToolNames,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub details_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    Ok(build_runtime_settings_with_overrides(
        &file_vars,
        env_var_string,
        overrides,
    ))
}

#[cfg(test)]
fn build_runtime_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> RuntimeSettings {
    build_runtime_settings_with_overrides(file_vars, env_lookup, RuntimeOverrides::default())
}

fn build_runtime_settings_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> RuntimeSettings {
    let details_endpoint = overrides
        .details_endpoint
        .and_then(non_blank)
        .or_else(|| lookup_value(ENDPOINT_KEY, file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_DETAILS_ENDPOINT.to_string());
    let timeout_secs = overrides
        .timeout_secs
        .filter(|secs| *secs > 0)
        .or_else(|| {
            lookup_value(TIMEOUT_KEY, file_vars, &env_lookup)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
        })
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let ytdlp = lookup_value(YTDLP_BIN_KEY, file_vars, &env_lookup)
        .unwrap_or_else(|| DEFAULT_YTDLP_BIN.to_string());
    let ffmpeg = lookup_value(FFMPEG_BIN_KEY, file_vars, &env_lookup)
        .unwrap_or_else(|| DEFAULT_FFMPEG_BIN.to_string());

    RuntimeSettings {
        details_endpoint,
        request_timeout: Duration::from_secs(timeout_secs),
        tools: ToolNames { ytdlp, ffmpeg },
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned().and_then(non_blank))
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn settings_from(contents: &str) -> RuntimeSettings {
        let cfg = make_config(contents);
        let vars = read_env_file(cfg.path()).unwrap();
        build_runtime_settings(&vars, |_| None)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let settings = settings_from("");
        assert_eq!(settings.details_endpoint, DEFAULT_DETAILS_ENDPOINT);
        assert_eq!(
            settings.request_timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(settings.tools, ToolNames::default());
    }

    #[test]
    fn config_file_sets_every_value() {
        let settings = settings_from(
            "CLIPLINE_ENDPOINT=\"http://127.0.0.1:9000/embed\"\n\
             CLIPLINE_TIMEOUT_SECS=\"3\"\n\
             CLIPLINE_YTDLP_BIN=\"/opt/yt-dlp\"\n\
             CLIPLINE_FFMPEG_BIN=\"/opt/ffmpeg\"\n",
        );
        assert_eq!(settings.details_endpoint, "http://127.0.0.1:9000/embed");
        assert_eq!(settings.request_timeout, Duration::from_secs(3));
        assert_eq!(settings.tools.ytdlp, "/opt/yt-dlp");
        assert_eq!(settings.tools.ffmpeg, "/opt/ffmpeg");
    }

    #[test]
    fn invalid_timeout_defaults() {
        for raw in ["nope", "0", "-3", ""] {
            let settings = settings_from(&format!("CLIPLINE_TIMEOUT_SECS=\"{raw}\"\n"));
            assert_eq!(
                settings.request_timeout,
                Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn blank_values_are_unset() {
        let settings = settings_from("CLIPLINE_ENDPOINT=\"   \"\nCLIPLINE_FFMPEG_BIN=''\n");
        assert_eq!(settings.details_endpoint, DEFAULT_DETAILS_ENDPOINT);
        assert_eq!(settings.tools.ffmpeg, DEFAULT_FFMPEG_BIN);
    }

    #[test]
    fn build_runtime_settings_prefers_env_over_file() {
        let vars =
            read_env_file(make_config("CLIPLINE_YTDLP_BIN=\"/file/yt-dlp\"\n").path()).unwrap();
        let settings = build_runtime_settings(&vars, |key| {
            if key == YTDLP_BIN_KEY {
                Some("/env/yt-dlp".to_string())
            } else {
                None
            }
        });
        assert_eq!(settings.tools.ytdlp, "/env/yt-dlp");
    }

    #[test]
    fn read_env_file_handles_export_and_quotes() {
        let cfg = make_config(
            r#"
            export CLIPLINE_ENDPOINT="https://noembed.example/embed"
            CLIPLINE_YTDLP_BIN='/usr/bin/yt-dlp'
            CLIPLINE_FFMPEG_BIN =  "ffmpeg7"
            CLIPLINE_TIMEOUT_SECS=5
            # comment
            INVALID_LINE
            "#,
        );
        let vars = read_env_file(cfg.path()).unwrap();
        assert_eq!(
            vars.get(ENDPOINT_KEY).unwrap(),
            "https://noembed.example/embed"
        );
        assert_eq!(vars.get(YTDLP_BIN_KEY).unwrap(), "/usr/bin/yt-dlp");
        assert_eq!(vars.get(FFMPEG_BIN_KEY).unwrap(), "ffmpeg7");
        assert_eq!(vars.get(TIMEOUT_KEY).unwrap(), "5");
        assert!(!vars.contains_key("INVALID_LINE"));
    }

    #[test]
    fn read_env_file_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&dir.path().join("missing.env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn read_env_file_reports_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_env_file(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Reading "));
    }

    #[test]
    fn build_runtime_settings_override_precedence() {
        let mut vars = HashMap::new();
        vars.insert(ENDPOINT_KEY.to_string(), "https://file/embed".to_string());
        vars.insert(TIMEOUT_KEY.to_string(), "7".to_string());

        let overrides = RuntimeOverrides {
            details_endpoint: Some("https://override/embed".into()),
            timeout_secs: None,
            env_path: None,
        };

        let settings = build_runtime_settings_with_overrides(
            &vars,
            |key| {
                if key == TIMEOUT_KEY {
                    Some("8".to_string())
                } else if key == ENDPOINT_KEY {
                    Some("https://env/embed".to_string())
                } else {
                    None
                }
            },
            overrides,
        );

        assert_eq!(settings.details_endpoint, "https://override/embed");
        assert_eq!(settings.request_timeout, Duration::from_secs(8));
    }

    #[test]
    fn build_runtime_settings_ignores_blank_and_zero_overrides() {
        let vars = read_env_file(
            make_config("CLIPLINE_ENDPOINT=\"https://file/embed\"\nCLIPLINE_TIMEOUT_SECS=4\n")
                .path(),
        )
        .unwrap();
        let settings = build_runtime_settings_with_overrides(
            &vars,
            |_| None,
            RuntimeOverrides {
                details_endpoint: Some("   ".into()),
                timeout_secs: Some(0),
                ..RuntimeOverrides::default()
            },
        );
        assert_eq!(settings.details_endpoint, "https://file/embed");
        assert_eq!(settings.request_timeout, Duration::from_secs(4));
    }

    #[test]
    fn resolve_runtime_settings_applies_overrides_over_env_path() {
        let cfg = make_config(
            "CLIPLINE_ENDPOINT=\"https://file/embed\"\nCLIPLINE_TIMEOUT_SECS=\"4\"\n",
        );
        let settings = resolve_runtime_settings(RuntimeOverrides {
            details_endpoint: Some("https://override/embed".into()),
            timeout_secs: Some(9),
            env_path: Some(cfg.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(settings.details_endpoint, "https://override/embed");
        assert_eq!(settings.request_timeout, Duration::from_secs(9));
    }

    #[test]
    fn resolve_runtime_settings_reads_given_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_runtime_settings(RuntimeOverrides {
            env_path: Some(dir.path().to_path_buf()),
            ..RuntimeOverrides::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }
}
