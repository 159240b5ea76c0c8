use std::{fs, path::Path, process::ExitCode};

use anyhow::Context;

use gantry_core::PipelineOutcome;
use gantry_model::{DeployConfig, Env, Environment};

/// Prefix of process variables injected into the template.
pub const ENV_PREFIX: &str = "GANTRY_ENV_";

pub fn load(path: &Path) -> anyhow::Result<DeployConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading deployment file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing deployment file {}", path.display()))
}

/// Collect `GANTRY_ENV_<NAME>=value` pairs as `NAME=value`.
pub fn injected_env(vars: impl IntoIterator<Item = (String, String)>) -> Env {
    let mut env = Env::new();
    for (key, value) in vars {
        if let Some(name) = key.strip_prefix(ENV_PREFIX).filter(|n| !n.is_empty()) {
            env.insert(name, value);
        }
    }
    env
}

/// One validated config per requested environment, in request order, duplicates dropped.
pub fn expand(
    base: DeployConfig,
    environments: &[Environment],
    image: Option<&str>,
    extra: &Env,
) -> anyhow::Result<Vec<DeployConfig>> {
    let mut base = base.with_env(extra);
    if let Some(image) = image {
        base = base.with_image(image);
    }

    let mut targets: Vec<Environment> = Vec::new();
    for env in environments {
        if !targets.contains(env) {
            targets.push(env.clone());
        }
    }
    if targets.is_empty() {
        targets.push(base.environment.clone());
    }

    targets
        .into_iter()
        .map(|env| {
            let cfg = base.clone().with_environment(env);
            cfg.validate()
                .with_context(|| format!("invalid configuration for '{}'", cfg.environment))?;
            Ok(cfg)
        })
        .collect()
}

/// 0 when every run succeeded, 1 on any failure, 2 when the worst result is inconclusive.
pub fn exit_code<'a>(outcomes: impl IntoIterator<Item = &'a PipelineOutcome>) -> ExitCode {
    let worst = outcomes
        .into_iter()
        .map(|o| match o {
            PipelineOutcome::Succeeded(_) => 0,
            PipelineOutcome::Inconclusive(_) => 2,
            PipelineOutcome::Failed(_) => 3,
        })
        .max()
        .unwrap_or(0);
    match worst {
        0 => ExitCode::SUCCESS,
        2 => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{CoreError, Stage, StageFailure};

    fn base() -> DeployConfig {
        serde_json::from_str(
            r#"{
                "environment": "dev",
                "workload": "gpu-probe",
                "image": "repo/img:sha123",
                "volume": {"zone": "Z1"},
                "env": {"MODE": "gpu"}
            }"#,
        )
        .unwrap()
    }

    fn env(name: &str) -> Environment {
        name.parse().unwrap()
    }

    #[test]
    fn collects_prefixed_variables_only() {
        let env = injected_env([
            ("GANTRY_ENV_HF_TOKEN".to_string(), "secret".to_string()),
            ("GANTRY_ENV_".to_string(), "ignored".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ]);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("HF_TOKEN").unwrap().expose(), "secret");
    }

    #[test]
    fn defaults_to_file_environment() {
        let plans = expand(base(), &[], None, &Env::new()).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].environment.as_str(), "dev");
    }

    #[test]
    fn overrides_apply_to_every_environment() {
        let extra = Env::single("HF_TOKEN", "t");
        let plans = expand(
            base(),
            &[env("staging"), env("production"), env("staging")],
            Some("repo/img:sha456"),
            &extra,
        )
        .unwrap();

        let names: Vec<_> = plans.iter().map(|c| c.environment.as_str()).collect();
        assert_eq!(names, ["staging", "production"]);
        for cfg in &plans {
            assert_eq!(cfg.image, "repo/img:sha456");
            assert_eq!(cfg.env.get("MODE").unwrap().expose(), "gpu");
            assert_eq!(cfg.env.get("HF_TOKEN").unwrap().expose(), "t");
        }
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = expand(base(), &[], Some(" "), &Env::new()).unwrap_err();
        assert!(err.to_string().contains("invalid configuration for 'dev'"));
    }

    #[test]
    fn failure_dominates_exit_code() {
        let failed = PipelineOutcome::Failed(StageFailure {
            environment: env("dev"),
            stage: Stage::Volume,
            resource: None,
            error: CoreError::Cancelled,
        });
        assert_eq!(exit_code([&failed]), ExitCode::FAILURE);
        assert_eq!(exit_code(&[] as &[PipelineOutcome]), ExitCode::SUCCESS);
    }
}
