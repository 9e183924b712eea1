//! End-to-end runs against documents on disk.
//!
//! Each test lays out a `config_files/` directory the way the collector image
//! ships it and drives a [`Runner`] over it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use otelprep::{AuxiliaryStatus, RunOptions, Runner};
use otelprep_config::{Environment, Profile};
use otelprep_core::DocumentError;
use otelprep_core::{load, Document};
use otelprep_patch::SequentialPorts;
use tempfile::TempDir;

const FILE_TOKEN: &str = "rDRJEidvpIbecUwshyCnGkuUjbymiHev";
const ENV_TOKEN: &str = "QwErTyUiOpAsDfGhJkLzXcVbNmQwErTy";

const CONFIG: &str = r"
otel:
  logzio_region: eu
  token: rDRJEidvpIbecUwshyCnGkuUjbymiHev
  p8s_logzio_name: staging
  scrape_interval: 300
pg:
  instances:
    - pg_host: db1
      pg_port: 5432
      pg_user: monitor
      pg_password: pw1
      pg_labels:
        - env: prod
    - pg_host: db2
      pg_port: 5432
      pg_user: monitor
cloudwatch:
  aws_region: eu-west-1
  rds_instances: db-1, db-2
";

const COLLECTOR: &str = r"
# Collector configuration. This comment is long enough that the rewritten
# document ends up shorter than the template, which exercises truncation of
# the old trailing bytes when the file is rewritten in place.
receivers:
  prometheus_exec/postgres:
    exec: ./postgres_exporter
  prometheus:
    config:
      global:
        scrape_interval: 60s
exporters:
  prometheusremotewrite:
    endpoint: https://placeholder.invalid:8053
    timeout: 30s
    headers:
      Authorization: Bearer placeholder
    external_labels:
      p8s_logzio_name: placeholder
service:
  telemetry:
    logs:
      level: info
  pipelines:
    metrics:
      receivers: [prometheus]
      exporters: [prometheusremotewrite]
";

const AUXILIARY: &str = r"
region: placeholder
period_seconds: 60
range_seconds: 60
delay_seconds: 60
metrics: []
";

const FRAGMENTS: &str = r"
RDS:
  - aws_namespace: AWS/RDS
    aws_metric_name: CPUUtilization
    aws_dimensions: [DBInstanceIdentifier]
    aws_statistics: [Average]
";

struct Layout {
    _dir: TempDir,
    root: PathBuf,
}

impl Layout {
    fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("config_files");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("config.yml"), config).unwrap();
        fs::write(root.join("otel-config.yml"), COLLECTOR).unwrap();
        fs::write(root.join("cloudwatch.yml"), AUXILIARY).unwrap();
        fs::write(root.join("namespaces.yml"), FRAGMENTS).unwrap();
        Self { _dir: dir, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn options(&self, profile: Profile) -> RunOptions {
        RunOptions::default()
            .with_profile(profile)
            .with_config(self.path("config.yml"))
            .with_collector(self.path("otel-config.yml"))
            .with_auxiliary(self.path("cloudwatch.yml"))
            .with_fragments(self.path("namespaces.yml"))
            .with_handoff(self.path("handoff.env"))
    }

    fn runner(&self, profile: Profile, env: Environment) -> Runner {
        Runner::new(self.options(profile), env)
    }
}

fn run(runner: &Runner) -> otelprep::RunReport {
    let input = runner.load_config().unwrap();
    let config = runner.resolve(&input).unwrap();
    runner
        .apply_with_ports(&config, SequentialPorts::starting_at(9187))
        .unwrap()
}

fn handoff(layout: &Layout) -> HashMap<String, String> {
    dotenvy::from_path_iter(layout.path("handoff.env"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn text(document: &Document, path: &[&str]) -> String {
    document
        .get_path(path)
        .and_then(Document::as_str)
        .unwrap_or_default()
        .to_string()
}

fn receiver_count(path: &Path) -> usize {
    load(path)
        .unwrap()
        .get("receivers")
        .and_then(Document::as_mapping)
        .map_or(0, |m| m.len())
}

#[test]
fn test_env_token_with_file_region() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(
        Profile::POSTGRES_MULTI,
        Environment::new().with_var("TOKEN", ENV_TOKEN),
    );

    let report = run(&runner);
    assert_eq!(report.receivers, 1);
    assert_eq!(report.dropped_instances, 1);
    assert_eq!(report.auxiliary, None);

    let patched = load(layout.path("otel-config.yml")).unwrap();
    let exporter = ["exporters", "prometheusremotewrite"];
    assert_eq!(
        text(&patched, &[exporter[0], exporter[1], "endpoint"]),
        "https://listener-eu.logz.io:8053"
    );
    assert_eq!(
        text(&patched, &[exporter[0], exporter[1], "headers", "Authorization"]),
        format!("Bearer {ENV_TOKEN}")
    );
    assert_eq!(text(&patched, &[exporter[0], exporter[1], "timeout"]), "120s");
    assert!(!fs::read_to_string(layout.path("otel-config.yml"))
        .unwrap()
        .contains(FILE_TOKEN));
}

#[test]
fn test_rewrite_leaves_no_stale_bytes() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(Profile::POSTGRES_MULTI, Environment::new());
    run(&runner);

    let written = fs::read_to_string(layout.path("otel-config.yml")).unwrap();
    assert!(!written.contains("placeholder"));
    assert!(!written.contains("truncation"));
    assert!(load(layout.path("otel-config.yml")).is_ok());
}

#[test]
fn test_rerun_does_not_accumulate_receivers() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(Profile::POSTGRES_MULTI, Environment::new());

    run(&runner);
    let first = receiver_count(&layout.path("otel-config.yml"));
    run(&runner);
    let second = receiver_count(&layout.path("otel-config.yml"));

    assert_eq!(first, 3);
    assert_eq!(first, second);

    let pipeline = load(layout.path("otel-config.yml")).unwrap();
    let receivers = pipeline
        .get_path(&["service", "pipelines", "metrics", "receivers"])
        .and_then(Document::as_sequence)
        .unwrap();
    assert_eq!(receivers.len(), 2);
}

#[test]
fn test_invalid_config_touches_nothing() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(
        Profile::POSTGRES_MULTI,
        Environment::new().with_var("REMOTE_TIMEOUT", "90"),
    );

    let err = runner.run().unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("otel.remote_timeout"));
    assert_eq!(fs::read_to_string(layout.path("otel-config.yml")).unwrap(), COLLECTOR);
}

#[test]
fn test_template_error_touches_nothing() {
    let layout = Layout::new(CONFIG);
    let broken = COLLECTOR.replace("  telemetry:\n    logs:\n      level: info\n", "");
    fs::write(layout.path("otel-config.yml"), &broken).unwrap();

    let runner = layout.runner(Profile::POSTGRES_MULTI, Environment::new());
    let input = runner.load_config().unwrap();
    let config = runner.resolve(&input).unwrap();
    let err = runner
        .apply_with_ports(&config, SequentialPorts::starting_at(9187))
        .unwrap_err();

    assert!(err.to_string().contains("service.telemetry"));
    assert_eq!(fs::read_to_string(layout.path("otel-config.yml")).unwrap(), broken);
}

#[test]
fn test_rds_profile_patches_both_documents() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(Profile::RDS, Environment::new());

    let report = run(&runner);
    assert_eq!(report.auxiliary, Some(AuxiliaryStatus::Patched));

    let collector = load(layout.path("otel-config.yml")).unwrap();
    assert_eq!(
        text(&collector, &["receivers", "prometheus", "config", "global", "scrape_interval"]),
        "300s"
    );

    let auxiliary = load(layout.path("cloudwatch.yml")).unwrap();
    assert_eq!(text(&auxiliary, &["region"]), "eu-west-1");
    let metrics = auxiliary.get("metrics").and_then(Document::as_sequence).unwrap();
    assert_eq!(metrics.len(), 1);

    run(&runner);
    let auxiliary = load(layout.path("cloudwatch.yml")).unwrap();
    let metrics = auxiliary.get("metrics").and_then(Document::as_sequence).unwrap();
    assert_eq!(metrics.len(), 1);
}

#[test]
fn test_custom_auxiliary_document_is_left_alone() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(
        Profile::CLOUDWATCH,
        Environment::new().with_var("CUSTOM_CONFIG", "true"),
    );

    let report = run(&runner);
    assert_eq!(report.auxiliary, Some(AuxiliaryStatus::Bypassed));
    assert_eq!(report.receivers, 0);
    assert_eq!(fs::read_to_string(layout.path("cloudwatch.yml")).unwrap(), AUXILIARY);
}

#[test]
fn test_single_profile_from_env() {
    let layout = Layout::new(CONFIG);
    let env = Environment::new()
        .with_var("PG_HOST", "primary")
        .with_var("PG_PORT", "6432")
        .with_var("PG_USER", "monitor")
        .with_var("PG_PASSWORD", "pw")
        .with_var("LOGZIO_LOG_TOKEN", "log-token");
    let runner = layout.runner(Profile::POSTGRES, env);

    let report = run(&runner);
    assert_eq!(report.receivers, 1);

    let collector = load(layout.path("otel-config.yml")).unwrap();
    let receiver = collector
        .get_path(&["receivers", "prometheus_exec/postgres"])
        .unwrap();
    assert_eq!(receiver.get("port").and_then(Document::as_i64), Some(9187));
    let env = receiver.get("env").and_then(Document::as_sequence).unwrap();
    assert_eq!(
        env[0].get("value").and_then(Document::as_str),
        Some("postgresql://monitor:pw@primary:6432/postgres")
    );
}

#[test]
fn test_repeated_instance_counts_one_receiver() {
    let config = CONFIG.replace(
        "    - pg_host: db2\n      pg_port: 5432\n      pg_user: monitor\n",
        "    - pg_host: db1\n      pg_port: 5432\n      pg_user: monitor\n      pg_password: other\n      pg_labels:\n        - env: staging\n",
    );
    let layout = Layout::new(&config);
    let runner = layout.runner(Profile::POSTGRES_MULTI, Environment::new());

    let report = run(&runner);
    assert_eq!(report.receivers, 1);
    assert_eq!(report.dropped_instances, 1);
    // `prometheus_exec/postgres`, `prometheus` and the one generated receiver.
    assert_eq!(receiver_count(&layout.path("otel-config.yml")), 3);

    let written = fs::read_to_string(layout.path("otel-config.yml")).unwrap();
    assert!(written.contains("env=prod"));
    assert!(!written.contains("env=staging"));
}

#[test]
fn test_read_only_custom_auxiliary_document() {
    let layout = Layout::new(CONFIG);
    let aux = layout.path("cloudwatch.yml");
    let mut permissions = fs::metadata(&aux).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&aux, permissions).unwrap();

    let runner = layout.runner(
        Profile::CLOUDWATCH,
        Environment::new().with_var("CUSTOM_CONFIG", "true"),
    );
    let report = run(&runner);

    assert_eq!(report.auxiliary, Some(AuxiliaryStatus::Bypassed));
    assert_eq!(fs::read_to_string(&aux).unwrap(), AUXILIARY);
    assert!(fs::metadata(&aux).unwrap().permissions().readonly());
}

#[test]
fn test_missing_custom_auxiliary_document_touches_nothing() {
    let layout = Layout::new(CONFIG);
    fs::remove_file(layout.path("cloudwatch.yml")).unwrap();

    let runner = layout.runner(
        Profile::CLOUDWATCH,
        Environment::new().with_var("CUSTOM_CONFIG", "true"),
    );
    let input = runner.load_config().unwrap();
    let config = runner.resolve(&input).unwrap();
    let err = runner
        .apply_with_ports(&config, SequentialPorts::starting_at(9187))
        .unwrap_err();

    assert!(matches!(err, otelprep::RunError::Document(DocumentError::Io { .. })));
    assert_eq!(fs::read_to_string(layout.path("otel-config.yml")).unwrap(), COLLECTOR);
}

#[test]
fn test_single_profile_writes_log_shipping_handoff() {
    let config = format!(
        "{CONFIG}fluentd:\n  logzio_log_token: file-log-token\n  logzio_type: pg-logs\n"
    );
    let layout = Layout::new(&config);
    let env = Environment::new()
        .with_var("PG_HOST", "primary")
        .with_var("PG_PORT", "5432")
        .with_var("PG_USER", "monitor")
        .with_var("PG_PASSWORD", "pw");
    let runner = layout.runner(Profile::POSTGRES, env);

    let report = run(&runner);
    assert_eq!(report.handoff_vars, 13);

    let handoff = handoff(&layout);
    assert_eq!(handoff["LOGZIO_LOG_TOKEN"], "file-log-token");
    assert_eq!(handoff["LOGZIO_TYPE"], "pg-logs");
    assert_eq!(handoff["LOGZIO_LOG_LISTENER"], "https://listener-eu.logz.io:8071");
    assert_eq!(handoff["RETRY_FOREVER"], "true");
}

#[test]
fn test_aws_credentials_handed_off() {
    let layout = Layout::new(CONFIG);
    let env = Environment::new()
        .with_var("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")
        .with_var("AWS_SECRET_ACCESS_KEY", "wJalr$EXAMPLE");
    let runner = layout.runner(Profile::RDS, env);

    let report = run(&runner);
    assert_eq!(report.handoff_vars, 2);

    let handoff = handoff(&layout);
    assert_eq!(handoff["AWS_ACCESS_KEY_ID"], "AKIAEXAMPLE");
    assert_eq!(handoff["AWS_SECRET_ACCESS_KEY"], "wJalr$EXAMPLE");
    assert!(!fs::read_to_string(layout.path("cloudwatch.yml"))
        .unwrap()
        .contains("wJalr"));
}

#[test]
fn test_no_handoff_file_without_variables() {
    let layout = Layout::new(CONFIG);
    let runner = layout.runner(Profile::POSTGRES_MULTI, Environment::new());

    let report = run(&runner);
    assert_eq!(report.handoff_vars, 0);
    assert!(!layout.path("handoff.env").exists());
}
