//! sparkmon - bootstrap and refresh Prometheus/Grafana monitoring on
//! Dataproc Spark clusters.
//!
//! The core is the cluster configuration orchestrator: discover topology
//! and the dynamically bound Spark UI port, render node-specific config
//! artifacts, distribute them through a GCS bucket, and apply the
//! configuration idempotently on master and worker roles. Everything
//! external (gcloud, gsutil, ssh, the monitoring binaries) is reached only
//! through its command-line contract.

pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exec;
pub mod output;
pub mod provision;
pub mod storage;
pub mod template;
pub mod topology;
