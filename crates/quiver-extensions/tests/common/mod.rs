//! Common test infrastructure for quiver-extensions tests

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use quiver_core::types::{AuthMethod, RuntimeConfig};
use quiver_extensions::{
    ArchiveInstaller, PackageInstallOutcome, PackageInstallRequest, PackageInstaller,
};
use quiver_fetch::{GuardedFetcher, SsrfPolicy};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOOPBACK: &str = "127.0.0.1";
pub const CATALOG_PATH: &str = "/catalog.json";

/// Archive installer allowed to reach the local mock server
pub fn local_archives() -> ArchiveInstaller {
    let fetcher = GuardedFetcher::new(SsrfPolicy::strict().with_allowed_host(LOOPBACK));
    ArchiveInstaller::new(fetcher, Duration::from_secs(5), Duration::from_secs(5))
}

/// Build a tar archive from `(path, contents)` pairs
pub fn tar_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

/// Same as [`tar_bytes`], gzip-compressed
pub fn tar_gz_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    gzip(&tar_bytes(files))
}

/// A gzip archive with one entry whose raw name is written verbatim, so
/// names the tar builder would refuse (`..`) can be produced
pub fn tar_gz_with_raw_name(raw_name: &str, contents: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    let name = raw_name.as_bytes();
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, contents.as_bytes()).unwrap();
    gzip(&builder.into_inner().unwrap())
}

fn gzip(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Archive of a valid skill package under a `package/` top-level directory
pub fn skill_archive(body: &str) -> Vec<u8> {
    tar_gz_bytes(&[
        ("package/SKILL.md", body),
        ("package/scripts/run.sh", "echo ok\n"),
    ])
}

pub async fn mock_bytes(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn mock_catalog(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Entries left in `dir` by an interrupted install
pub fn leftover_work_dirs(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with(".quiver-install-"))
                .collect()
        })
        .unwrap_or_default()
}

/// Runtime settings rooted at `home` and pointing at the mock catalog
pub fn runtime_config(home: &Path, server: &MockServer) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.paths.home = Some(home.to_path_buf());
    config.marketplace.catalog_url = Some(format!("{}{}", server.uri(), CATALOG_PATH));
    config.marketplace.auth_method = AuthMethod::None;
    config.network.allowed_hosts = vec![LOOPBACK.to_string()];
    config.network.download_timeout_secs = 5;
    config.network.http_timeout_secs = 5;
    config
}

/// Catalog with one skill served by `server` and two memory extensions
pub fn catalog_json(server: &MockServer, skill_version: &str) -> Value {
    json!({
        "version": 1,
        "extensions": [
            {
                "id": "memory-core",
                "name": "Core Memory",
                "packageSpec": "@acme/memory-core@1.0.0",
                "version": "1.0.0",
                "kind": "memory"
            },
            {
                "id": "memory-lance",
                "name": "LanceDB Memory",
                "packageSpec": "@acme/memory-lance@1.4.0",
                "version": "1.4.0",
                "kind": "memory"
            },
            {
                "id": "slack",
                "name": "Slack",
                "version": "2.0.0",
                "kind": "channel"
            }
        ],
        "skills": [
            {
                "name": "good-skill",
                "archiveUrl": format!("{}/skills/good-skill.tgz", server.uri()),
                "version": skill_version
            }
        ]
    })
}

/// Package installer that writes a marker file instead of running npm
#[derive(Clone, Default)]
pub struct FakePackageInstaller {
    pub requests: Arc<Mutex<Vec<PackageInstallRequest>>>,
}

impl FakePackageInstaller {
    pub fn specs(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.spec.clone())
            .collect()
    }
}

#[async_trait]
impl PackageInstaller for FakePackageInstaller {
    async fn install(
        &self,
        request: &PackageInstallRequest,
    ) -> quiver_extensions::Result<PackageInstallOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        std::fs::create_dir_all(&request.install_dir).unwrap();
        std::fs::write(request.install_dir.join("installed.txt"), &request.spec).unwrap();
        Ok(PackageInstallOutcome {
            install_path: request.install_dir.clone(),
            resolved_spec: Some(request.spec.clone()),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
