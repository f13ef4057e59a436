//! Scripted backend for driving pollers in tests

#![allow(dead_code)]

use async_trait::async_trait;
use carpentry_client::ClientError;
use carpentry_core::domain::build::{Build, BuildStatus};
use carpentry_core::domain::builder::Builder;
use carpentry_core::domain::user::User;
use carpentry_core::dto::build::{BuildOutput, ClearedBuilds, TriggerBuild};
use carpentry_core::dto::builder::{CreateBuilder, EditBuilder};
use carpentry_core::dto::preferences::Preferences;
use carpentry_sync::{CarpentryApi, SyncConfig, SyncContext, SyncEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use uuid::Uuid;

/// One scripted response
#[derive(Debug, Clone)]
pub enum Step {
    Output(BuildOutput),
    /// HTTP failure with an optional JSON body
    Status(u16, Option<String>),
    /// No response at all
    Unreachable,
}

impl Step {
    pub fn running(stdout: &str) -> Self {
        Step::Output(BuildOutput {
            status: Some(BuildStatus::Running),
            stdout: stdout.to_string(),
            done: false,
        })
    }

    pub fn finished(stdout: &str) -> Self {
        Step::Output(BuildOutput {
            status: Some(BuildStatus::Succeeded),
            stdout: stdout.to_string(),
            done: true,
        })
    }

    fn fail(&self, endpoint: &str) -> Option<ClientError> {
        match self {
            Step::Output(_) => None,
            Step::Status(status, body) => Some(ClientError::api_error(
                *status,
                endpoint,
                body.clone().unwrap_or_default(),
            )),
            Step::Unreachable => Some(ClientError::unreachable(endpoint, "connection refused")),
        }
    }
}

#[derive(Default)]
struct State {
    /// Output script per build; the last step repeats forever
    scripts: HashMap<Uuid, Vec<Step>>,
    output_calls: HashMap<Uuid, usize>,
    builders: Vec<Builder>,
    builds: HashMap<Uuid, Vec<Build>>,
    list_builders_calls: usize,
    list_builds_calls: HashMap<Uuid, usize>,
    /// Failure returned by every call other than output fetches
    failure: Option<Step>,
    preferences: Preferences,
}

/// In-memory backend with scripted build output
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output fetches block until a permit is added to `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            state: Mutex::default(),
            gate: Some(gate),
        }
    }

    pub fn script(&self, build_id: Uuid, steps: Vec<Step>) {
        self.state.lock().unwrap().scripts.insert(build_id, steps);
    }

    pub fn set_builders(&self, builders: Vec<Builder>) {
        self.state.lock().unwrap().builders = builders;
    }

    pub fn set_builds(&self, builder_id: Uuid, builds: Vec<Build>) {
        self.state.lock().unwrap().builds.insert(builder_id, builds);
    }

    pub fn fail_with(&self, step: Step) {
        self.state.lock().unwrap().failure = Some(step);
    }

    pub fn output_calls(&self, build_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .output_calls
            .get(&build_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn list_builders_calls(&self) -> usize {
        self.state.lock().unwrap().list_builders_calls
    }

    pub fn list_builds_calls(&self, builder_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .list_builds_calls
            .get(&builder_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn preferences(&self) -> Preferences {
        self.state.lock().unwrap().preferences.clone()
    }

    fn check(&self, endpoint: &str) -> Result<(), ClientError> {
        match self.state.lock().unwrap().failure.as_ref().and_then(|s| s.fail(endpoint)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CarpentryApi for FakeApi {
    async fn list_builders(&self) -> Result<Vec<Builder>, ClientError> {
        self.state.lock().unwrap().list_builders_calls += 1;
        self.check("/api/builders")?;
        Ok(self.state.lock().unwrap().builders.clone())
    }

    async fn get_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        let endpoint = format!("/api/builder/{}", builder_id);
        self.check(&endpoint)?;
        self.state
            .lock()
            .unwrap()
            .builders
            .iter()
            .find(|b| b.id == builder_id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, endpoint, r#"{"error": "not found"}"#))
    }

    async fn create_builder(&self, req: &CreateBuilder) -> Result<Builder, ClientError> {
        self.check("/api/builder")?;
        let created = Builder {
            id: Uuid::new_v4(),
            name: req.name.clone(),
            git_uri: req.git_uri.clone(),
            shell_script: req.shell_script.clone(),
            generate_ssh_keys: req.generate_ssh_keys,
            status: None,
            branch: None,
            id_rsa_public: None,
        };
        self.state.lock().unwrap().builders.push(created.clone());
        Ok(created)
    }

    async fn edit_builder(
        &self,
        builder_id: Uuid,
        req: &EditBuilder,
    ) -> Result<Builder, ClientError> {
        let mut builder = self.get_builder(builder_id).await?;
        if let Some(name) = &req.name {
            builder.name = name.clone();
        }
        Ok(builder)
    }

    async fn delete_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        let builder = self.get_builder(builder_id).await?;
        self.state.lock().unwrap().builders.retain(|b| b.id != builder_id);
        Ok(builder)
    }

    async fn trigger_build(
        &self,
        builder_id: Uuid,
        req: &TriggerBuild,
    ) -> Result<Build, ClientError> {
        self.check(&format!("/api/builder/{}/build", builder_id))?;
        let mut created = build(builder_id, Uuid::new_v4(), "", BuildStatus::Scheduled);
        created.author_name = req.author_name.clone();
        Ok(created)
    }

    async fn list_builds(&self, builder_id: Uuid) -> Result<Vec<Build>, ClientError> {
        *self
            .state
            .lock()
            .unwrap()
            .list_builds_calls
            .entry(builder_id)
            .or_default() += 1;
        self.check(&format!("/api/builder/{}/builds", builder_id))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .builds
            .get(&builder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear_builds(&self, builder_id: Uuid) -> Result<ClearedBuilds, ClientError> {
        self.check(&format!("/api/builder/{}/builds", builder_id))?;
        let removed = self.state.lock().unwrap().builds.remove(&builder_id);
        Ok(ClearedBuilds {
            total: removed.map_or(0, |builds| builds.len()),
        })
    }

    async fn get_build(&self, build_id: Uuid) -> Result<Build, ClientError> {
        let endpoint = format!("/api/build/{}", build_id);
        self.check(&endpoint)?;
        self.state
            .lock()
            .unwrap()
            .builds
            .values()
            .flatten()
            .find(|b| b.id == build_id)
            .cloned()
            .ok_or_else(|| ClientError::api_error(404, endpoint, ""))
    }

    async fn fetch_output(&self, build_id: Uuid) -> Result<BuildOutput, ClientError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let step = {
            let mut state = self.state.lock().unwrap();
            let calls = state.output_calls.entry(build_id).or_default();
            let index = *calls;
            *calls += 1;
            let script = state.scripts.get(&build_id).cloned().unwrap_or_default();
            script
                .get(index)
                .or(script.last())
                .cloned()
                .unwrap_or(Step::Status(404, None))
        };

        let endpoint = format!("/api/build/{}/output", build_id);
        match step {
            Step::Output(output) => Ok(output),
            other => Err(other.fail(&endpoint).unwrap()),
        }
    }

    async fn delete_build(&self, build_id: Uuid) -> Result<(), ClientError> {
        self.check(&format!("/api/build/{}", build_id))?;
        for builds in self.state.lock().unwrap().builds.values_mut() {
            builds.retain(|b| b.id != build_id);
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        self.check("/api/user")?;
        Ok(User {
            login: Some("octocat".to_string()),
            ..User::default()
        })
    }

    async fn set_preferences(&self, req: &Preferences) -> Result<Preferences, ClientError> {
        self.check("/api/preferences")?;
        let keep = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let stored = Preferences {
            global_id_rsa_private_key: keep(&req.global_id_rsa_private_key),
            global_id_rsa_public_key: keep(&req.global_id_rsa_public_key),
            docker_registry_url: keep(&req.docker_registry_url),
        };

        let mut state = self.state.lock().unwrap();
        let current = &mut state.preferences;
        for (slot, value) in [
            (&mut current.global_id_rsa_private_key, &stored.global_id_rsa_private_key),
            (&mut current.global_id_rsa_public_key, &stored.global_id_rsa_public_key),
            (&mut current.docker_registry_url, &stored.docker_registry_url),
        ] {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        Ok(stored)
    }
}

pub fn build(builder_id: Uuid, build_id: Uuid, stdout: &str, status: BuildStatus) -> Build {
    Build {
        id: build_id,
        builder_id,
        status,
        stdout: stdout.to_string(),
        done: status.is_terminal(),
        commit: None,
        author_name: None,
        author_email: None,
        code: None,
        date_created: None,
        date_finished: None,
    }
}

pub fn builder(name: &str) -> Builder {
    Builder {
        id: Uuid::new_v4(),
        name: name.to_string(),
        git_uri: format!("https://github.com/example/{}.git", name),
        shell_script: "make test".to_string(),
        generate_ssh_keys: false,
        status: None,
        branch: Some("master".to_string()),
        id_rsa_public: None,
    }
}

/// Fast intervals so tests cover many ticks in little virtual time
pub fn config(max_ticks: u32) -> SyncConfig {
    let mut config = SyncConfig::new("http://localhost:5000".to_string());
    config.build_poll_interval = Duration::from_millis(500);
    config.builder_poll_interval = Duration::from_millis(1000);
    config.index_poll_interval = Duration::from_millis(1000);
    config.max_ticks = max_ticks;
    config
}

pub fn context(
    api: Arc<FakeApi>,
    max_ticks: u32,
) -> (SyncContext, mpsc::UnboundedReceiver<SyncEvent>) {
    SyncContext::new(&config(max_ticks), api)
}

/// Drain every event emitted so far
pub fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned pollers run for `ms` of virtual time
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
