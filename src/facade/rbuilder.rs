//! # Management Server Facade
//!
//! Wraps the rBuilder procedure-call and resource interfaces behind
//! domain-typed methods. Every response passes through
//! [`unwrap_envelope`] (procedure calls) or [`RestClient`] (resources), so
//! callers only ever see [`crate::error::Error`].
//!
//! ## Response Envelope
//!
//! Procedure calls answer `[error_flag, payload]`. With the flag set the
//! payload is `[class_name, detail, ...]` and becomes
//! [`Error::Remote`], rendered as `rBuilder error <class>: <detail>`.
//!
//! ## Local Validation
//!
//! Names, labels and URLs are checked before anything is sent. A failed
//! check is an [`Error::Validation`] and never touches the network.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::poller::{self, Clock, JobStatus, StatusSource, SystemClock, WatchOptions, WatchReport};
use super::repository::is_valid_label;
use super::transport::{Connector, Endpoint, RestTransport, RpcTransport, TransportError};
use crate::config::RMAKE_PORT;
use crate::error::{Error, Result};
use crate::reconcile::CredentialValidator;
use crate::ui::Ui;

static BRANCH_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*$").expect("valid regex"));

static DOMAIN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(\.[A-Za-z][A-Za-z0-9-]*)*$").expect("valid regex")
});

static SHORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("valid regex"));

/// Longest short name the server accepts.
const SHORT_NAME_MAX: usize = 62;

/// Job state the server reports for a job that did not succeed.
const FAILED_JOB_STATE: &str = "Failed";

/// Throwaway base for assembling resource paths.
const PATH_BASE: &str = "http://localhost/";

/// A resource path with every segment percent-encoded.
fn resource_path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(PATH_BASE)?;
    url.path_segments_mut()
        .map_err(|()| Error::Protocol {
            message: format!("cannot build a path under {}", PATH_BASE),
        })?
        .extend(segments);
    Ok(url.path().to_string())
}

/// Branch names start with a letter or digit and contain only letters,
/// digits and dots.
pub fn is_valid_branch_name(name: &str) -> bool {
    BRANCH_NAME.is_match(name)
}

/// Empty is valid (no domain). Otherwise every dot-separated part starts
/// with a letter and contains only letters, digits and `-`.
pub fn is_valid_domain_name(name: Option<&str>) -> bool {
    match name {
        None | Some("") => true,
        Some(name) => DOMAIN_NAME.is_match(name),
    }
}

/// Short names are under 63 characters, start with a letter and contain
/// only letters, digits and `-`.
pub fn is_valid_short_name(name: &str) -> bool {
    name.len() <= SHORT_NAME_MAX && SHORT_NAME.is_match(name)
}

/// Unwrap a procedure-call response envelope.
pub fn unwrap_envelope(response: Value) -> Result<Value> {
    let Value::Array(mut parts) = response else {
        return Err(Error::Protocol {
            message: format!("expected a response envelope, got {}", response),
        });
    };
    if parts.len() != 2 {
        return Err(Error::Protocol {
            message: format!("expected 2 envelope fields, got {}", parts.len()),
        });
    }
    let payload = parts.pop().unwrap_or(Value::Null);
    match parts.pop() {
        Some(Value::Bool(false)) => Ok(payload),
        Some(Value::Bool(true)) => Err(remote_error(payload)),
        other => Err(Error::Protocol {
            message: format!("invalid error flag {:?}", other),
        }),
    }
}

fn remote_error(payload: Value) -> Error {
    let mut fields = match payload {
        Value::Array(fields) => fields.into_iter(),
        other => vec![other].into_iter(),
    };
    let class = match fields.next() {
        Some(Value::String(class)) => class,
        Some(other) => other.to_string(),
        None => "UnknownError".to_string(),
    };
    Error::Remote {
        class,
        detail: fields.next().unwrap_or(Value::Null),
    }
}

/// Accept `true`/`false` as booleans or as the strings the server uses.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => text.eq_ignore_ascii_case("true"),
    })
}

/// Answer to an authorization check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthInfo {
    #[serde(default, deserialize_with = "flag")]
    pub authorized: bool,
    #[serde(default, rename = "isAdmin", deserialize_with = "flag")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectBranch {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub project_branches: Vec<ProjectBranch>,
}

/// A deployment destination registered with the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub target_type_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub zone_name: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_configured: bool,
    #[serde(default, deserialize_with = "flag")]
    pub credentials_valid: bool,
}

/// Field values filled in against a descriptor the server published,
/// e.g. to create or configure a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DescriptorData(BTreeMap<String, Value>);

impl DescriptorData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}

/// An account on the management server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub user_name: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Platform {
    pub label: String,
    #[serde(default)]
    pub name: String,
}

/// Parameters for a new project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub title: String,
    pub short_name: String,
    /// Defaults to the short name.
    pub host_name: Option<String>,
    pub domain_name: Option<String>,
    pub external: bool,
    pub upstream_labels: Vec<String>,
    pub upstream_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewBranch<'a> {
    name: &'a str,
    platform_label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct BuildStatusPayload {
    #[serde(default)]
    message: String,
    status: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductDefinitionPayload {
    label: String,
}

#[derive(Debug, Deserialize)]
struct JobState {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JobPayload {
    job_state: JobState,
    #[serde(default)]
    status_text: String,
}

/// Procedure-call client for one endpoint.
pub struct RpcClient {
    transport: Box<dyn RpcTransport>,
    server_url: String,
}

impl RpcClient {
    pub fn new(transport: Box<dyn RpcTransport>, server_url: impl Into<String>) -> Self {
        Self {
            transport,
            server_url: server_url.into(),
        }
    }

    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        debug!("calling {} on {}", method, self.server_url);
        let response = self
            .transport
            .call(method, &params)
            .map_err(|err| err.into_error(&self.server_url))?;
        unwrap_envelope(response)
    }

    pub fn check_auth(&self) -> Result<AuthInfo> {
        Ok(serde_json::from_value(self.call("checkAuth", vec![])?)?)
    }

    pub fn get_project_id_by_hostname(&self, hostname: &str) -> Result<u64> {
        Ok(serde_json::from_value(
            self.call("getProjectIdByHostname", vec![json!(hostname)])?,
        )?)
    }

    /// Id of the product version named `version` of `product`.
    pub fn get_branch_id_from_name(&self, product: &str, version: &str) -> Result<u64> {
        let project_id = self.get_project_id_by_hostname(product)?;
        let versions: Vec<(u64, u64, String, String, String)> = serde_json::from_value(
            self.call("getProductVersionListForProduct", vec![json!(project_id)])?,
        )?;
        if let Some((id, ..)) = versions.iter().find(|entry| entry.3 == version) {
            return Ok(*id);
        }
        let known = if versions.is_empty() {
            format!("No versions found for product {}.", product)
        } else {
            let names: Vec<&str> = versions.iter().map(|entry| entry.3.as_str()).collect();
            format!("Valid versions are: {}", names.join(", "))
        };
        Err(Error::rbuild(format!(
            "{} is not a valid version for product {}.\n{}",
            version, product, known
        )))
    }

    /// Label the product definition of `product` version `version` lives on.
    pub fn get_product_label_from_name_and_version(
        &self,
        product: &str,
        version: &str,
    ) -> Result<String> {
        let branch_id = self.get_branch_id_from_name(product, version)?;
        let definition: ProductDefinitionPayload = serde_json::from_value(
            self.call("getProductDefinitionForVersion", vec![json!(branch_id)])?,
        )?;
        Ok(definition.label)
    }

    /// Start every build the product definition lists for `stage`.
    pub fn start_product_builds(
        &self,
        product: &str,
        version: &str,
        stage: &str,
        group_version: Option<&str>,
    ) -> Result<Vec<u64>> {
        let branch_id = self.get_branch_id_from_name(product, version)?;
        let mut params = vec![json!(branch_id), json!(stage), json!(false), Value::Null];
        if let Some(group_version) = group_version {
            params.push(json!(group_version));
        }
        Ok(serde_json::from_value(
            self.call("newBuildsFromProductDefinition", params)?,
        )?)
    }

    pub fn get_build_status(&self, build_id: u64) -> Result<JobStatus> {
        let payload: BuildStatusPayload =
            serde_json::from_value(self.call("getBuildStatus", vec![json!(build_id)])?)?;
        Ok(JobStatus::from_build_code(
            payload.status,
            payload.message,
            payload.name,
        ))
    }
}

impl StatusSource for RpcClient {
    fn fetch_status(&self, id: u64) -> Result<JobStatus> {
        self.get_build_status(id)
    }
}

/// Resource client for one endpoint.
pub struct RestClient {
    transport: Box<dyn RestTransport>,
    server_url: String,
}

impl RestClient {
    pub fn new(transport: Box<dyn RestTransport>, server_url: impl Into<String>) -> Self {
        Self {
            transport,
            server_url: server_url.into(),
        }
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let value = self
            .transport
            .get(path)
            .map_err(|err| err.into_error(&self.server_url))?;
        Ok(serde_json::from_value(value)?)
    }

    fn post(&self, path: &str, body: &Value) -> std::result::Result<Value, TransportError> {
        self.transport.post(path, body)
    }

    /// POST a creation request. A conflict becomes [`Error::Conflict`] with
    /// `conflict()` as its message; every other failure is [`Error::Remote`].
    fn create(
        &self,
        path: &str,
        body: &Value,
        conflict: impl FnOnce() -> String,
    ) -> Result<Value> {
        self.post(path, body).map_err(|err| match err {
            TransportError::Status { code: 409, .. } => Error::Conflict {
                message: conflict(),
            },
            other => other.into_remote_error(),
        })
    }

    pub fn get_project(&self, short_name: &str) -> Result<Project> {
        self.get(&resource_path(&["projects", short_name])?)
    }

    pub fn create_project(&self, project: &NewProject) -> Result<()> {
        self.create("/projects", &serde_json::to_value(project)?, || {
            format!("A project named '{}' already exists", project.short_name)
        })?;
        Ok(())
    }

    /// Add a branch to `project`. A name already on the project is refused
    /// without sending anything.
    pub fn create_branch(
        &self,
        project: &str,
        name: &str,
        platform_label: &str,
        namespace: Option<&str>,
        description: &str,
    ) -> Result<()> {
        let conflict = || format!("Branch named '{}' already exists", name);
        let existing = self.get_project(project)?;
        if existing.project_branches.iter().any(|b| b.name == name) {
            return Err(Error::Conflict {
                message: conflict(),
            });
        }
        let body = serde_json::to_value(NewBranch {
            name,
            platform_label,
            namespace,
            description,
        })?;
        let path = resource_path(&["projects", project, "project_branches"])?;
        self.create(&path, &body, conflict)?;
        Ok(())
    }

    pub fn get_targets(&self) -> Result<Vec<Target>> {
        self.get("/targets")
    }

    pub fn get_target(&self, name: &str) -> Result<Target> {
        self.get(&resource_path(&["targets", name])?)
    }

    /// Register a target of `target_type` from the `name`, `description`
    /// and `zone` fields of `data`.
    pub fn create_target(&self, target_type: &str, data: &DescriptorData) -> Result<Target> {
        let name = match data.text("name") {
            Some(name) if !name.is_empty() => name,
            _ => return Err(Error::validation("target name", "")),
        };
        let body = json!({
            "name": name,
            "description": data.text("description").unwrap_or_default(),
            "zone_name": data.text("zone").unwrap_or_default(),
            "target_type_name": target_type,
        });
        let created = self.create("/targets", &body, || {
            format!("A target named '{}' already exists", name)
        })?;
        Ok(serde_json::from_value(created)?)
    }

    /// Run a `job_type` job against `target` and return the target as it
    /// stands afterwards. A failed job is an error carrying its status text.
    fn run_target_job(
        &self,
        target: &str,
        job_type: &str,
        data: &DescriptorData,
    ) -> Result<Target> {
        let path = resource_path(&["targets", target, "jobs"])?;
        let body = json!({ "job_type": job_type, "descriptor_data": data });
        let value = self
            .post(&path, &body)
            .map_err(|err| err.into_error(&self.server_url))?;
        let job: JobPayload = serde_json::from_value(value)?;
        debug!("{} job on {} is {}", job_type, target, job.job_state.name);
        if job.job_state.name == FAILED_JOB_STATE {
            return Err(Error::rbuild(job.status_text));
        }
        self.get_target(target)
    }

    pub fn configure_target(&self, target: &str, data: &DescriptorData) -> Result<Target> {
        self.run_target_job(target, "configure", data)
    }

    pub fn configure_target_credentials(
        &self,
        target: &str,
        data: &DescriptorData,
    ) -> Result<Target> {
        self.run_target_job(target, "configure_credentials", data)
    }

    /// Accounts whose user name is `user_name`.
    pub fn get_users(&self, user_name: &str) -> Result<Vec<User>> {
        let mut url = Url::parse(PATH_BASE)?;
        url.set_path("/users");
        url.query_pairs_mut().append_pair("user_name", user_name);
        self.get(&format!("{}?{}", url.path(), url.query().unwrap_or_default()))
    }

    pub fn list_platforms(&self) -> Result<Vec<Platform>> {
        self.get("/platforms")
    }

    pub fn get_job(&self, job_id: u64) -> Result<JobStatus> {
        let payload: JobPayload = self.get(&resource_path(&["jobs", &job_id.to_string()])?)?;
        Ok(JobStatus::from_job_state(
            &payload.job_state.name,
            payload.status_text,
        ))
    }
}

struct JobSource(RestClient);

impl StatusSource for JobSource {
    fn fetch_status(&self, id: u64) -> Result<JobStatus> {
        self.0.get_job(id)
    }
}

/// The management server as seen by rbuild.
pub struct RbuilderFacade {
    connector: Box<dyn Connector>,
    endpoint: Endpoint,
    clock: Box<dyn Clock>,
}

impl RbuilderFacade {
    pub fn new(connector: Box<dyn Connector>, endpoint: Endpoint) -> Self {
        Self {
            connector,
            endpoint,
            clock: Box::new(SystemClock::new()),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Point the session at new credentials.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    fn rpc_for(&self, endpoint: &Endpoint) -> RpcClient {
        RpcClient::new(self.connector.rpc(endpoint), endpoint.server_url.clone())
    }

    fn rpc(&self) -> RpcClient {
        self.rpc_for(&self.endpoint)
    }

    fn rest(&self) -> RestClient {
        RestClient::new(
            self.connector.rest(&self.endpoint),
            self.endpoint.server_url.clone(),
        )
    }

    /// Whether `url` answers at all. An authentication challenge counts as
    /// an answer.
    pub fn is_valid_url(&self, url: &str) -> bool {
        match self.connector.reach(url) {
            Ok(()) => true,
            Err(TransportError::Status { code: 401, .. }) => true,
            Err(err) => {
                debug!("{} is not reachable: {}", url, err);
                false
            }
        }
    }

    /// Whether a build service listens next to the management server.
    pub fn check_for_rmake(&self, server_url: &str) -> bool {
        let host = Url::parse(server_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        match host {
            Some(host) => self.connector.port_open(&host, RMAKE_PORT),
            None => false,
        }
    }

    pub fn get_project(&self, project: &str) -> Result<Project> {
        // a full host name resolves to its short name
        let short_name = project.split('.').next().unwrap_or(project);
        self.rest().get_project(short_name)
    }

    /// Branches of `project`, optionally ordered by `name` or `label`
    /// (`-field` descending, `+field` or `field` ascending).
    pub fn get_project_branches(
        &self,
        project: &str,
        order_by: Option<&str>,
    ) -> Result<Vec<ProjectBranch>> {
        let mut branches = self.get_project(project)?.project_branches;
        let Some(order_by) = order_by else {
            return Ok(branches);
        };
        let (descending, field) = match order_by.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, order_by.strip_prefix('+').unwrap_or(order_by)),
        };
        match field {
            "name" => branches.sort_by(|a, b| a.name.cmp(&b.name)),
            "label" => branches.sort_by(|a, b| a.label.cmp(&b.label)),
            _ => return Err(Error::validation("order_by field", field)),
        }
        if descending {
            branches.reverse();
        }
        Ok(branches)
    }

    pub fn create_project(&self, project: &NewProject) -> Result<()> {
        if !is_valid_short_name(&project.short_name) {
            return Err(Error::validation("short name", &project.short_name));
        }
        let host_name = project
            .host_name
            .clone()
            .unwrap_or_else(|| project.short_name.clone());
        if !is_valid_short_name(&host_name) {
            return Err(Error::validation("host name", host_name));
        }
        if !is_valid_domain_name(project.domain_name.as_deref()) {
            return Err(Error::validation(
                "domain name",
                project.domain_name.clone().unwrap_or_default(),
            ));
        }
        if project.external {
            if let Some(label) = project.upstream_labels.iter().find(|l| !is_valid_label(l)) {
                return Err(Error::validation("upstream label", label));
            }
            if let Some(url) = &project.upstream_url {
                if !self.is_valid_url(url) {
                    return Err(Error::validation("upstream url", url));
                }
            }
        }
        let request = NewProject {
            host_name: Some(host_name),
            ..project.clone()
        };
        self.rest().create_project(&request)
    }

    pub fn create_branch(
        &self,
        project: &str,
        name: &str,
        platform_label: &str,
        namespace: Option<&str>,
        description: &str,
    ) -> Result<()> {
        if !is_valid_branch_name(name) {
            return Err(Error::validation("branch name", name));
        }
        self.rest()
            .create_branch(project, name, platform_label, namespace, description)
    }

    pub fn get_targets(&self) -> Result<Vec<Target>> {
        self.rest().get_targets()
    }

    pub fn get_target(&self, name: &str) -> Result<Target> {
        self.rest().get_target(name)
    }

    pub fn create_target(&self, target_type: &str, data: &DescriptorData) -> Result<Target> {
        self.rest().create_target(target_type, data)
    }

    pub fn configure_target(&self, target: &str, data: &DescriptorData) -> Result<Target> {
        self.rest().configure_target(target, data)
    }

    pub fn configure_target_credentials(
        &self,
        target: &str,
        data: &DescriptorData,
    ) -> Result<Target> {
        self.rest().configure_target_credentials(target, data)
    }

    /// Targets that are configured and hold valid credentials.
    pub fn get_enabled_targets(&self) -> Result<Vec<Target>> {
        Ok(self
            .get_targets()?
            .into_iter()
            .filter(|t| t.is_configured && t.credentials_valid)
            .collect())
    }

    pub fn list_platforms(&self) -> Result<Vec<Platform>> {
        self.rest().list_platforms()
    }

    /// The platform whose label is `label`, if the server knows it.
    pub fn get_platform(&self, label: &str) -> Result<Option<Platform>> {
        Ok(self
            .list_platforms()?
            .into_iter()
            .find(|platform| platform.label == label))
    }

    pub fn get_branch_id_from_name(&self, product: &str, version: &str) -> Result<u64> {
        self.rpc().get_branch_id_from_name(product, version)
    }

    pub fn get_product_label_from_name_and_version(
        &self,
        product: &str,
        version: &str,
    ) -> Result<String> {
        self.rpc()
            .get_product_label_from_name_and_version(product, version)
    }

    /// Whether `user_name` is an administrator. No name means no.
    pub fn is_admin(&self, user_name: Option<&str>) -> Result<bool> {
        let Some(user_name) = user_name else {
            return Ok(false);
        };
        Ok(self
            .rest()
            .get_users(user_name)?
            .iter()
            .any(|user| user.user_name == user_name && user.is_admin))
    }

    pub fn start_product_builds(
        &self,
        product: &str,
        version: &str,
        stage: &str,
        group_version: Option<&str>,
    ) -> Result<Vec<u64>> {
        self.rpc()
            .start_product_builds(product, version, stage, group_version)
    }

    pub fn watch_images(
        &self,
        build_ids: &[u64],
        options: WatchOptions,
        ui: &mut dyn Ui,
    ) -> Result<WatchReport> {
        poller::watch(&self.rpc(), self.clock.as_ref(), build_ids, options, ui)
    }

    pub fn show_image_status(&self, build_ids: &[u64], ui: &mut dyn Ui) -> Result<Vec<(u64, JobStatus)>> {
        poller::show_status(&self.rpc(), self.clock.as_ref(), build_ids, ui)
    }

    pub fn watch_jobs(
        &self,
        job_ids: &[u64],
        options: WatchOptions,
        ui: &mut dyn Ui,
    ) -> Result<WatchReport> {
        poller::watch(&JobSource(self.rest()), self.clock.as_ref(), job_ids, options, ui)
    }
}

impl CredentialValidator for RbuilderFacade {
    fn check_url(&self, url: &str) -> std::result::Result<(), String> {
        let conaryrc = format!("{}/conaryrc", url.trim_end_matches('/'));
        self.connector
            .reach(&conaryrc)
            .map_err(|err| format!("Error contacting '{}': {}", url, err))
    }

    fn validate_rbuilder_url(&self, url: &str) -> Result<()> {
        self.rpc_for(&Endpoint::anonymous(url)).check_auth().map(|_| ())
    }

    fn validate_credentials(&self, user: &str, password: &str, url: &str) -> bool {
        match self.rpc_for(&Endpoint::new(url, user, password)).check_auth() {
            Ok(info) => info.authorized,
            Err(err) => {
                debug!("credential check against {} failed: {}", url, err);
                false
            }
        }
    }
}
