use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

pub type JobId = String;

/// Authorization scheme placed in front of the token in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum AuthScheme {
    #[default]
    Token,
    Bearer,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::Token => write!(f, "Token"),
            AuthScheme::Bearer => write!(f, "Bearer"),
        }
    }
}

/// A remote collection of jobs reachable with one credential.
///
/// Built once from the credential source and passed explicitly to every call;
/// nothing in the collector keeps an ambient endpoint or token.
#[derive(Clone, PartialEq, Eq)]
pub struct Group {
    endpoint: Url,
    group_id: String,
    name: String,
    token: String,
    auth_scheme: AuthScheme,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("group name must not be empty")]
    EmptyGroupName,
    #[error("job has no input")]
    MissingInput,
    #[error("job input is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("job input has no queries field")]
    MissingQueries,
}

impl Group {
    pub fn new(
        endpoint: &str,
        group_id: impl Into<String>,
        name: impl Into<String>,
        token: impl Into<String>,
        auth_scheme: AuthScheme,
    ) -> Result<Self, InputError> {
        let invalid = |message: &str| InputError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        };
        let mut parsed = Url::parse(endpoint).map_err(|err| invalid(&err.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base url"));
        }
        parsed.set_query(None);
        parsed.set_fragment(None);

        let name = name.into();
        if name.trim().is_empty() {
            return Err(InputError::EmptyGroupName);
        }

        Ok(Self {
            endpoint: parsed,
            group_id: group_id.into(),
            name,
            token: token.into(),
            auth_scheme,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Human-readable name; also the checkpoint key and the sink index.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.auth_scheme, self.token)
    }

    /// `<endpoint>/jobs?group_id=<id>`
    pub fn jobs_url(&self) -> Url {
        let mut url = self.endpoint_with(&["jobs"]);
        url.query_pairs_mut().append_pair("group_id", &self.group_id);
        url
    }

    /// `<endpoint>/jobs/<id>?format=json`
    pub fn job_result_url(&self, job_id: &str) -> Url {
        let mut url = self.endpoint_with(&["jobs", job_id]);
        url.query_pairs_mut().append_pair("format", "json");
        url
    }

    /// Scheme-less job location used as the event source, e.g. `acme.example.com/api/jobs/42`.
    pub fn job_source(&self, job_id: &str) -> String {
        let url = self.endpoint_with(&["jobs", job_id]);
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{host}:{port}{}", url.path()),
            None => format!("{host}{}", url.path()),
        }
    }

    fn endpoint_with(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("endpoint", &self.endpoint.as_str())
            .field("group_id", &self.group_id)
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[default]
    Unknown,
}

impl JobStatus {
    /// Maps the provider's status string; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(JobStatus::parse).unwrap_or_default())
    }
}

/// One job as reported by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "job_id_from_string_or_number")]
    pub id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    /// JSON-encoded job definition. Usually a string holding JSON, occasionally inline.
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

impl Job {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn parse_input(&self) -> Result<JobInput, InputError> {
        match &self.input {
            None | Some(serde_json::Value::Null) => Err(InputError::MissingInput),
            Some(value) => JobInput::parse(value),
        }
    }
}

fn job_id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<JobId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One query of a job definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryRecord {
    /// Comma-separated address list.
    #[serde(default)]
    pub any_ip_addr: Option<String>,
}

/// Job definition with `queries` normalized to a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobInput {
    pub queries: Vec<QueryRecord>,
}

#[derive(Deserialize)]
struct RawJobInput {
    #[serde(default)]
    queries: Option<RawQueries>,
}

// The provider sends `queries` either as a list or as an object keyed by query name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawQueries {
    List(Vec<QueryRecord>),
    Map(BTreeMap<String, QueryRecord>),
}

impl JobInput {
    pub fn parse(value: &serde_json::Value) -> Result<Self, InputError> {
        let raw: RawJobInput = match value {
            serde_json::Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        }
        .map_err(|err| InputError::InvalidJson(err.to_string()))?;

        let queries = match raw.queries.ok_or(InputError::MissingQueries)? {
            RawQueries::List(list) => list,
            RawQueries::Map(map) => map.into_values().collect(),
        };
        Ok(Self { queries })
    }

    /// Every comma-separated entry of every `any_ip_addr` field, untrimmed, in query order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.queries
            .iter()
            .filter_map(|query| query.any_ip_addr.as_deref())
            .flat_map(|list| list.split(','))
    }
}
