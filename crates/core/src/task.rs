// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task record: a persistent description of one external command plus
//! its lifecycle metadata.

use crate::clock::Clock;
use crate::config::TaskConfig;
use crate::error::Fault;
use crate::interpolate::interpolate;
use crate::status::TaskStatus;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exit-code sentinel recorded while no child process has been awaited.
pub const EXIT_NEVER_STARTED: i32 = -9999;

/// Fields every task document carries. Anything else on a submit must be
/// enumerated in `runtime.task.extra_fields`.
const DEFAULT_FIELDS: &[&str] = &[
    "cmd",
    "env",
    "cwd",
    "pid",
    "init_time",
    "start_time",
    "end_time",
    "exit_code",
    "stdin",
    "stdout",
    "stderr",
    "log",
    "priority",
    "status",
    "timeout",
    "host",
    "user",
    "notes",
    "updated_at",
    "parent_url",
];

/// One append-only annotation on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub timestamp: String,
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier; `None` until inserted.
    #[serde(default)]
    pub id: Option<String>,
    /// Program and argv; first element is the binary.
    pub cmd: Vec<String>,
    /// Explicit child environment; `None` inherits the daemon's.
    #[serde(default)]
    pub env: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub cwd: Option<String>,
    /// Bytes piped to the child's stdin at launch.
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    /// Log file path; empty means stdout is piped instead.
    #[serde(default)]
    pub log: String,
    /// Smaller value = higher priority.
    pub priority: i64,
    #[serde(default)]
    pub timeout: Option<u64>,
    pub status: TaskStatus,
    /// OS process id while running; cleared on terminal commit.
    #[serde(default)]
    pub pid: Option<u32>,
    pub init_time: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default = "never_started")]
    pub exit_code: i32,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub parent_url: String,
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Config-enumerated extension fields.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn never_started() -> i32 {
    EXIT_NEVER_STARTED
}

impl Task {
    /// New in-memory record for `cmd`: queued, never started, first note
    /// recording creation.
    pub fn new(cmd: Vec<String>, clock: &dyn Clock) -> Self {
        let now = clock.timestamp();
        Self {
            id: None,
            cmd,
            env: None,
            cwd: None,
            stdin: None,
            stdout: None,
            stderr: None,
            log: String::new(),
            priority: 100,
            timeout: None,
            status: TaskStatus::Queued,
            pid: None,
            init_time: now.clone(),
            start_time: None,
            end_time: None,
            updated_at: None,
            exit_code: EXIT_NEVER_STARTED,
            host: String::new(),
            user: "external_default".to_string(),
            parent_url: String::new(),
            notes: vec![Note {
                text: "task created".to_string(),
                timestamp: now,
                user: "external_default".to_string(),
            }],
            extra: IndexMap::new(),
        }
    }

    /// Build an unsubmitted record from a validated submit spec.
    pub fn from_spec(spec: TaskSpec, default_log: &str, clock: &dyn Clock) -> Self {
        let mut task = Task::new(spec.cmd, clock);
        task.priority = spec.priority;
        task.log = spec.log.unwrap_or_else(|| default_log.to_string());
        task.env = spec.env;
        task.cwd = spec.cwd;
        task.stdin = spec.stdin;
        task.timeout = spec.timeout;
        task.host = spec.host;
        task.user = spec.user.clone();
        task.parent_url = spec.parent_url;
        task.extra = spec.extra;
        if let Some(note) = task.notes.first_mut() {
            note.user = spec.user;
        }
        task
    }

    /// The external string form of the id; empty until inserted.
    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Canonical URL of this task on its submitting host.
    pub fn url(&self) -> String {
        format!("{}proc_pool/task/{}", self.host, self.name())
    }

    pub fn add_note(&mut self, text: impl Into<String>, user: &str, clock: &dyn Clock) {
        self.notes.push(Note {
            text: text.into(),
            timestamp: clock.timestamp(),
            user: user.to_string(),
        });
    }

    /// True when the status is in the configured `complete` bucket; terminal
    /// tasks accept note appends only.
    pub fn is_complete(&self, cfg: &TaskConfig) -> bool {
        cfg.states.is_complete(self.status.as_str())
    }

    /// Compact projection for listings and submit responses.
    pub fn slim(&self) -> Value {
        serde_json::json!({
            "id": self.name(),
            "cmd": self.cmd,
            "priority": self.priority,
            "status": self.status,
            "url": self.url(),
            "parent_url": self.parent_url,
            "notes": self.notes,
            "user": self.user,
            "exit_code": self.exit_code,
        })
    }

    /// Complete projection: every field plus the derived `url`.
    pub fn full(&self) -> Value {
        let mut doc = serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()));
        if let Value::Object(map) = &mut doc {
            map.insert("id".to_string(), Value::String(self.name().to_string()));
            map.insert("url".to_string(), Value::String(self.url()));
        }
        doc
    }

    /// The document persisted to the store. Unset fields serialize as
    /// explicit nulls, so a commit always writes the complete document even
    /// through a merge-style store update (a stale `pid` must not survive
    /// the terminal commit).
    pub fn to_doc(&self) -> Result<Value, Fault> {
        serde_json::to_value(self)
            .map_err(|e| Fault::application(format!("unable to serialize task: {}", e)))
    }

    pub fn from_doc(doc: Value) -> Result<Task, Fault> {
        serde_json::from_value(doc)
            .map_err(|e| Fault::application(format!("malformed task document: {}", e)))
    }

    /// Apply one `field = value` update, enforcing the terminal freeze and
    /// the config-enumerated field set. `priority` and `id` are immutable.
    pub fn set_field(&mut self, key: &str, value: Value, cfg: &TaskConfig) -> Result<(), Fault> {
        if self.is_complete(cfg) && key != "notes" {
            return Err(Fault::user(format!(
                "the task is {} -- only notes may be appended",
                self.status
            )));
        }
        if key == "id" || key == "priority" {
            return Err(Fault::user(format!("the {} field is immutable", key)));
        }
        if !DEFAULT_FIELDS.contains(&key) && !cfg.extra_fields.iter().any(|f| f == key) {
            return Err(Fault::user(format!(
                "the task document only allows the following keys: {}",
                DEFAULT_FIELDS.join(", ")
            )));
        }

        let mut doc = self.to_doc()?;
        if let Value::Object(map) = &mut doc {
            map.insert(key.to_string(), value);
        }
        *self = serde_json::from_value(doc)
            .map_err(|e| Fault::user(format!("invalid value for {}: {}", key, e)))?;
        Ok(())
    }

    /// Apply a map of updates, all-or-nothing.
    pub fn apply_update(
        &mut self,
        updates: &serde_json::Map<String, Value>,
        cfg: &TaskConfig,
    ) -> Result<(), Fault> {
        let mut staged = self.clone();
        for (key, value) in updates {
            staged.set_field(key, value.clone(), cfg)?;
        }
        *self = staged;
        Ok(())
    }

    /// Apply a map of updates, skipping keys that fail validation. Returns
    /// the number applied.
    pub fn apply_update_lenient(
        &mut self,
        updates: &serde_json::Map<String, Value>,
        cfg: &TaskConfig,
    ) -> usize {
        let mut applied = 0;
        for (key, value) in updates {
            if self.set_field(key, value.clone(), cfg).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Interpolate `{placeholder}`s in every formattable field.
    ///
    /// The namespace holds `name` (task id, or a fresh hex token while
    /// unset), `date`, and every field of the task.
    pub fn format_fields(&mut self, cfg: &TaskConfig, clock: &dyn Clock) -> Result<(), Fault> {
        let vars = self.interpolation_vars(clock);
        for field in cfg.formattable() {
            match field {
                "cmd" => {
                    for arg in &mut self.cmd {
                        *arg = interpolate(arg, &vars)?;
                    }
                }
                "log" => self.log = interpolate(&self.log, &vars)?,
                "cwd" => {
                    if let Some(cwd) = &mut self.cwd {
                        *cwd = interpolate(cwd, &vars)?;
                    }
                }
                other => {
                    if let Some(Value::String(s)) = self.extra.get(other) {
                        let formatted = interpolate(s, &vars)?;
                        self.extra.insert(other.to_string(), Value::String(formatted));
                    }
                }
            }
        }
        Ok(())
    }

    /// `name`, `date`, and every field of the task. Strings substitute
    /// verbatim, unset fields as the empty string, and compound fields
    /// (`cmd`, `env`, `notes`) as compact JSON.
    fn interpolation_vars(&self, clock: &dyn Clock) -> IndexMap<String, String> {
        let mut vars = IndexMap::new();
        vars.insert(
            "name".to_string(),
            self.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
        );
        vars.insert("date".to_string(), clock.date());
        if let Ok(Value::Object(doc)) = self.to_doc() {
            for (key, value) in doc {
                vars.insert(key, var_string(&value));
            }
        }
        vars
    }
}

fn var_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validated submit payload for one task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub cmd: Vec<String>,
    pub priority: i64,
    pub log: Option<String>,
    pub env: Option<IndexMap<String, String>>,
    pub cwd: Option<String>,
    pub stdin: Option<String>,
    pub timeout: Option<u64>,
    pub host: String,
    pub user: String,
    pub parent_url: String,
    pub extra: IndexMap<String, Value>,
}

impl TaskSpec {
    /// Validate one submit request object. Error messages are user-facing.
    pub fn from_value(value: &Value) -> Result<TaskSpec, Fault> {
        let Value::Object(map) = value else {
            return Err(Fault::user(format!(
                "each request must be an object -- this was what was received: '{}'",
                value
            )));
        };

        let cmd = match map.get("cmd") {
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(Fault::user(format!(
                        "the cmd argument must be a list of strings -- received: '{}'",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(Fault::user("the cmd argument must be a non-empty list")),
        };

        let priority = match map.get("priority") {
            None | Some(Value::Null) => 100,
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(100),
            Some(_) => return Err(Fault::user("the priority argument should be an int")),
        };

        let timeout = match map.get("timeout") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.is_u64() => n.as_u64(),
            Some(_) => return Err(Fault::user("the timeout argument should be an integer")),
        };

        let env = match map.get("env") {
            None | Some(Value::Null) => None,
            Some(Value::Object(pairs)) => {
                let mut env = IndexMap::new();
                for (k, v) in pairs {
                    match v {
                        Value::String(s) => env.insert(k.clone(), s.clone()),
                        other => env.insert(k.clone(), other.to_string()),
                    };
                }
                Some(env)
            }
            Some(_) => return Err(Fault::user("the env argument should be a dict")),
        };

        let string_arg = |key: &str| -> Result<Option<String>, Fault> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(Fault::user(format!("the {} argument should be a string", key))),
            }
        };

        let known = [
            "cmd",
            "priority",
            "log",
            "env",
            "cwd",
            "stdin",
            "timeout",
            "host",
            "user",
            "parent_url",
        ];
        let mut extra = IndexMap::new();
        for (key, value) in map {
            if !known.contains(&key.as_str()) {
                extra.insert(key.clone(), value.clone());
            }
        }

        Ok(TaskSpec {
            cmd,
            priority,
            log: string_arg("log")?,
            env,
            cwd: string_arg("cwd")?,
            stdin: string_arg("stdin")?,
            timeout,
            host: string_arg("host")?.unwrap_or_default(),
            user: string_arg("user")?.unwrap_or_else(|| "external_default".to_string()),
            parent_url: string_arg("parent_url")?.unwrap_or_default(),
            extra,
        })
    }
}

/// Ordering key used by the priority queue.
///
/// Greater = scheduled sooner: smaller numeric priority wins, ties break
/// FIFO on the insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub priority: i64,
    pub seq: u64,
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
