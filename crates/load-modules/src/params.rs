//! Load module parameters.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Parameters resolved for one load module.
///
/// Well-known keys get defaults; anything else in the module's configuration
/// section lands in `extra` for the module to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadParams {
    /// Top-level build directory
    #[serde(default = "default_builddir")]
    pub builddir: PathBuf,
    /// Directory holding workload payloads
    #[serde(default = "default_srcdir")]
    pub srcdir: PathBuf,
    /// Number of cores the load should occupy
    #[serde(default = "default_numcores")]
    pub numcores: usize,
    /// Optional payload (tarball, script) consumed during setup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Report directory; private logs go to `<reportdir>/logs`
    #[serde(default = "default_reportdir")]
    pub reportdir: PathBuf,
    /// Capture load output into per-module log files
    #[serde(default)]
    pub logging: bool,
    /// Memory the load may use
    #[serde(default)]
    pub memsize: MemSize,
    /// Module-specific keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_builddir() -> PathBuf {
    cwd().join("..").join("build")
}

fn default_srcdir() -> PathBuf {
    cwd().join("..").join("loadsource")
}

fn default_numcores() -> usize {
    1
}

fn default_reportdir() -> PathBuf {
    cwd()
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            builddir: default_builddir(),
            srcdir: default_srcdir(),
            numcores: default_numcores(),
            source: None,
            reportdir: default_reportdir(),
            logging: false,
            memsize: MemSize::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl LoadParams {
    /// Resolve parameters for one module section.
    ///
    /// Keys in `section` win over `common`. A `null` section means "defaults
    /// only"; any other non-mapping value is rejected.
    pub fn from_section(section: &Value, common: &LoadParams) -> Result<Self, LoadError> {
        let overlay = match section {
            Value::Null => Mapping::new(),
            Value::Mapping(m) => m.clone(),
            other => {
                return Err(LoadError::InvalidConfig(format!(
                    "module section is not a mapping: {other:?}"
                )))
            }
        };

        let mut merged = match serde_yaml::to_value(common)? {
            Value::Mapping(m) => m,
            _ => Mapping::new(),
        };
        for (k, v) in overlay {
            merged.insert(k, v);
        }

        let params: LoadParams = serde_yaml::from_value(Value::Mapping(merged))?;
        if params.numcores == 0 {
            return Err(LoadError::InvalidConfig(
                "numcores must be at least 1".to_string(),
            ));
        }
        Ok(params)
    }

    /// Builder-style setters used by the coordinator and tests.
    pub fn with_reportdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reportdir = dir.into();
        self
    }

    pub fn with_builddir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builddir = dir.into();
        self
    }

    pub fn with_numcores(mut self, numcores: usize) -> Self {
        self.numcores = numcores;
        self
    }

    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Directory for private log artifacts.
    pub fn log_dir(&self) -> PathBuf {
        self.reportdir.join("logs")
    }

    /// Optional string parameter.
    pub fn get_str(&self, key: &str) -> Result<Option<String>, LoadError> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    /// Optional unsigned integer parameter.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, LoadError> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| type_error(key, "an unsigned integer", &Value::Number(n.clone()))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| type_error(key, "an unsigned integer", &Value::String(s.clone()))),
            Some(other) => Err(type_error(key, "an unsigned integer", other)),
        }
    }

    /// Optional argument list. A plain string is split on whitespace.
    pub fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>, LoadError> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.split_whitespace().map(String::from).collect())),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(type_error(key, "a list of strings", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(type_error(key, "a list of strings", other)),
        }
    }
}

fn type_error(key: &str, expected: &str, got: &Value) -> LoadError {
    LoadError::InvalidConfig(format!("parameter '{key}' must be {expected}, got {got:?}"))
}

/// Memory size with a unit, e.g. `4GB` or `512M`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemSize {
    pub value: u64,
    pub unit: MemUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemUnit {
    B,
    KB,
    MB,
    GB,
    TB,
}

impl MemUnit {
    fn factor(self) -> u64 {
        match self {
            MemUnit::B => 1,
            MemUnit::KB => 1 << 10,
            MemUnit::MB => 1 << 20,
            MemUnit::GB => 1 << 30,
            MemUnit::TB => 1 << 40,
        }
    }
}

impl std::fmt::Display for MemUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemUnit::B => write!(f, "B"),
            MemUnit::KB => write!(f, "KB"),
            MemUnit::MB => write!(f, "MB"),
            MemUnit::GB => write!(f, "GB"),
            MemUnit::TB => write!(f, "TB"),
        }
    }
}

impl Default for MemSize {
    fn default() -> Self {
        Self {
            value: 0,
            unit: MemUnit::GB,
        }
    }
}

impl MemSize {
    pub fn bytes(&self) -> u64 {
        self.value.saturating_mul(self.unit.factor())
    }
}

impl std::fmt::Display for MemSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

impl std::str::FromStr for MemSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: u64 = num
            .parse()
            .map_err(|_| format!("Invalid memory size: {s}"))?;
        let unit = match unit.trim().to_uppercase().as_str() {
            "" | "G" | "GB" => MemUnit::GB,
            "B" => MemUnit::B,
            "K" | "KB" => MemUnit::KB,
            "M" | "MB" => MemUnit::MB,
            "T" | "TB" => MemUnit::TB,
            other => return Err(format!("Unknown memory unit: {other}")),
        };
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for MemSize {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MemSize> for String {
    fn from(m: MemSize) -> Self {
        m.to_string()
    }
}
