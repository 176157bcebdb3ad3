use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::error::{CfError, LOCAL_HINT};
use garage_types::{ServiceInstance, VcapServices};

const VCAP_SERVICES_VAR: &str = "VCAP_SERVICES";
const VCAP_APPLICATION_VAR: &str = "VCAP_APPLICATION";

/// Selects services by exact string or by pattern
#[derive(Clone, Debug)]
pub enum ServiceSpec {
    Exact(String),
    Pattern(Regex),
}

impl ServiceSpec {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(value) => value == candidate,
            Self::Pattern(regex) => regex.is_match(candidate),
        }
    }
}

impl From<&str> for ServiceSpec {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for ServiceSpec {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for ServiceSpec {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl fmt::Display for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.write_str(value),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Services bound to the running app, as Cloud Foundry exposes them
#[derive(Clone, Debug, Default)]
pub struct CfEnv {
    pub services: VcapServices,
    pub application: Option<Value>,
    /// Not running on Cloud Foundry (`VCAP_APPLICATION` is unset)
    pub is_local: bool,
}

impl CfEnv {
    pub fn from_vcap(services: VcapServices, application: Option<Value>) -> Self {
        let is_local = application.is_none();
        Self {
            services,
            application,
            is_local,
        }
    }

    /// Build from the values of `VCAP_SERVICES` and `VCAP_APPLICATION`
    /// returned by `var`
    pub fn from_vars<F>(var: F) -> Result<Self, CfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let services = match var(VCAP_SERVICES_VAR) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => VcapServices::new(),
        };
        let application = match var(VCAP_APPLICATION_VAR) {
            Some(raw) if !raw.trim().is_empty() => Some(serde_json::from_str(&raw)?),
            _ => None,
        };
        Ok(Self::from_vcap(services, application))
    }

    pub fn from_process_env() -> Result<Self, CfError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Application name from `VCAP_APPLICATION`
    pub fn name(&self) -> Option<&str> {
        let app = self.application.as_ref()?;
        app.get("application_name")
            .or_else(|| app.get("name"))
            .and_then(Value::as_str)
    }

    /// Credentials of the only instance of the service whose label matches.
    ///
    /// Instances without credentials yield an empty object. More than one
    /// instance under the label is an error.
    pub fn service_creds_by_label(
        &self,
        spec: &ServiceSpec,
        required: bool,
    ) -> Result<Option<Value>, CfError> {
        let instances = match spec {
            ServiceSpec::Exact(label) => self.services.get(label),
            ServiceSpec::Pattern(_) => self
                .services
                .iter()
                .find(|(label, _)| spec.matches(label))
                .map(|(_, instances)| instances),
        };

        match instances.map(Vec::as_slice) {
            None | Some([]) => self.not_found(spec, required),
            Some([instance]) => Ok(Some(credentials(instance))),
            Some(_) => Err(CfError::MultipleInstances(spec.to_string())),
        }
    }

    /// Credentials of the first instance, in label order, whose name matches
    pub fn service_creds_by_name(
        &self,
        spec: &ServiceSpec,
        required: bool,
    ) -> Result<Option<Value>, CfError> {
        let found = self
            .services
            .values()
            .flatten()
            .find(|instance| spec.matches(&instance.name));

        match found {
            Some(instance) => Ok(Some(credentials(instance))),
            None => self.not_found(spec, required),
        }
    }

    fn not_found(&self, spec: &ServiceSpec, required: bool) -> Result<Option<Value>, CfError> {
        if !required {
            return Ok(None);
        }
        Err(CfError::ServiceNotFound {
            spec: spec.to_string(),
            hint: if self.is_local { LOCAL_HINT } else { "" },
        })
    }
}

fn credentials(instance: &ServiceInstance) -> Value {
    instance
        .credentials
        .clone()
        .unwrap_or_else(|| Value::Object(Default::default()))
}
