//! Calls to device functions.

use super::filter::Filter;
use super::value::Value;
use crate::foundation::FunctionDef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// `name=value` argument of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    pub name: String,
    pub value: Value,
}

/// Output binding introduced by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputParam {
    pub name: String,
    pub value: Value,
}

/// Which device a call goes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    Device(DeviceSelector),
    /// The engine itself (`notify`, `return`)
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSelector {
    pub kind: String,
    pub id: Option<String>,
    pub principal: Option<String>,
    /// Device attributes other than `id` and `principal`, e.g. `name`
    pub attributes: Vec<InputParam>,
}

/// One call to a trigger, query or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub selector: Selector,
    pub channel: String,
    pub in_params: Vec<InputParam>,
    pub filter: Filter,
    pub out_params: Vec<OutputParam>,
    /// Resolved signature, written by the type checker
    #[serde(skip)]
    pub schema: Option<Arc<FunctionDef>>,
}

impl InputParam {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

impl DeviceSelector {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: None,
            principal: None,
            attributes: Vec::new(),
        }
    }
}

impl Selector {
    pub fn device(kind: &str) -> Self {
        Selector::Device(DeviceSelector::new(kind))
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Selector::Device(d) => Some(&d.kind),
            Selector::Builtin => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Selector::Builtin)
    }
}

impl Invocation {
    pub fn new(selector: Selector, channel: &str, in_params: Vec<InputParam>) -> Self {
        Self {
            selector,
            channel: channel.to_string(),
            in_params,
            filter: Filter::True,
            out_params: Vec::new(),
            schema: None,
        }
    }

    /// The builtin `notify` action.
    pub fn notify() -> Self {
        Self::new(Selector::Builtin, "notify", Vec::new())
    }

    pub fn in_param(&self, name: &str) -> Option<&InputParam> {
        self.in_params.iter().find(|p| p.name == name)
    }
}

/// Comma-joined parameter list, as used by the `Display` forms.
pub(crate) fn display_params(f: &mut fmt::Formatter<'_>, params: &[InputParam]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

impl fmt::Display for InputParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputParam({}, {})", self.name, self.value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Device(d) => write!(
                f,
                "Device({}, {}, {})",
                d.kind,
                d.id.as_deref().unwrap_or(""),
                d.principal.as_deref().unwrap_or("")
            ),
            Selector::Builtin => f.write_str("Builtin"),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invocation({}, {}, ", self.selector, self.channel)?;
        display_params(f, &self.in_params)?;
        f.write_str(", )")
    }
}
