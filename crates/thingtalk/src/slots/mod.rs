//! Deterministic views over the fillable leaves of a typed program.
//!
//! Three views share a single traversal:
//!
//! - [`iterate_primitives`] - every invocation, call and result reference,
//!   with the role it plays in its rule
//! - [`iterate_slots`] - the legacy view: selectors, input parameters and
//!   filter atoms, each with its schema and primitive
//! - [`iterate_slots2`] - device selectors and typed, addressable [`Slot`]s
//!
//! # Order
//!
//! The principal comes first, then declarations, datasets, rules and
//! permissions. Within a rule the trigger precedes the queries, which precede
//! the actions; the left side of a join precedes the right side. Within an
//! invocation, device attributes come first, then the selector, the input
//! parameters in signature order and the filter atoms in textual order.
//!
//! Declared programs are not traversed; their calls are.
//!
//! # Laziness
//!
//! Each view is an iterator that walks one top-level item at a time. Nothing
//! is cached between calls, so every call starts over from the program.

mod prompts;
mod slot;
mod walk;


pub use prompts::{PromptCatalog, PromptError};
pub use slot::{LegacySlot, LegacyValue, Slot, SlotItem, SlotKind};

use serde::Serialize;
use std::fmt;
use thingtalk_ast::{InputParam, Invocation, Program, Value};
use walk::{Visit, Walk};

/// Role of a primitive within its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveRole {
    Trigger,
    Query,
    Action,
}

/// Leaf that talks to a device or to a declared function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive<'a> {
    Invocation(&'a Invocation),
    /// Call to a declared query, stream, action or program
    Call {
        name: &'a str,
        in_params: &'a [InputParam],
    },
    ResultRef {
        kind: &'a str,
        channel: &'a str,
        index: &'a Value,
    },
}

impl PrimitiveRole {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveRole::Trigger => "trigger",
            PrimitiveRole::Query => "query",
            PrimitiveRole::Action => "action",
        }
    }
}

impl fmt::Display for PrimitiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Primitive<'_> {
    /// `kind:channel` for invocations, the name for calls.
    pub fn name(&self) -> String {
        match self {
            Primitive::Invocation(inv) => match inv.selector.kind() {
                Some(kind) => format!("{}:{}", kind, inv.channel),
                None => inv.channel.clone(),
            },
            Primitive::Call { name, .. } => name.to_string(),
            Primitive::ResultRef { kind, channel, .. } => format!("{}:{}", kind, channel),
        }
    }
}

impl fmt::Display for Primitive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Invocation(inv) => write!(f, "{}", inv),
            Primitive::Call { name, in_params } => {
                write!(f, "VarRef({}, ", name)?;
                for (i, p) in in_params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                f.write_str(", )")
            }
            Primitive::ResultRef {
                kind,
                channel,
                index,
            } => write!(f, "ResultRef({}, {}, {}, )", kind, channel, index),
        }
    }
}

/// Every primitive of `program`, with its role.
///
/// With `include_queries` unset, query primitives are skipped.
pub fn iterate_primitives(
    program: &Program,
    include_queries: bool,
) -> impl Iterator<Item = (PrimitiveRole, Primitive<'_>)> {
    Walk::new(program).filter_map(move |visit| match visit {
        Visit::Primitive(PrimitiveRole::Query, _) if !include_queries => None,
        Visit::Primitive(role, primitive) => Some((role, primitive)),
        _ => None,
    })
}

/// Legacy slot view: selectors, input parameters and filter atoms.
pub fn iterate_slots(program: &Program) -> impl Iterator<Item = LegacySlot<'_>> {
    Walk::new(program).filter_map(|visit| match visit {
        Visit::Selector {
            selector,
            primitive,
            schema,
            scope,
        } => Some(LegacySlot {
            schema,
            slot: LegacyValue::Selector(selector),
            primitive: Some(primitive),
            scope,
        }),
        Visit::Slot {
            slot,
            legacy: Some(value),
            primitive,
            schema,
        } => Some(LegacySlot {
            schema,
            slot: value,
            primitive,
            scope: slot.scope,
        }),
        _ => None,
    })
}

/// Device selectors and typed slots, in slot order.
pub fn iterate_slots2(program: &Program) -> impl Iterator<Item = SlotItem<'_>> {
    Walk::new(program).filter_map(|visit| match visit {
        Visit::Selector { selector, .. } => selector_device(selector).map(SlotItem::Selector),
        Visit::Slot { slot, .. } => Some(SlotItem::Value(slot)),
        Visit::Primitive(..) => None,
    })
}

fn selector_device(selector: &thingtalk_ast::Selector) -> Option<&thingtalk_ast::DeviceSelector> {
    match selector {
        thingtalk_ast::Selector::Device(device) => Some(device),
        thingtalk_ast::Selector::Builtin => None,
    }
}
