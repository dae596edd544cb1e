use super::prompts::{self, PromptError, PromptKey};
use super::Primitive;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thingtalk_ast::{
    DeviceSelector, FilterAtom, FunctionDef, InputParam, NodePath, Program, Selector, Type, Value,
};

/// What a slot fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Argument of an invocation or call
    InputParam,
    /// Value compared by a filter atom
    Filter,
    /// Element of an array value
    ArrayIndex,
    /// Operand of a table, stream or computed filter, or the principal
    Field,
    /// Device attribute such as `name`
    DeviceAttribute,
}

/// One fillable value, addressed by its node path.
///
/// A slot is a snapshot: it owns a copy of the value it was created from and
/// writes back through [`Slot::set`].
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub kind: SlotKind,
    label: String,
    #[serde(rename = "type")]
    ty: Type,
    value: Value,
    path: NodePath,
    tag: String,
    #[serde(skip)]
    question: Option<String>,
    #[serde(skip)]
    prompt: PromptKey,
    /// Names visible where the slot appears, with their types
    pub scope: IndexMap<String, Type>,
}

/// Item of [`super::iterate_slots2`].
#[derive(Debug, Clone)]
pub enum SlotItem<'a> {
    Selector(&'a DeviceSelector),
    Value(Slot),
}

/// Leaf reported by the legacy view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegacyValue<'a> {
    Selector(&'a Selector),
    InputParam(&'a InputParam),
    FilterAtom(&'a FilterAtom),
}

/// Item of [`super::iterate_slots`].
#[derive(Debug, Clone)]
pub struct LegacySlot<'a> {
    /// Signature of the enclosing function, if known
    pub schema: Option<Arc<FunctionDef>>,
    pub slot: LegacyValue<'a>,
    /// Enclosing primitive; `None` for permission filters
    pub primitive: Option<Primitive<'a>>,
    pub scope: IndexMap<String, Type>,
}

pub(super) struct SlotBuilder {
    pub kind: SlotKind,
    pub label: String,
    pub ty: Type,
    pub tag: String,
    pub question: Option<String>,
    pub prompt: PromptKey,
}

impl SlotBuilder {
    pub fn build(self, value: &Value, path: NodePath, scope: &IndexMap<String, Type>) -> Slot {
        Slot {
            kind: self.kind,
            label: self.label,
            ty: self.ty,
            value: value.clone(),
            path,
            tag: self.tag,
            question: self.question,
            prompt: self.prompt,
            scope: scope.clone(),
        }
    }
}

impl Slot {
    /// Type a value must have to fill this slot; `Any` when unknown.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The value at the time the slot was produced.
    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Stable category key, e.g. `in_param.status` or `filter.=~.title`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Write `value` into `program` at this slot's address.
    ///
    /// Returns `false` if the address no longer resolves in `program`.
    pub fn set(&mut self, program: &mut Program, value: Value) -> bool {
        match program.value_at_mut(&self.path) {
            Some(target) => {
                *target = value.clone();
                self.value = value;
                true
            }
            None => false,
        }
    }

    /// Values to offer when the type has a closed domain.
    pub fn options(&self) -> Vec<Value> {
        match &self.ty {
            Type::Enum(symbols) => symbols.iter().cloned().map(Value::Enum).collect(),
            Type::Boolean => vec![Value::Boolean(true), Value::Boolean(false)],
            _ => Vec::new(),
        }
    }

    /// Question to ask to fill this slot.
    ///
    /// The schema's own question wins; otherwise the catalog for `locale`
    /// is used.
    ///
    /// # Errors
    ///
    /// [`PromptError::MissingTranslation`] if `locale` has no catalog or the
    /// catalog has no prompt for this slot.
    pub fn prompt(&self, locale: &str) -> Result<String, PromptError> {
        if let Some(question) = &self.question {
            return Ok(question.clone());
        }
        prompts::render(locale, &self.prompt, &self.tag)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::InputParam => "InputParamSlot",
            SlotKind::Filter => "FilterSlot",
            SlotKind::ArrayIndex => "ArrayIndexSlot",
            SlotKind::Field => "FieldSlot",
            SlotKind::DeviceAttribute => "DeviceAttributeSlot",
        })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} : {})", self.kind, self.label, self.ty)
    }
}

impl fmt::Display for SlotItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotItem::Selector(device) => write!(f, "Selector(@{})", device.kind),
            SlotItem::Value(slot) => write!(f, "{}", slot),
        }
    }
}

impl fmt::Display for LegacyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyValue::Selector(selector) => write!(f, "{}", selector),
            LegacyValue::InputParam(param) => write!(f, "{}", param),
            LegacyValue::FilterAtom(atom) => write!(f, "{}", atom),
        }
    }
}

impl fmt::Display for LegacySlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.primitive {
            Some(primitive) => write!(f, "{} {}", self.slot, primitive.name()),
            None => write!(f, "{}", self.slot),
        }
    }
}
