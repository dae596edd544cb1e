//! The traversal shared by every slot view.

use super::prompts::PromptKey;
use super::slot::{LegacyValue, Slot, SlotBuilder, SlotKind};
use super::{Primitive, PrimitiveRole};
use indexmap::IndexMap;
use std::sync::Arc;
use thingtalk_ast::{
    Action, DeclarationBody, Filter, FilterAtom, FunctionDef, InputParam, Invocation, NodePath,
    PermissionFunction, PermissionRule, Program, Rule, RuleTrigger, Selector, Stream, Table,
    TopLevel, Type, Value, PERMISSION_SOURCE,
};

pub(super) type Scope = IndexMap<String, Type>;

/// One step of the traversal.
pub(super) enum Visit<'a> {
    Primitive(PrimitiveRole, Primitive<'a>),
    Selector {
        selector: &'a Selector,
        primitive: Primitive<'a>,
        schema: Option<Arc<FunctionDef>>,
        scope: Scope,
    },
    Slot {
        slot: Slot,
        /// Set for the leaves the legacy view reports
        legacy: Option<LegacyValue<'a>>,
        primitive: Option<Primitive<'a>>,
        schema: Option<Arc<FunctionDef>>,
    },
}

/// Lazy traversal of a program, one top-level item at a time.
pub(super) struct Walk<'a> {
    principal: Option<&'a Value>,
    items: Box<dyn Iterator<Item = TopLevel<'a>> + 'a>,
    pending: std::vec::IntoIter<Visit<'a>>,
}

impl<'a> Walk<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            principal: program.principal.as_ref(),
            items: Box::new(program.items()),
            pending: Vec::new().into_iter(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Visit<'a>> {
        loop {
            if let Some(visit) = self.pending.next() {
                return Some(visit);
            }
            let mut visitor = Visitor::default();
            if let Some(principal) = self.principal.take() {
                visitor.principal(principal);
            } else {
                visitor.item(self.items.next()?);
            }
            self.pending = visitor.out.into_iter();
        }
    }
}

/// Where a filter sits, which decides how its atoms are typed and reported.
struct FilterOwner<'a, 'f> {
    schema: Option<&'f Arc<FunctionDef>>,
    primitive: Option<Primitive<'a>>,
    /// Principal filter of a permission rule
    principal: bool,
    scope: &'f Scope,
}

#[derive(Default)]
struct Visitor<'a> {
    out: Vec<Visit<'a>>,
}

impl<'a> Visitor<'a> {
    fn principal(&mut self, value: &'a Value) {
        let slot = SlotBuilder {
            kind: SlotKind::Field,
            label: "principal".to_string(),
            ty: Type::Entity(PERMISSION_SOURCE.1.to_string()),
            tag: "program.principal".to_string(),
            question: None,
            prompt: PromptKey::new("program.principal"),
        };
        self.slot(
            slot.build(value, NodePath::root().field("principal"), &Scope::new()),
            None,
            None,
            None,
        );
    }

    fn item(&mut self, item: TopLevel<'a>) {
        let root = NodePath::root();
        match item {
            // declared programs are reached through their calls
            TopLevel::Declaration(_, decl) if matches!(decl.body, DeclarationBody::Program(_)) => {}
            TopLevel::Declaration(i, decl) => {
                let scope: Scope = decl.params.clone();
                self.body(&decl.body, &scope, &root.field("declarations").index(i));
            }
            TopLevel::Dataset(i, dataset) => {
                let path = root.field("datasets").index(i).field("examples");
                for (j, example) in dataset.examples.iter().enumerate() {
                    self.body(&example.body, &example.params, &path.index(j));
                }
            }
            TopLevel::Rule(i, rule) => self.rule(rule, &Scope::new(), &root.field("rules").index(i)),
            TopLevel::Permission(i, permission) => {
                self.permission(permission, &root.field("permissions").index(i))
            }
        }
    }

    fn body(&mut self, body: &'a DeclarationBody, scope: &Scope, path: &NodePath) {
        match body {
            DeclarationBody::Program(rules) => {
                for (i, rule) in rules.iter().enumerate() {
                    self.rule(rule, scope, &path.field("rules").index(i));
                }
            }
            DeclarationBody::Query(table) => self.table(table, scope, &path.field("table")),
            DeclarationBody::Stream(stream) => self.stream(stream, scope, &path.field("stream")),
            DeclarationBody::Action(action) => self.action(action, scope, &path.field("action")),
        }
    }

    fn rule(&mut self, rule: &'a Rule, scope: &Scope, path: &NodePath) {
        let mut scope = scope.clone();
        if let RuleTrigger::Stream(stream) = &rule.trigger {
            self.stream(stream, &scope, &path.field("stream"));
            bind_outputs(&mut scope, stream.schema().as_deref());
        }
        let queries = path.field("queries");
        for (i, table) in rule.queries.iter().enumerate() {
            self.table(table, &scope, &queries.index(i));
            bind_outputs(&mut scope, table.schema().as_deref());
        }
        let actions = path.field("actions");
        for (i, action) in rule.actions.iter().enumerate() {
            self.action(action, &scope, &actions.index(i));
        }
    }

    fn permission(&mut self, permission: &'a PermissionRule, path: &NodePath) {
        let scope = Scope::new();
        let owner = FilterOwner {
            schema: None,
            primitive: None,
            principal: true,
            scope: &scope,
        };
        self.filter(&permission.principal, &owner, &path.field("principal"));

        for (field, function) in [("query", &permission.query), ("action", &permission.action)] {
            if let PermissionFunction::Specified { filter, schema, .. } = function {
                let owner = FilterOwner {
                    schema: schema.as_ref(),
                    primitive: None,
                    principal: false,
                    scope: &scope,
                };
                self.filter(filter, &owner, &path.field(field).field("filter"));
            }
        }
    }

    fn table(&mut self, table: &'a Table, scope: &Scope, path: &NodePath) {
        match table {
            Table::Invocation(inv) => self.invocation(inv, PrimitiveRole::Query, scope, path),
            Table::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), PrimitiveRole::Query, scope, path),
            Table::ResultRef {
                kind,
                channel,
                index,
                ..
            } => {
                self.out.push(Visit::Primitive(
                    PrimitiveRole::Query,
                    Primitive::ResultRef {
                        kind,
                        channel,
                        index,
                    },
                ));
                self.field(index, "index", Type::Number, "result_ref.index", scope, &path.field("index"));
            }
            Table::Filter { table: inner, filter } => {
                self.table(inner, scope, &path.field("table"));
                let schema = inner.schema();
                let owner = FilterOwner {
                    schema: schema.as_ref(),
                    primitive: table_primitive(inner),
                    principal: false,
                    scope,
                };
                self.filter(filter, &owner, &path.field("filter"));
            }
            Table::Projection { table, .. }
            | Table::Aggregate { table, .. }
            | Table::Sort { table, .. }
            | Table::Compute { table, .. } => self.table(table, scope, &path.field("table")),
            // left values reach the right side only through `on`
            Table::Join { left, right, .. } => {
                self.table(left, scope, &path.field("left"));
                self.table(right, scope, &path.field("right"));
            }
            Table::Index { table, indices } => {
                self.table(table, scope, &path.field("table"));
                let indices_path = path.field("indices");
                for (i, index) in indices.iter().enumerate() {
                    let slot = SlotBuilder {
                        kind: SlotKind::ArrayIndex,
                        label: format!("[{}]", i),
                        ty: Type::Number,
                        tag: format!("table.index.{}", i),
                        question: None,
                        prompt: PromptKey::new("table.index").at(i, indices.len()),
                    };
                    self.slot(slot.build(index, indices_path.index(i), scope), None, None, None);
                }
            }
            Table::Slice { table, base, limit } => {
                self.table(table, scope, &path.field("table"));
                self.field(base, "base", Type::Number, "slice.base", scope, &path.field("base"));
                self.field(limit, "limit", Type::Number, "slice.limit", scope, &path.field("limit"));
            }
        }
    }

    fn stream(&mut self, stream: &'a Stream, scope: &Scope, path: &NodePath) {
        match stream {
            Stream::Invocation(inv) => self.invocation(inv, PrimitiveRole::Trigger, scope, path),
            Stream::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), PrimitiveRole::Trigger, scope, path),
            Stream::Monitor { table } => self.table(table, scope, &path.field("table")),
            Stream::AtTimer {
                time,
                expiration_date,
            } => {
                let time_path = path.field("time");
                match time {
                    Value::Array(times) => {
                        for (i, t) in times.iter().enumerate() {
                            let slot = SlotBuilder {
                                kind: SlotKind::ArrayIndex,
                                label: format!("[{}]", i),
                                ty: Type::Time,
                                tag: format!("attimer.time.{}", i),
                                question: None,
                                prompt: PromptKey::new("attimer.time").at(i, times.len()),
                            };
                            self.slot(slot.build(t, time_path.index(i), scope), None, None, None);
                        }
                    }
                    other => self.field(other, "time", Type::Time.array_of(), "attimer.time", scope, &time_path),
                }
                if let Some(date) = expiration_date {
                    self.field(
                        date,
                        "expiration_date",
                        Type::Date,
                        "attimer.expiration_date",
                        scope,
                        &path.field("expiration_date"),
                    );
                }
            }
            Stream::Timer { base, interval } => {
                self.field(base, "base", Type::Date, "timer.base", scope, &path.field("base"));
                self.field(
                    interval,
                    "interval",
                    Type::Measure("ms".to_string()),
                    "timer.interval",
                    scope,
                    &path.field("interval"),
                );
            }
            Stream::EdgeNew { stream } => self.stream(stream, scope, &path.field("stream")),
            Stream::EdgeFilter {
                stream: inner,
                filter,
            }
            | Stream::Filter {
                stream: inner,
                filter,
            } => {
                self.stream(inner, scope, &path.field("stream"));
                let schema = inner.schema();
                let owner = FilterOwner {
                    schema: schema.as_ref(),
                    primitive: stream_primitive(inner),
                    principal: false,
                    scope,
                };
                self.filter(filter, &owner, &path.field("filter"));
            }
            Stream::Join { stream, table, .. } => {
                self.stream(stream, scope, &path.field("stream"));
                self.table(table, scope, &path.field("table"));
            }
        }
    }

    fn action(&mut self, action: &'a Action, scope: &Scope, path: &NodePath) {
        match action {
            Action::Invocation(inv) => self.invocation(inv, PrimitiveRole::Action, scope, path),
            Action::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), PrimitiveRole::Action, scope, path),
        }
    }

    fn invocation(&mut self, inv: &'a Invocation, role: PrimitiveRole, scope: &Scope, path: &NodePath) {
        let primitive = Primitive::Invocation(inv);
        self.out.push(Visit::Primitive(role, primitive));

        if let Selector::Device(device) = &inv.selector {
            let attributes = path.field("attributes");
            for attribute in &device.attributes {
                let slot = SlotBuilder {
                    kind: SlotKind::DeviceAttribute,
                    label: attribute.name.clone(),
                    ty: Type::String,
                    tag: format!("attribute.{}", attribute.name),
                    question: None,
                    prompt: PromptKey::named("attribute", &attribute.name),
                };
                let slot = slot.build(&attribute.value, attributes.key(&attribute.name), scope);
                self.slot(slot, None, Some(primitive), inv.schema.clone());
            }
        }
        self.out.push(Visit::Selector {
            selector: &inv.selector,
            primitive,
            schema: inv.schema.clone(),
            scope: scope.clone(),
        });

        self.params(&inv.in_params, inv.schema.as_ref(), primitive, scope, &path.field("in_params"));
        let owner = FilterOwner {
            schema: inv.schema.as_ref(),
            primitive: Some(primitive),
            principal: false,
            scope,
        };
        self.filter(&inv.filter, &owner, &path.field("filter"));
    }

    fn call(
        &mut self,
        name: &'a str,
        in_params: &'a [InputParam],
        schema: Option<&Arc<FunctionDef>>,
        role: PrimitiveRole,
        scope: &Scope,
        path: &NodePath,
    ) {
        let primitive = Primitive::Call { name, in_params };
        self.out.push(Visit::Primitive(role, primitive));
        self.params(in_params, schema, primitive, scope, &path.field("in_params"));
    }

    fn params(
        &mut self,
        params: &'a [InputParam],
        schema: Option<&Arc<FunctionDef>>,
        primitive: Primitive<'a>,
        scope: &Scope,
        path: &NodePath,
    ) {
        for param in params {
            let arg = schema.and_then(|s| s.arg(&param.name));
            let slot = SlotBuilder {
                kind: SlotKind::InputParam,
                label: param.name.clone(),
                ty: arg.map_or(Type::Any, |a| a.ty.clone()),
                tag: format!("in_param.{}", param.name),
                question: arg.and_then(|a| a.question()).map(str::to_string),
                prompt: PromptKey::named("in_param", &param.name),
            };
            let slot = slot.build(&param.value, path.key(&param.name), scope);
            self.slot(
                slot,
                Some(LegacyValue::InputParam(param)),
                Some(primitive),
                schema.cloned(),
            );
        }
    }

    fn filter(&mut self, filter: &'a Filter, owner: &FilterOwner<'a, '_>, path: &NodePath) {
        match filter {
            Filter::True | Filter::False => {}
            Filter::And(operands) | Filter::Or(operands) => {
                let operands_path = path.field("operands");
                for (i, operand) in operands.iter().enumerate() {
                    self.filter(operand, owner, &operands_path.index(i));
                }
            }
            Filter::Not(inner) => self.filter(inner, owner, &path.field("operand")),
            Filter::Atom(atom) => self.atom(atom, owner, path),
            Filter::Compute(compute) => {
                let lookup = |name: &str| {
                    owner
                        .schema
                        .and_then(|s| s.arg(name))
                        .map(|a| a.ty.clone())
                        .or_else(|| owner.scope.get(name).cloned())
                };
                let lhs_ty = compute.lhs.infer_type(&lookup).unwrap_or(Type::Number);
                let rhs_ty = compute.op.value_type(&lhs_ty).unwrap_or(Type::Any);
                for (side, value, ty) in [("lhs", &compute.lhs, lhs_ty), ("rhs", &compute.rhs, rhs_ty)] {
                    let tag = format!("compute_filter.{}", side);
                    let slot = SlotBuilder {
                        kind: SlotKind::Field,
                        label: side.to_string(),
                        ty,
                        prompt: PromptKey::new(tag.clone()),
                        tag,
                        question: None,
                    };
                    let slot = slot.build(value, path.field(side), owner.scope);
                    self.slot(slot, None, owner.primitive, owner.schema.cloned());
                }
            }
        }
    }

    fn atom(&mut self, atom: &'a FilterAtom, owner: &FilterOwner<'a, '_>, path: &NodePath) {
        let (field, question, name) = if owner.principal && atom.name == PERMISSION_SOURCE.0 {
            (
                Type::Entity(PERMISSION_SOURCE.1.to_string()),
                None,
                format!("${}", atom.name),
            )
        } else {
            let arg = owner.schema.and_then(|s| s.arg(&atom.name));
            (
                arg.map_or(Type::Any, |a| a.ty.clone()),
                arg.and_then(|a| a.question()).map(str::to_string),
                atom.name.clone(),
            )
        };
        let ty = atom.op.value_type(&field).unwrap_or(Type::Any);
        let tag = format!("filter.{}.{}", atom.op.as_str(), name);
        let (key, element_key) = if owner.principal {
            ("source".to_string(), "source.element")
        } else {
            (format!("filter.{}", atom.op.as_str()), "filter.element")
        };

        let value_path = path.field("value");
        let element_ty = ty.element_type().cloned().unwrap_or(Type::Any);
        let slot = SlotBuilder {
            kind: SlotKind::Filter,
            label: format!("{} {}", atom.name, atom.op.as_str()),
            ty,
            tag: tag.clone(),
            question,
            prompt: PromptKey::named(key, &atom.name),
        };
        let slot = slot.build(&atom.value, value_path.clone(), owner.scope);
        self.slot(
            slot,
            Some(LegacyValue::FilterAtom(atom)),
            owner.primitive,
            owner.schema.cloned(),
        );

        if let Value::Array(elements) = &atom.value {
            for (i, element) in elements.iter().enumerate() {
                let slot = SlotBuilder {
                    kind: SlotKind::ArrayIndex,
                    label: format!("[{}]", i),
                    ty: element_ty.clone(),
                    tag: format!("{}.{}", tag, i),
                    question: None,
                    prompt: PromptKey::named(element_key, &atom.name).at(i, elements.len()),
                };
                let slot = slot.build(element, value_path.index(i), owner.scope);
                self.slot(slot, None, owner.primitive, owner.schema.cloned());
            }
        }
    }

    /// A `Field` slot of a table or stream operand.
    fn field(&mut self, value: &'a Value, label: &str, ty: Type, tag: &str, scope: &Scope, path: &NodePath) {
        let slot = SlotBuilder {
            kind: SlotKind::Field,
            label: label.to_string(),
            ty,
            tag: tag.to_string(),
            question: None,
            prompt: PromptKey::new(tag),
        };
        self.slot(slot.build(value, path.clone(), scope), None, None, None);
    }

    fn slot(
        &mut self,
        slot: Slot,
        legacy: Option<LegacyValue<'a>>,
        primitive: Option<Primitive<'a>>,
        schema: Option<Arc<FunctionDef>>,
    ) {
        self.out.push(Visit::Slot {
            slot,
            legacy,
            primitive,
            schema,
        });
    }
}

fn bind_outputs(scope: &mut Scope, schema: Option<&FunctionDef>) {
    if let Some(schema) = schema {
        for arg in schema.outputs() {
            scope.insert(arg.name.clone(), arg.ty.clone());
        }
    }
}

/// The invocation a filter on `table` applies to, if there is exactly one.
fn table_primitive(table: &Table) -> Option<Primitive<'_>> {
    match table {
        Table::Invocation(inv) => Some(Primitive::Invocation(inv)),
        _ => None,
    }
}

fn stream_primitive(stream: &Stream) -> Option<Primitive<'_>> {
    match stream {
        Stream::Invocation(inv) => Some(Primitive::Invocation(inv)),
        Stream::Monitor { table } => table_primitive(table),
        _ => None,
    }
}
