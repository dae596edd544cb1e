//! Device kinds named by a program, for prefetching.

use indexmap::IndexMap;
use thingtalk_ast::{
    Action, DeclarationBody, Invocation, NodePath, PermissionFunction, Program, Rule, RuleTrigger,
    Selector, Stream, Table,
};

/// Every device kind in `program`, with the path of its first use.
pub(super) fn collect(program: &Program) -> IndexMap<String, NodePath> {
    let mut kinds = Kinds::default();
    let root = NodePath::root();
    for (i, decl) in program.declarations.iter().enumerate() {
        kinds.body(&decl.body, &root.field("declarations").index(i));
    }
    for (i, dataset) in program.datasets.iter().enumerate() {
        let dataset_path = root.field("datasets").index(i).field("examples");
        for (j, example) in dataset.examples.iter().enumerate() {
            kinds.body(&example.body, &dataset_path.index(j));
        }
    }
    for (i, rule) in program.rules.iter().enumerate() {
        kinds.rule(rule, &root.field("rules").index(i));
    }
    for (i, permission) in program.permissions.iter().enumerate() {
        let path = root.field("permissions").index(i);
        kinds.permission_function(&permission.query, &path.field("query"));
        kinds.permission_function(&permission.action, &path.field("action"));
    }
    kinds.0
}

#[derive(Default)]
struct Kinds(IndexMap<String, NodePath>);

impl Kinds {
    fn add(&mut self, kind: &str, path: &NodePath) {
        if !self.0.contains_key(kind) {
            self.0.insert(kind.to_string(), path.clone());
        }
    }

    fn body(&mut self, body: &DeclarationBody, path: &NodePath) {
        match body {
            DeclarationBody::Program(rules) => {
                for (i, rule) in rules.iter().enumerate() {
                    self.rule(rule, &path.field("rules").index(i));
                }
            }
            DeclarationBody::Query(table) => self.table(table, &path.field("table")),
            DeclarationBody::Stream(stream) => self.stream(stream, &path.field("stream")),
            DeclarationBody::Action(action) => self.action(action, &path.field("action")),
        }
    }

    fn rule(&mut self, rule: &Rule, path: &NodePath) {
        if let RuleTrigger::Stream(stream) = &rule.trigger {
            self.stream(stream, &path.field("stream"));
        }
        for (i, table) in rule.queries.iter().enumerate() {
            self.table(table, &path.field("queries").index(i));
        }
        for (i, action) in rule.actions.iter().enumerate() {
            self.action(action, &path.field("actions").index(i));
        }
    }

    fn invocation(&mut self, inv: &Invocation, path: &NodePath) {
        if let Selector::Device(device) = &inv.selector {
            self.add(&device.kind, path);
        }
    }

    fn table(&mut self, table: &Table, path: &NodePath) {
        match table {
            Table::Invocation(inv) => self.invocation(inv, path),
            Table::ResultRef { kind, .. } => self.add(kind, path),
            Table::VarRef { .. } => {}
            Table::Join { left, right, .. } => {
                self.table(left, &path.field("left"));
                self.table(right, &path.field("right"));
            }
            Table::Filter { table, .. }
            | Table::Projection { table, .. }
            | Table::Aggregate { table, .. }
            | Table::Sort { table, .. }
            | Table::Index { table, .. }
            | Table::Slice { table, .. }
            | Table::Compute { table, .. } => self.table(table, &path.field("table")),
        }
    }

    fn stream(&mut self, stream: &Stream, path: &NodePath) {
        match stream {
            Stream::Invocation(inv) => self.invocation(inv, path),
            Stream::Monitor { table } => self.table(table, &path.field("table")),
            Stream::Join { stream, table, .. } => {
                self.stream(stream, &path.field("stream"));
                self.table(table, &path.field("table"));
            }
            Stream::EdgeNew { stream }
            | Stream::EdgeFilter { stream, .. }
            | Stream::Filter { stream, .. } => self.stream(stream, &path.field("stream")),
            Stream::VarRef { .. } | Stream::AtTimer { .. } | Stream::Timer { .. } => {}
        }
    }

    fn action(&mut self, action: &Action, path: &NodePath) {
        if let Action::Invocation(inv) = action {
            self.invocation(inv, path);
        }
    }

    fn permission_function(&mut self, function: &PermissionFunction, path: &NodePath) {
        match function {
            PermissionFunction::ClassStar(kind) | PermissionFunction::Specified { kind, .. } => {
                self.add(kind, path)
            }
            PermissionFunction::Builtin | PermissionFunction::Star => {}
        }
    }
}
