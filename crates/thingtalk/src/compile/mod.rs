//! Lowering of typed programs into rule plans.
//!
//! A [`RulePlan`] is a list of [`Stage`]s with explicit data flow: every
//! stage input says where its value comes from (a constant, a pending
//! placeholder, another stage's output, the current event or a declaration
//! parameter), and `depends_on` lists the stages it needs.
//!
//! Stages are numbered in creation order, so the stages a stage depends on
//! always have smaller ids. Within a rule each trigger or query stage depends
//! on the one before it, and actions depend on the last of them.
//!
//! Permission rules are policies, not executable rules, and are not lowered.
//! Declared programs are lowered to plans tagged with their name; other
//! declarations are reached through the `Call` stages that name them.


use crate::resolve::{CompileError, CompileResult, ErrorKind};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use thingtalk_ast::{
    Action, AggregateOp, DeclarationBody, Filter, FunctionDef, InputParam, Invocation, NodePath,
    Program, Rule, RuleTrigger, Selector, SortDirection, Stream, Table, Type, Value,
};
use tracing::info;

/// What starts a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Runs once
    Now,
    /// Runs on every event of a data stream
    Monitor,
    /// Runs on a clock
    Timer,
    /// Runs on every user input
    OnInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Trigger,
    Query,
    Action,
}

/// Operation performed by a stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageKind {
    /// Call to a device function
    Invoke {
        kind: String,
        channel: String,
        /// Device attributes used to pick the device
        attributes: IndexMap<String, StageInput>,
        filter: Filter,
    },
    /// Call to an engine function (`notify`, `return`)
    Builtin { channel: String },
    /// Call to a declared function
    Call { name: String },
    ResultRef { kind: String, channel: String },
    AtTimer,
    Timer,
    Monitor,
    EdgeNew,
    EdgeFilter { filter: Filter },
    Filter { filter: Filter },
    Projection { fields: Vec<String> },
    /// Joins its first dependency with its second, passing the join inputs
    /// to the second
    Join,
    Aggregate { op: AggregateOp, field: Option<String> },
    Sort { field: String, direction: SortDirection },
    Index,
    Slice,
    Compute { expr: Value, alias: String },
}

/// Source of a stage input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageInput {
    Constant(Value),
    /// Value with a local placeholder, to be asked before execution
    Pending(Value),
    /// Output `field` of an earlier stage
    FromStage { stage: usize, field: String },
    /// The event produced by `stage`, or one of its fields
    Event { stage: usize, field: Option<String> },
    /// Parameter of the enclosing declaration
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub id: usize,
    pub role: StageRole,
    pub kind: StageKind,
    pub inputs: IndexMap<String, StageInput>,
    pub outputs: IndexMap<String, Type>,
    pub depends_on: Vec<usize>,
}

/// Executable form of one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePlan {
    pub mode: RuleMode,
    /// Who runs the rule, if not the owner
    pub executor: Option<Value>,
    /// Name of the declared program this rule belongs to
    pub declaration: Option<String>,
    pub stages: Vec<Stage>,
}

/// Lower every rule of a type-checked program.
///
/// Plans for declared programs come first, in declaration order, followed
/// by the top-level rules.
///
/// # Errors
///
/// - `UnresolvedPlaceholder` if an input holds `$undefined.remote`
/// - `Internal` if the program was not type-checked (`missing schema`)
/// - `UndefinedName` if a value names nothing in scope
pub fn compile_program(program: &Program) -> CompileResult<Vec<RulePlan>> {
    let root = NodePath::root();
    let mut plans = Vec::new();

    for (i, decl) in program.declarations.iter().enumerate() {
        if let DeclarationBody::Program(rules) = &decl.body {
            let path = root.field("declarations").index(i).field("rules");
            for (j, rule) in rules.iter().enumerate() {
                let mut plan = lower_rule(rule, &decl.params, &path.index(j))?;
                plan.executor = program.principal.clone();
                plan.declaration = Some(decl.name.clone());
                plans.push(plan);
            }
        }
    }

    let no_params = IndexMap::new();
    for (i, rule) in program.rules.iter().enumerate() {
        let mut plan = lower_rule(rule, &no_params, &root.field("rules").index(i))?;
        plan.executor = program.principal.clone();
        plans.push(plan);
    }

    info!(
        plans = plans.len(),
        stages = plans.iter().map(|p| p.stages.len()).sum::<usize>(),
        "compilation complete"
    );
    Ok(plans)
}

fn lower_rule(rule: &Rule, params: &IndexMap<String, Type>, path: &NodePath) -> CompileResult<RulePlan> {
    let mut lowering = Lowering::new(params);
    let mode = match &rule.trigger {
        RuleTrigger::Now => RuleMode::Now,
        RuleTrigger::OnInput => RuleMode::OnInput,
        RuleTrigger::Stream(stream) => {
            let id = lowering.stream(stream, &path.field("stream"))?;
            lowering.last = Some(id);
            if stream.is_timer() {
                RuleMode::Timer
            } else {
                RuleMode::Monitor
            }
        }
    };

    let queries = path.field("queries");
    for (i, table) in rule.queries.iter().enumerate() {
        let previous = lowering.last;
        let id = lowering.table(table, &queries.index(i))?;
        if let Some(previous) = previous {
            lowering.depend(id, previous);
        }
        lowering.last = Some(id);
    }

    let actions = path.field("actions");
    for (i, action) in rule.actions.iter().enumerate() {
        lowering.action(action, &actions.index(i))?;
    }

    Ok(RulePlan {
        mode,
        executor: None,
        declaration: None,
        stages: lowering.stages,
    })
}

/// Producer of each visible name: stage id and output field.
type Env = IndexMap<String, (usize, String)>;

/// Lowering state of one rule.
struct Lowering<'p> {
    stages: Vec<Stage>,
    env: Env,
    params: &'p IndexMap<String, Type>,
    /// Last completed trigger or query stage; the source of `$event`
    last: Option<usize>,
}

impl<'p> Lowering<'p> {
    fn new(params: &'p IndexMap<String, Type>) -> Self {
        Self {
            stages: Vec::new(),
            env: Env::new(),
            params,
            last: None,
        }
    }

    fn stream(&mut self, stream: &Stream, path: &NodePath) -> CompileResult<usize> {
        let role = StageRole::Trigger;
        match stream {
            Stream::Invocation(inv) => self.invocation(inv, role, path),
            Stream::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), role, path),
            Stream::Monitor { table } => {
                let inner = self.table(table, &path.field("table"))?;
                let outputs = outputs_of(table.schema(), path)?;
                Ok(self.push(role, StageKind::Monitor, IndexMap::new(), outputs, vec![inner]))
            }
            Stream::AtTimer {
                time,
                expiration_date,
            } => {
                let mut deps = Vec::new();
                let mut inputs = IndexMap::new();
                inputs.insert(
                    "time".to_string(),
                    self.input(time, None, &mut deps, &path.field("time"))?,
                );
                if let Some(date) = expiration_date {
                    inputs.insert(
                        "expiration_date".to_string(),
                        self.input(date, None, &mut deps, &path.field("expiration_date"))?,
                    );
                }
                Ok(self.push(role, StageKind::AtTimer, inputs, IndexMap::new(), deps))
            }
            Stream::Timer { base, interval } => {
                let mut deps = Vec::new();
                let mut inputs = IndexMap::new();
                inputs.insert(
                    "base".to_string(),
                    self.input(base, None, &mut deps, &path.field("base"))?,
                );
                inputs.insert(
                    "interval".to_string(),
                    self.input(interval, None, &mut deps, &path.field("interval"))?,
                );
                Ok(self.push(role, StageKind::Timer, inputs, IndexMap::new(), deps))
            }
            Stream::EdgeNew { stream: inner } => {
                let id = self.stream(inner, &path.field("stream"))?;
                let outputs = outputs_of(inner.schema(), path)?;
                Ok(self.push(role, StageKind::EdgeNew, IndexMap::new(), outputs, vec![id]))
            }
            Stream::EdgeFilter {
                stream: inner,
                filter,
            }
            | Stream::Filter {
                stream: inner,
                filter,
            } => {
                let id = self.stream(inner, &path.field("stream"))?;
                let mut deps = vec![id];
                self.filter(filter, &mut deps, &path.field("filter"))?;
                let outputs = outputs_of(inner.schema(), path)?;
                let kind = if matches!(stream, Stream::EdgeFilter { .. }) {
                    StageKind::EdgeFilter {
                        filter: filter.clone(),
                    }
                } else {
                    StageKind::Filter {
                        filter: filter.clone(),
                    }
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, deps))
            }
            Stream::Join {
                stream: left,
                table,
                on,
            } => {
                let left_id = self.stream(left, &path.field("stream"))?;
                let left_env = self.env.clone();
                let right_id = self.table(table, &path.field("table"))?;
                let outputs = outputs_of(stream.schema(), path)?;
                self.join(role, (left_id, left_env), right_id, on, outputs, path)
            }
        }
    }

    fn table(&mut self, table: &Table, path: &NodePath) -> CompileResult<usize> {
        let role = StageRole::Query;
        match table {
            Table::Invocation(inv) => self.invocation(inv, role, path),
            Table::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), role, path),
            Table::ResultRef {
                kind,
                channel,
                index,
                schema,
            } => {
                let mut deps = Vec::new();
                let mut inputs = IndexMap::new();
                inputs.insert(
                    "index".to_string(),
                    self.input(index, None, &mut deps, &path.field("index"))?,
                );
                let outputs = outputs_of(schema.clone(), path)?;
                let kind = StageKind::ResultRef {
                    kind: kind.clone(),
                    channel: channel.clone(),
                };
                Ok(self.push(role, kind, inputs, outputs, deps))
            }
            Table::Filter { table: inner, filter } => {
                let id = self.table(inner, &path.field("table"))?;
                let mut deps = vec![id];
                self.filter(filter, &mut deps, &path.field("filter"))?;
                let outputs = outputs_of(table.schema(), path)?;
                let kind = StageKind::Filter {
                    filter: filter.clone(),
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, deps))
            }
            Table::Projection { table: inner, fields } => {
                let id = self.table(inner, &path.field("table"))?;
                let outputs = outputs_of(table.schema(), path)?;
                let kind = StageKind::Projection {
                    fields: fields.clone(),
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, vec![id]))
            }
            Table::Join { left, right, on } => {
                let left_id = self.table(left, &path.field("left"))?;
                let left_env = self.env.clone();
                let right_id = self.table(right, &path.field("right"))?;
                let outputs = outputs_of(table.schema(), path)?;
                self.join(role, (left_id, left_env), right_id, on, outputs, path)
            }
            Table::Aggregate {
                op,
                field,
                table: inner,
            } => {
                let id = self.table(inner, &path.field("table"))?;
                let outputs = outputs_of(table.schema(), path)?;
                let kind = StageKind::Aggregate {
                    op: *op,
                    field: field.clone(),
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, vec![id]))
            }
            Table::Sort {
                field,
                direction,
                table: inner,
            } => {
                let id = self.table(inner, &path.field("table"))?;
                let outputs = outputs_of(table.schema(), path)?;
                let kind = StageKind::Sort {
                    field: field.clone(),
                    direction: *direction,
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, vec![id]))
            }
            Table::Index {
                table: inner,
                indices,
            } => {
                let id = self.table(inner, &path.field("table"))?;
                let mut deps = vec![id];
                let mut inputs = IndexMap::new();
                let indices_path = path.field("indices");
                for (i, index) in indices.iter().enumerate() {
                    let input = self.input(index, None, &mut deps, &indices_path.index(i))?;
                    inputs.insert(i.to_string(), input);
                }
                let outputs = outputs_of(table.schema(), path)?;
                Ok(self.push(role, StageKind::Index, inputs, outputs, deps))
            }
            Table::Slice {
                table: inner,
                base,
                limit,
            } => {
                let id = self.table(inner, &path.field("table"))?;
                let mut deps = vec![id];
                let mut inputs = IndexMap::new();
                inputs.insert(
                    "base".to_string(),
                    self.input(base, None, &mut deps, &path.field("base"))?,
                );
                inputs.insert(
                    "limit".to_string(),
                    self.input(limit, None, &mut deps, &path.field("limit"))?,
                );
                let outputs = outputs_of(table.schema(), path)?;
                Ok(self.push(role, StageKind::Slice, inputs, outputs, deps))
            }
            Table::Compute {
                table: inner,
                expr,
                alias,
            } => {
                let id = self.table(inner, &path.field("table"))?;
                reject_remote(expr, &path.field("expr"))?;
                let outputs = outputs_of(table.schema(), path)?;
                let kind = StageKind::Compute {
                    expr: expr.clone(),
                    alias: alias
                        .clone()
                        .unwrap_or_else(|| thingtalk_ast::DEFAULT_COMPUTE_ALIAS.to_string()),
                };
                Ok(self.push(role, kind, IndexMap::new(), outputs, vec![id]))
            }
        }
    }

    fn action(&mut self, action: &Action, path: &NodePath) -> CompileResult<usize> {
        let role = StageRole::Action;
        let id = match action {
            Action::Invocation(inv) => self.invocation(inv, role, path)?,
            Action::VarRef {
                name,
                in_params,
                schema,
            } => self.call(name, in_params, schema.as_ref(), role, path)?,
        };
        if let Some(last) = self.last {
            self.depend(id, last);
        }
        Ok(id)
    }

    fn invocation(&mut self, inv: &Invocation, role: StageRole, path: &NodePath) -> CompileResult<usize> {
        let schema = inv.schema.clone().ok_or_else(|| missing_schema(path))?;
        let mut deps = Vec::new();
        let inputs = self.params(&inv.in_params, &mut deps, &path.field("in_params"))?;
        self.filter(&inv.filter, &mut deps, &path.field("filter"))?;

        let kind = match &inv.selector {
            Selector::Builtin => StageKind::Builtin {
                channel: inv.channel.clone(),
            },
            Selector::Device(device) => StageKind::Invoke {
                kind: device.kind.clone(),
                channel: inv.channel.clone(),
                attributes: self.params(&device.attributes, &mut deps, &path.field("attributes"))?,
                filter: inv.filter.clone(),
            },
        };
        Ok(self.push(role, kind, inputs, outputs_of(Some(schema), path)?, deps))
    }

    fn call(
        &mut self,
        name: &str,
        in_params: &[InputParam],
        schema: Option<&Arc<FunctionDef>>,
        role: StageRole,
        path: &NodePath,
    ) -> CompileResult<usize> {
        let mut deps = Vec::new();
        let inputs = self.params(in_params, &mut deps, &path.field("in_params"))?;
        // calls to declared actions and programs carry no signature
        let outputs = match schema {
            Some(schema) => output_map(schema),
            None if role == StageRole::Action => IndexMap::new(),
            None => return Err(missing_schema(path)),
        };
        let kind = StageKind::Call {
            name: name.to_string(),
        };
        Ok(self.push(role, kind, inputs, outputs, deps))
    }

    /// `on` values are read in the scope left by the first operand.
    fn join(
        &mut self,
        role: StageRole,
        (left, left_env): (usize, Env),
        right: usize,
        on: &[InputParam],
        outputs: IndexMap<String, Type>,
        path: &NodePath,
    ) -> CompileResult<usize> {
        let mut deps = vec![left, right];
        let right_env = std::mem::replace(&mut self.env, left_env);
        let on_path = path.field("on");
        let inputs: CompileResult<IndexMap<_, _>> = on
            .iter()
            .map(|param| {
                let input = self.input(&param.value, Some(left), &mut deps, &on_path.key(&param.name))?;
                Ok((param.name.clone(), input))
            })
            .collect();
        self.env = right_env;
        Ok(self.push(role, StageKind::Join, inputs?, outputs, deps))
    }

    fn params(
        &self,
        params: &[InputParam],
        deps: &mut Vec<usize>,
        path: &NodePath,
    ) -> CompileResult<IndexMap<String, StageInput>> {
        let mut inputs = IndexMap::new();
        for param in params {
            let input = self.input(&param.value, self.last, deps, &path.key(&param.name))?;
            inputs.insert(param.name.clone(), input);
        }
        Ok(inputs)
    }

    /// Lower one value, recording the stages it reads from in `deps`.
    fn input(
        &self,
        value: &Value,
        event: Option<usize>,
        deps: &mut Vec<usize>,
        path: &NodePath,
    ) -> CompileResult<StageInput> {
        reject_remote(value, path)?;
        if value.has_undefined() {
            return Ok(StageInput::Pending(value.clone()));
        }
        match value {
            Value::VarRef(name) => {
                if let Some((stage, field)) = self.env.get(name) {
                    deps.push(*stage);
                    Ok(StageInput::FromStage {
                        stage: *stage,
                        field: field.clone(),
                    })
                } else if self.params.contains_key(name) {
                    Ok(StageInput::Parameter(name.clone()))
                } else {
                    Err(CompileError::new(
                        ErrorKind::UndefinedName,
                        path.clone(),
                        format!("'{}' is not produced by any earlier stage", name),
                    ))
                }
            }
            Value::Event(field) => {
                let stage = event.ok_or_else(|| {
                    CompileError::new(
                        ErrorKind::Internal,
                        path.clone(),
                        "$event used before any stage produced a result".to_string(),
                    )
                })?;
                deps.push(stage);
                Ok(StageInput::Event {
                    stage,
                    field: field.clone(),
                })
            }
            other => {
                self.references(other, deps);
                Ok(StageInput::Constant(other.clone()))
            }
        }
    }

    /// Record the producers of names nested inside compound values.
    fn references(&self, value: &Value, deps: &mut Vec<usize>) {
        match value {
            Value::VarRef(name) => {
                if let Some((stage, _)) = self.env.get(name) {
                    deps.push(*stage);
                }
            }
            Value::Array(values) | Value::Computation { operands: values, .. } => {
                values.iter().for_each(|v| self.references(v, deps))
            }
            Value::ArrayFilter { value, .. } => self.references(value, deps),
            _ => {}
        }
    }

    /// Validate the values compared by a filter and record their producers.
    fn filter(&self, filter: &Filter, deps: &mut Vec<usize>, path: &NodePath) -> CompileResult<()> {
        match filter {
            Filter::True | Filter::False => Ok(()),
            Filter::And(operands) | Filter::Or(operands) => {
                let operands_path = path.field("operands");
                for (i, operand) in operands.iter().enumerate() {
                    self.filter(operand, deps, &operands_path.index(i))?;
                }
                Ok(())
            }
            Filter::Not(inner) => self.filter(inner, deps, &path.field("operand")),
            Filter::Atom(atom) => {
                reject_remote(&atom.value, &path.field("value"))?;
                self.references(&atom.value, deps);
                Ok(())
            }
            Filter::Compute(compute) => {
                reject_remote(&compute.lhs, &path.field("lhs"))?;
                reject_remote(&compute.rhs, &path.field("rhs"))?;
                self.references(&compute.rhs, deps);
                Ok(())
            }
        }
    }

    fn push(
        &mut self,
        role: StageRole,
        kind: StageKind,
        inputs: IndexMap<String, StageInput>,
        outputs: IndexMap<String, Type>,
        mut depends_on: Vec<usize>,
    ) -> usize {
        let id = self.stages.len();
        depends_on.sort_unstable();
        depends_on.dedup();
        for name in outputs.keys() {
            self.env.insert(name.clone(), (id, name.clone()));
        }
        self.stages.push(Stage {
            id,
            role,
            kind,
            inputs,
            outputs,
            depends_on,
        });
        id
    }

    fn depend(&mut self, id: usize, on: usize) {
        if let Some(stage) = self.stages.get_mut(id) {
            if !stage.depends_on.contains(&on) {
                stage.depends_on.push(on);
                stage.depends_on.sort_unstable();
            }
        }
    }
}

fn output_map(schema: &FunctionDef) -> IndexMap<String, Type> {
    schema
        .outputs()
        .map(|arg| (arg.name.clone(), arg.ty.clone()))
        .collect()
}

fn outputs_of(schema: Option<Arc<FunctionDef>>, path: &NodePath) -> CompileResult<IndexMap<String, Type>> {
    schema
        .map(|s| output_map(&s))
        .ok_or_else(|| missing_schema(path))
}

fn missing_schema(path: &NodePath) -> CompileError {
    CompileError::new(ErrorKind::Internal, path.clone(), "missing schema".to_string())
        .with_note("type-check the program before compiling it".to_string())
}

fn reject_remote(value: &Value, path: &NodePath) -> CompileResult<()> {
    if value.has_remote_undefined() {
        return Err(CompileError::new(
            ErrorKind::UnresolvedPlaceholder,
            path.clone(),
            format!("{} must be filled before the program can run", value),
        ));
    }
    Ok(())
}
