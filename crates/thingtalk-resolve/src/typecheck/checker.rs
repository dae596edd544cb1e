//! Program-level checks: declarations, rules, permissions and invocations.

use super::scope::Scope;
use super::values::{check_filter, check_value, value_type};
use super::{display_name, mismatch, undefined_name, CheckerOptions};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::schema::{SchemaError, BUILTIN_KIND};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use thingtalk_ast::{
    Action, ArgDirection, ArgumentDef, ClassDef, DeclarationBody, DeclarationKind, DeviceSelector,
    FunctionDef, FunctionType, InputParam, Invocation, NodePath, OutputParam, PermissionFunction,
    PermissionRule, Program, Rule, RuleTrigger, Selector, Type, Value, PERMISSION_SOURCE,
};

/// A declaration that later items may call.
struct Declared {
    kind: DeclarationKind,
    signature: Arc<FunctionDef>,
}

pub(super) struct Checker<'a> {
    classes: &'a HashMap<String, Arc<ClassDef>>,
    builtins: &'a ClassDef,
    options: &'a CheckerOptions,
    declared: HashMap<String, Declared>,
}

impl<'a> Checker<'a> {
    pub(super) fn new(
        classes: &'a HashMap<String, Arc<ClassDef>>,
        builtins: &'a ClassDef,
        options: &'a CheckerOptions,
    ) -> Self {
        Self {
            classes,
            builtins,
            options,
            declared: HashMap::new(),
        }
    }

    pub(super) fn check_program(&mut self, program: &mut Program) -> CompileResult<()> {
        let root = NodePath::root();

        if let Some(principal) = &program.principal {
            let contact = Type::Entity(PERMISSION_SOURCE.1.to_string());
            check_value(principal, &contact, &Scope::default(), &root.field("principal"))?;
        }

        for (i, decl) in program.declarations.iter_mut().enumerate() {
            let path = root.field("declarations").index(i);
            let scope = Scope::with_params(&decl.params);
            let result = self.check_body(&mut decl.body, &scope, &path)?;
            let kind = decl.body.kind();
            let signature = declared_signature(&decl.name, kind, &decl.params, result.as_deref());
            self.declared.insert(
                decl.name.clone(),
                Declared {
                    kind,
                    signature: Arc::new(signature),
                },
            );
        }

        for (i, dataset) in program.datasets.iter_mut().enumerate() {
            let path = root.field("datasets").index(i).field("examples");
            for (j, example) in dataset.examples.iter_mut().enumerate() {
                let scope = Scope::with_params(&example.params);
                self.check_body(&mut example.body, &scope, &path.index(j))?;
            }
        }

        for (i, rule) in program.rules.iter_mut().enumerate() {
            self.check_rule(rule, &Scope::default(), &root.field("rules").index(i))?;
        }

        for (i, permission) in program.permissions.iter_mut().enumerate() {
            self.check_permission(permission, &root.field("permissions").index(i))?;
        }
        Ok(())
    }

    /// Check a declaration or example body and return its result signature.
    fn check_body(
        &self,
        body: &mut DeclarationBody,
        scope: &Scope,
        path: &NodePath,
    ) -> CompileResult<Option<Arc<FunctionDef>>> {
        match body {
            DeclarationBody::Program(rules) => {
                for (i, rule) in rules.iter_mut().enumerate() {
                    self.check_rule(rule, scope, &path.field("rules").index(i))?;
                }
                Ok(None)
            }
            DeclarationBody::Query(table) => self
                .check_table(table, scope, &[], &path.field("table"))
                .map(Some),
            DeclarationBody::Stream(stream) => self
                .check_stream(stream, scope, &path.field("stream"))
                .map(Some),
            DeclarationBody::Action(action) => {
                self.check_action(action, scope, &path.field("action"))?;
                Ok(None)
            }
        }
    }

    fn check_rule(&self, rule: &mut Rule, base: &Scope, path: &NodePath) -> CompileResult<()> {
        let mut scope = base.clone();
        if let RuleTrigger::Stream(stream) = &mut rule.trigger {
            let schema = self.check_stream(stream, &scope, &path.field("stream"))?;
            scope.bind_outputs(&schema);
        }
        for (i, table) in rule.queries.iter_mut().enumerate() {
            let schema = self.check_table(table, &scope, &[], &path.field("queries").index(i))?;
            scope.bind_outputs(&schema);
        }
        for (i, action) in rule.actions.iter_mut().enumerate() {
            self.check_action(action, &scope, &path.field("actions").index(i))?;
        }
        Ok(())
    }

    fn check_action(&self, action: &mut Action, scope: &Scope, path: &NodePath) -> CompileResult<()> {
        match action {
            Action::Invocation(inv) => {
                self.check_invocation(inv, FunctionType::Action, scope, &[], path)?;
            }
            // Calls to declared programs and actions are checked but carry no
            // signature; their parameters are slotted as `Any`.
            Action::VarRef {
                name, in_params, ..
            } => {
                let signature = self.declared(
                    name,
                    &[DeclarationKind::Action, DeclarationKind::Program],
                    path,
                )?;
                self.check_params(in_params, &signature, scope, &[], path)?;
            }
        }
        Ok(())
    }

    fn check_permission(&self, rule: &mut PermissionRule, path: &NodePath) -> CompileResult<()> {
        let (name, entity) = PERMISSION_SOURCE;
        let source = FunctionDef::derived(
            vec![ArgumentDef::new(
                name,
                Type::Entity(entity.to_string()),
                ArgDirection::Out,
            )],
            false,
            false,
        );
        check_filter(&rule.principal, &source, &Scope::default(), &path.field("principal"))?;
        self.check_permission_function(&mut rule.query, FunctionType::Query, &path.field("query"))?;
        self.check_permission_function(&mut rule.action, FunctionType::Action, &path.field("action"))
    }

    fn check_permission_function(
        &self,
        function: &mut PermissionFunction,
        function_type: FunctionType,
        path: &NodePath,
    ) -> CompileResult<()> {
        match function {
            PermissionFunction::Builtin | PermissionFunction::Star => Ok(()),
            PermissionFunction::ClassStar(kind) => self.class(kind, path).map(|_| ()),
            PermissionFunction::Specified {
                kind,
                channel,
                filter,
                schema,
            } => {
                let function = self.function(kind, channel, function_type, path)?;
                check_filter(filter, &function, &Scope::default(), &path.field("filter"))?;
                *schema = Some(function);
                Ok(())
            }
        }
    }

    /// Check a call to a device or builtin function and annotate it.
    pub(super) fn check_invocation(
        &self,
        inv: &mut Invocation,
        function_type: FunctionType,
        scope: &Scope,
        bound: &[String],
        path: &NodePath,
    ) -> CompileResult<Arc<FunctionDef>> {
        let function = match &inv.selector {
            Selector::Builtin => self
                .builtins
                .function(&inv.channel, function_type)
                .cloned()
                .ok_or_else(|| {
                    CompileError::from_schema(
                        SchemaError::UnknownChannel {
                            kind: BUILTIN_KIND.to_string(),
                            channel: inv.channel.clone(),
                            function_type,
                        },
                        path.clone(),
                    )
                })?,
            Selector::Device(device) => {
                check_attributes(device, scope, path)?;
                self.function(&device.kind, &inv.channel, function_type, path)?
            }
        };

        self.check_params(&mut inv.in_params, &function, scope, bound, path)?;
        check_filter(&inv.filter, &function, scope, &path.field("filter"))?;
        inv.out_params = function
            .outputs()
            .map(|arg| OutputParam {
                name: arg.name.clone(),
                value: Value::VarRef(arg.name.clone()),
            })
            .collect();
        inv.schema = Some(function.clone());
        Ok(function)
    }

    /// Check the arguments of a call, complete them and put them in
    /// signature order.
    ///
    /// Parameters named in `bound` are supplied by an enclosing join.
    pub(super) fn check_params(
        &self,
        params: &mut Vec<InputParam>,
        signature: &FunctionDef,
        scope: &Scope,
        bound: &[String],
        path: &NodePath,
    ) -> CompileResult<()> {
        let params_path = path.field("in_params");
        for param in params.iter() {
            let param_path = params_path.key(&param.name);
            let arg = signature
                .arg(&param.name)
                .filter(|arg| arg.is_input())
                .ok_or_else(|| {
                    undefined_name(
                        &param_path,
                        format!(
                            "{} has no input parameter '{}'",
                            display_name(signature),
                            param.name
                        ),
                    )
                })?;
            if params.iter().filter(|p| p.name == param.name).count() > 1 {
                return Err(mismatch(
                    &param_path,
                    format!("parameter '{}' is given more than once", param.name),
                ));
            }
            check_value(&param.value, &arg.ty, scope, &param_path)?;
        }

        for arg in signature.inputs().filter(|arg| arg.is_required()) {
            let given = params.iter().any(|p| p.name == arg.name) || bound.contains(&arg.name);
            if given {
                continue;
            }
            if !self.options.allow_undefined {
                return Err(CompileError::new(
                    ErrorKind::MissingRequiredArgument,
                    params_path.key(&arg.name),
                    format!(
                        "missing required argument '{}' of {}",
                        arg.name,
                        display_name(signature)
                    ),
                ));
            }
            params.push(InputParam::new(&arg.name, Value::undefined()));
        }

        params.sort_by_key(|p| signature.arg_index(&p.name).unwrap_or(usize::MAX));
        Ok(())
    }

    /// Signature of a declaration callable under one of `kinds`.
    pub(super) fn declared(
        &self,
        name: &str,
        kinds: &[DeclarationKind],
        path: &NodePath,
    ) -> CompileResult<Arc<FunctionDef>> {
        match self.declared.get(name) {
            Some(decl) if kinds.contains(&decl.kind) => Ok(decl.signature.clone()),
            Some(decl) => Err(mismatch(
                path,
                format!("'{}' is a {}, not a {}", name, decl.kind.name(), kinds[0].name()),
            )),
            None => Err(undefined_name(
                path,
                format!("no {} named '{}' is declared before this point", kinds[0].name(), name),
            )),
        }
    }

    pub(super) fn class(&self, kind: &str, path: &NodePath) -> CompileResult<&Arc<ClassDef>> {
        self.classes.get(kind).ok_or_else(|| {
            CompileError::from_schema(SchemaError::UnknownSchema(kind.to_string()), path.clone())
        })
    }

    pub(super) fn function(
        &self,
        kind: &str,
        channel: &str,
        function_type: FunctionType,
        path: &NodePath,
    ) -> CompileResult<Arc<FunctionDef>> {
        self.class(kind, path)?
            .function(channel, function_type)
            .cloned()
            .ok_or_else(|| {
                CompileError::from_schema(
                    SchemaError::UnknownChannel {
                        kind: kind.to_string(),
                        channel: channel.to_string(),
                        function_type,
                    },
                    path.clone(),
                )
            })
    }

    pub(super) fn builtin(&self, channel: &str, path: &NodePath) -> CompileResult<Arc<FunctionDef>> {
        self.builtins
            .function(channel, FunctionType::Trigger)
            .cloned()
            .ok_or_else(|| {
                CompileError::new(
                    ErrorKind::Internal,
                    path.clone(),
                    format!("missing builtin '{}'", channel),
                )
            })
    }
}

/// Device attributes (`name`, ...) are strings.
fn check_attributes(device: &DeviceSelector, scope: &Scope, path: &NodePath) -> CompileResult<()> {
    let attributes = path.field("attributes");
    for attribute in &device.attributes {
        let attribute_path = attributes.key(&attribute.name);
        if let Some(ty) = value_type(&attribute.value, scope, &attribute_path)? {
            if !Type::is_assignable(&ty, &Type::String) {
                return Err(mismatch(
                    &attribute_path,
                    format!("device attribute '{}' must be a String, found {}", attribute.name, ty),
                ));
            }
        }
    }
    Ok(())
}

/// Callable signature of a declaration: its parameters as required inputs,
/// followed by the outputs of its body.
fn declared_signature(
    name: &str,
    kind: DeclarationKind,
    params: &IndexMap<String, Type>,
    result: Option<&FunctionDef>,
) -> FunctionDef {
    let function_type = match kind {
        DeclarationKind::Query => FunctionType::Query,
        DeclarationKind::Stream => FunctionType::Trigger,
        DeclarationKind::Program | DeclarationKind::Action => FunctionType::Action,
    };
    let mut signature = FunctionDef::new("", name, function_type);
    for (param, ty) in params {
        signature.args.push(ArgumentDef::new(param, ty.clone(), ArgDirection::InReq));
    }
    if let Some(result) = result {
        signature.args.extend(result.outputs().cloned());
        signature.is_list = result.is_list;
        signature.is_monitorable = result.is_monitorable;
    }
    signature
}
