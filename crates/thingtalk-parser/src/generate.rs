//! Canonical program text.
//!
//! [`generate`] is the inverse of [`crate::parse`]: for every parsed program
//! `p`, `parse(&generate(&p)) == Ok(p)`. Parentheses are added exactly where
//! the binding strength of an operand is lower than its position requires
//! (see [`Table::precedence`] and [`Stream::precedence`]).

use indexmap::IndexMap;
use thingtalk_ast::{
    Action, Annotations, Dataset, DateValue, Declaration, DeclarationBody, Example, Filter,
    FilterOp, InputParam, Invocation, LocationValue, PermissionFunction, PermissionRule, Program,
    Rule, RuleTrigger, Selector, Stream, Table, Type, Value,
};
use thingtalk_lexer::escape_string;

/// Print a program in canonical form, one top-level item per line.
pub fn generate(program: &Program) -> String {
    let mut lines = Vec::new();
    for decl in &program.declarations {
        lines.push(declaration(decl));
    }
    for dataset in &program.datasets {
        lines.push(self::dataset(dataset));
    }
    for r in &program.rules {
        lines.push(format!("{};", rule(r)));
    }
    for p in &program.permissions {
        lines.push(permission(p));
    }

    let body = lines.join("\n");
    match &program.principal {
        Some(principal) if body.is_empty() => format!("executor = {} :", value(principal)),
        Some(principal) => format!("executor = {} : {}", value(principal), body),
        None => body,
    }
}

// === Values ===

pub fn value(v: &Value) -> String {
    match v {
        Value::VarRef(name) => name.clone(),
        Value::Undefined(true) => "$?".to_string(),
        Value::Undefined(false) => "$undefined.remote".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::String(s) => quote(s),
        Value::Number(n) => n.to_string(),
        Value::Measure(n, unit) => format!("{}{}", n, unit),
        Value::Date(DateValue::Now) => "makeDate()".to_string(),
        Value::Date(DateValue::Absolute { year, month, day }) => {
            format!("makeDate({}, {}, {})", year, month, day)
        }
        Value::Date(DateValue::Edge { edge, unit }) => format!("{}({})", edge.name(), unit),
        Value::Time { hour, minute } => format!("makeTime({}, {})", hour, minute),
        Value::Location(LocationValue::Absolute { lat, lon, display }) => match display {
            Some(name) => format!("makeLocation({}, {}, {})", lat, lon, quote(name)),
            None => format!("makeLocation({}, {})", lat, lon),
        },
        Value::Location(LocationValue::Relative(tag)) => format!("$context.location.{}", tag),
        Value::Entity { value, ty, display } => match display {
            Some(display) => format!("{}^^{}({})", quote(value), ty, quote(display)),
            None => format!("{}^^{}", quote(value), ty),
        },
        Value::Enum(symbol) => format!("enum({})", symbol),
        Value::Array(values) => format!("[{}]", list(values, value)),
        Value::Event(None) => "$event".to_string(),
        Value::Event(Some(field)) => format!("$event.{}", field),
        Value::Computation { op, operands } => format!("{}({})", op.name(), list(operands, value)),
        Value::ArrayFilter { value: inner, filter: f } => {
            format!("{} filter {{ {} }}", value(inner), filter(f))
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

fn list<T>(items: &[T], print: impl Fn(&T) -> String) -> String {
    items.iter().map(print).collect::<Vec<_>>().join(", ")
}

fn params(params: &[InputParam]) -> String {
    format!("({})", list(params, |p| format!("{}={}", p.name, value(&p.value))))
}

// === Filters ===

pub fn filter(f: &Filter) -> String {
    match f {
        Filter::Or(operands) => operands
            .iter()
            .map(conjunction)
            .collect::<Vec<_>>()
            .join(" || "),
        other => conjunction(other),
    }
}

fn conjunction(f: &Filter) -> String {
    match f {
        Filter::And(operands) => operands
            .iter()
            .map(unary)
            .collect::<Vec<_>>()
            .join(" && "),
        other => unary(other),
    }
}

fn unary(f: &Filter) -> String {
    match f {
        Filter::True => "true".to_string(),
        Filter::False => "false".to_string(),
        Filter::Not(inner) => format!("!{}", unary(inner)),
        Filter::Atom(atom) if atom.op.is_infix() => {
            format!("{} {} {}", atom.name, atom.op, value(&atom.value))
        }
        Filter::Atom(atom) => format!("{}({}, {})", atom.op, atom.name, value(&atom.value)),
        Filter::Compute(c) => compare(&value(&c.lhs), c.op, &value(&c.rhs)),
        Filter::And(_) | Filter::Or(_) => format!("({})", filter(f)),
    }
}

fn compare(lhs: &str, op: FilterOp, rhs: &str) -> String {
    if op.is_infix() {
        format!("{} {} {}", lhs, op, rhs)
    } else {
        format!("{}({}, {})", op, lhs, rhs)
    }
}

// === Invocations ===

fn call(inv: &Invocation) -> String {
    let Selector::Device(device) = &inv.selector else {
        return inv.channel.clone();
    };

    let mut attributes = Vec::new();
    if let Some(id) = &device.id {
        attributes.push(format!("id={}", quote(id)));
    }
    if let Some(principal) = &device.principal {
        attributes.push(format!("principal={}", quote(principal)));
    }
    attributes.extend(
        device
            .attributes
            .iter()
            .map(|a| format!("{}={}", a.name, value(&a.value))),
    );

    if attributes.is_empty() {
        format!("@{}.{}{}", device.kind, inv.channel, params(&inv.in_params))
    } else {
        format!(
            "@{}({}).{}{}",
            device.kind,
            attributes.join(", "),
            inv.channel,
            params(&inv.in_params)
        )
    }
}

fn filtered_call(inv: &Invocation) -> String {
    if inv.filter.is_true() {
        call(inv)
    } else {
        format!("{}, {}", call(inv), filter(&inv.filter))
    }
}

// === Tables and streams ===

pub fn table(t: &Table) -> String {
    table_at(t, 0)
}

fn table_at(t: &Table, min: u8) -> String {
    let text = match t {
        Table::Invocation(inv) => filtered_call(inv),
        Table::VarRef {
            name, in_params, ..
        } => format!("{}{}", name, params(in_params)),
        Table::ResultRef {
            kind,
            channel,
            index,
            ..
        } => match index {
            Value::Number(n) if *n == -1.0 => format!("result(@{}.{})", kind, channel),
            index => format!("result(@{}.{}[{}])", kind, channel, value(index)),
        },
        Table::Filter { table, filter: f } => format!("{}, {}", table_at(table, 2), filter(f)),
        Table::Projection { table, fields } => {
            format!("[{}] of {}", fields.join(", "), table_at(table, 1))
        }
        Table::Join { left, right, on } => join(&table_at(left, 0), &table_at(right, 1), on),
        Table::Aggregate { op, field, table } => match field {
            Some(field) => format!("aggregate {} {} of {}", op.name(), field, table_at(table, 1)),
            None => format!("aggregate {} of {}", op.name(), table_at(table, 1)),
        },
        Table::Sort {
            field,
            direction,
            table,
        } => format!("sort {} {} of {}", field, direction.name(), table_at(table, 1)),
        Table::Index { table, indices } => {
            format!("{}[{}]", table_at(table, 2), list(indices, value))
        }
        Table::Slice { table, base, limit } => {
            format!("{}[{}:{}]", table_at(table, 2), value(base), value(limit))
        }
        Table::Compute { table, expr, alias } => match alias {
            Some(alias) => format!("compute {} as {} of {}", value(expr), alias, table_at(table, 1)),
            None => format!("compute {} of {}", value(expr), table_at(table, 1)),
        },
    };
    parenthesize(text, t.precedence() < min)
}

pub fn stream(s: &Stream) -> String {
    stream_at(s, 0)
}

fn stream_at(s: &Stream, min: u8) -> String {
    let text = match s {
        Stream::Invocation(inv) => filtered_call(inv),
        Stream::VarRef {
            name, in_params, ..
        } => format!("{}{}", name, params(in_params)),
        // The operand is always parenthesized, which every table level allows.
        Stream::Monitor { table } => format!("monitor ({})", self::table(table)),
        Stream::AtTimer {
            time,
            expiration_date,
        } => match expiration_date {
            Some(date) => format!("attimer(time={}, expiration_date={})", value(time), value(date)),
            None => format!("attimer(time={})", value(time)),
        },
        Stream::Timer { base, interval } => {
            format!("timer(base={}, interval={})", value(base), value(interval))
        }
        Stream::EdgeNew { stream } => format!("edge {} on new", stream_at(stream, 2)),
        Stream::EdgeFilter { stream, filter: f } => {
            format!("edge {} on {}", stream_at(stream, 2), filter(f))
        }
        Stream::Filter { stream, filter: f } => format!("{}, {}", stream_at(stream, 2), filter(f)),
        Stream::Join { stream, table, on } => {
            join(&stream_at(stream, 0), &table_at(table, 1), on)
        }
    };
    parenthesize(text, s.precedence() < min)
}

fn join(left: &str, right: &str, on: &[InputParam]) -> String {
    if on.is_empty() {
        format!("{} join {}", left, right)
    } else {
        format!("{} join {} on {}", left, right, params(on))
    }
}

fn parenthesize(text: String, needed: bool) -> String {
    if needed {
        format!("({})", text)
    } else {
        text
    }
}

// === Statements ===

fn action(a: &Action) -> String {
    match a {
        Action::Invocation(inv) => call(inv),
        Action::VarRef {
            name, in_params, ..
        } => format!("{}{}", name, params(in_params)),
    }
}

/// A rule without its terminating `;`.
pub fn rule(r: &Rule) -> String {
    let mut stages = vec![match &r.trigger {
        RuleTrigger::Now => "now".to_string(),
        RuleTrigger::OnInput => "oninput".to_string(),
        RuleTrigger::Stream(s) => stream(s),
    }];
    stages.extend(r.queries.iter().map(table));
    stages.push(match r.actions.as_slice() {
        [single] => action(single),
        actions => format!(
            "{{ {} }}",
            actions
                .iter()
                .map(|a| format!("{};", action(a)))
                .collect::<Vec<_>>()
                .join(" ")
        ),
    });
    stages.join(" => ")
}

fn formals(params: &IndexMap<String, Type>) -> String {
    if params.is_empty() {
        return String::new();
    }
    let params: Vec<String> = params
        .iter()
        .map(|(name, ty)| format!("{} : {}", name, ty))
        .collect();
    format!("({})", params.join(", "))
}

fn body(body: &DeclarationBody) -> String {
    match body {
        DeclarationBody::Program(rules) if rules.is_empty() => "{ }".to_string(),
        DeclarationBody::Program(rules) => format!(
            "{{ {} }}",
            rules
                .iter()
                .map(|r| format!("{};", rule(r)))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        DeclarationBody::Query(t) => table(t),
        DeclarationBody::Stream(s) => stream(s),
        DeclarationBody::Action(a) => action(a),
    }
}

fn annotations(annotations: &Annotations) -> String {
    let nl = annotations
        .nl
        .iter()
        .map(|(key, v)| format!(" #_[{}={}]", key, value(v)));
    let implementation = annotations
        .implementation
        .iter()
        .map(|(key, v)| format!(" #[{}={}]", key, value(v)));
    nl.chain(implementation).collect()
}

fn declaration(decl: &Declaration) -> String {
    format!(
        "let {} {}{} := {}{};",
        decl.body.kind().name(),
        decl.name,
        formals(&decl.params),
        body(&decl.body),
        annotations(&decl.annotations)
    )
}

fn example(example: &Example) -> String {
    format!(
        "{}{} := {}{};",
        example.body.kind().name(),
        formals(&example.params),
        body(&example.body),
        annotations(&example.annotations)
    )
}

fn dataset(dataset: &Dataset) -> String {
    let mut out = format!(
        "dataset @{} language {} {{",
        dataset.kind,
        quote(&dataset.language)
    );
    for ex in &dataset.examples {
        out.push_str("\n    ");
        out.push_str(&example(ex));
    }
    out.push_str("\n}");
    out
}

fn permission_function(function: &PermissionFunction, builtin: &str) -> String {
    match function {
        PermissionFunction::Builtin => builtin.to_string(),
        PermissionFunction::Star => "*".to_string(),
        PermissionFunction::ClassStar(kind) => format!("@{}.*", kind),
        PermissionFunction::Specified {
            kind,
            channel,
            filter: f,
            ..
        } if f.is_true() => format!("@{}.{}", kind, channel),
        PermissionFunction::Specified {
            kind,
            channel,
            filter: f,
            ..
        } => format!("@{}.{}, {}", kind, channel, filter(f)),
    }
}

fn permission(p: &PermissionRule) -> String {
    format!(
        "{} : {} => {};",
        filter(&p.principal),
        permission_function(&p.query, "now"),
        permission_function(&p.action, "notify")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn canonical(source: &str) -> String {
        generate(&parse(source).unwrap())
    }

    #[test]
    fn test_simple_rules() {
        assert_eq!(
            canonical("now => @com.xkcd.get_comic() => notify;"),
            "now => @com.xkcd.get_comic() => notify;"
        );
        assert_eq!(
            canonical("monitor @com.xkcd.get_comic() => notify"),
            "monitor (@com.xkcd.get_comic()) => notify;"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            canonical("now => @com.twitter.post(status=$undefined);"),
            "now => @com.twitter.post(status=$?);"
        );
        assert_eq!(
            canonical("now => @com.twitter.post(status=$undefined.remote);"),
            "now => @com.twitter.post(status=$undefined.remote);"
        );
    }

    #[test]
    fn test_filter_parentheses() {
        assert_eq!(
            canonical(r#"now => @com.xkcd.get_comic(), (title =~ "a" || title =~ "b") && number > 5 => notify;"#),
            r#"now => @com.xkcd.get_comic(), (title =~ "a" || title =~ "b") && number > 5 => notify;"#
        );
        assert_eq!(
            canonical(r#"now => @com.xkcd.get_comic(), !(title =~ "a" && number == 1) => notify;"#),
            r#"now => @com.xkcd.get_comic(), !(title =~ "a" && number == 1) => notify;"#
        );
    }

    #[test]
    fn test_table_parentheses() {
        assert_eq!(
            canonical("now => (aggregate count of @com.xkcd.get_comic())[1] => notify;"),
            "now => (aggregate count of @com.xkcd.get_comic())[1] => notify;"
        );
        assert_eq!(
            canonical("now => @a.b() join (@c.d() join @e.f()) => notify;"),
            "now => @a.b() join (@c.d() join @e.f()) => notify;"
        );
    }

    #[test]
    fn test_executor_and_permissions() {
        assert_eq!(
            canonical(r#"executor = "bob"^^tt:contact : now => notify;"#),
            r#"executor = "bob"^^tt:contact : now => notify;"#
        );
        assert_eq!(
            canonical("in_array(source, [$?, $?]) : now => @com.twitter.post;"),
            "in_array(source, [$?, $?]) : now => @com.twitter.post;"
        );
    }

    #[test]
    fn test_declaration_and_dataset() {
        assert_eq!(
            canonical("let program p1(p_query : String) := { monitor (@com.bing.web_search(query=p_query)) => notify; };"),
            "let program p1(p_query : String) := { monitor (@com.bing.web_search(query=p_query)) => notify; };"
        );
        assert_eq!(
            canonical("dataset @com.twitter language 'en' { action := @com.twitter.post(status=$?) #_[utterances=['tweet']]; }"),
            "dataset @com.twitter language \"en\" {\n    action := @com.twitter.post(status=$?) #_[utterances=[\"tweet\"]];\n}"
        );
    }
}
