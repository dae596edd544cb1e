use super::*;
use crate::schema::MemorySchemaDelegate;
use std::sync::Arc;
use thingtalk_ast::{Action, InputParam, RuleTrigger, Stream, Table, Type, Value};
use thingtalk_parser::parse;

const SCHEMAS: &str = r#"{
    "com.xkcd": { "queries": { "get_comic": { "is_monitorable": true, "args": [
        { "name": "number", "type": "Number", "direction": "in_opt" },
        { "name": "title", "type": "String", "direction": "out" },
        { "name": "picture_url", "type": "Entity(tt:picture)", "direction": "out" } ] } } },
    "com.twitter": {
        "queries": { "search": { "is_monitorable": true, "is_list": true, "args": [
            { "name": "author", "type": "Entity(tt:username)", "direction": "out" },
            { "name": "text", "type": "String", "direction": "out" } ] } },
        "actions": { "post": { "args": [
            { "name": "status", "type": "String", "direction": "in_req",
              "question": "What do you want to tweet?" } ] } } },
    "com.bing": { "queries": { "web_search": { "is_monitorable": true, "is_list": true, "args": [
        { "name": "query", "type": "String", "direction": "in_req" },
        { "name": "title", "type": "String", "direction": "out" },
        { "name": "description", "type": "String", "direction": "out" } ] } } },
    "com.yandex.translate": { "queries": { "translate": { "args": [
        { "name": "text", "type": "String", "direction": "in_req" },
        { "name": "target_language", "type": "Entity(tt:iso_lang_code)", "direction": "in_opt" },
        { "name": "translated_text", "type": "String", "direction": "out" } ] } } },
    "com.washingtonpost": { "queries": { "get_article": { "is_monitorable": true, "is_list": true, "args": [
        { "name": "section", "type": "Enum(world,politics,opinions)", "direction": "in_req" },
        { "name": "title", "type": "String", "direction": "out" } ] } } },
    "com.thecatapi": { "queries": { "get": { "is_list": true, "args": [
        { "name": "count", "type": "Number", "direction": "in_opt" },
        { "name": "image_id", "type": "String", "direction": "out" } ] } } },
    "com.instagram": { "queries": { "get_pictures": { "is_monitorable": true, "is_list": true, "args": [
        { "name": "location", "type": "Location", "direction": "out" },
        { "name": "caption", "type": "String", "direction": "out" } ] } } },
    "org.thingpedia.weather": { "queries": { "current": { "is_monitorable": true, "args": [
        { "name": "location", "type": "Location", "direction": "in_req" },
        { "name": "temperature", "type": "Measure(C)", "direction": "out" } ] } } },
    "org.schema": { "queries": { "restaurant": { "is_list": true, "args": [
        { "name": "name", "type": "String", "direction": "out" },
        { "name": "review", "type": "Array(Entity(org.schema:Review))", "direction": "out" } ] } } },
    "thermostat": { "queries": { "get_temperature": { "is_monitorable": true, "args": [
        { "name": "value", "type": "Measure(C)", "direction": "out" } ] } } },
    "light-bulb": { "actions": { "set_power": { "args": [
        { "name": "power", "type": "Enum(on,off)", "direction": "in_req" } ] } } }
}"#;

fn delegate() -> Arc<MemorySchemaDelegate> {
    Arc::new(MemorySchemaDelegate::from_json(SCHEMAS).unwrap())
}

async fn check(code: &str, allow_undefined: bool) -> (Program, CompileResult<()>) {
    let mut program = parse(code).unwrap();
    let schemas = SchemaRetriever::new(delegate());
    let result = typecheck_program(&mut program, &schemas, &CheckerOptions { allow_undefined }).await;
    (program, result)
}

async fn checked(code: &str) -> Program {
    let (program, result) = check(code, true).await;
    result.unwrap_or_else(|e| panic!("{}\n  in: {}", e, code));
    program
}

async fn error(code: &str, allow_undefined: bool) -> CompileError {
    match check(code, allow_undefined).await {
        (_, Err(e)) => e,
        (program, Ok(())) => panic!("expected a type error, got {:?}", program),
    }
}

fn action_params(program: &Program) -> &[InputParam] {
    match &program.rules[0].actions[0] {
        Action::Invocation(inv) => &inv.in_params,
        Action::VarRef { in_params, .. } => in_params,
    }
}

fn names(params: &[InputParam]) -> Vec<&str> {
    params.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn test_missing_required_becomes_placeholder() {
    let program = checked("now => @com.twitter.post();").await;
    assert_eq!(
        action_params(&program),
        &[InputParam::new("status", Value::undefined())]
    );
}

#[tokio::test]
async fn test_missing_required_fails_without_placeholders() {
    let err = error("now => @com.twitter.post();", false).await;
    assert_eq!(err.kind, ErrorKind::MissingRequiredArgument);
    assert_eq!(err.path.to_string(), "rules[0].actions[0].in_params.status");
}

#[tokio::test]
async fn test_optional_inputs_are_not_inserted() {
    let program = checked("now => @com.xkcd.get_comic() => notify;").await;
    let Table::Invocation(inv) = &program.rules[0].queries[0] else {
        panic!("expected an invocation");
    };
    assert!(inv.in_params.is_empty());
    assert_eq!(names_of_outputs(inv), vec!["title", "picture_url"]);
    assert_eq!(inv.schema.as_ref().unwrap().qualified_name(), "com.xkcd.get_comic");
}

fn names_of_outputs(inv: &thingtalk_ast::Invocation) -> Vec<&str> {
    inv.out_params.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn test_params_are_put_in_signature_order() {
    let program = checked(
        r#"now => @com.yandex.translate.translate(target_language="it"^^tt:iso_lang_code, text="hello") => notify;"#,
    )
    .await;
    let Table::Invocation(inv) = &program.rules[0].queries[0] else {
        panic!("expected an invocation");
    };
    assert_eq!(names(&inv.in_params), vec!["text", "target_language"]);
}

#[tokio::test]
async fn test_join_binds_right_inputs() {
    let program = checked(
        r#"monitor (@com.washingtonpost.get_article()) join @com.yandex.translate.translate(target_language="zh"^^tt:iso_lang_code) on (text=title) => notify;"#,
    )
    .await;
    let RuleTrigger::Stream(Stream::Join { stream, table, .. }) = &program.rules[0].trigger else {
        panic!("expected a join");
    };
    let Stream::Monitor { table: monitored } = &**stream else {
        panic!("expected a monitor");
    };
    let Table::Invocation(article) = &**monitored else {
        panic!("expected an invocation");
    };
    assert_eq!(
        article.in_params,
        vec![InputParam::new("section", Value::undefined())]
    );
    let Table::Invocation(translate) = &**table else {
        panic!("expected an invocation");
    };
    assert_eq!(names(&translate.in_params), vec!["target_language"]);
}

#[tokio::test]
async fn test_event_joins_as_string() {
    checked("monitor (@com.twitter.search()) join @com.bing.web_search() on (query=$event) => notify;").await;
}

#[tokio::test]
async fn test_event_before_any_result() {
    let err = error("now => @com.twitter.post(status=$event);", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
    assert_eq!(err.path.to_string(), "rules[0].actions[0].in_params.status");
}

#[tokio::test]
async fn test_outputs_flow_into_later_stages() {
    checked("now => @com.xkcd.get_comic() => @com.twitter.post(status=title);").await;
    let err = error("now => @com.twitter.post(status=title);", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[tokio::test]
async fn test_unknown_schema_and_channel() {
    let err = error("now => @com.nope.get() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UnknownSchema);

    let err = error("now => @com.xkcd.get_nothing() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UnknownChannel);

    let err = error("now => @com.xkcd.get_comic();", true).await;
    assert_eq!(err.kind, ErrorKind::UnknownChannel);
    assert_eq!(err.path.to_string(), "rules[0].actions[0]");
}

#[tokio::test]
async fn test_param_type_mismatch() {
    let err = error(r#"now => @com.xkcd.get_comic(number="one") => notify;"#, true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].queries[0].in_params.number");

    let err = error("now => @com.xkcd.get_comic(title=\"x\") => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[tokio::test]
async fn test_join_type_mismatch() {
    let err = error(
        "now => @com.xkcd.get_comic() join @com.yandex.translate.translate() on (text=picture_url) => notify;",
        true,
    )
    .await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].queries[0].on.text");
    assert_eq!(err.labels.len(), 1);
    assert_eq!(err.labels[0].path.to_string(), "rules[0].queries[0].left");
    assert_eq!(err.labels[0].message, "left side of the join");
}

#[tokio::test]
async fn test_stream_join_mismatch_labels_the_stream() {
    let err = error(
        "monitor (@com.xkcd.get_comic()) join @com.yandex.translate.translate() on (text=picture_url) => notify;",
        true,
    )
    .await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].stream.on.text");
    assert_eq!(err.labels[0].path.to_string(), "rules[0].stream.stream");
}

#[tokio::test]
async fn test_join_schema_drops_bound_inputs() {
    let program = checked(
        "now => @com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location) => notify;",
    )
    .await;
    let schema = program.rules[0].queries[0].schema().unwrap();
    let args: Vec<&str> = schema.args.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(args, vec!["location", "caption", "temperature"]);
}

#[tokio::test]
async fn test_filters() {
    checked(r#"now => @com.xkcd.get_comic(), title =~ "lol" && number > 5 => notify;"#).await;
    checked(r#"now => @org.schema.restaurant(), count(review filter { author =~ "bob" }) >= 1 => notify;"#).await;

    let err = error(r#"now => @com.xkcd.get_comic(), number =~ "x" => notify;"#, true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].queries[0].filter");

    let err = error(r#"now => @com.xkcd.get_comic(), likes > 5 => notify;"#, true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[tokio::test]
async fn test_aggregates() {
    let program = checked("now => aggregate avg number of @com.xkcd.get_comic() => notify;").await;
    let schema = program.rules[0].queries[0].schema().unwrap();
    assert_eq!(schema.arg("number").unwrap().ty, Type::Number);

    checked("now => aggregate count of @com.xkcd.get_comic() => notify;").await;
    checked(
        "now => aggregate avg temperature of (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location)) => notify;",
    )
    .await;

    let err = error("now => aggregate avg title of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    let err = error("now => aggregate max likes of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);

    let err = error("now => aggregate max title of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    let err = error("now => aggregate min title of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    checked("now => aggregate max number of @com.xkcd.get_comic() => notify;").await;
}

#[tokio::test]
async fn test_join_right_side_does_not_see_left_outputs() {
    let err = error(
        "now => @com.xkcd.get_comic() join @com.yandex.translate.translate(text=title) => notify;",
        true,
    )
    .await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
    checked("now => @com.xkcd.get_comic() join @com.yandex.translate.translate() on (text=title) => notify;").await;
}

#[tokio::test]
async fn test_sort_index_slice_projection() {
    checked("now => sort number desc of @com.xkcd.get_comic() => notify;").await;
    checked("now => @com.xkcd.get_comic()[1, 2] => notify;").await;
    checked("now => (@com.xkcd.get_comic(), number > 10)[1:$?] => notify;").await;

    let program = checked("now => [title] of @com.xkcd.get_comic() => notify;").await;
    let schema = program.rules[0].queries[0].schema().unwrap();
    assert_eq!(schema.outputs().count(), 1);

    let err = error("now => sort picture_url asc of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    let err = error("now => [likes] of @com.xkcd.get_comic() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[tokio::test]
async fn test_compute_adds_output() {
    let program = checked(
        "now => compute distance(location, makeLocation(37.4, -122.1, \"Palo Alto\")) as dist of @com.instagram.get_pictures() => notify;",
    )
    .await;
    let schema = program.rules[0].queries[0].schema().unwrap();
    assert_eq!(schema.arg("dist").unwrap().ty, Type::Measure("m".into()));
}

#[tokio::test]
async fn test_result_ref() {
    let program = checked("now => result(@com.thecatapi.get[2]) => notify;").await;
    let Table::ResultRef { schema, .. } = &program.rules[0].queries[0] else {
        panic!("expected a result reference");
    };
    assert_eq!(schema.as_ref().unwrap().channel, "get");
}

#[tokio::test]
async fn test_monitor_requires_monitorable() {
    let err = error("monitor (@com.thecatapi.get()) => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].stream");

    checked("edge monitor (@thermostat.get_temperature()) on value >= 21C => notify;").await;
}

#[tokio::test]
async fn test_attimer_takes_a_list_of_times() {
    let program = checked("attimer(time=$?) => notify;").await;
    let RuleTrigger::Stream(Stream::AtTimer { time, .. }) = &program.rules[0].trigger else {
        panic!("expected attimer");
    };
    assert_eq!(time, &Value::Array(vec![Value::undefined()]));

    let program = checked("attimer(time=makeTime(7, 30)) => notify;").await;
    let RuleTrigger::Stream(Stream::AtTimer { time, .. }) = &program.rules[0].trigger else {
        panic!("expected attimer");
    };
    assert_eq!(time, &Value::Array(vec![Value::Time { hour: 7, minute: 30 }]));

    checked("attimer(time=[$?, $?], expiration_date=makeDate(2018, 5, 23)) => notify;").await;
}

#[tokio::test]
async fn test_timer_interval_is_a_duration() {
    checked("timer(base=makeDate(), interval=1h) => notify;").await;
    let err = error("timer(base=makeDate(), interval=5) => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "rules[0].stream.interval");
}

#[tokio::test]
async fn test_device_attributes() {
    checked(r#"now => @light-bulb(id="lb-1", name="bedroom").set_power(power=enum(off));"#).await;
    let err = error("now => @light-bulb.set_power(power=enum(dim));", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[tokio::test]
async fn test_declared_program_call() {
    let code = "let program p1(p_query : String) := { monitor (@com.bing.web_search(query=p_query)) => notify; };\noninput => { p1(); }";
    let program = checked(code).await;
    assert_eq!(
        action_params(&program),
        &[InputParam::new("p_query", Value::undefined())]
    );

    let err = error(code, false).await;
    assert_eq!(err.kind, ErrorKind::MissingRequiredArgument);
}

#[tokio::test]
async fn test_declared_query_call() {
    let program = checked(
        "let query q(p : Number) := @com.xkcd.get_comic(number=p);\nnow => q(p=1) => @com.twitter.post(status=title);",
    )
    .await;
    let Table::VarRef { schema, .. } = &program.rules[0].queries[0] else {
        panic!("expected a declared query");
    };
    let schema = schema.as_ref().unwrap();
    assert_eq!(schema.channel, "q");
    assert!(schema.is_monitorable);

    let err = error("now => q() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);

    let err = error("let stream s := monitor (@com.twitter.search());\nnow => s() => notify;", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[tokio::test]
async fn test_declaration_params_are_in_scope() {
    checked("let action a(x : Enum(on,off)) := @light-bulb.set_power(power=x);").await;
    let err = error("let action a(x : Number) := @light-bulb.set_power(power=x);", true).await;
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "declarations[0].action.in_params.power");
}

#[tokio::test]
async fn test_dataset_examples() {
    checked(
        "dataset @com.twitter language 'en' {\n    stream (p_author : Entity(tt:username)) := monitor (@com.twitter.search()), author == p_author;\n    action := @com.twitter.post(status=$?);\n}",
    )
    .await;
    let err = error(
        "dataset @com.twitter language 'en' {\n    action (p_status : Number) := @com.twitter.post(status=p_status);\n}",
        true,
    )
    .await;
    assert_eq!(err.path.to_string(), "datasets[0].examples[0].action.in_params.status");
}

#[tokio::test]
async fn test_permissions() {
    let (program, result) = check(
        r#"in_array(source, [$?, $?]) : @com.bing.web_search, query =~ "cats" => notify;"#,
        true,
    )
    .await;
    result.unwrap();
    let thingtalk_ast::PermissionFunction::Specified { schema, .. } = &program.permissions[0].query
    else {
        panic!("expected a specified function");
    };
    assert!(schema.is_some());

    checked("true : * => @com.twitter.*;").await;
    checked("source == $? : now => @com.twitter.post;").await;

    let err = error(r#"true : @com.bing.web_search, likes =~ "cats" => notify;"#, true).await;
    assert_eq!(err.kind, ErrorKind::UndefinedName);
    assert_eq!(err.path.to_string(), "permissions[0].query.filter");

    let err = error("true : * => @com.nope.*;", true).await;
    assert_eq!(err.kind, ErrorKind::UnknownSchema);
}

#[tokio::test]
async fn test_executor() {
    checked(r#"executor = "bob"^^tt:contact : now => notify;"#).await;
    checked("executor = $? : now => @com.twitter.post();").await;
}

#[tokio::test]
async fn test_program_unchanged_on_failure() {
    let code = "now => @com.xkcd.get_comic() => notify;\nnow => @com.twitter.post(status=5);";
    let original = parse(code).unwrap();
    let (program, result) = check(code, true).await;
    assert!(result.is_err());
    assert_eq!(program, original);
}

#[tokio::test]
async fn test_check_is_idempotent() {
    let code = r#"monitor (@com.washingtonpost.get_article()) join @com.yandex.translate.translate(target_language="zh"^^tt:iso_lang_code) on (text=title) => @com.twitter.post();"#;
    let mut program = checked(code).await;
    let once = program.clone();
    let schemas = SchemaRetriever::new(delegate());
    typecheck_program(&mut program, &schemas, &CheckerOptions { allow_undefined: true })
        .await
        .unwrap();
    assert_eq!(program, once);
}

#[tokio::test]
async fn test_each_kind_is_fetched_once() {
    let delegate = delegate();
    let schemas = SchemaRetriever::new(delegate.clone());
    let mut program = parse(
        "now => @com.xkcd.get_comic() => notify;
         monitor (@com.xkcd.get_comic()) => @com.twitter.post(status=title);
         now => @com.xkcd.get_comic() => @com.twitter.post(status=title);",
    )
    .unwrap();
    typecheck_program(&mut program, &schemas, &CheckerOptions::default())
        .await
        .unwrap();
    assert_eq!(delegate.fetch_count(), 2);

    typecheck_program(&mut program, &schemas, &CheckerOptions::default())
        .await
        .unwrap();
    assert_eq!(delegate.fetch_count(), 2);
}
