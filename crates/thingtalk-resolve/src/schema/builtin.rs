use thingtalk_ast::{ArgDirection, ArgumentDef, ClassDef, FunctionDef, FunctionType, Type};

/// Kind under which the engine's own functions are registered.
pub const BUILTIN_KIND: &str = "org.thingpedia.builtin.thingengine.builtin";

/// The engine's own functions: the `notify` and `return` actions and the
/// `attimer` and `timer` streams.
pub fn builtin_class() -> ClassDef {
    let mut class = ClassDef::new(BUILTIN_KIND);
    class.add_function(FunctionDef::new(BUILTIN_KIND, "notify", FunctionType::Action));
    class.add_function(FunctionDef::new(BUILTIN_KIND, "return", FunctionType::Action));
    class.add_function(
        FunctionDef::new(BUILTIN_KIND, "attimer", FunctionType::Trigger)
            .with_arg(ArgumentDef::new(
                "time",
                Type::Time.array_of(),
                ArgDirection::InReq,
            ))
            .with_arg(ArgumentDef::new(
                "expiration_date",
                Type::Date,
                ArgDirection::InOpt,
            )),
    );
    class.add_function(
        FunctionDef::new(BUILTIN_KIND, "timer", FunctionType::Trigger)
            .with_arg(ArgumentDef::new("base", Type::Date, ArgDirection::InReq))
            .with_arg(ArgumentDef::new(
                "interval",
                Type::Measure("ms".to_string()),
                ArgDirection::InReq,
            )),
    );
    class
}
