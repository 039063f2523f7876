//! Demonstration wrapper: check a JSON document against the recursive
//! `JsonValue` type, defined once in a module scope with deferred
//! self-references.

use std::{env, fs, process::ExitCode, time::Instant};

use latebound::{Atom, ScopeChain, Session, TypeExpr, Value};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.json" };
    let raw = match read_file(file_path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let json: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("error: {file_path} is not valid JSON: {err}");
            return ExitCode::FAILURE;
        }
    };
    let value = Value::from_json(json);

    let mut session = Session::new();
    let module = session.module_scope("json_type");
    let chain = ScopeChain::from([module]);

    // JsonValue = int | float | str | bool | None
    //           | list[JsonValue] | mapping[str, JsonValue]
    let json_value = TypeExpr::union([
        Atom::Int.into(),
        Atom::Float.into(),
        Atom::Str.into(),
        Atom::Bool.into(),
        Atom::None.into(),
        TypeExpr::list_of(session.deferred("JsonValue", &chain)),
        TypeExpr::mapping_of(Atom::Str.into(), session.deferred("JsonValue", &chain)),
    ]);
    session.bind_type(module, "JsonValue", json_value.clone());

    let start = Instant::now();
    let result = session.check(&value, &json_value, None);
    let elapsed = start.elapsed();
    match result {
        Ok(()) => {
            println!("{file_path}: matches {} ({elapsed:?})", session.type_repr(&json_value));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{file_path}: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    fs::read_to_string(file_path).map_err(|err| format!("failed to read {file_path}: {err}"))
}
