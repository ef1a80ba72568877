use perf_baseline::{BaselineError, BoxError, Kwargs, Namespace, Target, Value};
use serde_json::json;

fn add(args: &[Value], kwargs: &Kwargs) -> Result<Value, BoxError> {
    let a = args.first().and_then(Value::as_i64).ok_or("missing a")?;
    let b = kwargs.get("b").and_then(Value::as_i64).ok_or("missing b")?;
    Ok(json!(a + b))
}

#[test]
fn test_call_target_runs_closure() {
    let mut count = 0;
    let mut target = Target::call(|| count += 1);
    for _ in 0..3 {
        target.invoke().unwrap();
    }
    assert_eq!(target.describe(), "<callable>");
    drop(target);
    assert_eq!(count, 3);
}

#[test]
fn test_bound_target_applies_bindings() {
    let mut seen = Vec::new();
    let mut kwargs = Kwargs::new();
    kwargs.insert("b".into(), json!(3));
    let mut target = Target::bound(
        |args: &[Value], kwargs: &Kwargs| {
            let sum = add(args, kwargs)?;
            seen.push(sum.clone());
            Ok::<_, BoxError>(sum)
        },
        vec![json!(2)],
        kwargs,
    );
    target.invoke().unwrap();
    target.invoke().unwrap();
    assert_eq!(target.describe(), "<callable>(1 args, 1 kwargs)");
    drop(target);
    assert_eq!(seen, vec![json!(5), json!(5)]);
}

#[test]
fn test_bound_target_error_propagates() {
    let mut target = Target::bound(add, vec![json!(2)], Kwargs::new());
    let err = target.invoke().unwrap_err();
    assert_eq!(err.to_string(), "missing b");
}

#[test]
fn test_expression_target_evaluates_namespace() {
    let mut calls = 0;
    let namespace = Namespace::new()
        .with_value("base", 40)
        .with_function("add", |args: &[Value]| {
            calls += 1;
            let total: i64 = args.iter().filter_map(Value::as_i64).sum();
            Ok::<_, BoxError>(json!(total))
        });
    let mut target = Target::expression("add(base, 2)", namespace).unwrap();
    assert_eq!(target.describe(), "add(base, 2)");
    target.invoke().unwrap();
    target.invoke().unwrap();
    drop(target);
    assert_eq!(calls, 2);
}

#[test]
fn test_expression_rejects_bad_source() {
    for source in ["", "add(1, 2", "add(1) extra", "missing(1)", "[1, 2"] {
        let namespace = Namespace::new().with_function("add", |_: &[Value]| {
            Ok::<_, BoxError>(Value::Null)
        });
        let err = Target::expression(source, namespace).unwrap_err();
        assert!(
            matches!(err, BaselineError::Configuration(_)),
            "{source:?} gave {err:?}"
        );
    }
}

#[test]
fn test_debug_shows_description() {
    let target = Target::bound(add, vec![], Kwargs::new());
    assert_eq!(format!("{target:?}"), "Target(\"<callable>(0 args, 0 kwargs)\")");
}
