use crate::*;
use serde_json::json;

fn data(value: serde_json::Value) -> Data {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("Expected object"),
    }
}

fn render(source: &str, value: serde_json::Value) -> EvalResult<String> {
    Renderer::new().render(source, &data(value))
}

#[test]
fn test_escaped_and_raw_echo() {
    let ctx = json!({ "name": "<b>World</b>" });
    assert_eq!(
        render("Hello <%= name %>", ctx.clone()).unwrap(),
        "Hello &lt;b&gt;World&lt;/b&gt;"
    );
    assert_eq!(render("Hello <%- name %>", ctx).unwrap(), "Hello <b>World</b>");
}

#[test]
fn test_null_echoes_nothing() {
    assert_eq!(render("[<%= value %>]", json!({ "value": null })).unwrap(), "[]");
}

#[test]
fn test_arithmetic_and_number_printing() {
    let ctx = json!({ "price": 2.5, "qty": 4 });
    assert_eq!(render("<%= price * qty %>", ctx.clone()).unwrap(), "10");
    assert_eq!(render("<%= qty / 8 %>", ctx.clone()).unwrap(), "0.5");
    assert_eq!(render("<%= -qty + 1 %>", ctx.clone()).unwrap(), "-3");
    assert_eq!(render("<%= 7 % 3 %>", ctx).unwrap(), "1");
}

#[test]
fn test_string_concatenation() {
    let ctx = json!({ "first": "Ada", "n": 2 });
    assert_eq!(
        render("<%= first + ' #' + n %>", ctx).unwrap(),
        "Ada #2"
    );
}

#[test]
fn test_comparisons_and_logic() {
    let ctx = json!({ "count": 5, "name": "b" });
    assert_eq!(render("<%= count < 10 && count >= 5 %>", ctx.clone()).unwrap(), "true");
    assert_eq!(render("<%= name > 'a' || false %>", ctx.clone()).unwrap(), "true");
    assert_eq!(render("<%= !(count == 5.0) %>", ctx.clone()).unwrap(), "false");
    assert_eq!(render("<%= count != '5' %>", ctx).unwrap(), "true");
}

#[test]
fn test_member_and_index_access() {
    let ctx = json!({
        "user": { "name": "Ada", "tags": ["a", "b"], "meta": { "x-y": 1 } }
    });
    assert_eq!(render("<%= user.name %>", ctx.clone()).unwrap(), "Ada");
    assert_eq!(render("<%= user.tags[1] %>", ctx.clone()).unwrap(), "b");
    assert_eq!(render("<%= user.tags.0 %>", ctx.clone()).unwrap(), "a");
    assert_eq!(render("<%= user.meta['x-y'] %>", ctx.clone()).unwrap(), "1");
    assert_eq!(render("<%= user.missing.deeper %>", ctx).unwrap(), "");
}

#[test]
fn test_unknown_variable_is_an_error() {
    let err = render("<%= ghost %>", json!({})).unwrap_err();
    assert_eq!(
        err,
        EvalError::VariableNotFound {
            name: "ghost".to_string()
        }
    );
}

#[test]
fn test_coalesce_and_is_null_tolerate_unknown_variables() {
    assert_eq!(render("<%= ghost ?? 'guest' %>", json!({})).unwrap(), "guest");
    assert_eq!(render("<%= name ?? 'guest' %>", json!({ "name": "Ada" })).unwrap(), "Ada");
    assert_eq!(render("<%= is_null(ghost) %>", json!({})).unwrap(), "true");
    assert_eq!(render("<%= default(title, 'Untitled') %>", json!({ "title": "" })).unwrap(), "Untitled");
}

#[test]
fn test_builtin_functions() {
    let ctx = json!({ "items": [1, 2, 3], "name": "  Ada  ", "obj": { "a": 1 } });
    assert_eq!(render("<%= count(items) %>", ctx.clone()).unwrap(), "3");
    assert_eq!(render("<%= upper(trim(name)) %>", ctx.clone()).unwrap(), "ADA");
    assert_eq!(render("<%= lower('ABC') %>", ctx.clone()).unwrap(), "abc");
    assert_eq!(render("<%- json(obj) %>", ctx.clone()).unwrap(), "{\"a\":1}");
    assert_eq!(render("<%= items %>", ctx.clone()).unwrap(), "[1,2,3]");

    let err = render("<%= shout(name) %>", ctx.clone()).unwrap_err();
    assert!(matches!(err, EvalError::UnknownFunction { .. }));

    let err = render("<%= count() %>", ctx).unwrap_err();
    assert!(matches!(err, EvalError::TypeError { .. }));
}

#[test]
fn test_operand_errors() {
    assert_eq!(render("<%= 1 / 0 %>", json!({})).unwrap_err(), EvalError::DivisionByZero);
    assert!(matches!(
        render("<%= [1] %>", json!({})).unwrap_err(),
        EvalError::Syntax { .. }
    ));
    assert!(matches!(
        render("<%= a - 'x' %>", json!({ "a": 1 })).unwrap_err(),
        EvalError::InvalidOperands { .. }
    ));
}

#[test]
fn test_evaluate_single_expression() {
    let expr = parse_expression("a.b ?? 3", 0).unwrap();
    let value = Renderer::new()
        .evaluate(&expr, &data(json!({ "a": {} })))
        .unwrap();
    assert_eq!(value, json!(3));
}
