//! Payload decoder - 生のボディ → `TaskInvocation`
//!
//! ここで見るのはエンベロープの形だけ。引数が関数に合うかどうかは
//! executor が bind するときに決まる。

use serde_json::{Map, Value};

use crate::domain::{PayloadError, TaskInvocation};

pub fn decode(body: &[u8]) -> Result<TaskInvocation, PayloadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    let Value::Object(mut obj) = value else {
        return Err(PayloadError::NotAnObject);
    };

    let module = required_string(&mut obj, "module")?;
    let function = required_string(&mut obj, "function")?;

    let args = match obj.remove("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(args)) => args,
        Some(_) => return Err(invalid("args", "must be a list")),
    };

    let kwargs = optional_object(&mut obj, "kwargs")?;
    let options = optional_object(&mut obj, "options")?;

    let task_name = match obj.remove("task_name") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::String(_)) => None,
        Some(_) => return Err(invalid("task_name", "must be a string")),
    };

    Ok(TaskInvocation {
        module,
        function,
        args,
        kwargs,
        task_name,
        options,
    })
}

fn required_string(obj: &mut Map<String, Value>, field: &'static str) -> Result<String, PayloadError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Err(PayloadError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(invalid(field, "must not be empty")),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(invalid(field, "must be a string")),
    }
}

fn optional_object(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Map<String, Value>, PayloadError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(invalid(field, "must be an object")),
    }
}

fn invalid(field: &'static str, reason: &'static str) -> PayloadError {
    PayloadError::InvalidField { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn bytes(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn decodes_full_envelope() {
        let inv = decode(&bytes(json!({
            "module": "app.tasks",
            "function": "add",
            "args": [2, 3],
            "kwargs": {"x": 1},
            "task_name": "Math adder",
            "options": {"max_retries": 3}
        })))
        .unwrap();
        assert_eq!(inv.path(), "app.tasks.add");
        assert_eq!(inv.args, vec![json!(2), json!(3)]);
        assert_eq!(inv.kwargs["x"], 1);
        assert_eq!(inv.task_name.as_deref(), Some("Math adder"));
        assert_eq!(inv.options["max_retries"], 3);
    }

    #[test]
    fn omitted_args_and_kwargs_default_to_empty() {
        let inv = decode(&bytes(json!({"module": "app.tasks", "function": "add"}))).unwrap();
        assert!(inv.args.is_empty());
        assert!(inv.kwargs.is_empty());
        assert!(inv.task_name.is_none());
    }

    #[rstest]
    #[case(json!({"function": "add"}), "module")]
    #[case(json!({"module": "app.tasks"}), "function")]
    #[case(json!({"module": null, "function": "add"}), "module")]
    fn missing_required_field(#[case] body: Value, #[case] field: &str) {
        match decode(&bytes(body)) {
            Err(PayloadError::MissingField(f)) => assert_eq!(f, field),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[rstest]
    #[case(json!({"module": "", "function": "add"}))]
    #[case(json!({"module": "app.tasks", "function": 7}))]
    #[case(json!({"module": "app.tasks", "function": "add", "args": {"a": 1}}))]
    #[case(json!({"module": "app.tasks", "function": "add", "kwargs": [1, 2]}))]
    #[case(json!({"module": "app.tasks", "function": "add", "options": "fast"}))]
    fn invalid_fields(#[case] body: Value) {
        assert!(matches!(
            decode(&bytes(body)),
            Err(PayloadError::InvalidField { .. })
        ));
    }

    #[test]
    fn non_json_and_non_object_bodies() {
        assert!(matches!(decode(b"not json"), Err(PayloadError::InvalidJson(_))));
        assert_eq!(decode(b"[1,2]"), Err(PayloadError::NotAnObject));
    }
}
