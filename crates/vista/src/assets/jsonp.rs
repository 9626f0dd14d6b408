use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonpError {
    #[error("payload is empty")]
    Empty,
    #[error("payload is neither JSON nor a `callback(...)` call with a JSON argument")]
    NotACall,
    #[error("invalid callback name `{0}`")]
    BadCallback(String),
}

/// Unwraps a JSONP response like `callback({ ... });` into its JSON argument. Plain JSON objects
/// and arrays are returned as they are.
///
/// ```
/// use vista::assets::strip_jsonp;
///
/// assert_eq!(strip_jsonp(r#"SceneJS.onLoad({ "type": "node" });"#), Ok(r#"{ "type": "node" }"#));
/// assert_eq!(strip_jsonp(" [1, 2] "), Ok("[1, 2]"));
/// ```
pub fn strip_jsonp(payload: &str) -> Result<&str, JsonpError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(JsonpError::Empty);
    }
    if payload.starts_with('{') || payload.starts_with('[') {
        return Ok(payload);
    }

    let call = payload.strip_suffix(';').unwrap_or(payload).trim_end();
    let (callback, rest) = call.split_once('(').ok_or(JsonpError::NotACall)?;
    let argument = rest.strip_suffix(')').ok_or(JsonpError::NotACall)?;

    let callback = callback.trim();
    let valid_callback = !callback.is_empty()
        && !callback.starts_with('.')
        && !callback.ends_with('.')
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid_callback {
        return Err(JsonpError::BadCallback(callback.to_string()));
    }

    let argument = argument.trim();
    if !(argument.starts_with('{') || argument.starts_with('[')) {
        return Err(JsonpError::NotACall);
    }
    Ok(argument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_calls() {
        assert_eq!(strip_jsonp("cb({})"), Ok("{}"));
        assert_eq!(strip_jsonp("  cb ( [ {} ] ) ;\n"), Ok("[ {} ]"));
        assert_eq!(strip_jsonp("$jsonp_12.done({\"a\": \"(x)\"});"), Ok("{\"a\": \"(x)\"}"));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(strip_jsonp("   "), Err(JsonpError::Empty));
        assert_eq!(strip_jsonp("hello"), Err(JsonpError::NotACall));
        assert_eq!(strip_jsonp("cb({}"), Err(JsonpError::NotACall));
        assert_eq!(strip_jsonp("alert(1); cb({})"), Err(JsonpError::NotACall));
        assert_eq!(
            strip_jsonp("a b({})"),
            Err(JsonpError::BadCallback(String::from("a b")))
        );
    }
}
