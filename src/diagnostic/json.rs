use super::{Diagnostic, Phase};
use crate::compiler::ErrorLocation;

pub fn render(d: &Diagnostic) -> String {
    let phase = match d.phase {
        Phase::Compile => "compile",
        Phase::Runtime => "runtime",
    };

    let mut obj = serde_json::json!({
        "phase": phase,
        "message": d.message,
        "line": d.line,
    });

    match &d.location {
        Some(ErrorLocation::At(lexeme)) => {
            obj["location"] = serde_json::Value::from("token");
            obj["lexeme"] = serde_json::Value::from(lexeme.as_str());
        }
        Some(ErrorLocation::End) => obj["location"] = serde_json::Value::from("end"),
        Some(ErrorLocation::Lexical) => obj["location"] = serde_json::Value::from("lexical"),
        None => {}
    }

    if let Some(text) = d.source_line() {
        obj["source_line"] = serde_json::Value::from(text);
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| r#"{"phase":"internal","message":"internal error serializing diagnostic"}"#.to_string())
}
