//! Usage document printed by `groovy-sandbox docs`

use groovy_sandbox_config::SandboxConfig;
use serde::Serialize;
use serde_json::{json, Value};

/// Self-describing usage document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageDoc {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    request: Value,
    response: Value,
    dialects: Vec<DialectDoc>,
    host_api: Vec<&'static str>,
    limits: Value,
    pub(crate) examples: Vec<Example>,
}

#[derive(Debug, Serialize)]
struct DialectDoc {
    name: &'static str,
    detected_by: &'static str,
    bindings: &'static str,
}

/// A runnable script with its input
#[derive(Debug, Serialize)]
pub(crate) struct Example {
    pub(crate) title: &'static str,
    pub(crate) script: &'static str,
    pub(crate) payload: Value,
}

/// Build the document; limits reflect the active configuration
pub(crate) fn usage(config: &SandboxConfig) -> UsageDoc {
    UsageDoc {
        name: "groovy-sandbox",
        version: env!("CARGO_PKG_VERSION"),
        description: "Runs Groovy-style message transforms against a JSON or text payload",
        request: json!({
            "rawScript": "string, required (alias: script)",
            "payload": "JSON value or text, required (alias: body)",
        }),
        response: json!({
            "success": {
                "success": true,
                "result": "transformed payload",
                "executionTimeMs": "integer",
                "logs": ["string"],
                "declaredVariables": ["string"],
            },
            "failure": {
                "success": false,
                "error": "string",
                "executionTimeMs": "integer",
                "logs": ["partial log lines, last one is the error"],
            },
        }),
        dialects: vec![
            DialectDoc {
                name: "generic",
                detected_by: "anything that is not host-style",
                bindings: "payload bound as both `body` and `message`",
            },
            DialectDoc {
                name: "host_style",
                detected_by: "`import com.sap.gateway...` or `Message processData(Message m)`",
                bindings: "payload wrapped in a Message passed to processData",
            },
        ],
        host_api: vec![
            "message.getBody(String) / setBody(v) / getResult()",
            "message.getHeader(name) / setHeader(name, v) / getHeaders()",
            "message.getProperty(name) / setProperty(name, v) / getProperties()",
            "new JsonSlurper().parseText(text)",
            "JsonOutput.toJson(v) / JsonOutput.prettyPrint(text)",
            "messageLogFactory.getMessageLog(message).addAttachmentAsString(name, text, mime)",
            "Logger.log(...) / println ...",
            "new Date().format(pattern) / UUID.randomUUID()",
            "collections: each, collect, findAll, find, any, every, inject, sum, sort, groupBy",
        ],
        limits: json!({
            "timeoutMs": config.limits.timeout.as_millis() as u64,
            "maxOperations": config.limits.max_operations,
            "maxScriptSize": config.engine.max_script_size,
            "maxLogEntries": config.engine.max_log_entries,
        }),
        examples: vec![
            Example {
                title: "Derive a field",
                script: "def message = body\nmessage.doble = message.valor * 2\nreturn message",
                payload: json!({"valor": 100}),
            },
            Example {
                title: "Upper-case a list",
                script: "def message = body; message.itemsUpper = message.items.collect { it.toUpperCase() }; return message;",
                payload: json!({"items": ["a", "b", "c"]}),
            },
            Example {
                title: "Filter a list",
                script: "body.pares = body.numeros.findAll { it % 2 == 0 }\nreturn body",
                payload: json!({"numeros": [1, 2, 3, 4, 5, 6]}),
            },
            Example {
                title: "Host-style entry point",
                script: "import com.sap.gateway.ip.core.customdev.util.Message\n\
                         import groovy.json.JsonSlurper\n\n\
                         Message processData(Message message) {\n    \
                         def json = new JsonSlurper().parseText(message.getBody(String))\n    \
                         message.setHeader('Customer', json.customer ?: 'unknown')\n    \
                         message.setBody([count: json.items.size()])\n    \
                         return message\n\
                         }\n",
                payload: json!({"customer": "ACME", "items": [1, 2]}),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groovy_sandbox_core::ScriptRequest;
    use groovy_sandbox_scripting::TransformEngine;

    #[test]
    fn test_examples_run() {
        let config = SandboxConfig::default();
        let engine = TransformEngine::new(config.clone());
        for example in usage(&config).examples {
            let request = ScriptRequest::new(example.script, example.payload.clone());
            let result = engine.execute(&request);
            assert!(result.is_ok(), "{} failed: {:?}", example.title, result.err());
        }
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let doc = serde_json::to_value(usage(&SandboxConfig::default())).unwrap();
        assert!(doc.get("hostApi").is_some());
        assert_eq!(doc["limits"]["maxOperations"], json!(1_000_000));
    }
}
