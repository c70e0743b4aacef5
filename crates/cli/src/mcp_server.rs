//! Tool-call server: JSON-RPC 2.0 over stdio, one message per line.
//!
//! `tools/call` requests each run on their own thread so a long inline
//! transcription does not hold up other calls. Every response goes through
//! a single writer thread, so lines are never interleaved.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::Tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "transcriber";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Serve requests from `input` until it reaches end of file, then wait for
/// in-flight calls and flush `output`.
pub fn serve<R, W>(tools: Arc<Tools>, input: R, output: W) -> io::Result<()>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let (tx, rx) = unbounded::<JsonRpcResponse>();
    let writer = thread::Builder::new()
        .name("mcp-writer".to_string())
        .spawn(move || -> io::Result<()> {
            let mut output = output;
            for response in rx {
                let line = serde_json::to_string(&response)?;
                writeln!(output, "{line}")?;
                output.flush()?;
            }
            Ok(())
        })?;

    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        in_flight.retain(|handle| !handle.is_finished());

        let request: JsonRpcRequest = match serde_json::from_str::<Value>(&line) {
            Err(e) => {
                log::warn!("Unparsable request: {e}");
                let message = format!("Parse error: {e}");
                send(&tx, JsonRpcResponse::error(Value::Null, PARSE_ERROR, message));
                continue;
            }
            Ok(value) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value(value) {
                    Ok(request) => request,
                    Err(e) => {
                        let message = format!("Invalid request: {e}");
                        send(&tx, JsonRpcResponse::error(id, INVALID_REQUEST, message));
                        continue;
                    }
                }
            }
        };

        log::debug!("Received {} (id={:?})", request.method, request.id);
        if let Some(handle) = dispatch(&tools, request, &tx)? {
            in_flight.push(handle);
        }
    }

    log::info!("Input closed, waiting for {} in-flight calls", in_flight.len());
    for handle in in_flight {
        if handle.join().is_err() {
            log::error!("A tool call panicked");
        }
    }
    drop(tx);
    match writer.join() {
        Ok(result) => result,
        Err(_) => Err(io::Error::other("response writer panicked")),
    }
}

fn dispatch(
    tools: &Arc<Tools>,
    request: JsonRpcRequest,
    tx: &Sender<JsonRpcResponse>,
) -> io::Result<Option<JoinHandle<()>>> {
    let Some(id) = request.id else {
        // Notifications (e.g. notifications/initialized) get no response
        log::debug!("Notification {}", request.method);
        return Ok(None);
    };

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools.definitions() })),
        "tools/call" => {
            let params: CallParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(e) => {
                    let message = format!("Invalid params: {e}");
                    send(tx, JsonRpcResponse::error(id, INVALID_PARAMS, message));
                    return Ok(None);
                }
            };
            let tools = Arc::clone(tools);
            let tx = tx.clone();
            let handle = thread::Builder::new()
                .name(format!("tool-{}", params.name))
                .spawn(move || {
                    let arguments = params.arguments.unwrap_or_else(|| json!({}));
                    let response = match tools.call(&params.name, &arguments) {
                        Ok(result) => JsonRpcResponse::success(id, result.to_json()),
                        Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
                    };
                    send(&tx, response);
                })?;
            return Ok(Some(handle));
        }
        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };

    send(tx, response);
    Ok(None)
}

fn send(tx: &Sender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        log::error!("Response writer is gone; dropping response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TranscriptionService;
    use std::io::Cursor;
    use std::sync::Mutex;
    use transcriber_core::job::domain::transcription_request::TranscriptionRequest;
    use transcriber_core::shared::error::TranscribeError;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct EchoService;

    impl TranscriptionService for EchoService {
        fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, TranscribeError> {
            Ok(format!("transcribed {}", request.audio_path.display()))
        }
    }

    fn run(input: &str) -> Vec<Value> {
        let tools = Arc::new(Tools::new(Arc::new(EchoService), "zh"));
        let output = SharedBuffer::default();
        serve(tools, Cursor::new(input.to_string()), output.clone()).unwrap();
        let bytes = output.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses
            .iter()
            .find(|r| r["id"] == json!(id))
            .unwrap_or_else(|| panic!("no response with id {id}"))
    }

    #[test]
    fn test_initialize() {
        let responses = run(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        let result = &by_id(&responses, 1)["result"];
        assert_eq!(result["protocolVersion"], json!(PROTOCOL_VERSION));
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(result["serverInfo"]["name"], json!("transcriber"));
    }

    #[test]
    fn test_notifications_get_no_response() {
        let responses = run(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(responses.is_empty());
    }

    #[test]
    fn test_tools_list() {
        let responses = run(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#);
        let tools = by_id(&responses, 2)["result"]["tools"].as_array().unwrap().len();
        assert_eq!(tools, 2);
    }

    #[test]
    fn test_tools_call_completes_before_exit() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"transcribe_audio","arguments":{"audio_file_path":"/a.mp3"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#,
            "\n"
        ));
        let result = &by_id(&responses, 3)["result"];
        assert_eq!(result["content"][0]["text"], json!("transcribed /a.mp3"));
        assert_eq!(result["isError"], json!(false));
        assert_eq!(by_id(&responses, 4)["result"], json!({}));
    }

    #[test]
    fn test_unknown_tool_is_invalid_params() {
        let responses =
            run(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#);
        assert_eq!(by_id(&responses, 5)["error"]["code"], json!(INVALID_PARAMS));
    }

    #[test]
    fn test_unknown_method() {
        let responses = run(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#);
        assert_eq!(by_id(&responses, 6)["error"]["code"], json!(METHOD_NOT_FOUND));
    }

    #[test]
    fn test_garbage_is_parse_error_and_server_continues() {
        let responses =
            run("this is not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n");
        assert_eq!(responses.len(), 2);
        assert!(responses
            .iter()
            .any(|r| r["error"]["code"] == json!(PARSE_ERROR) && r["id"].is_null()));
        assert_eq!(by_id(&responses, 7)["result"], json!({}));
    }

    #[test]
    fn test_request_without_method_is_invalid() {
        let responses = run(r#"{"jsonrpc":"2.0","id":8}"#);
        assert_eq!(by_id(&responses, 8)["error"]["code"], json!(INVALID_REQUEST));
    }

    #[test]
    fn test_string_ids_are_echoed() {
        let responses = run(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#);
        assert_eq!(responses[0]["id"], json!("abc"));
    }
}
