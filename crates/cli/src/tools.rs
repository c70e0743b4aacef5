use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use transcriber_core::job::domain::transcription_request::TranscriptionRequest;
use transcriber_core::pipeline::result_formatter::format_error;
use transcriber_core::pipeline::transcribe_audio_use_case::TranscribeAudioUseCase;
use transcriber_core::shared::constants::SUPPORTED_FORMATS;
use transcriber_core::shared::error::TranscribeError;

pub const TRANSCRIBE_AUDIO: &str = "transcribe_audio";
pub const GET_SUPPORTED_FORMATS: &str = "get_supported_formats";

/// Anything that can turn a request into the text a caller sees.
pub trait TranscriptionService: Send + Sync {
    fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, TranscribeError>;
}

impl TranscriptionService for TranscribeAudioUseCase {
    fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, TranscribeError> {
        self.execute(request).map(|outcome| outcome.text().to_string())
    }
}

/// Failures of the call itself, reported as JSON-RPC errors rather than tool output.
#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn to_json(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

#[derive(Deserialize)]
struct TranscribeArgs {
    audio_file_path: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default = "default_true")]
    enable_diarization: bool,
}

fn default_true() -> bool {
    true
}

/// The two tools exposed over the tool-call protocol.
pub struct Tools {
    service: Arc<dyn TranscriptionService>,
    default_language: String,
}

impl Tools {
    pub fn new(
        service: Arc<dyn TranscriptionService>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            service,
            default_language: default_language.into(),
        }
    }

    pub fn definitions(&self) -> Value {
        json!([
            {
                "name": TRANSCRIBE_AUDIO,
                "description": "Transcribe an audio file, optionally labelling speakers. \
                    Audio up to 3 minutes is transcribed immediately; longer audio \
                    (up to 60 minutes) is processed in the background and the result \
                    is written next to the input file.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "audio_file_path": {
                            "type": "string",
                            "description": "Absolute path of the audio file"
                        },
                        "language": {
                            "type": "string",
                            "description":
                                "Language code such as 'zh' or 'en'; empty or 'auto' to detect",
                            "default": self.default_language
                        },
                        "enable_diarization": {
                            "type": "boolean",
                            "description": "Label each segment with its speaker",
                            "default": true
                        }
                    },
                    "required": ["audio_file_path"]
                }
            },
            {
                "name": GET_SUPPORTED_FORMATS,
                "description": "List the audio formats transcribe_audio accepts.",
                "inputSchema": { "type": "object", "properties": {} }
            }
        ])
    }

    pub fn call(&self, name: &str, arguments: &Value) -> Result<ToolResult, ToolCallError> {
        match name {
            TRANSCRIBE_AUDIO => self.transcribe_audio(arguments),
            GET_SUPPORTED_FORMATS => Ok(ToolResult {
                text: SUPPORTED_FORMATS.join("\n"),
                is_error: false,
            }),
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }

    fn transcribe_audio(&self, arguments: &Value) -> Result<ToolResult, ToolCallError> {
        let args: TranscribeArgs =
            serde_json::from_value(arguments.clone()).map_err(|e| ToolCallError::InvalidArguments {
                tool: TRANSCRIBE_AUDIO,
                message: e.to_string(),
            })?;
        let language = resolve_language(args.language.as_deref(), &self.default_language);
        let request =
            TranscriptionRequest::new(args.audio_file_path, language, args.enable_diarization);

        Ok(match self.service.transcribe(&request) {
            Ok(text) => ToolResult {
                text,
                is_error: false,
            },
            Err(e) => {
                if e.is_rejection() {
                    log::warn!("transcribe_audio rejected {}: {e}", request.audio_path.display());
                } else {
                    log::error!("transcribe_audio failed: {e}");
                }
                ToolResult {
                    text: format_error(&e),
                    is_error: true,
                }
            }
        })
    }
}

/// Missing means the configured default; empty or `auto` means detect.
fn resolve_language(requested: Option<&str>, default: &str) -> Option<String> {
    let language = requested.unwrap_or(default).trim();
    if language.is_empty() || language.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(language.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    struct StubService {
        requests: Mutex<Vec<TranscriptionRequest>>,
        fail: bool,
    }

    impl StubService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl TranscriptionService for StubService {
        fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, TranscribeError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Err(TranscribeError::InputNotFound(request.audio_path.clone()))
            } else {
                Ok("Transcription Result\n...".to_string())
            }
        }
    }

    fn tools(service: &Arc<StubService>) -> Tools {
        Tools::new(service.clone(), "zh")
    }

    #[rstest]
    #[case(None, Some("zh"))]
    #[case(Some("en"), Some("en"))]
    #[case(Some(""), None)]
    #[case(Some("auto"), None)]
    #[case(Some("AUTO"), None)]
    fn test_resolve_language(#[case] requested: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(resolve_language(requested, "zh").as_deref(), expected);
    }

    #[test]
    fn test_transcribe_defaults() {
        let service = StubService::new(false);
        let result = tools(&service)
            .call(TRANSCRIBE_AUDIO, &json!({ "audio_file_path": "/a/b.mp3" }))
            .unwrap();
        assert!(!result.is_error);

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].language.as_deref(), Some("zh"));
        assert!(requests[0].diarization);
    }

    #[test]
    fn test_transcribe_explicit_arguments() {
        let service = StubService::new(false);
        tools(&service)
            .call(
                TRANSCRIBE_AUDIO,
                &json!({
                    "audio_file_path": "/a/b.mp3",
                    "language": "auto",
                    "enable_diarization": false
                }),
            )
            .unwrap();
        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].language, None);
        assert!(!requests[0].diarization);
    }

    #[test]
    fn test_service_error_is_prefixed_tool_error() {
        let service = StubService::new(true);
        let result = tools(&service)
            .call(TRANSCRIBE_AUDIO, &json!({ "audio_file_path": "/nope.mp3" }))
            .unwrap();
        assert!(result.is_error);
        assert!(result.text.starts_with("Error: file not found"));
        assert_eq!(result.to_json()["isError"], json!(true));
    }

    #[test]
    fn test_missing_path_is_invalid_arguments() {
        let service = StubService::new(false);
        let err = tools(&service).call(TRANSCRIBE_AUDIO, &json!({})).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { .. }));
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_supported_formats() {
        let result = tools(&StubService::new(false))
            .call(GET_SUPPORTED_FORMATS, &json!({}))
            .unwrap();
        let formats: Vec<_> = result.text.lines().collect();
        assert_eq!(
            formats,
            vec!["mp3", "wav", "m4a", "flac", "ogg", "wma", "aac", "opus", "webm", "mp4"]
        );
    }

    #[test]
    fn test_unknown_tool() {
        let err = tools(&StubService::new(false))
            .call("delete_everything", &json!({}))
            .unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(_)));
    }

    #[test]
    fn test_definitions_name_both_tools() {
        let defs = tools(&StubService::new(false)).definitions();
        let names: Vec<_> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec![TRANSCRIBE_AUDIO, GET_SUPPORTED_FORMATS]);
        assert_eq!(defs[0]["inputSchema"]["properties"]["language"]["default"], json!("zh"));
    }

    #[test]
    fn test_result_json_shape() {
        let json = ToolResult {
            text: "hi".to_string(),
            is_error: false,
        }
        .to_json();
        assert_eq!(json["content"][0]["type"], json!("text"));
        assert_eq!(json["content"][0]["text"], json!("hi"));
        assert_eq!(json["isError"], json!(false));
    }
}
