//! Streaming support for LLM responses.
//!
//! Parses Anthropic server-sent events into text chunks for a display sink.
//! Streaming is display-only: the caller still receives the complete text once
//! the stream finishes.

use serde::Deserialize;
use tokio::sync::mpsc;

use super::types::Usage;

/// Events received during streaming from the Anthropic API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Start of message, carries input token usage
    MessageStart {
        #[serde(default)]
        message: MessageStartBody,
    },
    ContentBlockStart {
        index: u32,
    },
    /// Delta within a content block
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    /// Stop reason and output token count
    MessageDelta {
        #[serde(default)]
        usage: Option<OutputUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: StreamErrorBody,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageStartBody {
    #[serde(default)]
    pub usage: Option<InputUsage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputUsage {
    #[serde(default)]
    pub input_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputUsage {
    #[serde(default)]
    pub output_tokens: u64,
}

/// Content block delta payload; only text deltas matter for generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub message: String,
}

/// Chunk types emitted to consumers during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Text content delta
    Text(String),
    /// Stream completed successfully
    Done,
    /// Stream error
    Error(String),
}

/// Handle for receiving streaming chunks.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamChunk>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamChunk>) -> Self {
        Self { receiver }
    }

    /// Receive the next chunk from the stream.
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        self.receiver.recv().await
    }

    /// Collect all text from the stream into a single string.
    pub async fn collect_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(chunk) = self.recv().await {
            match chunk {
                StreamChunk::Text(t) => text.push_str(&t),
                StreamChunk::Done | StreamChunk::Error(_) => break,
            }
        }
        text
    }
}

/// Builder for stream handle pairs (sender and handle).
pub fn create_stream_channel(buffer_size: usize) -> (mpsc::Sender<StreamChunk>, StreamHandle) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (tx, StreamHandle::new(rx))
}

/// Parse the `data:` payload of one SSE event.
///
/// Unknown event types and keep-alive noise yield `None`.
pub fn parse_sse_event(data: &str) -> Option<StreamEvent> {
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    serde_json::from_str(data).ok()
}

/// Accumulates streamed text and usage while emitting chunks.
#[derive(Debug, Default)]
pub struct StreamParser {
    pub text_content: String,
    pub usage: Usage,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event and emit chunks.
    pub fn process_event(&mut self, event: StreamEvent) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();

        match event {
            StreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.usage.input_tokens = usage.input_tokens;
                }
            }
            StreamEvent::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } => {
                self.text_content.push_str(&text);
                chunks.push(StreamChunk::Text(text));
            }
            StreamEvent::MessageDelta { usage: Some(usage) } => {
                self.usage.output_tokens = usage.output_tokens;
            }
            StreamEvent::MessageStop => {
                chunks.push(StreamChunk::Done);
            }
            StreamEvent::Error { error } => {
                chunks.push(StreamChunk::Error(format!("{}: {}", error.kind, error.message)));
            }
            _ => {}
        }

        chunks
    }
}
