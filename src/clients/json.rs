//! # JsonClient: newline-delimited JSON over any async writer.
//!
//! Serializes each [`ClientEvent`] to one line of JSON in the client-facing schema and
//! writes it to the wrapped [`AsyncWrite`] (a socket half, a pipe, a file).
//!
//! ## Example output
//! ```text
//! {"type":"status","content":{"time":1718000000.5,"status":2,"target_type":"pipeline","target":"calc"}}
//! {"type":"log","content":{"time":1718000000.6,"src":{"unit":null,"pipeline":"calc"},"level":"info","msg":"Starting..."}}
//! ```

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::clients::Client;
use crate::events::ClientEvent;

/// Client writing one JSON document per line.
pub struct JsonClient<W> {
    id: String,
    writer: Mutex<W>,
}

impl<W> JsonClient<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps `writer` under the given client id.
    pub fn new(id: impl Into<String>, writer: W) -> Self {
        Self {
            id: id.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Client for JsonClient<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, event: &ClientEvent) -> io::Result<()> {
        let mut line = serde_json::to_vec(event).map_err(io::Error::other)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::events::{Level, LogRecord, translate};

    #[tokio::test]
    async fn writes_one_line_per_event() {
        let client = JsonClient::new("json", Vec::<u8>::new());
        let status = translate(&LogRecord::from_channel("backend.calc", Level::Info, "STATUS: 1"));
        let log = translate(&LogRecord::from_channel("backend.calc.add", Level::Info, "5"));

        client.send(&status).await.unwrap();
        client.send(&log).await.unwrap();

        let out = String::from_utf8(client.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "status");
        assert_eq!(lines[0]["content"]["status"], 1);
        assert_eq!(lines[0]["content"]["target"], "calc");
        assert_eq!(lines[1]["type"], "log");
        assert_eq!(lines[1]["content"]["src"]["unit"], "add");
        assert_eq!(lines[1]["content"]["msg"], "5");
    }
}
