use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use persist::{FOOTER_SIZE, PersistCodec, SIG_BACK, peek_header};
use std::{fs::File, path::Path};
use tokio::fs::OpenOptions;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::{
    cli::OutputFormat,
    config::AppConfig,
    output,
    record::{USER_FIELDS, User, UserInput},
};

/// Where a frame sits in a file and whether it ends where it claims to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub offset: usize,
    pub len: usize,
    pub back_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub file_len: usize,
    pub frames: Vec<FrameSummary>,
}

pub struct CommandExecutor {
    config: AppConfig,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Encode the users in a JSON file. Returns how many frames were written.
    pub async fn write(&self, input: &Path, output: &Path, append: bool) -> Result<usize> {
        let json = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let users = serde_json::from_str::<UserInput>(&json)
            .context("Failed to parse users")?
            .into_users();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(output)
            .await
            .with_context(|| format!("Failed to open {}", output.display()))?;

        let mut sink = FramedWrite::new(file, PersistCodec::new(USER_FIELDS));
        for user in &users {
            sink.send(user).await?;
        }
        sink.close().await?;

        info!(frames = users.len(), path = %output.display(), "wrote users");
        Ok(users.len())
    }

    /// Decode every frame of a file in order.
    pub async fn read_records(&self, input: &Path) -> Result<Vec<User>> {
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("Failed to open {}", input.display()))?;

        let mut frames = FramedRead::new(file, PersistCodec::new(USER_FIELDS));
        let mut users = Vec::new();
        while let Some(user) = frames.next().await {
            let index = users.len();
            users.push(user.with_context(|| format!("Frame #{index} is invalid"))?);
        }

        debug!(frames = users.len(), "read users");
        Ok(users)
    }

    pub async fn read(&self, input: &Path, format: Option<OutputFormat>) -> Result<String> {
        let users = self.read_records(input).await?;
        output::format_users(&users, format.unwrap_or(self.config.default_output_format))
    }

    /// Walk the frame headers of a file without decoding any field.
    pub async fn inspect(&self, input: &Path) -> Result<Inspection> {
        let buf = tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < buf.len() {
            let header = peek_header(&buf[offset..])
                .with_context(|| format!("Bad frame header at offset {offset}"))?;
            let end = offset + header.len();

            let mut back = [0u8; FOOTER_SIZE];
            back.copy_from_slice(&buf[end - FOOTER_SIZE..end]);
            frames.push(FrameSummary {
                offset,
                len: header.len(),
                back_ok: u64::from_ne_bytes(back) == SIG_BACK,
            });
            offset = end;
        }

        Ok(Inspection {
            file_len: buf.len(),
            frames,
        })
    }

    /// Write the sample user with the blocking adapters, then read it back.
    pub fn demo(&self, path: &Path) -> Result<User> {
        let sample = User::sample();

        let mut file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let written = persist::write_to_file(&sample, USER_FIELDS, &mut file)?;
        info!(bytes = written, path = %path.display(), "saved sample user");

        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut loaded = User::default();
        persist::read_from_file(&mut loaded, USER_FIELDS, &mut file)?;
        Ok(loaded)
    }
}
