//! Control socket client, used by the command-line subcommands

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::net::UnixStream;

use super::codec::{read_frame, write_frame};
use super::protocol::{Notification, Request, Response};
use crate::events::ToggleEvent;

async fn connect(socket_path: &Path) -> Result<UnixStream> {
    UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("is layout-hint running? cannot connect to {}", socket_path.display()))
}

/// Send one request and wait for its response
pub async fn request(socket_path: &Path, request: &Request) -> Result<Response> {
    let mut stream = connect(socket_path).await?;
    write_frame(&mut stream, request).await?;

    let body = read_frame(&mut stream)
        .await?
        .context("connection closed before a response arrived")?;
    serde_json::from_slice(&body).context("malformed response")
}

/// Subscribe and call `on_event` for every toggle event until the server goes away
pub async fn watch<F>(socket_path: &Path, mut on_event: F) -> Result<()>
where
    F: FnMut(ToggleEvent),
{
    let mut stream = connect(socket_path).await?;
    write_frame(&mut stream, &Request::Subscribe).await?;

    let Some(body) = read_frame(&mut stream).await? else {
        return Ok(());
    };
    match serde_json::from_slice::<Response>(&body)? {
        Response::Subscribed => {}
        other => bail!("unexpected response to subscribe: {:?}", other),
    }

    while let Some(body) = read_frame(&mut stream).await? {
        let Notification::Notification { event } = serde_json::from_slice(&body)?;
        on_event(event);
    }

    Ok(())
}
