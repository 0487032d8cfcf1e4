//! `jdi cancel|capacity|threads` – forwarded to the running `jdi get`.

use anyhow::Result;
use jdi_core::control::default_control_socket_path;

use crate::cli::control_socket::{send_command, ControlCommand};

pub async fn run_control(cmd: ControlCommand) -> Result<()> {
    let path = default_control_socket_path()?;
    send_command(&path, cmd).await?;
    println!("sent: {}", cmd.to_line().trim_end());
    Ok(())
}
