use homelab_camera_client::CameraDirectory;
use tracing::{info, warn};

use crate::{
    Error, Result,
    config::{HlsAction, prompt_with_default},
    context::Context,
    grid::{CameraGrid, Roster},
};

/// Prints the roster once. A failed fetch is an error exit.
pub async fn list(context: &Context) -> Result<()> {
    let mut grid = CameraGrid::new(context.metrics.clone());

    grid.load(&context.directory).await;
    print!("{}", grid.render());

    match grid.roster() {
        Roster::Failed(message) => Err(Error::General(message.clone())),
        _ => Ok(()),
    }
}

pub async fn hls(context: &Context, action: HlsAction) -> Result<()> {
    match action {
        HlsAction::Start { camera_id } => {
            let response = context.directory.start_hls(&camera_id).await?;
            match response.hls_url {
                Some(hls_url) => println!("{camera_id}: {} ({hls_url})", response.status),
                None => println!("{camera_id}: {}", response.status),
            }
        }
        HlsAction::Stop { camera_id } => {
            let response = context.directory.stop_hls(&camera_id).await?;
            println!("{camera_id}: {}", response.status);
        }
    }

    Ok(())
}

/// Loads the roster, offering a retry after every failed fetch.
pub async fn load_with_retry(
    grid: &mut CameraGrid,
    directory: &dyn CameraDirectory,
    mut retry: impl FnMut() -> Result<bool>,
) -> Result<()> {
    loop {
        if let Roster::Failed(message) = grid.load(directory).await {
            let message = message.clone();
            print!("{}", grid.render());

            if retry()? {
                info!("Retrying camera fetch");
                continue;
            }

            warn!("Giving up on camera fetch");
            return Err(Error::General(message));
        }

        return Ok(());
    }
}

pub fn confirm_retry() -> Result<bool> {
    let answer = prompt_with_default("Retry (y/n)", "y")?;
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
