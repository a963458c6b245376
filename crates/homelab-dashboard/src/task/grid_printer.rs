use std::{
    io::{self, Write},
    time::Duration,
};

use tokio::time::interval;
use tracing::info;

use crate::{Result, grid::CameraGrid};

/// Redraws the grid on a fixed interval.
pub struct GridPrinter {
    refresh_interval: Duration,
}

impl GridPrinter {
    pub fn new(refresh_interval: Duration) -> Self {
        Self { refresh_interval }
    }

    pub async fn run(&self, grid: &CameraGrid) -> Result<()> {
        info!(interval = ?self.refresh_interval, "Starting Grid Printer");

        let mut interval = interval(self.refresh_interval);

        loop {
            interval.tick().await;
            self.print(grid, &mut io::stdout().lock())?;
        }
    }

    fn print(&self, grid: &CameraGrid, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", grid.render())?;
        out.flush()?;
        Ok(())
    }
}
