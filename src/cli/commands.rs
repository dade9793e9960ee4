use crate::cli::args::{BatchType, Cli, Commands};
use crate::client::Awhere;
use crate::config::AwhereConfig;
use crate::locations::{clamp_end_date, load_woredas};
use crate::output::csv::{batch_file_name, location_file_name, write_result_csv};
use crate::output::ndjson::write_weather_json;
use crate::types::location::{LatLon, Woreda};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Pull {
            woreda_latlon_path,
            output_data_path,
            start_date,
            end_date,
            batch_type,
            key,
            secret,
            poll_interval,
            max_polls,
            concurrency,
        } => {
            let config = AwhereConfig::builder()
                .key(key)
                .secret(secret)
                .poll_interval(Duration::from_secs(poll_interval))
                .maybe_max_polls(max_polls)
                .concurrency(concurrency)
                .build();
            let client = Awhere::new(config);
            let end_date = clamp_end_date(end_date, Local::now().date_naive());

            let woredas = task::spawn_blocking(move || load_woredas(&woreda_latlon_path))
                .await??;
            tokio::fs::create_dir_all(&output_data_path)
                .await
                .with_context(|| format!("creating {}", output_data_path.display()))?;

            let cancel = cancel_on_ctrl_c();
            let pull = Pull {
                client: &client,
                output_dir: &output_data_path,
                start_date,
                end_date,
                cancel,
            };
            let written = match batch_type {
                BatchType::Batch => pull.batch(&woredas).await?,
                BatchType::Single => pull.single(&woredas).await?,
            };
            println!("Weather data written to {}", written.display());
        }

        Commands::ToJson {
            woreda_mapped_path,
            weather_data_dir,
            output_dir,
        } => {
            let path = write_weather_json(&woreda_mapped_path, &weather_data_dir, &output_dir)
                .await
                .with_context(|| format!("exporting {}", weather_data_dir.display()))?;
            println!("Weather JSON written to {}", path.display());
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding jobs");
            guard.cancel();
        }
    });
    cancel
}

struct Pull<'a> {
    client: &'a Awhere,
    output_dir: &'a Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
    cancel: CancellationToken,
}

impl Pull<'_> {
    /// All woredas in one run and one CSV.
    async fn batch(&self, woredas: &[Woreda]) -> anyhow::Result<PathBuf> {
        let locations: Vec<LatLon> = woredas.iter().map(|w| w.lat_lon).collect();
        let labels: Vec<String> = woredas.iter().map(|w| w.geo_key.clone()).collect();

        let result = self
            .client
            .fetch_data_multiple()
            .locations(&locations)
            .labels(&labels)
            .start_date(self.start_date)
            .end_date(self.end_date)
            .cancel(self.cancel.clone())
            .call()
            .await?;

        let path = self
            .output_dir
            .join(batch_file_name(self.start_date, self.end_date));
        write_result_csv(&result, &path).await?;
        info!("Wrote {} rows to {}", result.records.len(), path.display());
        Ok(path)
    }

    /// One batch job and one CSV per woreda.
    async fn single(&self, woredas: &[Woreda]) -> anyhow::Result<PathBuf> {
        for (i, woreda) in woredas.iter().enumerate() {
            info!("Woreda {} of {}: {}", i + 1, woredas.len(), woreda.geo_key);
            let result = self
                .client
                .fetch_data_single()
                .location(woreda.lat_lon)
                .label(&woreda.geo_key)
                .start_date(self.start_date)
                .end_date(self.end_date)
                .cancel(self.cancel.clone())
                .call()
                .await
                .with_context(|| format!("pulling {}", woreda.geo_key))?;

            let path = self.output_dir.join(location_file_name(&woreda.geo_key));
            write_result_csv(&result, &path).await?;
        }
        Ok(self.output_dir.to_path_buf())
    }
}
