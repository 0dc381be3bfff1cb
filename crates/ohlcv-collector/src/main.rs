//! Full-history OHLCV backfill CLI.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ohlcv_collector::modules::{
    self, FetchOptions, FetchScheduler, HistoryFetcher, ScheduleOptions,
};
use ohlcv_collector::CollectorConfig;
use ohlcv_core::{init_logging, Granularity, LogConfig, LogFormat};
use ohlcv_data::{
    ChartApiClient, ChartPageDirectory, HistorySource, MemorySeriesStore, PgSeriesStore,
    SeriesStore, SymbolDirectory,
};

#[derive(Parser)]
#[command(name = "ohlcv-collector")]
#[command(about = "Full-history OHLCV backfill collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 전체 과거 캔들 수집 및 저장
    Run {
        /// 특정 심볼만 수집 (쉼표로 구분, symbol_id 또는 거래쌍)
        #[arg(long)]
        symbols: Option<String>,

        /// 특정 거래소만 수집 (쉼표로 구분)
        #[arg(long)]
        exchanges: Option<String>,

        /// 수집할 단위 (쉼표로 구분, 예: "1m,1h,1d", 기본: 전체)
        #[arg(long)]
        granularities: Option<String>,

        /// DB 대신 메모리 저장소 사용
        #[arg(long)]
        dry_run: bool,
    },

    /// 수집 대상 심볼 목록 출력
    ListSymbols {
        /// 특정 거래소만 출력 (쉼표로 구분)
        #[arg(long)]
        exchanges: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::new(cli.log_level.clone()).with_format(cli.log_format))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("OHLCV Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        base_url = %config.chart.base_url,
        market_id = %config.chart.market_id,
        batch_size = config.schedule.batch_size,
        "설정 로드 완료"
    );

    let client = ChartApiClient::new(config.chart.clone())?;
    let directory = ChartPageDirectory::new(client.clone());

    match cli.command {
        Commands::Run {
            symbols,
            exchanges,
            granularities,
            dry_run,
        } => {
            let granularities = match granularities {
                Some(list) => Granularity::parse_list(&list).map_err(anyhow::Error::msg)?,
                None => Granularity::ALL.to_vec(),
            };

            let targets = discover(&directory, symbols.as_deref(), exchanges.as_deref()).await?;
            if targets.is_empty() {
                tracing::warn!("수집할 심볼이 없습니다");
                return Ok(());
            }

            let store: Arc<dyn SeriesStore> = if dry_run {
                tracing::info!("dry-run: 메모리 저장소 사용");
                Arc::new(MemorySeriesStore::new())
            } else {
                let url = config.require_database_url()?;
                Arc::new(
                    PgSeriesStore::connect(url, config.database_max_connections)
                        .await
                        .context("데이터베이스 연결 실패")?,
                )
            };

            let source: Arc<dyn HistorySource> = Arc::new(client);
            let fetcher = HistoryFetcher::new(source, FetchOptions::from(&config.fetch));
            let scheduler = FetchScheduler::new(
                fetcher,
                store,
                ScheduleOptions::new(&config.schedule, granularities),
            );

            let stats = scheduler.run(&targets).await?;
            stats.log_summary("OHLCV 이력 수집");
        }
        Commands::ListSymbols { exchanges } => {
            let targets = discover(&directory, None, exchanges.as_deref()).await?;
            for symbol in &targets {
                println!(
                    "{}\t{}\t{}\t{}",
                    symbol.symbol_id,
                    symbol.exchange,
                    symbol.pair,
                    symbol.table_name()
                );
            }
            tracing::info!(count = targets.len(), "심볼 목록 출력 완료");
        }
    }

    Ok(())
}

/// 심볼 목록을 조회하고 CLI 필터를 적용합니다.
async fn discover(
    directory: &dyn SymbolDirectory,
    symbols: Option<&str>,
    exchanges: Option<&str>,
) -> anyhow::Result<Vec<ohlcv_core::SymbolRef>> {
    let all = directory
        .list_symbols()
        .await
        .with_context(|| format!("{} 심볼 목록 조회 실패", directory.name()))?;

    let symbol_filter = symbols.map(modules::parse_csv).unwrap_or_default();
    let exchange_filter = exchanges.map(modules::parse_csv).unwrap_or_default();
    let selected = modules::select_symbols(all, &symbol_filter, &exchange_filter);

    tracing::info!(
        directory = directory.name(),
        selected = selected.len(),
        "수집 대상 선택 완료"
    );
    Ok(selected)
}
