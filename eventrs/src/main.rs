use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eventrs::{
    apis::DbApi,
    init_tracing,
    report::{events_table, to_json, window_table, EventListing},
    utility::config::Config,
    utility::errors::{EventrsError, EventrsResult},
    RunnerBuilder,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "eventrs")]
#[command(about = "Detect significant intraday trading days and their 3-day windows")]
struct Args {
    /// 설정 파일 경로 (없으면 기본 설정 사용)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 분봉 DB 경로 (기본값: 설정 파일의 database.db_path)
    #[arg(long)]
    db: Option<String>,

    /// 분봉 테이블 이름 (기본값: 설정 파일의 database.table)
    #[arg(long)]
    table: Option<String>,

    /// 이 날짜 이후의 데이터만 사용 (YYYY-MM-DD, 해당 날짜 제외)
    #[arg(long, value_parser = parse_date)]
    after: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 이벤트 거래일 목록
    Events {
        #[arg(long)]
        json: bool,
    },
    /// 이벤트 하나의 3일 구간 (0부터 시작하는 인덱스)
    Window {
        index: usize,
        #[arg(long)]
        json: bool,
    },
    /// DB의 테이블 목록
    Tables,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("YYYY-MM-DD 형식이 아닙니다: {}", e))
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("❌ 실행 중 오류 발생: {}", e);
        eprintln!("오류: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> EventrsResult<()> {
    let (config, defaulted) = Config::load_or_default(&args.config)?;

    init_tracing(&config.logging.level).map_err(EventrsError::general)?;

    info!("🚀 eventrs 시작!");
    if defaulted {
        warn!(
            "⚠️ 설정 파일 {}이 없어 기본 설정으로 진행합니다. (config.example.toml 참고)",
            args.config
        );
    } else {
        info!("📁 설정 파일: {}", args.config);
    }

    let mut builder = RunnerBuilder::new(config);
    if let Some(db) = args.db {
        builder = builder.db_path(db);
    }
    if let Some(table) = args.table {
        builder = builder.table(table);
    }
    if let Some(after) = args.after {
        builder = builder.after_date(after);
    }

    match args.command {
        Command::Tables => {
            let config = builder.resolve_config()?;
            let db = DbApi::open(&config.database.db_path)?;
            for table in db.list_tables()? {
                println!("{}", table);
            }
        }
        Command::Events { json } => {
            let runner = builder.build()?;
            if json {
                let listing = EventListing {
                    symbol: runner.store().symbol(),
                    skipped_records: runner.skipped_records(),
                    trading_days: runner.report().daily_bars.len(),
                    events: runner.events(),
                };
                println!("{}", to_json(&listing)?);
            } else {
                print!("{}", events_table(runner.events()));
                if runner.skipped_records() > 0 {
                    println!("(건너뛴 레코드: {}개)", runner.skipped_records());
                }
            }
        }
        Command::Window { index, json } => {
            let runner = builder.build()?;
            let window = runner.window(index)?;
            if json {
                println!("{}", to_json(&window)?);
            } else {
                print!("{}", window_table(runner.store().symbol(), &window));
            }
        }
    }

    info!("🏁 eventrs 종료");
    Ok(())
}
