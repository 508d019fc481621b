use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// tracing 초기화 함수
/// JSON 구조화 로그를 stderr로 출력하며, RUST_LOG가 없으면 `default_level`을 사용합니다.
pub fn init_tracing(default_level: &str) -> Result<(), String> {
    // 기존 log! 매크로 호환
    LogTracer::init().map_err(|e| format!("로그 시스템 초기화 실패: {}", e))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 표준 출력은 결과(JSON/표) 전용
    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .with_target(true),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("로그 시스템 초기화 실패: {}", e))?;

    Ok(())
}

pub mod apis;
pub mod detector;
pub mod indicators;
pub mod report;
pub mod runner;
pub mod store;
pub mod types;
pub mod utility;
pub mod window;

pub use detector::{DetectionReport, EventDetector};
pub use runner::{Runner, RunnerBuilder};
pub use store::BarStore;
pub use utility::errors::{EventrsError, EventrsResult};
