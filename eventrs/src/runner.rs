use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

use crate::apis::{DbApi, LoadReport};
use crate::detector::{DetectionReport, EventDetector};
use crate::indicators::IndicatorSeries;
use crate::store::BarStore;
use crate::types::bar::EventDay;
use crate::utility::config::Config;
use crate::utility::errors::{EventrsError, EventrsResult};
use crate::window::{render_or_placeholder, select_event, EventWindow};

/// 한 번의 데이터 로드에 대한 탐지 결과와 분봉 저장소를 소유하는 구조체
///
/// 분봉은 로드 시점에 한 번만 읽고, 이후 구간 요청은 모두 이 값을 빌려 계산한다.
pub struct Runner {
    store: BarStore,
    skipped: usize,
    indicators: IndicatorSeries,
    report: DetectionReport,
}

impl Runner {
    /// 설정의 DB에서 분봉을 읽어 탐지까지 수행
    pub fn new(config: Config) -> EventrsResult<Self> {
        let db = DbApi::open(&config.database.db_path)?;
        let LoadReport { store, skipped, .. } =
            db.load_bars(&config.database, config.detection.after_date)?;
        Ok(Self::from_store(config, store, skipped))
    }

    /// 이미 메모리에 있는 분봉으로 생성
    pub fn from_store(config: Config, store: BarStore, skipped: usize) -> Self {
        let indicators = IndicatorSeries::compute(
            store.bars(),
            config.chart.ema_span,
            config.chart.volume_color_rule,
        );
        let report = EventDetector::new(config.detection).detect(store.bars());

        info!(
            "🎯 [Runner::from_store] {}: 분봉 {}개, 거래일 {}일, 이벤트 {}개",
            store.symbol(),
            store.len(),
            report.daily_bars.len(),
            report.events.len()
        );

        Runner {
            store,
            skipped,
            indicators,
            report,
        }
    }

    pub fn store(&self) -> &BarStore {
        &self.store
    }

    pub fn report(&self) -> &DetectionReport {
        &self.report
    }

    pub fn events(&self) -> &[EventDay] {
        &self.report.events
    }

    /// 로드 단계와 탐지 단계에서 제외된 레코드 수의 합
    pub fn skipped_records(&self) -> usize {
        self.skipped + self.report.ignored_bars
    }

    /// 슬라이더 인덱스에 해당하는 3일 구간
    ///
    /// 인덱스가 범위를 벗어나면 오류, 구간 계산 실패는 빈 차트로 대체한다.
    pub fn window(&self, index: usize) -> EventrsResult<EventWindow> {
        let event = select_event(&self.report.events, index).ok_or_else(|| {
            EventrsError::not_found(format!(
                "이벤트 #{} (전체 {}개)",
                index,
                self.report.events.len()
            ))
        })?;
        Ok(render_or_placeholder(
            &self.store,
            &self.indicators,
            self.report.calender(),
            event,
        ))
    }
}

/// 설정 파일 값 위에 명령행 값을 덮어쓰는 Builder
pub struct RunnerBuilder {
    config: Config,
    db_path: Option<PathBuf>,
    table: Option<String>,
    after_date: Option<NaiveDate>,
}

impl RunnerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            db_path: None,
            table: None,
            after_date: None,
        }
    }

    pub fn db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn after_date(mut self, date: NaiveDate) -> Self {
        self.after_date = Some(date);
        self
    }

    /// 덮어쓴 설정 (검증 포함)
    pub fn resolve_config(self) -> EventrsResult<Config> {
        let mut config = self.config;
        if let Some(path) = self.db_path {
            config.database.db_path = path.to_string_lossy().into_owned();
        }
        if let Some(table) = self.table {
            config.database.table = table;
        }
        if let Some(date) = self.after_date {
            config.detection.after_date = Some(date);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn build(self) -> EventrsResult<Runner> {
        Runner::new(self.resolve_config()?)
    }
}
