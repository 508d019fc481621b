//! 유의미한 거래일(이벤트) 탐지
//!
//! 1. 분봉을 날짜별로 묶어 일봉(고가/저가/범위) 생성
//! 2. 일중 범위가 기준 이상인 날 표시
//! 3. V자 반전 분봉이 있는 날 표시 (설정으로 끌 수 있음)
//! 4. 날짜 기준으로 합치고 정렬
//! 5. 각 이벤트의 직전/직후 거래일 연결 (없으면 None)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::types::bar::{DailyBar, EventDay, EventReason, IntradayBar};
use crate::utility::config::{DetectionConfig, VShapeConfig};
use crate::utility::trading_calender::TradingCalender;

/// V자 판정을 어느 단위로 할지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VShapeScope {
    /// 분봉 하나하나에 대해 판정
    #[default]
    Bar,
    /// 하루 전체(첫 시가, 최고가, 최저가, 마지막 종가)로 판정
    Session,
}

/// 탐지 결과
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub daily_bars: Vec<DailyBar>,
    /// 날짜 오름차순, 날짜 중복 없음
    pub events: Vec<EventDay>,
    /// 값이 유한하지 않아 제외한 분봉 수
    pub ignored_bars: usize,
    calender: TradingCalender,
}

impl DetectionReport {
    pub fn calender(&self) -> &TradingCalender {
        &self.calender
    }

    pub fn previous_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.calender.previous_trading_day(date)
    }

    pub fn next_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.calender.next_trading_day(date)
    }

    pub fn event_on(&self, date: NaiveDate) -> Option<&EventDay> {
        self.events
            .binary_search_by_key(&date, |e| e.date)
            .ok()
            .map(|i| &self.events[i])
    }

    pub fn daily_bar(&self, date: NaiveDate) -> Option<&DailyBar> {
        self.daily_bars
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.daily_bars[i])
    }
}

pub struct EventDetector {
    config: DetectionConfig,
}

impl EventDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// 분봉 목록에서 이벤트 거래일을 탐지
    ///
    /// 같은 입력에 대해 항상 같은 결과를 낸다. 거래일이 2일 미만이면
    /// 이벤트 목록은 비어 있다.
    pub fn detect(&self, bars: &[IntradayBar]) -> DetectionReport {
        let valid: Cow<[IntradayBar]> = if bars.iter().all(IntradayBar::is_finite) {
            Cow::Borrowed(bars)
        } else {
            Cow::Owned(bars.iter().filter(|b| b.is_finite()).cloned().collect())
        };
        let ignored_bars = bars.len() - valid.len();
        if ignored_bars > 0 {
            warn!(
                "⚠️ [EventDetector::detect] 유효하지 않은 분봉 {}개 제외",
                ignored_bars
            );
        }

        let daily_bars = aggregate_daily(&valid);
        let calender = TradingCalender::from_dates(daily_bars.iter().map(|d| d.date));

        if daily_bars.len() < 2 {
            debug!(
                "🔍 [EventDetector::detect] 거래일 {}개 - 탐지 생략",
                daily_bars.len()
            );
            return DetectionReport {
                daily_bars,
                events: Vec::new(),
                ignored_bars,
                calender,
            };
        }

        let mut flagged: BTreeMap<NaiveDate, BTreeSet<EventReason>> = BTreeMap::new();

        let mut range_count = 0;
        for daily in &daily_bars {
            if daily.range >= self.config.range_threshold {
                flagged.entry(daily.date).or_default().insert(EventReason::Range);
                range_count += 1;
            }
        }

        let mut v_shape_count = 0;
        let v_shape = &self.config.v_shape;
        if v_shape.enabled {
            match v_shape.scope {
                VShapeScope::Bar => {
                    for bar in valid.iter() {
                        if let Some(reason) =
                            classify_v_shape(bar.open, bar.high, bar.low, bar.close, v_shape)
                        {
                            flagged.entry(bar.date()).or_default().insert(reason);
                            v_shape_count += 1;
                        }
                    }
                }
                VShapeScope::Session => {
                    for daily in &daily_bars {
                        if let Some(reason) = classify_v_shape(
                            daily.open,
                            daily.high,
                            daily.low,
                            daily.close,
                            v_shape,
                        ) {
                            flagged.entry(daily.date).or_default().insert(reason);
                            v_shape_count += 1;
                        }
                    }
                }
            }
        }

        let events: Vec<EventDay> = flagged
            .into_iter()
            .filter_map(|(date, reasons)| {
                let index = daily_bars.binary_search_by_key(&date, |d| d.date).ok()?;
                Some(EventDay {
                    date,
                    range: daily_bars[index].range,
                    reasons: reasons.into_iter().collect(),
                    previous_day: calender.previous_trading_day(date),
                    next_day: calender.next_trading_day(date),
                })
            })
            .collect();

        info!(
            "📊 [EventDetector::detect] 거래일 {}개, 이벤트 {}개 (범위 기준 {}일, V자 판정 {}건)",
            daily_bars.len(),
            events.len(),
            range_count,
            v_shape_count
        );

        DetectionReport {
            daily_bars,
            events,
            ignored_bars,
            calender,
        }
    }
}

/// 분봉을 날짜별 일봉으로 집계 (날짜 오름차순)
pub fn aggregate_daily(bars: &[IntradayBar]) -> Vec<DailyBar> {
    let is_sorted = bars.windows(2).all(|w| w[0].datetime <= w[1].datetime);
    let ordered: Cow<[IntradayBar]> = if is_sorted {
        Cow::Borrowed(bars)
    } else {
        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|b| b.datetime);
        Cow::Owned(sorted)
    };

    ordered
        .chunk_by(|a, b| a.date() == b.date())
        .filter_map(|chunk| DailyBar::from_bars(chunk[0].date(), chunk))
        .collect()
}

/// V자 판정
/// - 양봉이면서 시가 대비 저가가 `move_threshold` 이상 낮고, 종가가 고가에서 `tolerance` 이내
/// - 음봉이면서 시가 대비 고가가 `move_threshold` 이상 높고, 종가가 저가에서 `tolerance` 이내
pub fn classify_v_shape(
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    config: &VShapeConfig,
) -> Option<EventReason> {
    let body = close - open;
    if body > 0.0 && open - low >= config.move_threshold && high - close <= config.tolerance {
        Some(EventReason::VShapeRecovery)
    } else if body < 0.0 && high - open >= config.move_threshold && close - low <= config.tolerance
    {
        Some(EventReason::VShapeReversal)
    } else {
        None
    }
}
