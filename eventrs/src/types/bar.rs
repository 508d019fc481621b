use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 분봉 한 개 (DB에서 읽은 후 변경되지 않음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayBar {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// 가중 AD 라인 값
    pub ad_line_weighted: f64,
    pub volume: f64,
}

impl IntradayBar {
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    /// 모든 가격/보조 값이 유한한지 확인
    pub fn is_finite(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.ad_line_weighted,
            self.volume,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// 날짜별로 집계한 일봉
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    /// 첫 분봉의 시가
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// 마지막 분봉의 종가
    pub close: f64,
    pub range: f64,
    pub bar_count: usize,
}

impl DailyBar {
    /// 같은 날짜의 분봉들로 일봉 생성 (비어 있으면 None)
    pub fn from_bars(date: NaiveDate, bars: &[IntradayBar]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;

        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        Some(DailyBar {
            date,
            open: first.open,
            high,
            low,
            close: last.close,
            range: high - low,
            bar_count: bars.len(),
        })
    }
}

/// 이벤트로 판정된 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventReason {
    /// 일중 범위가 기준 이상
    Range,
    /// 급락 후 회복 (양봉, 고가 근처 마감)
    VShapeRecovery,
    /// 급등 후 반락 (음봉, 저가 근처 마감)
    VShapeReversal,
}

impl EventReason {
    pub fn label(&self) -> &'static str {
        match self {
            EventReason::Range => "range",
            EventReason::VShapeRecovery => "v-recovery",
            EventReason::VShapeReversal => "v-reversal",
        }
    }
}

/// 유의미한 거래일
///
/// `previous_day`/`next_day`는 알려진 거래일 중 가장 가까운 날짜이며,
/// 경계(첫/마지막 거래일)에서는 `None`이다. 이벤트 날짜 자신으로 대체하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDay {
    pub date: NaiveDate,
    pub range: f64,
    pub reasons: Vec<EventReason>,
    pub previous_day: Option<NaiveDate>,
    pub next_day: Option<NaiveDate>,
}

impl EventDay {
    pub fn has_reason(&self, reason: EventReason) -> bool {
        self.reasons.contains(&reason)
    }
}
