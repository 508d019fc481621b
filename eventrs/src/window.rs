//! 선택한 이벤트의 3일 구간(직전 거래일 ~ 직후 거래일) 데이터
//!
//! 차트 콜백 대신 (이벤트, 분봉 저장소) → 렌더링용 구간으로 바꾸는 순수 함수로 구성한다.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::indicators::{IndicatorSeries, VolumeColor};
use crate::store::BarStore;
use crate::types::bar::EventDay;
use crate::utility::errors::{EventrsError, EventrsResult};
use crate::utility::trading_calender::TradingCalender;

/// 차트 한 점 (캔들 + AD 라인 + EMA + 거래량)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowPoint {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ad_line_weighted: f64,
    pub ad_line_ema: f64,
    pub volume: f64,
    pub volume_color: VolumeColor,
}

/// 렌더링용 구간
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWindow {
    pub event: EventDay,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// 직전 거래일이 없어 이벤트 날짜부터 시작
    pub clamped_start: bool,
    /// 직후 거래일이 없어 이벤트 날짜에서 끝남
    pub clamped_end: bool,
    /// 구간 안에서 데이터가 없는 날짜 (주말/휴장일)
    pub missing_dates: Vec<NaiveDate>,
    pub points: Vec<WindowPoint>,
    /// 오류로 빈 차트를 대신 보여주는 경우
    pub placeholder: bool,
}

impl EventWindow {
    /// 빈 차트
    pub fn placeholder(event: &EventDay) -> Self {
        EventWindow {
            event: event.clone(),
            from: event.date,
            to: event.date,
            clamped_start: false,
            clamped_end: false,
            missing_dates: Vec::new(),
            points: Vec::new(),
            placeholder: true,
        }
    }

    pub fn title(&self, symbol: &str) -> String {
        format!(
            "{} from {} to {}",
            symbol,
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }
}

/// 슬라이더 인덱스로 이벤트 선택 (범위 밖이면 None)
pub fn select_event(events: &[EventDay], index: usize) -> Option<&EventDay> {
    events.get(index)
}

/// 이벤트의 3일 구간 계산
///
/// `indicators`는 `store` 전체 분봉에 대해 계산된 값이어야 하고, `calender`는
/// 탐지 단계에서 만든 같은 분봉의 거래일 캘린더다.
/// 한쪽 이웃 거래일이 없으면 이벤트 날짜로 잘라내고 표시만 남긴다.
pub fn event_window(
    store: &BarStore,
    indicators: &IndicatorSeries,
    calender: &TradingCalender,
    event: &EventDay,
) -> EventrsResult<EventWindow> {
    if indicators.len() != store.len() {
        return Err(EventrsError::validation(
            "indicators",
            format!(
                "지표 길이({})와 분봉 수({})가 다릅니다",
                indicators.len(),
                store.len()
            ),
        ));
    }

    let from = event.previous_day.unwrap_or(event.date);
    let to = event.next_day.unwrap_or(event.date);
    if from > event.date || to < event.date {
        return Err(EventrsError::validation(
            "event",
            format!(
                "이웃 거래일 순서가 잘못되었습니다: {} / {:?} / {:?}",
                event.date, event.previous_day, event.next_day
            ),
        ));
    }

    let range = store.index_range(from, to);
    let bars = &store.bars()[range.clone()];
    if !bars.iter().any(|b| b.date() == event.date) {
        return Err(EventrsError::not_found(format!(
            "{} 이벤트 날짜의 분봉",
            event.date
        )));
    }

    let points = bars
        .iter()
        .zip(&indicators.ema[range.clone()])
        .zip(&indicators.volume_colors[range])
        .map(|((bar, &ema), &color)| WindowPoint {
            datetime: bar.datetime,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            ad_line_weighted: bar.ad_line_weighted,
            ad_line_ema: ema,
            volume: bar.volume,
            volume_color: color,
        })
        .collect::<Vec<_>>();

    let missing_dates = calender.missing_dates_in_range(from, to);

    debug!(
        "🔍 [window::event_window] {}: {} ~ {} 분봉 {}개",
        event.date,
        from,
        to,
        points.len()
    );

    Ok(EventWindow {
        event: event.clone(),
        from,
        to,
        clamped_start: event.previous_day.is_none(),
        clamped_end: event.next_day.is_none(),
        missing_dates,
        points,
        placeholder: false,
    })
}

/// 구간 계산 중 문제가 생기면 세션을 끝내지 않고 빈 차트로 대체
pub fn render_or_placeholder(
    store: &BarStore,
    indicators: &IndicatorSeries,
    calender: &TradingCalender,
    event: &EventDay,
) -> EventWindow {
    match event_window(store, indicators, calender, event) {
        Ok(window) => window,
        Err(e) => {
            warn!(
                "⚠️ [window::render_or_placeholder] {} 구간 생성 실패, 빈 차트로 대체: {}",
                event.date, e
            );
            EventWindow::placeholder(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectionReport, EventDetector};
    use crate::indicators::VolumeColorRule;
    use crate::types::bar::{EventReason, IntradayBar};
    use crate::utility::config::DetectionConfig;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("Invalid test date")
    }

    fn bar(date: NaiveDate, minute: u32, range: f64) -> IntradayBar {
        IntradayBar {
            datetime: NaiveDateTime::new(
                date,
                NaiveTime::from_hms_opt(9, 15 + minute, 0).expect("valid time"),
            ),
            open: 35_000.0,
            high: 35_000.0 + range,
            low: 35_000.0,
            close: 35_000.0 + minute as f64,
            ad_line_weighted: minute as f64,
            volume: 100.0,
        }
    }

    /// 1/4, 1/5(이벤트), 1/6, 1/8(이벤트), 1/11(이벤트, 마지막) - 하루 2개 분봉
    fn store() -> BarStore {
        let mut bars = Vec::new();
        for (date, range) in [
            (d(2021, 1, 4), 100.0),
            (d(2021, 1, 5), 600.0),
            (d(2021, 1, 6), 100.0),
            (d(2021, 1, 8), 600.0),
            (d(2021, 1, 11), 600.0),
        ] {
            bars.push(bar(date, 0, range));
            bars.push(bar(date, 1, range));
        }
        BarStore::new("banknifty", bars)
    }

    fn setup() -> (BarStore, IndicatorSeries, DetectionReport) {
        let store = store();
        let indicators = IndicatorSeries::compute(store.bars(), 9, VolumeColorRule::PreviousClose);
        let report = EventDetector::new(DetectionConfig::default()).detect(store.bars());
        (store, indicators, report)
    }

    #[test]
    fn test_three_day_window() {
        let (store, indicators, report) = setup();
        let event = select_event(&report.events, 0).expect("first event");
        assert_eq!(event.date, d(2021, 1, 5));
        assert_eq!(event.reasons, vec![EventReason::Range]);

        let window = event_window(&store, &indicators, report.calender(), event).expect("window");
        assert_eq!(window.from, d(2021, 1, 4));
        assert_eq!(window.to, d(2021, 1, 6));
        assert_eq!(window.points.len(), 6);
        assert!(!window.clamped_start && !window.clamped_end);
        assert!(window.missing_dates.is_empty());
        assert!(!window.placeholder);
        assert_eq!(window.title("BankNifty"), "BankNifty from 2021-01-04 to 2021-01-06");

        // EMA는 전체 구간 기준 값을 그대로 잘라 쓴다
        assert_eq!(window.points[0].ad_line_ema, indicators.ema[0]);
        assert_eq!(window.points[5].ad_line_ema, indicators.ema[5]);
    }

    #[test]
    fn test_window_reports_gaps() {
        let (store, indicators, report) = setup();
        let event = select_event(&report.events, 1).expect("second event");
        assert_eq!(event.date, d(2021, 1, 8));

        let window = event_window(&store, &indicators, report.calender(), event).expect("window");
        assert_eq!(window.from, d(2021, 1, 6));
        assert_eq!(window.to, d(2021, 1, 11));
        assert_eq!(window.points.len(), 6);
        assert_eq!(
            window.missing_dates,
            vec![d(2021, 1, 7), d(2021, 1, 9), d(2021, 1, 10)]
        );
    }

    #[test]
    fn test_missing_dates_follow_detection_calender() {
        // 1/7에는 유효하지 않은 분봉만 있으므로 탐지 기준으로는 거래일이 아니다
        let mut bars = store().bars().to_vec();
        let mut broken = bar(d(2021, 1, 7), 0, 100.0);
        broken.high = f64::NAN;
        bars.push(broken);
        let store = BarStore::new("banknifty", bars);
        let indicators = IndicatorSeries::compute(store.bars(), 9, VolumeColorRule::PreviousClose);
        let report = EventDetector::new(DetectionConfig::default()).detect(store.bars());
        assert_eq!(report.ignored_bars, 1);

        let event = select_event(&report.events, 1).expect("second event");
        assert_eq!(event.previous_day, Some(d(2021, 1, 6)));

        let window = event_window(&store, &indicators, report.calender(), event).expect("window");
        assert_eq!(
            window.missing_dates,
            vec![d(2021, 1, 7), d(2021, 1, 9), d(2021, 1, 10)]
        );
    }

    #[test]
    fn test_window_clamped_at_last_day() {
        let (store, indicators, report) = setup();
        let event = select_event(&report.events, 2).expect("last event");
        assert_eq!(event.next_day, None);

        let window = event_window(&store, &indicators, report.calender(), event).expect("window");
        assert!(window.clamped_end);
        assert!(!window.clamped_start);
        assert_eq!(window.to, d(2021, 1, 11));
        assert_eq!(window.points.len(), 4);
    }

    #[test]
    fn test_select_out_of_range() {
        let (_, _, report) = setup();
        assert_eq!(report.events.len(), 3);
        assert!(select_event(&report.events, 3).is_none());
    }

    #[test]
    fn test_placeholder_on_error() {
        let (store, _, report) = setup();
        let event = &report.events[0];
        // 다른 길이의 지표를 넘기면 오류 -> 빈 차트
        let stale = IndicatorSeries::default();
        assert!(event_window(&store, &stale, report.calender(), event).is_err());

        let window = render_or_placeholder(&store, &stale, report.calender(), event);
        assert!(window.placeholder);
        assert!(window.points.is_empty());
        assert_eq!(window.event.date, d(2021, 1, 5));
    }

    #[test]
    fn test_event_without_bars_is_not_found() {
        let (store, indicators, report) = setup();
        let ghost = EventDay {
            date: d(2021, 1, 7),
            range: 0.0,
            reasons: vec![EventReason::Range],
            previous_day: Some(d(2021, 1, 6)),
            next_day: Some(d(2021, 1, 8)),
        };
        assert!(matches!(
            event_window(&store, &indicators, report.calender(), &ghost),
            Err(EventrsError::NotFound { .. })
        ));
        assert!(render_or_placeholder(&store, &indicators, report.calender(), &ghost).placeholder);
    }
}
