use serde::Serialize;
use std::fmt::Write as _;

use crate::types::bar::EventDay;
use crate::utility::errors::EventrsResult;
use crate::window::EventWindow;

/// 이벤트 목록 JSON 출력용
#[derive(Debug, Serialize)]
pub struct EventListing<'a> {
    pub symbol: &'a str,
    pub skipped_records: usize,
    pub trading_days: usize,
    pub events: &'a [EventDay],
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 이벤트 목록 텍스트 표
pub fn events_table(events: &[EventDay]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<10}  {:>9}  {:<10}  {:<10}  {}",
        "#", "date", "range", "previous", "next", "reasons"
    );

    for (i, event) in events.iter().enumerate() {
        let reasons = event
            .reasons
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(
            out,
            "{:>5}  {:<10}  {:>9.2}  {:<10}  {:<10}  {}",
            i,
            event.date.format("%Y-%m-%d"),
            event.range,
            date_or_dash(event.previous_day),
            date_or_dash(event.next_day),
            reasons
        );
    }
    out
}

/// 구간 텍스트 요약 (분봉 한 줄씩)
pub fn window_table(symbol: &str, window: &EventWindow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", window.title(symbol));

    if window.placeholder {
        let _ = writeln!(out, "(표시할 데이터가 없습니다)");
        return out;
    }
    if window.clamped_start {
        let _ = writeln!(out, "(직전 거래일 없음: 이벤트 날짜부터 표시)");
    }
    if window.clamped_end {
        let _ = writeln!(out, "(직후 거래일 없음: 이벤트 날짜까지 표시)");
    }
    if !window.missing_dates.is_empty() {
        let missing = window
            .missing_dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "missing: {}", missing);
    }

    let _ = writeln!(
        out,
        "{:<19}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>12}  {}",
        "datetime", "open", "high", "low", "close", "ad_line", "ema", "volume", "color"
    );
    for p in &window.points {
        let _ = writeln!(
            out,
            "{:<19}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>12.0}  {}",
            p.datetime.format("%Y-%m-%d %H:%M:%S"),
            p.open,
            p.high,
            p.low,
            p.close,
            p.ad_line_weighted,
            p.ad_line_ema,
            p.volume,
            p.volume_color.css()
        );
    }
    out
}

pub fn to_json<T: Serialize>(value: &T) -> EventrsResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
