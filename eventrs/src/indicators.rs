//! 차트 보조 패널용 지표
//!
//! - AD 라인의 EMA (첫 값으로 초기화, 평활 계수 K=2/(n+1))
//! - 거래량 막대 색상 (직전 종가 비교 또는 같은 봉 시가 비교)

use serde::{Deserialize, Serialize};

use crate::types::bar::IntradayBar;

/// 거래량 색상 결정 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeColorRule {
    /// 종가 >= 직전 분봉 종가 이면 상승
    #[default]
    PreviousClose,
    /// 종가 >= 같은 분봉 시가 이면 상승
    SameBarOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeColor {
    Up,
    Down,
}

impl VolumeColor {
    /// 차트 라이브러리에 넘길 색상 이름
    pub fn css(&self) -> &'static str {
        match self {
            VolumeColor::Up => "green",
            VolumeColor::Down => "red",
        }
    }
}

/// EMA 시계열 (입력과 같은 길이)
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema_series = Vec::with_capacity(values.len());

    // 첫 값으로 초기화
    let mut ema = values[0];
    ema_series.push(ema);

    for &value in &values[1..] {
        ema = value * k + ema * (1.0 - k);
        ema_series.push(ema);
    }

    ema_series
}

/// 분봉별 AD 라인 EMA
pub fn ad_line_ema(bars: &[IntradayBar], span: usize) -> Vec<f64> {
    let ad_line: Vec<f64> = bars.iter().map(|b| b.ad_line_weighted).collect();
    ema_series(&ad_line, span)
}

/// 분봉별 거래량 색상
/// 직전 종가 규칙에서 첫 분봉은 비교 대상이 없으므로 상승으로 둔다
pub fn volume_colors(bars: &[IntradayBar], rule: VolumeColorRule) -> Vec<VolumeColor> {
    let up_if = |cond: bool| if cond { VolumeColor::Up } else { VolumeColor::Down };

    match rule {
        VolumeColorRule::PreviousClose => bars
            .iter()
            .enumerate()
            .map(|(i, bar)| match i.checked_sub(1).map(|p| &bars[p]) {
                Some(prev) => up_if(bar.close >= prev.close),
                None => VolumeColor::Up,
            })
            .collect(),
        VolumeColorRule::SameBarOpen => bars.iter().map(|b| up_if(b.close >= b.open)).collect(),
    }
}

/// 전체 분봉에 대해 미리 계산한 보조 지표
///
/// EMA와 직전 종가 비교는 앞선 분봉에 의존하므로 전체 구간에서 한 번 계산한 뒤
/// 윈도우에서 잘라 쓴다.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub ema: Vec<f64>,
    pub volume_colors: Vec<VolumeColor>,
}

impl IndicatorSeries {
    pub fn compute(bars: &[IntradayBar], span: usize, rule: VolumeColorRule) -> Self {
        Self {
            ema: ad_line_ema(bars, span),
            volume_colors: volume_colors(bars, rule),
        }
    }

    pub fn len(&self) -> usize {
        self.ema.len().min(self.volume_colors.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn bar(minute: u32, open: f64, close: f64, ad: f64) -> IntradayBar {
        IntradayBar {
            datetime: NaiveDateTime::parse_from_str(
                &format!("2021-01-04 09:{:02}:00", minute),
                "%Y-%m-%d %H:%M:%S",
            )
            .expect("valid test datetime"),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            ad_line_weighted: ad,
            volume: 100.0,
        }
    }

    #[test]
    fn test_ema_series() {
        let values = [10.0, 20.0, 30.0];
        let ema = ema_series(&values, 3);
        // K = 0.5 -> 10, 15, 22.5
        assert_eq!(ema.len(), 3);
        assert!((ema[0] - 10.0).abs() < 1e-9);
        assert!((ema[1] - 15.0).abs() < 1e-9);
        assert!((ema[2] - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_ema_span_one_is_identity() {
        let values = [3.0, -1.0, 4.0];
        assert_eq!(ema_series(&values, 1), values.to_vec());
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema_series(&[], 9).is_empty());
        assert!(ema_series(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_volume_colors_previous_close() {
        let bars = vec![
            bar(15, 100.0, 90.0, 0.0),
            bar(16, 90.0, 95.0, 0.0),
            bar(17, 95.0, 95.0, 0.0),
            bar(18, 99.0, 94.0, 0.0),
        ];
        let colors = volume_colors(&bars, VolumeColorRule::PreviousClose);
        assert_eq!(
            colors,
            vec![
                VolumeColor::Up,
                VolumeColor::Up,
                VolumeColor::Up,
                VolumeColor::Down
            ]
        );
    }

    #[test]
    fn test_volume_colors_same_bar_open() {
        let bars = vec![bar(15, 100.0, 90.0, 0.0), bar(16, 90.0, 95.0, 0.0)];
        let colors = volume_colors(&bars, VolumeColorRule::SameBarOpen);
        assert_eq!(colors, vec![VolumeColor::Down, VolumeColor::Up]);
        assert_eq!(colors[0].css(), "red");
    }

    #[test]
    fn test_indicator_series() {
        let bars = vec![bar(15, 1.0, 2.0, 4.0), bar(16, 2.0, 1.0, 8.0)];
        let series = IndicatorSeries::compute(&bars, 3, VolumeColorRule::PreviousClose);
        assert_eq!(series.len(), 2);
        assert!((series.ema[1] - 6.0).abs() < 1e-9);
        assert_eq!(series.volume_colors[1], VolumeColor::Down);
    }
}
