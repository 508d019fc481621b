use chrono::NaiveDate;

use crate::types::bar::IntradayBar;

/// 메모리에 올린 분봉 집합
///
/// 로드 이후 변경되지 않으며 시간 순으로 정렬되어 있다.
/// 탐지기와 윈도우 계산이 모두 이 저장소를 빌려서 사용한다.
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    symbol: String,
    bars: Vec<IntradayBar>,
}

impl BarStore {
    /// 분봉 목록으로 저장소 생성 (시간 순 정렬은 내부에서 보장)
    pub fn new(symbol: impl Into<String>, mut bars: Vec<IntradayBar>) -> Self {
        bars.sort_by_key(|b| b.datetime);
        BarStore {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[IntradayBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 날짜 구간(양끝 포함)에 해당하는 분봉의 인덱스 범위
    pub fn index_range(&self, from: NaiveDate, to: NaiveDate) -> std::ops::Range<usize> {
        if from > to {
            return 0..0;
        }
        let start = self.bars.partition_point(|b| b.date() < from);
        let end = self.bars.partition_point(|b| b.date() <= to);
        start..end.max(start)
    }
}
