use chrono::NaiveDate;
use std::collections::HashSet;

/// 거래 캘린더를 담당하는 구조체
/// 실제로 분봉 데이터가 존재하는 날짜들로 구성됨
#[derive(Debug, Clone, Default)]
pub struct TradingCalender {
    // 전체 거래일 집합 (포함 여부 확인용)
    all_trading_days_set: HashSet<NaiveDate>,
    // 정렬된 전체 거래일 목록 (next/previous 계산용)
    all_trading_days_list: Vec<NaiveDate>,
}

impl TradingCalender {
    /// 날짜 목록으로 캘린더 생성 (정렬/중복 제거는 내부에서 처리)
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut trading_days: Vec<NaiveDate> = dates.into_iter().collect();
        trading_days.sort_unstable(); // 이진 검색을 위해 정렬
        trading_days.dedup();

        TradingCalender {
            all_trading_days_set: trading_days.iter().cloned().collect(),
            all_trading_days_list: trading_days,
        }
    }

    pub fn len(&self) -> usize {
        self.all_trading_days_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_trading_days_list.is_empty()
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.all_trading_days_list
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.all_trading_days_set.contains(&date)
    }

    /// `date`보다 엄격하게 뒤에 있는 가장 가까운 거래일
    /// 마지막 거래일 이후라면 None
    pub fn next_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let trading_days = &self.all_trading_days_list;
        let index = match trading_days.binary_search(&date) {
            // 거래일이면 바로 다음 인덱스
            Ok(index) => index + 1,
            // 거래일이 아니면 삽입 위치가 곧 다음 거래일
            Err(insert_point) => insert_point,
        };
        trading_days.get(index).copied()
    }

    /// `date`보다 엄격하게 앞에 있는 가장 가까운 거래일
    /// 첫 거래일 이전이라면 None
    pub fn previous_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let trading_days = &self.all_trading_days_list;
        let index = match trading_days.binary_search(&date) {
            Ok(index) | Err(index) => index,
        };
        index.checked_sub(1).and_then(|i| trading_days.get(i).copied())
    }

    /// 지정한 구간(양끝 포함)에서 거래일이 아닌 날짜 목록
    /// (주말/휴장일 포함, 차트의 rangebreak 용도)
    pub fn missing_dates_in_range(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        if from > to {
            return Vec::new();
        }
        from.iter_days()
            .take_while(|d| *d <= to)
            .filter(|d| !self.is_trading_day(*d))
            .collect()
    }
}
