use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::store::BarStore;
use crate::types::bar::IntradayBar;
use crate::utility::config::{is_safe_identifier, DatabaseConfig};
use crate::utility::errors::{EventrsError, EventrsResult};

/// 텍스트 datetime 컬럼에서 허용하는 형식
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M",
];

/// 분봉 로드 결과
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub store: BarStore,
    /// 테이블에서 읽은 전체 행 수
    pub total_rows: usize,
    /// 값이 없거나 형식이 잘못되어 건너뛴 행 수
    pub skipped: usize,
    /// 기준일 이전이라 제외한 행 수
    pub filtered_out: usize,
}

/// DB 정보 조회 API - 분봉 SQLite DB에서 읽기만 담당
pub struct DbApi {
    db_connection: Connection,
}

impl DbApi {
    pub fn open<P: AsRef<Path>>(path: P) -> EventrsResult<Self> {
        let path = path.as_ref();
        debug!("🔄 [DbApi::open] DB 연결 시작: {}", path.display());

        if !path.exists() {
            return Err(EventrsError::not_found(format!(
                "분봉 DB 파일: {}",
                path.display()
            )));
        }

        let db_connection = Connection::open(path)
            .map_err(|e| EventrsError::database("분봉 DB 연결", e.to_string()))?;

        Self::optimize_database(&db_connection)?;

        info!("✅ [DbApi::open] 분봉 DB 연결 성공: {}", path.display());
        Ok(DbApi { db_connection })
    }

    /// 이미 열린 연결로 생성 (테스트/인메모리 DB용)
    pub fn from_connection(db_connection: Connection) -> EventrsResult<Self> {
        Self::optimize_database(&db_connection)?;
        Ok(DbApi { db_connection })
    }

    /// 읽기 전용 작업에 맞춘 성능 설정
    fn optimize_database(db: &Connection) -> EventrsResult<()> {
        // 메모리 사용량 최적화
        db.execute_batch("PRAGMA cache_size=10000;")?;
        db.execute_batch("PRAGMA temp_store=MEMORY;")?;

        debug!("✅ [DbApi::optimize_database] DB 최적화 설정 완료");
        Ok(())
    }

    /// DB의 사용자 테이블 목록
    pub fn list_tables(&self) -> EventrsResult<Vec<String>> {
        let tables_query = "SELECT name FROM sqlite_master \
            WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
        let mut stmt = self.db_connection.prepare(tables_query).map_err(|e| {
            EventrsError::database_query(format!("SQL 준비 실패: {} ({})", tables_query, e))
        })?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;

        debug!("📊 [DbApi::list_tables] 테이블 개수: {}개", tables.len());
        Ok(tables)
    }

    pub fn table_exists(&self, table: &str) -> EventrsResult<bool> {
        let count: i64 = self.db_connection.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
            rusqlite::params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 분봉 테이블 전체를 읽어 저장소로 만든다
    ///
    /// 필수 값이 비었거나 숫자로 읽을 수 없는 행은 건너뛰고 개수만 센다.
    /// `after`가 주어지면 그 날짜보다 뒤의 데이터만 남긴다.
    pub fn load_bars(
        &self,
        config: &DatabaseConfig,
        after: Option<NaiveDate>,
    ) -> EventrsResult<LoadReport> {
        let columns = [
            config.table.as_str(),
            config.datetime_column.as_str(),
            config.ad_line_column.as_str(),
            config.volume_column.as_str(),
        ];
        if let Some(bad) = columns.iter().find(|c| !is_safe_identifier(c)) {
            return Err(EventrsError::validation(
                "테이블/컬럼 이름",
                format!("허용되지 않는 이름: {:?}", bad),
            ));
        }

        if !self.table_exists(&config.table)? {
            return Err(EventrsError::not_found(format!(
                "분봉 테이블: {}",
                config.table
            )));
        }

        let query = format!(
            "SELECT \"{dt}\", open, high, low, close, \"{ad}\", \"{vol}\" \
             FROM \"{table}\" ORDER BY \"{dt}\"",
            dt = config.datetime_column,
            ad = config.ad_line_column,
            vol = config.volume_column,
            table = config.table,
        );

        let mut stmt = self.db_connection.prepare(&query).map_err(|e| {
            EventrsError::database_query(format!(
                "SQL 준비 실패: {} (테이블: {}) - {}",
                query, config.table, e
            ))
        })?;

        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(7);
            for i in 0..7 {
                values.push(row.get::<_, Value>(i)?);
            }
            Ok(values)
        })?;

        let mut report = LoadReport::default();
        let mut bars = Vec::new();

        for row in rows {
            let values = row?;
            report.total_rows += 1;

            let Some(bar) = bar_from_values(&values) else {
                report.skipped += 1;
                debug!(
                    "🔍 [DbApi::load_bars] 잘못된 행 건너뜀: {:?}",
                    values.first()
                );
                continue;
            };

            if after.is_some_and(|cutoff| bar.date() <= cutoff) {
                report.filtered_out += 1;
                continue;
            }

            bars.push(bar);
        }

        if report.skipped > 0 {
            warn!(
                "⚠️ [DbApi::load_bars] {}: 잘못된 행 {}개를 건너뛰었습니다 (전체 {}행)",
                config.table, report.skipped, report.total_rows
            );
        }

        report.store = BarStore::new(config.table.clone(), bars);

        info!(
            "✅ [DbApi::load_bars] {}: 분봉 {}개 로드 (전체 {}행, 건너뜀 {}, 기준일 이전 {})",
            config.table,
            report.store.len(),
            report.total_rows,
            report.skipped,
            report.filtered_out
        );

        Ok(report)
    }
}

/// 한 행의 값으로 분봉 생성 (하나라도 비정상이면 None)
fn bar_from_values(values: &[Value]) -> Option<IntradayBar> {
    let [datetime, open, high, low, close, ad_line, volume] = values else {
        return None;
    };

    let bar = IntradayBar {
        datetime: parse_datetime(datetime)?,
        open: value_to_f64(open)?,
        high: value_to_f64(high)?,
        low: value_to_f64(low)?,
        close: value_to_f64(close)?,
        ad_line_weighted: value_to_f64(ad_line)?,
        volume: value_to_f64(volume)?,
    };

    (bar.is_finite() && bar.high >= bar.low).then_some(bar)
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(*v as f64),
        Value::Real(v) => Some(*v),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Blob(_) => None,
    }
}

/// datetime 컬럼 파싱
/// - 텍스트: ISO 형식(초/소수초/타임존 유무 무관) 또는 YYYYMMDDHHMM
/// - 정수: YYYYMMDDHHMM 또는 YYYYMMDDHHMMSS
pub fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Text(s) => parse_datetime_str(s.trim()),
        Value::Integer(v) => {
            let digits = v.to_string();
            match digits.len() {
                12 => NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M").ok(),
                14 => NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S").ok(),
                _ => None,
            }
        }
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }

    // 타임존이 붙어 있으면 현지 시각 그대로 사용
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("Invalid test date")
    }

    fn create_test_db(path: &Path) {
        let conn = Connection::open(path).expect("open test db");
        conn.execute_batch(
            "CREATE TABLE banknifty (
                datetime TEXT,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                AD_LineWeighted REAL,
                weighted_volume REAL
            );
            INSERT INTO banknifty VALUES ('2020-12-31 09:15:00', 100, 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('2021-01-04 09:15:00', 100, 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('2021-01-04 09:16:00+05:30', 105, 115, 95, 100, 2.0, 20);
            INSERT INTO banknifty VALUES ('2021-01-05T09:15:00', 100, 700, 90, 650, 3.0, 30);
            INSERT INTO banknifty VALUES ('2021-01-05 09:16:00', NULL, 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('garbage', 100, 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('2021-01-06 09:15:00', 'abc', 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('2021-01-06 09:16:00', '101.5', 110, 90, 105, 1.0, 10);
            INSERT INTO banknifty VALUES ('2021-01-06 09:17:00', 100, 80, 90, 105, 1.0, 10);
            CREATE TABLE finnifty (datetime TEXT);",
        )
        .expect("create test table");
    }

    #[test]
    fn test_load_bars_skips_malformed_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("intraday.db");
        create_test_db(&path);

        let api = DbApi::open(&path).expect("open");
        let report = api
            .load_bars(&DatabaseConfig::default(), None)
            .expect("load");

        assert_eq!(report.total_rows, 9);
        // NULL, garbage datetime, 'abc', high < low
        assert_eq!(report.skipped, 4);
        assert_eq!(report.filtered_out, 0);
        assert_eq!(report.store.len(), 5);
        assert_eq!(report.store.symbol(), "banknifty");

        let texts: Vec<f64> = report.store.bars().iter().map(|b| b.open).collect();
        assert!(texts.contains(&101.5));
    }

    #[test]
    fn test_load_bars_after_cutoff() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("intraday.db");
        create_test_db(&path);

        let api = DbApi::open(&path).expect("open");
        let report = api
            .load_bars(&DatabaseConfig::default(), Some(d(2020, 12, 31)))
            .expect("load");

        assert_eq!(report.filtered_out, 1);
        assert_eq!(report.store.len(), 4);
        assert!(report.store.bars().iter().all(|b| b.date() > d(2020, 12, 31)));
        let mut dates: Vec<_> = report.store.bars().iter().map(|b| b.date()).collect();
        dates.dedup();
        assert_eq!(dates, vec![d(2021, 1, 4), d(2021, 1, 5), d(2021, 1, 6)]);
    }

    #[test]
    fn test_missing_table_and_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("intraday.db");
        create_test_db(&path);

        let api = DbApi::open(&path).expect("open");
        let config = DatabaseConfig {
            table: "nifty".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            api.load_bars(&config, None),
            Err(EventrsError::NotFound { .. })
        ));

        let config = DatabaseConfig {
            table: "bank\"nifty".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            api.load_bars(&config, None),
            Err(EventrsError::Validation { .. })
        ));

        // 컬럼이 없는 테이블은 쿼리 준비 단계에서 실패
        let config = DatabaseConfig {
            table: "finnifty".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            api.load_bars(&config, None),
            Err(EventrsError::Database { .. })
        ));

        assert!(DbApi::open(dir.path().join("none.db")).is_err());
    }

    #[test]
    fn test_list_tables() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("CREATE TABLE b (x); CREATE TABLE a (x);")
            .expect("create tables");
        let api = DbApi::from_connection(conn).expect("api");
        assert_eq!(api.list_tables().expect("tables"), vec!["a", "b"]);
        assert!(api.table_exists("a").expect("exists"));
        assert!(!api.table_exists("c").expect("exists"));
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDateTime::parse_from_str("2021-01-04 09:15:00", "%Y-%m-%d %H:%M:%S")
            .expect("valid");

        for text in [
            "2021-01-04 09:15:00",
            "2021-01-04T09:15:00",
            "2021-01-04 09:15",
            "2021-01-04 09:15:00+05:30",
            "2021-01-04T09:15:00+05:30",
            "202101040915",
        ] {
            assert_eq!(
                parse_datetime(&Value::Text(text.to_string())),
                Some(expected),
                "format: {}",
                text
            );
        }

        assert_eq!(parse_datetime(&Value::Integer(202101040915)), Some(expected));
        assert_eq!(parse_datetime(&Value::Integer(20210104091500)), Some(expected));
        assert_eq!(parse_datetime(&Value::Integer(20210104)), None);
        assert_eq!(parse_datetime(&Value::Null), None);
        assert_eq!(parse_datetime(&Value::Text(String::new())), None);
    }
}
